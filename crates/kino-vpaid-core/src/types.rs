//! Core types for Kino VPAID

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for an ad session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ad session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdState {
    /// Created, waiting for `initialize`
    Uninitialized,
    /// Creative loaded, media requested, waiting for `start`
    Initialized,
    /// Ad is showing
    Started,
    /// Ad paused by the host
    Paused,
    /// Terminal
    Stopped,
}

impl AdState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: AdState) -> bool {
        use AdState::*;
        matches!(
            (self, target),
            // From Uninitialized
            (Uninitialized, Initialized) |
            // From Initialized
            (Initialized, Started) | (Initialized, Stopped) |
            // From Started
            (Started, Paused) | (Started, Stopped) |
            // From Paused
            (Paused, Paused) | (Paused, Started) | (Paused, Stopped)
        )
    }

    /// Initialized and not yet stopped
    pub fn is_live(&self) -> bool {
        matches!(self, AdState::Initialized | AdState::Started | AdState::Paused)
    }

    /// Showing, whether paused or not
    pub fn is_playing(&self) -> bool {
        matches!(self, AdState::Started | AdState::Paused)
    }

    pub fn is_terminal(&self) -> bool {
        *self == AdState::Stopped
    }
}

impl std::fmt::Display for AdState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdState::Uninitialized => write!(f, "uninitialized"),
            AdState::Initialized => write!(f, "initialized"),
            AdState::Started => write!(f, "started"),
            AdState::Paused => write!(f, "paused"),
            AdState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Presentation mode requested by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Normal,
    Fullscreen,
    Thumbnail,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Normal => "normal",
            ViewMode::Fullscreen => "fullscreen",
            ViewMode::Thumbnail => "thumbnail",
        }
    }
}

impl FromStr for ViewMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(ViewMode::Normal),
            "fullscreen" => Ok(ViewMode::Fullscreen),
            "thumbnail" => Ok(ViewMode::Thumbnail),
            other => Err(Error::InvalidAttribute(format!("unknown view mode '{}'", other))),
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events the ad emits to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdEvent {
    AdLoaded,
    AdImpression,
    AdStarted,
    AdVideoStart,
    AdVideoFirstQuartile,
    AdVideoMidpoint,
    AdVideoThirdQuartile,
    AdVideoComplete,
    AdPaused,
    AdResumed,
    AdStopped,
    AdSkipped,
    AdExpanded,
    AdSizeChange,
    AdVolumeChange,
    AdClickThru,
}

impl AdEvent {
    /// Full event vocabulary, in declaration order
    pub const ALL: [AdEvent; 16] = [
        AdEvent::AdLoaded,
        AdEvent::AdImpression,
        AdEvent::AdStarted,
        AdEvent::AdVideoStart,
        AdEvent::AdVideoFirstQuartile,
        AdEvent::AdVideoMidpoint,
        AdEvent::AdVideoThirdQuartile,
        AdEvent::AdVideoComplete,
        AdEvent::AdPaused,
        AdEvent::AdResumed,
        AdEvent::AdStopped,
        AdEvent::AdSkipped,
        AdEvent::AdExpanded,
        AdEvent::AdSizeChange,
        AdEvent::AdVolumeChange,
        AdEvent::AdClickThru,
    ];

    /// Wire name used for host subscriptions
    pub fn as_str(&self) -> &'static str {
        match self {
            AdEvent::AdLoaded => "AdLoaded",
            AdEvent::AdImpression => "AdImpression",
            AdEvent::AdStarted => "AdStarted",
            AdEvent::AdVideoStart => "AdVideoStart",
            AdEvent::AdVideoFirstQuartile => "AdVideoFirstQuartile",
            AdEvent::AdVideoMidpoint => "AdVideoMidpoint",
            AdEvent::AdVideoThirdQuartile => "AdVideoThirdQuartile",
            AdEvent::AdVideoComplete => "AdVideoComplete",
            AdEvent::AdPaused => "AdPaused",
            AdEvent::AdResumed => "AdResumed",
            AdEvent::AdStopped => "AdStopped",
            AdEvent::AdSkipped => "AdSkipped",
            AdEvent::AdExpanded => "AdExpanded",
            AdEvent::AdSizeChange => "AdSizeChange",
            AdEvent::AdVolumeChange => "AdVolumeChange",
            AdEvent::AdClickThru => "AdClickThru",
        }
    }

    /// Returns true for the progress events driven by media position
    pub fn is_quartile(&self) -> bool {
        matches!(
            self,
            AdEvent::AdVideoStart
                | AdEvent::AdVideoFirstQuartile
                | AdEvent::AdVideoMidpoint
                | AdEvent::AdVideoThirdQuartile
                | AdEvent::AdVideoComplete
        )
    }
}

impl FromStr for AdEvent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AdEvent::ALL
            .iter()
            .copied()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| Error::InvalidAttribute(format!("unknown event '{}'", s)))
    }
}

impl std::fmt::Display for AdEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ad session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdSessionConfig {
    /// Version string answered to `handshakeVersion`
    pub supported_version: String,
    /// Delay before `AdStopped` is delivered (milliseconds)
    pub stop_delay_ms: u64,
    /// Distance from the end (seconds) treated as natural completion
    pub completion_tolerance: f64,
    /// Reject `initialize` until the host has called `handshakeVersion`
    pub require_handshake: bool,
    /// Maximum dispatch records kept in the tracking log
    pub tracking_capacity: usize,
}

impl AdSessionConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.supported_version.is_empty() {
            return Err(Error::InvalidConfig("supported_version is empty".into()));
        }
        if !self.completion_tolerance.is_finite() || self.completion_tolerance < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "completion_tolerance must be a non-negative number, got {}",
                self.completion_tolerance
            )));
        }
        if self.tracking_capacity == 0 {
            return Err(Error::InvalidConfig("tracking_capacity must be at least 1".into()));
        }
        Ok(())
    }

    pub fn stop_delay(&self) -> Duration {
        Duration::from_millis(self.stop_delay_ms)
    }
}

impl Default for AdSessionConfig {
    fn default() -> Self {
        Self {
            supported_version: "2.0".to_string(),
            stop_delay_ms: 75,
            completion_tolerance: 1.0,
            require_handshake: true,
            tracking_capacity: 256,
        }
    }
}
