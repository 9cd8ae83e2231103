//! Simulated host for running an ad session end to end
//!
//! Plays the part of both the host player (lifecycle calls) and the video
//! element (position updates), advancing media time by a fixed step per tick.

use anyhow::{bail, Context};
use kino_vpaid_core::{
    AdParameters, AdSession, AdSessionConfig, AdState, AdSurface, AttributeValue, MediaBinding,
    MediaNotifier, TrackingRecord, ViewMode,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

const DESIRED_BITRATE: u32 = 256;
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// What the simulated host does during the session
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub duration: f64,
    pub step: f64,
    pub width: u32,
    pub height: u32,
    pub pause_at: Option<f64>,
    pub skippable: bool,
    pub skip_at: Option<f64>,
}

impl SimulationPlan {
    fn validate(&self) -> anyhow::Result<()> {
        if !(self.duration.is_finite() && self.duration > 0.0) {
            bail!("duration must be positive, got {}", self.duration);
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            bail!("step must be positive, got {}", self.step);
        }
        Ok(())
    }

    fn max_ticks(&self) -> usize {
        (self.duration / self.step).ceil() as usize + 16
    }
}

/// Outcome of a simulated session
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub session_id: String,
    pub source: Option<String>,
    pub final_state: AdState,
    pub position: f64,
    pub attributes: Vec<(String, AttributeValue)>,
    pub events: Vec<TrackingRecord>,
}

#[derive(Default)]
struct MediaState {
    notifier: Option<MediaNotifier>,
    source: Option<String>,
    playing: bool,
    position: f64,
    duration: f64,
}

/// In-process stand-in for a video element
#[derive(Clone, Default)]
pub struct SimulatedMedia {
    state: Arc<Mutex<MediaState>>,
}

impl SimulatedMedia {
    pub fn new(duration: f64) -> Self {
        let media = Self::default();
        media.lock().duration = duration;
        media
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MediaState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Advance media time if playing; returns the notifier to report through
    fn tick(&self, step: f64) -> Option<MediaNotifier> {
        let mut state = self.lock();
        if state.playing {
            state.position = (state.position + step).min(state.duration);
        }
        state.notifier.clone()
    }

    pub fn position(&self) -> f64 {
        self.lock().position
    }

    pub fn source(&self) -> Option<String> {
        self.lock().source.clone()
    }
}

impl MediaBinding for SimulatedMedia {
    fn attach(&mut self, notifier: MediaNotifier) {
        self.lock().notifier = Some(notifier);
    }

    fn set_source(&mut self, url: &str) {
        debug!(url, "Media source set");
        self.lock().source = Some(url.to_string());
    }

    fn set_dimensions(&mut self, width: u32, height: u32) {
        debug!(width, height, "Media resized");
    }

    fn play(&mut self) {
        self.lock().playing = true;
    }

    fn pause(&mut self) {
        self.lock().playing = false;
    }

    fn current_position(&self) -> f64 {
        self.lock().position
    }

    fn duration(&self) -> f64 {
        self.lock().duration
    }
}

/// Surface that only logs what a real one would render
struct LoggingSurface;

impl AdSurface for LoggingSurface {
    fn ad_loaded(&mut self, params: &AdParameters) {
        for (family, url) in params.font_faces() {
            info!(family, url, "Font face");
        }
    }

    fn media_ready(&mut self, source: &str) {
        info!(source, "Media ready");
    }

    fn request_fullscreen(&mut self) {
        info!("Fullscreen requested");
    }
}

/// Drive one session from handshake to delivered `AdStopped`
pub async fn run(
    config: AdSessionConfig,
    params: &str,
    plan: &SimulationPlan,
) -> anyhow::Result<SimulationReport> {
    plan.validate()?;

    let session = AdSession::new(config)?;
    let media = SimulatedMedia::new(plan.duration);
    session.set_surface(Box::new(LoggingSurface));

    session.handshake_version("2.0");
    if plan.skippable {
        session.set_attribute("skippableState", AttributeValue::Bool(true))?;
    }
    session
        .initialize(
            plan.width,
            plan.height,
            ViewMode::Normal,
            DESIRED_BITRATE,
            params,
            Box::new(media.clone()),
        )
        .context("initialize failed")?;
    session.start()?;

    let mut paused_once = false;
    for _ in 0..plan.max_ticks() {
        if !session.state().is_playing() {
            break;
        }
        let position = media.position();

        if let Some(skip_at) = plan.skip_at {
            if position >= skip_at {
                info!(position, "Host requests skip");
                session.skip()?;
                session.stop()?;
                break;
            }
        }

        if let Some(pause_at) = plan.pause_at {
            if !paused_once && position >= pause_at {
                paused_once = true;
                session.pause()?;
                // one update arrives while paused
                if let Some(notifier) = media.tick(plan.step) {
                    notifier.time_update()?;
                }
                session.resume()?;
                continue;
            }
        }

        if let Some(notifier) = media.tick(plan.step) {
            notifier.time_update()?;
        }
        tokio::task::yield_now().await;
    }

    if session.state().is_live() {
        info!("Media did not complete, stopping");
        session.stop()?;
    }

    tokio::time::timeout(STOP_TIMEOUT, session.stopped())
        .await
        .context("AdStopped was never delivered")?;

    Ok(SimulationReport {
        session_id: session.id().to_string(),
        source: media.source(),
        final_state: session.state(),
        position: media.position(),
        attributes: session
            .attributes()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
        events: session.tracking_log(),
    })
}
