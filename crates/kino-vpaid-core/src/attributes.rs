//! Ad attribute store
//!
//! The fixed set of attributes a host can query (and in part set) on an ad.
//! Every key exists for the whole life of the store; lookups by a name outside
//! the set fail with [`Error::InvalidAttribute`].

use crate::{types::ViewMode, Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Attribute names, as spelled by hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKey {
    Companions,
    DesiredBitrate,
    Duration,
    Expanded,
    Height,
    Icons,
    Linear,
    RemainingTime,
    SkippableState,
    ViewMode,
    Width,
    Volume,
}

impl AttributeKey {
    pub const ALL: [AttributeKey; 12] = [
        AttributeKey::Companions,
        AttributeKey::DesiredBitrate,
        AttributeKey::Duration,
        AttributeKey::Expanded,
        AttributeKey::Height,
        AttributeKey::Icons,
        AttributeKey::Linear,
        AttributeKey::RemainingTime,
        AttributeKey::SkippableState,
        AttributeKey::ViewMode,
        AttributeKey::Width,
        AttributeKey::Volume,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKey::Companions => "companions",
            AttributeKey::DesiredBitrate => "desiredBitrate",
            AttributeKey::Duration => "duration",
            AttributeKey::Expanded => "expanded",
            AttributeKey::Height => "height",
            AttributeKey::Icons => "icons",
            AttributeKey::Linear => "linear",
            AttributeKey::RemainingTime => "remainingTime",
            AttributeKey::SkippableState => "skippableState",
            AttributeKey::ViewMode => "viewMode",
            AttributeKey::Width => "width",
            AttributeKey::Volume => "volume",
        }
    }
}

impl FromStr for AttributeKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AttributeKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| Error::InvalidAttribute(s.to_string()))
    }
}

impl std::fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Integer(u32),
    Number(f64),
    Text(String),
    ViewMode(ViewMode),
}

impl AttributeValue {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Bool(_) => "boolean",
            AttributeValue::Integer(_) => "integer",
            AttributeValue::Number(_) => "number",
            AttributeValue::Text(_) => "string",
            AttributeValue::ViewMode(_) => "view mode",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(v) => Some(*v),
            AttributeValue::Integer(v) => Some(f64::from(*v)),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Integer(v) => write!(f, "{}", v),
            AttributeValue::Number(v) => write!(f, "{}", v),
            AttributeValue::Text(v) => write!(f, "{:?}", v),
            AttributeValue::ViewMode(v) => write!(f, "{}", v),
        }
    }
}

/// Mutable ad attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeStore {
    /// Serialized companion descriptors, opaque
    pub companions: String,
    pub desired_bitrate: u32,
    /// Media duration in seconds, -1 while unknown
    pub duration: f64,
    pub expanded: bool,
    pub height: u32,
    /// Serialized icon descriptors, opaque
    pub icons: String,
    pub linear: bool,
    /// Seconds left, -1 while unknown
    pub remaining_time: f64,
    pub skippable_state: bool,
    pub view_mode: ViewMode,
    pub width: u32,
    /// Volume in [0, 1]
    pub volume: f64,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self {
            companions: String::new(),
            desired_bitrate: 256,
            duration: -1.0,
            expanded: false,
            height: 0,
            icons: String::new(),
            linear: true,
            remaining_time: -1.0,
            skippable_state: false,
            view_mode: ViewMode::Normal,
            width: 0,
            volume: 1.0,
        }
    }

    /// Look up an attribute by host name
    pub fn get(&self, name: &str) -> Result<AttributeValue> {
        Ok(self.get_key(name.parse()?))
    }

    /// Set an attribute by host name
    pub fn set(&mut self, name: &str, value: AttributeValue) -> Result<()> {
        self.set_key(name.parse()?, value)
    }

    pub fn get_key(&self, key: AttributeKey) -> AttributeValue {
        match key {
            AttributeKey::Companions => AttributeValue::Text(self.companions.clone()),
            AttributeKey::DesiredBitrate => AttributeValue::Integer(self.desired_bitrate),
            AttributeKey::Duration => AttributeValue::Number(self.duration),
            AttributeKey::Expanded => AttributeValue::Bool(self.expanded),
            AttributeKey::Height => AttributeValue::Integer(self.height),
            AttributeKey::Icons => AttributeValue::Text(self.icons.clone()),
            AttributeKey::Linear => AttributeValue::Bool(self.linear),
            AttributeKey::RemainingTime => AttributeValue::Number(self.remaining_time),
            AttributeKey::SkippableState => AttributeValue::Bool(self.skippable_state),
            AttributeKey::ViewMode => AttributeValue::ViewMode(self.view_mode),
            AttributeKey::Width => AttributeValue::Integer(self.width),
            AttributeKey::Volume => AttributeValue::Number(self.volume),
        }
    }

    /// Set an attribute; the value must be of the key's kind
    pub fn set_key(&mut self, key: AttributeKey, value: AttributeValue) -> Result<()> {
        use AttributeKey as K;
        use AttributeValue as V;

        match (key, value) {
            (K::Companions, V::Text(text)) => self.companions = text,
            (K::Icons, V::Text(text)) => self.icons = text,
            (K::DesiredBitrate, V::Integer(n)) => self.desired_bitrate = n,
            (K::Height, V::Integer(n)) => self.height = n,
            (K::Width, V::Integer(n)) => self.width = n,
            (K::Expanded, V::Bool(flag)) => self.expanded = flag,
            (K::Linear, V::Bool(flag)) => self.linear = flag,
            (K::SkippableState, V::Bool(flag)) => self.skippable_state = flag,
            // integers widen into number attributes
            (K::Duration, V::Number(n)) => self.duration = n,
            (K::Duration, V::Integer(n)) => self.duration = f64::from(n),
            (K::RemainingTime, V::Number(n)) => self.remaining_time = n,
            (K::RemainingTime, V::Integer(n)) => self.remaining_time = f64::from(n),
            (K::Volume, V::Number(n)) => self.volume = n,
            (K::Volume, V::Integer(n)) => self.volume = f64::from(n),
            (K::ViewMode, V::ViewMode(mode)) => self.view_mode = mode,
            (K::ViewMode, V::Text(text)) => self.view_mode = text.parse()?,
            (key, value) => {
                return Err(Error::InvalidAttribute(format!(
                    "{} does not accept a {} value",
                    key,
                    value.kind()
                )))
            }
        }
        Ok(())
    }

    /// Snapshot of every attribute, in key order
    pub fn entries(&self) -> Vec<(AttributeKey, AttributeValue)> {
        AttributeKey::ALL
            .iter()
            .map(|key| (*key, self.get_key(*key)))
            .collect()
    }
}

impl Default for AttributeStore {
    fn default() -> Self {
        Self::new()
    }
}
