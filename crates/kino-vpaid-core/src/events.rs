//! Host event subscriptions
//!
//! One callback per event name. Subscribing again replaces the previous
//! callback; there is no fan-out. Dispatch calls the callback directly on the
//! caller's stack and hands any failure straight back.

use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Callback registered by the host for a single event
pub type EventCallback = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Event name to callback mapping
#[derive(Default, Clone)]
pub struct EventRegistry {
    callbacks: HashMap<String, EventCallback>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event_name`, replacing any earlier one
    pub fn subscribe(&mut self, event_name: impl Into<String>, callback: EventCallback) {
        let event_name = event_name.into();
        if self.callbacks.insert(event_name.clone(), callback).is_some() {
            debug!(event = %event_name, "Replaced event callback");
        }
    }

    /// Drop the callback for `event_name`, if any
    pub fn unsubscribe(&mut self, event_name: &str) {
        self.callbacks.remove(event_name);
    }

    /// Callback currently registered for `event_name`
    pub fn handler(&self, event_name: &str) -> Option<EventCallback> {
        self.callbacks.get(event_name).cloned()
    }

    /// Invoke the callback for `event_name`.
    ///
    /// Returns `Ok(false)` when nothing is subscribed.
    pub fn dispatch(&self, event_name: &str) -> Result<bool> {
        match self.handler(event_name) {
            Some(callback) => invoke(event_name, &callback).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.callbacks.keys().collect();
        names.sort();
        f.debug_struct("EventRegistry").field("events", &names).finish()
    }
}

/// Run a callback, attributing any failure to `event_name`
pub(crate) fn invoke(event_name: &str, callback: &EventCallback) -> Result<()> {
    callback().map_err(|source| Error::Callback {
        event: event_name.to_string(),
        source,
    })
}
