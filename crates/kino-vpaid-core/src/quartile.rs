//! Playback progress tracking
//!
//! Turns media position samples into the ordered one-shot progress events
//! (`AdVideoStart` through `AdVideoComplete`). A sample that jumps across
//! several thresholds yields every crossed event, lowest threshold first.

use crate::types::AdEvent;
use tracing::debug;

/// Progress thresholds (percent of duration) and the event each one fires
pub static QUARTILES: [(f64, AdEvent); 5] = [
    (0.0, AdEvent::AdVideoStart),
    (25.0, AdEvent::AdVideoFirstQuartile),
    (50.0, AdEvent::AdVideoMidpoint),
    (75.0, AdEvent::AdVideoThirdQuartile),
    (100.0, AdEvent::AdVideoComplete),
];

/// Cursor over [`QUARTILES`]; only ever moves forward
#[derive(Debug, Clone, Default)]
pub struct QuartileTracker {
    next_index: usize,
}

impl QuartileTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a position sample; returns the events crossed, in order.
    ///
    /// Samples with an unknown or zero duration produce nothing.
    pub fn on_progress(&mut self, position: f64, duration: f64) -> Vec<AdEvent> {
        let crossed: Vec<_> = std::iter::from_fn(|| self.take_next(position, duration)).collect();
        if !crossed.is_empty() {
            debug!(position, duration, events = ?crossed, "Quartiles crossed");
        }
        crossed
    }

    /// Claim the next event if `position` has crossed its threshold.
    ///
    /// Advances by at most one threshold, so a caller delivering events one
    /// at a time leaves the rest pending when a delivery fails.
    pub fn take_next(&mut self, position: f64, duration: f64) -> Option<AdEvent> {
        if !duration.is_finite() || duration <= 0.0 || position.is_nan() {
            return None;
        }

        let percent = position * 100.0 / duration;
        let (threshold, event) = QUARTILES.get(self.next_index)?;
        if percent < *threshold {
            return None;
        }
        self.next_index += 1;
        Some(*event)
    }

    /// Claim the next event regardless of position
    pub fn take_remaining(&mut self) -> Option<AdEvent> {
        let (_, event) = QUARTILES.get(self.next_index)?;
        self.next_index += 1;
        Some(*event)
    }

    /// Everything not yet fired, for media that completed without
    /// reporting a final 100% sample
    pub fn complete(&mut self) -> Vec<AdEvent> {
        std::iter::from_fn(|| self.take_remaining()).collect()
    }

    /// Index of the next threshold to watch
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Next event that will fire, if any
    pub fn next_event(&self) -> Option<AdEvent> {
        QUARTILES.get(self.next_index).map(|(_, event)| *event)
    }

    pub fn is_exhausted(&self) -> bool {
        self.next_index >= QUARTILES.len()
    }
}
