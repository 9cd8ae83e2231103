//! Collaborators the session directs but does not own
//!
//! [`MediaBinding`] wraps the host-supplied video element: the session asks it
//! to load, size, play and pause, and it reports progress back through the
//! [`MediaNotifier`] handed to [`MediaBinding::attach`]. [`AdSurface`] is the
//! visual layer around the video; it only needs to hear about lifecycle
//! milestones.

use crate::params::AdParameters;

pub use crate::session::MediaNotifier;

/// Host media element, as seen by the ad session.
///
/// Implementations must not call back into the [`MediaNotifier`] from inside
/// these methods; queue notifications and deliver them from the media's own
/// event loop instead.
pub trait MediaBinding: Send {
    /// Register for position-changed and playback-ended notifications
    fn attach(&mut self, notifier: MediaNotifier);

    /// Point the element at a media file
    fn set_source(&mut self, url: &str);

    fn set_dimensions(&mut self, width: u32, height: u32);

    fn play(&mut self);

    fn pause(&mut self);

    /// Current position in seconds
    fn current_position(&self) -> f64;

    /// Media duration in seconds; NaN or zero while unknown
    fn duration(&self) -> f64;
}

/// Visual layer around the ad video. Every hook defaults to doing nothing.
pub trait AdSurface: Send {
    /// Creative parameters decoded, media source assigned
    fn ad_loaded(&mut self, _params: &AdParameters) {}

    /// Media source handed to the binding
    fn media_ready(&mut self, _source: &str) {}

    fn ad_started(&mut self) {}

    fn request_fullscreen(&mut self) {}

    fn exit_fullscreen(&mut self) {}
}
