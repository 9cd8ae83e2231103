//! Kino VPAID Core - Ad Session Controller for Kino
//!
//! This crate provides the controller behind a VPAID-style video ad unit:
//! - Host lifecycle calls (initialize, start, pause, resume, stop, ...)
//! - The attribute store hosts query and set
//! - Single-callback-per-event host subscriptions
//! - Quartile progress events driven by the media element
//! - Deferred `AdStopped` delivery
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Kino VPAID Core                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │  Attribute   │  │    Event     │  │   Quartile   │          │
//! │  │    Store     │  │   Registry   │  │   Tracker    │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │        host ─────▶ │     Ad      │ ◀───── media binding         │
//! │                    │   Session   │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐                              │
//! │  │  Ad Surface  │  │  Tracking   │                              │
//! │  │  (external)  │  │     Log     │                              │
//! │  └──────────────┘  └─────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use kino_vpaid_core::{AdSession, MediaBinding, ViewMode};
//!
//! fn run(media: Box<dyn MediaBinding>) -> kino_vpaid_core::Result<()> {
//!     let session = AdSession::default();
//!     session.subscribe("AdLoaded", || {
//!         println!("ad loaded");
//!         Ok(())
//!     });
//!
//!     session.handshake_version("2.0");
//!     session.initialize(640, 360, ViewMode::Normal, 300, r#"{"videoUrl":"ad.mp4"}"#, media)?;
//!     session.start()
//! }
//! ```

pub mod error;
pub mod types;
pub mod attributes;
pub mod events;
pub mod quartile;
pub mod media;
pub mod params;
pub mod tracking;
pub mod session;

pub use error::{Error, Result};
pub use types::*;
pub use attributes::{AttributeKey, AttributeStore, AttributeValue};
pub use events::{EventCallback, EventRegistry};
pub use quartile::{QuartileTracker, QUARTILES};
pub use media::{AdSurface, MediaBinding, MediaNotifier};
pub use params::AdParameters;
pub use tracking::{TrackingLog, TrackingRecord};
pub use session::AdSession;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Create an ad session with the default configuration
pub fn get_vpaid_ad() -> AdSession {
    tracing::debug!(version = VERSION, "Creating ad session");
    AdSession::default()
}
