//! Ad Session - the controller a host drives
//!
//! Coordinates:
//! - Host lifecycle calls and the state machine behind them
//! - The attribute store hosts query
//! - Event dispatch to host callbacks
//! - Media progress and quartile events
//! - The deferred `AdStopped` delivery
//!
//! All dispatch is synchronous on the caller's stack, and no lock is held
//! while a host callback runs, so callbacks may call back into the session.

use crate::{
    attributes::{AttributeKey, AttributeStore, AttributeValue},
    events::{self, EventCallback, EventRegistry},
    media::{AdSurface, MediaBinding},
    params::AdParameters,
    quartile::QuartileTracker,
    tracking::{TrackingLog, TrackingRecord},
    types::*,
    Error, Result,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Mutable session state, guarded by one lock
struct Inner {
    state: AdState,
    /// Host version seen at handshake
    host_version: Option<String>,
    attributes: AttributeStore,
    events: EventRegistry,
    quartiles: QuartileTracker,
    parameters: Option<AdParameters>,
    tracking: TrackingLog,
}

#[derive(Default)]
struct Collaborators {
    media: Option<Box<dyn MediaBinding>>,
    surface: Option<Box<dyn AdSurface>>,
}

struct Shared {
    id: SessionId,
    config: AdSessionConfig,
    inner: Mutex<Inner>,
    collaborators: Mutex<Collaborators>,
    state_tx: watch::Sender<AdState>,
    stop_tx: watch::Sender<bool>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn collaborators(&self) -> MutexGuard<'_, Collaborators> {
        self.collaborators.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_media(&self, f: impl FnOnce(&mut dyn MediaBinding)) {
        if let Some(media) = self.collaborators().media.as_mut() {
            f(media.as_mut());
        }
    }

    fn with_surface(&self, f: impl FnOnce(&mut dyn AdSurface)) {
        if let Some(surface) = self.collaborators().surface.as_mut() {
            f(surface.as_mut());
        }
    }

    /// Move to `target`, or fail without touching anything
    fn transition(&self, inner: &mut Inner, operation: &'static str, target: AdState) -> Result<()> {
        let current = inner.state;
        if !current.can_transition_to(target) {
            warn!(operation, state = %current, "Rejected host call");
            return Err(Error::invalid_state(operation, current));
        }

        inner.state = target;
        self.state_tx.send_replace(target);
        if current != target {
            info!(session_id = %self.id, from = %current, to = %target, "State transition");
        }
        Ok(())
    }

    /// Fail unless the ad is initialized and not yet stopped
    fn require_live(&self, inner: &Inner, operation: &'static str) -> Result<()> {
        if inner.state.is_live() {
            Ok(())
        } else {
            warn!(operation, state = %inner.state, "Rejected host call");
            Err(Error::invalid_state(operation, inner.state))
        }
    }

    /// Deliver one event to the host
    fn dispatch(&self, event: AdEvent) -> Result<()> {
        let handler = Self::claim_handler(&mut self.lock(), event);
        Self::deliver(event, handler)
    }

    /// Record `event` and look up its callback; runs under the lock
    fn claim_handler(inner: &mut Inner, event: AdEvent) -> Option<EventCallback> {
        let handler = inner.events.handler(event.as_str());
        inner.tracking.record(event, handler.is_some());
        handler
    }

    fn deliver(event: AdEvent, handler: Option<EventCallback>) -> Result<()> {
        debug!(event = %event, subscribed = handler.is_some(), "Dispatching event");
        match handler {
            Some(callback) => events::invoke(event.as_str(), &callback),
            None => Ok(()),
        }
    }

    /// Dispatch quartile events one at a time. `next` claims the next event
    /// under the lock, so a failed delivery leaves later ones pending.
    fn dispatch_quartiles(
        &self,
        mut next: impl FnMut(&mut Inner) -> Option<AdEvent>,
    ) -> Result<()> {
        loop {
            let claimed = {
                let mut inner = self.lock();
                next(&mut *inner).map(|event| (event, Self::claim_handler(&mut *inner, event)))
            };
            match claimed {
                Some((event, handler)) => Self::deliver(event, handler)?,
                None => return Ok(()),
            }
        }
    }

    /// Media progress sample
    fn on_time_update(self: &Arc<Self>, position: f64, duration: f64) -> Result<()> {
        let completed = {
            let mut inner = self.lock();
            if !inner.state.is_playing() {
                debug!(state = %inner.state, position, "Ignoring time update");
                return Ok(());
            }

            let known = duration.is_finite() && duration > 0.0;
            if known {
                inner.attributes.duration = duration;
                inner.attributes.remaining_time = (duration - position).max(0.0);
            }

            let completed = known && position + self.config.completion_tolerance >= duration;
            if completed {
                inner.attributes.remaining_time = 0.0;
                self.transition(&mut inner, "complete", AdState::Stopped)?;
            }
            completed
        };

        if completed {
            return self.complete_playback();
        }

        // a callback may pause or stop the ad between events
        self.dispatch_quartiles(|inner| {
            if inner.state.is_playing() {
                inner.quartiles.take_next(position, duration)
            } else {
                None
            }
        })
    }

    /// Media reached its end
    fn on_ended(self: &Arc<Self>) -> Result<()> {
        {
            let mut inner = self.lock();
            if !inner.state.is_playing() {
                debug!(state = %inner.state, "Ignoring end of media");
                return Ok(());
            }
            inner.attributes.remaining_time = 0.0;
            self.transition(&mut inner, "complete", AdState::Stopped)?;
        }

        self.complete_playback()
    }

    /// Natural completion, after the move to `Stopped`: pause the media, fire
    /// every quartile not yet fired, then schedule `AdStopped`
    fn complete_playback(self: &Arc<Self>) -> Result<()> {
        info!(session_id = %self.id, "Media completed");
        self.with_media(|media| media.pause());

        let delivered = self.dispatch_quartiles(|inner| inner.quartiles.take_remaining());
        self.schedule_stop();
        delivered
    }

    /// Deliver `AdStopped` after the configured delay
    fn schedule_stop(self: &Arc<Self>) {
        let delay = self.config.stop_delay();
        let shared = Arc::clone(self);

        debug!(delay_ms = self.config.stop_delay_ms, "Scheduling AdStopped");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    shared.deliver_stopped();
                });
            }
            Err(_) => {
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    shared.deliver_stopped();
                });
            }
        }
    }

    fn deliver_stopped(&self) {
        if let Err(e) = self.dispatch(AdEvent::AdStopped) {
            warn!(session_id = %self.id, error = %e, "AdStopped callback failed");
        }
        self.stop_tx.send_replace(true);
        info!(session_id = %self.id, "Ad stopped");
    }
}

/// Handle given to the media binding for reporting playback progress.
///
/// Holds only a weak reference; notifications after the session is dropped
/// are ignored.
#[derive(Clone)]
pub struct MediaNotifier {
    shared: Weak<Shared>,
}

impl MediaNotifier {
    /// Position changed; the session reads position and duration back from
    /// the binding
    pub fn time_update(&self) -> Result<()> {
        let Some(shared) = self.shared.upgrade() else {
            return Ok(());
        };

        let sample = shared
            .collaborators()
            .media
            .as_ref()
            .map(|media| (media.current_position(), media.duration()));

        match sample {
            Some((position, duration)) => shared.on_time_update(position, duration),
            None => Ok(()),
        }
    }

    /// Playback reached the end of the media
    pub fn ended(&self) -> Result<()> {
        match self.shared.upgrade() {
            Some(shared) => shared.on_ended(),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for MediaNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaNotifier")
            .field("attached", &(self.shared.strong_count() > 0))
            .finish()
    }
}

/// Ad session managing a single ad, from initialize to stop
pub struct AdSession {
    shared: Arc<Shared>,
}

impl AdSession {
    /// Create a new ad session
    pub fn new(config: AdSessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: AdSessionConfig) -> Self {
        let id = SessionId::new();
        let (state_tx, _) = watch::channel(AdState::Uninitialized);
        let (stop_tx, _) = watch::channel(false);

        let inner = Inner {
            state: AdState::Uninitialized,
            host_version: None,
            attributes: AttributeStore::new(),
            events: EventRegistry::new(),
            quartiles: QuartileTracker::new(),
            parameters: None,
            tracking: TrackingLog::new(id, config.tracking_capacity),
        };

        Self {
            shared: Arc::new(Shared {
                id,
                config,
                inner: Mutex::new(inner),
                collaborators: Mutex::new(Collaborators::default()),
                state_tx,
                stop_tx,
            }),
        }
    }

    /// Get session ID
    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    pub fn config(&self) -> &AdSessionConfig {
        &self.shared.config
    }

    /// Get current state
    pub fn state(&self) -> AdState {
        self.shared.lock().state
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<AdState> {
        self.shared.state_tx.subscribe()
    }

    /// Attach the visual layer
    pub fn set_surface(&self, surface: Box<dyn AdSurface>) {
        self.shared.collaborators().surface = Some(surface);
    }

    /// Agree on the interface version. The answer does not depend on the
    /// host's version.
    #[instrument(skip(self))]
    pub fn handshake_version(&self, host_version: &str) -> String {
        self.shared.lock().host_version = Some(host_version.to_string());
        info!(session_id = %self.shared.id, supported = %self.shared.config.supported_version, "Handshake");
        self.shared.config.supported_version.clone()
    }

    /// Load the creative and request playback.
    ///
    /// Dispatches `AdLoaded` then `AdImpression`, then asks the media to play.
    /// A parameter blob that does not decode fails with
    /// [`Error::MalformedParameters`] and leaves the session uninitialized with
    /// the media untouched.
    #[instrument(skip(self, ad_parameters, media))]
    pub fn initialize(
        &self,
        width: u32,
        height: u32,
        view_mode: ViewMode,
        desired_bitrate: u32,
        ad_parameters: &str,
        mut media: Box<dyn MediaBinding>,
    ) -> Result<()> {
        let shared = &self.shared;
        {
            let inner = shared.lock();
            if shared.config.require_handshake && inner.host_version.is_none() {
                warn!("initialize called before handshakeVersion");
                return Err(Error::invalid_state("initialize", "awaiting handshake"));
            }
            if inner.state != AdState::Uninitialized {
                warn!(state = %inner.state, "Rejected host call");
                return Err(Error::invalid_state("initialize", inner.state));
            }
        }

        let params = AdParameters::parse(ad_parameters).inspect_err(|e| {
            warn!(error = %e, "Creative parameters rejected");
        })?;

        {
            let mut inner = shared.lock();
            // a reentrant host may have raced us here
            shared.transition(&mut inner, "initialize", AdState::Initialized)?;
            inner.attributes.width = width;
            inner.attributes.height = height;
            inner.attributes.view_mode = view_mode;
            inner.attributes.desired_bitrate = desired_bitrate;
            inner.parameters = Some(params.clone());
        }

        media.attach(MediaNotifier {
            shared: Arc::downgrade(shared),
        });
        media.set_source(&params.video_url);
        media.set_dimensions(width, height);
        shared.collaborators().media = Some(media);

        shared.with_surface(|surface| {
            surface.ad_loaded(&params);
            surface.media_ready(&params.video_url);
        });

        info!(
            session_id = %shared.id,
            source = %params.video_url,
            width,
            height,
            "Ad loaded"
        );

        shared.dispatch(AdEvent::AdLoaded)?;
        shared.dispatch(AdEvent::AdImpression)?;
        shared.with_media(|media| media.play());
        Ok(())
    }

    /// Show the ad
    #[instrument(skip(self))]
    pub fn start(&self) -> Result<()> {
        {
            let mut inner = self.shared.lock();
            self.shared.transition(&mut inner, "start", AdState::Started)?;
        }
        self.shared.with_surface(|surface| surface.ad_started());
        self.shared.dispatch(AdEvent::AdStarted)
    }

    #[instrument(skip(self))]
    pub fn pause(&self) -> Result<()> {
        {
            let mut inner = self.shared.lock();
            self.shared.transition(&mut inner, "pause", AdState::Paused)?;
        }
        self.shared.with_media(|media| media.pause());
        self.shared.dispatch(AdEvent::AdPaused)
    }

    #[instrument(skip(self))]
    pub fn resume(&self) -> Result<()> {
        {
            let mut inner = self.shared.lock();
            if inner.state != AdState::Paused {
                warn!(state = %inner.state, "Rejected host call");
                return Err(Error::invalid_state("resume", inner.state));
            }
            self.shared.transition(&mut inner, "resume", AdState::Started)?;
        }
        self.shared.with_media(|media| media.play());
        self.shared.dispatch(AdEvent::AdResumed)
    }

    /// End the ad. The state is `Stopped` on return; `AdStopped` follows after
    /// the configured delay so events already in flight reach the host first.
    /// Stopping a stopped ad does nothing.
    ///
    /// The delayed `AdStopped` runs as a task on the current tokio runtime.
    /// Without one it is delivered from a short-lived helper thread, so the
    /// host callback may then run concurrently with the caller's thread.
    #[instrument(skip(self))]
    pub fn stop(&self) -> Result<()> {
        {
            let mut inner = self.shared.lock();
            if inner.state.is_terminal() {
                debug!("Already stopped");
                return Ok(());
            }
            self.shared.transition(&mut inner, "stop", AdState::Stopped)?;
        }
        info!(session_id = %self.shared.id, "Stopping ad");
        self.shared.schedule_stop();
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn expand(&self) -> Result<()> {
        {
            let mut inner = self.shared.lock();
            self.shared.require_live(&inner, "expand")?;
            inner.attributes.expanded = true;
        }
        self.shared.with_surface(|surface| surface.request_fullscreen());
        self.shared.dispatch(AdEvent::AdExpanded)
    }

    #[instrument(skip(self))]
    pub fn collapse(&self) -> Result<()> {
        {
            let mut inner = self.shared.lock();
            self.shared.require_live(&inner, "collapse")?;
            inner.attributes.expanded = false;
        }
        self.shared.with_surface(|surface| surface.exit_fullscreen());
        Ok(())
    }

    /// Skip the ad; ignored unless the ad is currently skippable
    #[instrument(skip(self))]
    pub fn skip(&self) -> Result<()> {
        let skippable = {
            let inner = self.shared.lock();
            self.shared.require_live(&inner, "skip")?;
            inner.attributes.skippable_state
        };

        if !skippable {
            debug!("Skip requested while not skippable");
            return Ok(());
        }
        self.shared.dispatch(AdEvent::AdSkipped)
    }

    #[instrument(skip(self))]
    pub fn resize(&self, width: u32, height: u32, view_mode: ViewMode) -> Result<()> {
        {
            let mut inner = self.shared.lock();
            self.shared.require_live(&inner, "resize")?;
            inner.attributes.width = width;
            inner.attributes.height = height;
            inner.attributes.view_mode = view_mode;
        }
        self.shared.with_media(|media| media.set_dimensions(width, height));
        self.shared.dispatch(AdEvent::AdSizeChange)
    }

    /// Set the volume, clamped to [0, 1]
    #[instrument(skip(self))]
    pub fn set_volume(&self, volume: f64) -> Result<()> {
        if volume.is_nan() {
            return Err(Error::InvalidAttribute("volume is NaN".into()));
        }
        {
            let mut inner = self.shared.lock();
            self.shared.require_live(&inner, "setVolume")?;
            inner.attributes.volume = volume.clamp(0.0, 1.0);
        }
        self.shared.dispatch(AdEvent::AdVolumeChange)
    }

    /// Mute if audible, otherwise restore full volume
    pub fn toggle_mute(&self) -> Result<()> {
        {
            let mut inner = self.shared.lock();
            self.shared.require_live(&inner, "toggleMute")?;
            let volume = &mut inner.attributes.volume;
            *volume = if *volume == 0.0 { 1.0 } else { 0.0 };
        }
        self.shared.dispatch(AdEvent::AdVolumeChange)
    }

    /// The viewer clicked through to the advertiser
    #[instrument(skip(self))]
    pub fn click_thru(&self) -> Result<()> {
        {
            let inner = self.shared.lock();
            if !inner.state.is_playing() {
                warn!(state = %inner.state, "Rejected host call");
                return Err(Error::invalid_state("clickThru", inner.state));
            }
        }
        self.shared.dispatch(AdEvent::AdClickThru)
    }

    /// Register `callback` for `event_name`, replacing any earlier one.
    /// Valid in every state.
    pub fn subscribe<F>(&self, event_name: &str, callback: F)
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let callback: EventCallback = Arc::new(callback);
        self.shared.lock().events.subscribe(event_name, callback);
        debug!(event = %event_name, "Host subscribed");
    }

    pub fn unsubscribe(&self, event_name: &str) {
        self.shared.lock().events.unsubscribe(event_name);
        debug!(event = %event_name, "Host unsubscribed");
    }

    /// Look up any attribute by host name
    pub fn attribute(&self, name: &str) -> Result<AttributeValue> {
        self.shared.lock().attributes.get(name)
    }

    /// Set any attribute by host name. Rejected once stopped.
    ///
    /// `volume` goes through [`AdSession::set_volume`], so it is clamped and
    /// announced the same way.
    pub fn set_attribute(&self, name: &str, value: AttributeValue) -> Result<()> {
        if name.parse::<AttributeKey>()? == AttributeKey::Volume {
            let volume = value.as_f64().ok_or_else(|| {
                Error::InvalidAttribute(format!("volume expects a number, got {}", value.kind()))
            })?;
            return self.set_volume(volume);
        }

        let mut inner = self.shared.lock();
        if inner.state.is_terminal() {
            return Err(Error::invalid_state("setAttribute", inner.state));
        }
        inner.attributes.set(name, value)
    }

    /// Snapshot of every attribute
    pub fn attributes(&self) -> Vec<(AttributeKey, AttributeValue)> {
        self.shared.lock().attributes.entries()
    }

    pub fn width(&self) -> u32 {
        self.shared.lock().attributes.width
    }

    pub fn height(&self) -> u32 {
        self.shared.lock().attributes.height
    }

    pub fn view_mode(&self) -> ViewMode {
        self.shared.lock().attributes.view_mode
    }

    pub fn desired_bitrate(&self) -> u32 {
        self.shared.lock().attributes.desired_bitrate
    }

    /// Seconds left, -1 while unknown
    pub fn remaining_time(&self) -> f64 {
        self.shared.lock().attributes.remaining_time
    }

    /// Media duration in seconds, -1 while unknown
    pub fn duration(&self) -> f64 {
        self.shared.lock().attributes.duration
    }

    pub fn companions(&self) -> String {
        self.shared.lock().attributes.companions.clone()
    }

    pub fn icons(&self) -> String {
        self.shared.lock().attributes.icons.clone()
    }

    pub fn linear(&self) -> bool {
        self.shared.lock().attributes.linear
    }

    pub fn expanded(&self) -> bool {
        self.shared.lock().attributes.expanded
    }

    pub fn skippable_state(&self) -> bool {
        self.shared.lock().attributes.skippable_state
    }

    pub fn volume(&self) -> f64 {
        self.shared.lock().attributes.volume
    }

    /// Decoded creative parameters, once initialized
    pub fn parameters(&self) -> Option<AdParameters> {
        self.shared.lock().parameters.clone()
    }

    /// Dispatched events, oldest first
    pub fn tracking_log(&self) -> Vec<TrackingRecord> {
        self.shared.lock().tracking.records()
    }

    /// True once `AdStopped` has been delivered
    pub fn is_stop_delivered(&self) -> bool {
        *self.shared.stop_tx.borrow()
    }

    /// Wait until `AdStopped` has been delivered
    pub async fn stopped(&self) {
        let mut stop_rx = self.shared.stop_tx.subscribe();
        // the sender lives as long as `self`, so this only returns on delivery
        let _ = stop_rx.wait_for(|delivered| *delivered).await;
    }
}

impl Default for AdSession {
    fn default() -> Self {
        Self::build(AdSessionConfig::default())
    }
}

impl std::fmt::Debug for AdSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdSession")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .finish()
    }
}
