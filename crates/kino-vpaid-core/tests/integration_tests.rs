//! Integration tests for Kino VPAID Core

use kino_vpaid_core::{
    AdEvent, AdSession, AdSessionConfig, AdState, AdSurface, AttributeValue, Error,
    MediaBinding, MediaNotifier, ViewMode,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// Helpers
// =============================================================================

const PARAMS: &str = r#"{"videoUrl":"a.mp4"}"#;

/// Media element driven by the test
#[derive(Clone, Default)]
struct TestMedia {
    state: Arc<Mutex<TestMediaState>>,
}

#[derive(Default)]
struct TestMediaState {
    notifier: Option<MediaNotifier>,
    source: Option<String>,
    dimensions: (u32, u32),
    playing: bool,
    position: f64,
    duration: f64,
}

impl TestMedia {
    fn advance(&self, position: f64, duration: f64) -> kino_vpaid_core::Result<()> {
        let notifier = {
            let mut state = self.state.lock().unwrap();
            state.position = position;
            state.duration = duration;
            state.notifier.clone()
        };
        notifier.expect("media not attached").time_update()
    }

    fn end(&self) -> kino_vpaid_core::Result<()> {
        let notifier = self.state.lock().unwrap().notifier.clone();
        notifier.expect("media not attached").ended()
    }

    fn playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }
}

impl MediaBinding for TestMedia {
    fn attach(&mut self, notifier: MediaNotifier) {
        self.state.lock().unwrap().notifier = Some(notifier);
    }
    fn set_source(&mut self, url: &str) {
        self.state.lock().unwrap().source = Some(url.to_string());
    }
    fn set_dimensions(&mut self, width: u32, height: u32) {
        self.state.lock().unwrap().dimensions = (width, height);
    }
    fn play(&mut self) {
        self.state.lock().unwrap().playing = true;
    }
    fn pause(&mut self) {
        self.state.lock().unwrap().playing = false;
    }
    fn current_position(&self) -> f64 {
        self.state.lock().unwrap().position
    }
    fn duration(&self) -> f64 {
        self.state.lock().unwrap().duration
    }
}

/// Host-side record of every delivered event
#[derive(Clone, Default)]
struct Host {
    seen: Arc<Mutex<Vec<AdEvent>>>,
}

impl Host {
    fn subscribe_all(&self, session: &AdSession) {
        for event in AdEvent::ALL {
            let seen = self.seen.clone();
            session.subscribe(event.as_str(), move || {
                seen.lock().unwrap().push(event);
                Ok(())
            });
        }
    }

    fn take(&self) -> Vec<AdEvent> {
        std::mem::take(&mut *self.seen.lock().unwrap())
    }

    fn seen(&self) -> Vec<AdEvent> {
        self.seen.lock().unwrap().clone()
    }
}

fn initialized() -> (AdSession, TestMedia, Host) {
    let session = AdSession::default();
    let media = TestMedia::default();
    let host = Host::default();
    host.subscribe_all(&session);

    assert_eq!(session.handshake_version("2.0"), "2.0");
    session
        .initialize(640, 360, ViewMode::Normal, 300, PARAMS, Box::new(media.clone()))
        .unwrap();
    (session, media, host)
}

fn started() -> (AdSession, TestMedia, Host) {
    let (session, media, host) = initialized();
    session.start().unwrap();
    host.take();
    (session, media, host)
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_handshake_ignores_host_version() {
    let session = AdSession::default();
    assert_eq!(session.handshake_version("1.0"), "2.0");
    assert_eq!(session.handshake_version("9.9.9"), "2.0");

    let config = AdSessionConfig {
        supported_version: "2.1".into(),
        ..Default::default()
    };
    assert_eq!(AdSession::new(config).unwrap().handshake_version("2.0"), "2.1");
}

#[test]
fn test_initialize_then_start_order() {
    let (session, media, host) = initialized();
    assert_eq!(host.take(), vec![AdEvent::AdLoaded, AdEvent::AdImpression]);
    assert!(media.playing());
    assert_eq!(session.width(), 640);
    assert_eq!(session.height(), 360);
    assert_eq!(session.view_mode(), ViewMode::Normal);

    session.start().unwrap();
    assert_eq!(host.take(), vec![AdEvent::AdStarted]);
    assert_eq!(session.state(), AdState::Started);
}

#[test]
fn test_single_sample_at_end_fires_every_quartile() {
    let (session, media, host) = started();
    media.advance(100.0, 100.0).unwrap();

    assert_eq!(
        host.take(),
        vec![
            AdEvent::AdVideoStart,
            AdEvent::AdVideoFirstQuartile,
            AdEvent::AdVideoMidpoint,
            AdEvent::AdVideoThirdQuartile,
            AdEvent::AdVideoComplete,
        ]
    );
    assert_eq!(session.state(), AdState::Stopped);
}

#[test]
fn test_full_playback_fires_each_event_once_in_order() {
    let (session, media, host) = initialized();
    session.start().unwrap();

    let mut position = 0.0;
    while position <= 30.0 && session.state() == AdState::Started {
        media.advance(position, 30.0).unwrap();
        position += 0.25;
    }

    assert_eq!(
        host.seen(),
        vec![
            AdEvent::AdLoaded,
            AdEvent::AdImpression,
            AdEvent::AdStarted,
            AdEvent::AdVideoStart,
            AdEvent::AdVideoFirstQuartile,
            AdEvent::AdVideoMidpoint,
            AdEvent::AdVideoThirdQuartile,
            AdEvent::AdVideoComplete,
        ]
    );
}

#[test]
fn test_jump_fires_skipped_quartiles_in_order() {
    let (_session, media, host) = started();
    media.advance(10.0, 100.0).unwrap();
    assert_eq!(host.take(), vec![AdEvent::AdVideoStart]);

    media.advance(90.0, 100.0).unwrap();
    assert_eq!(
        host.take(),
        vec![
            AdEvent::AdVideoFirstQuartile,
            AdEvent::AdVideoMidpoint,
            AdEvent::AdVideoThirdQuartile,
        ]
    );

    media.advance(60.0, 100.0).unwrap();
    media.advance(90.0, 100.0).unwrap();
    assert!(host.take().is_empty());
}

#[test]
fn test_near_end_is_natural_completion() {
    let (session, media, host) = started();
    media.advance(20.0, 30.0).unwrap();
    host.take();

    media.advance(29.2, 30.0).unwrap();
    assert_eq!(host.take(), vec![AdEvent::AdVideoThirdQuartile, AdEvent::AdVideoComplete]);
    assert_eq!(session.state(), AdState::Stopped);
    assert_eq!(session.remaining_time(), 0.0);
    assert!(!media.playing());

    // later samples are ignored once stopped
    media.advance(30.0, 30.0).unwrap();
    assert!(host.take().is_empty());
}

#[test]
fn test_ended_notification_completes() {
    let (session, media, host) = started();
    media.advance(0.0, 30.0).unwrap();
    host.take();

    media.end().unwrap();
    assert_eq!(
        host.take(),
        vec![
            AdEvent::AdVideoFirstQuartile,
            AdEvent::AdVideoMidpoint,
            AdEvent::AdVideoThirdQuartile,
            AdEvent::AdVideoComplete,
        ]
    );
    assert_eq!(session.state(), AdState::Stopped);
    assert_eq!(session.remaining_time(), 0.0);
}

#[test]
fn test_progress_while_paused() {
    let (session, media, host) = started();
    session.pause().unwrap();
    assert_eq!(host.take(), vec![AdEvent::AdPaused]);

    media.advance(8.0, 30.0).unwrap();
    assert_eq!(host.take(), vec![AdEvent::AdVideoStart, AdEvent::AdVideoFirstQuartile]);

    session.resume().unwrap();
    assert_eq!(host.take(), vec![AdEvent::AdResumed]);
    assert_eq!(session.state(), AdState::Started);
}

#[test]
fn test_start_twice_rejected() {
    let (session, _media, host) = started();
    assert!(matches!(session.start(), Err(Error::InvalidState { .. })));
    assert!(host.take().is_empty());
}

#[test]
fn test_initialize_twice_rejected() {
    let (session, _media, host) = initialized();
    host.take();

    let err = session
        .initialize(320, 180, ViewMode::Thumbnail, 100, PARAMS, Box::new(TestMedia::default()))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));
    assert_eq!(session.width(), 640);
    assert!(host.take().is_empty());
}

// =============================================================================
// Failure Semantics Tests
// =============================================================================

#[test]
fn test_calls_before_initialize_have_no_effect() {
    let session = AdSession::default();
    let host = Host::default();
    host.subscribe_all(&session);
    let before = session.attributes();

    assert!(matches!(session.pause(), Err(Error::InvalidState { .. })));
    assert!(session.resume().is_err());
    assert!(session.start().is_err());
    assert!(session.stop().is_err());
    assert!(session.expand().is_err());
    assert!(session.skip().is_err());
    assert!(session.set_volume(0.2).is_err());
    assert!(session.resize(1, 1, ViewMode::Fullscreen).is_err());

    assert_eq!(session.attributes(), before);
    assert_eq!(session.volume(), 1.0);
    assert!(host.seen().is_empty());
    assert_eq!(session.state(), AdState::Uninitialized);
}

#[test]
fn test_malformed_parameters_are_fatal_to_initialize() {
    let session = AdSession::default();
    let media = TestMedia::default();
    let host = Host::default();
    host.subscribe_all(&session);
    session.handshake_version("2.0");

    let err = session
        .initialize(640, 360, ViewMode::Normal, 300, "not json", Box::new(media.clone()))
        .unwrap_err();

    assert!(matches!(err, Error::MalformedParameters(_)));
    assert!(!err.is_recoverable());
    assert!(!media.playing());
    assert!(media.state.lock().unwrap().source.is_none());
    assert!(host.seen().is_empty());
    assert_eq!(session.state(), AdState::Uninitialized);
}

#[test]
fn test_callback_failure_reaches_media_notification() {
    let (session, media, _host) = started();
    session.subscribe("AdVideoMidpoint", || anyhow::bail!("host exploded"));

    let err = media.advance(15.0, 30.0).unwrap_err();
    assert!(matches!(err, Error::Callback { ref event, .. } if event == "AdVideoMidpoint"));

    // the tracker moved on; the midpoint is not retried
    media.advance(16.0, 30.0).unwrap();
    let midpoints = session
        .tracking_log()
        .iter()
        .filter(|r| r.event == AdEvent::AdVideoMidpoint)
        .count();
    assert_eq!(midpoints, 1);
}

#[test]
fn test_failed_quartile_leaves_later_ones_pending() {
    let (session, media, host) = started();
    session.subscribe("AdVideoFirstQuartile", || anyhow::bail!("beacon rejected"));

    // 90% crosses four thresholds; delivery stops at the failing one
    let err = media.advance(27.0, 30.0).unwrap_err();
    assert!(matches!(err, Error::Callback { ref event, .. } if event == "AdVideoFirstQuartile"));
    assert_eq!(host.take(), vec![AdEvent::AdVideoStart]);

    media.end().unwrap();
    assert_eq!(
        host.take(),
        vec![
            AdEvent::AdVideoMidpoint,
            AdEvent::AdVideoThirdQuartile,
            AdEvent::AdVideoComplete,
        ]
    );
    assert_eq!(
        session
            .tracking_log()
            .iter()
            .filter(|r| r.event == AdEvent::AdVideoFirstQuartile)
            .count(),
        1
    );
}

#[test]
fn test_callback_failure_reaches_host_call() {
    let (session, _media, _host) = initialized();
    session.subscribe("AdStarted", || anyhow::bail!("not ready"));

    let err = session.start().unwrap_err();
    assert_eq!(err.error_code(), "CALLBACK");
}

#[test]
fn test_unknown_attribute() {
    let session = AdSession::default();
    assert!(matches!(session.attribute("adId"), Err(Error::InvalidAttribute(_))));
    assert!(matches!(
        session.set_attribute("adId", AttributeValue::Bool(true)),
        Err(Error::InvalidAttribute(_))
    ));
}

#[test]
fn test_volume_attribute_goes_through_set_volume() {
    let (session, _media, host) = started();

    session.set_attribute("volume", AttributeValue::Number(5.0)).unwrap();
    assert_eq!(session.volume(), 1.0);
    assert_eq!(host.take(), vec![AdEvent::AdVolumeChange]);

    session.set_attribute("volume", AttributeValue::Integer(0)).unwrap();
    assert_eq!(session.volume(), 0.0);

    assert!(matches!(
        session.set_attribute("volume", AttributeValue::Number(f64::NAN)),
        Err(Error::InvalidAttribute(_))
    ));
    assert!(matches!(
        session.set_attribute("volume", AttributeValue::Text("loud".into())),
        Err(Error::InvalidAttribute(_))
    ));
    assert_eq!(session.volume(), 0.0);
    assert_eq!(host.take(), vec![AdEvent::AdVolumeChange]);
}

// =============================================================================
// Subscription Tests
// =============================================================================

#[test]
fn test_resubscribe_replaces_callback() {
    let session = AdSession::default();
    let calls = Arc::new(Mutex::new(Vec::new()));

    let first = calls.clone();
    session.subscribe("AdLoaded", move || {
        first.lock().unwrap().push("first");
        Ok(())
    });
    let second = calls.clone();
    session.subscribe("AdLoaded", move || {
        second.lock().unwrap().push("second");
        Ok(())
    });

    session.handshake_version("2.0");
    session
        .initialize(640, 360, ViewMode::Normal, 300, PARAMS, Box::new(TestMedia::default()))
        .unwrap();

    assert_eq!(*calls.lock().unwrap(), vec!["second"]);
}

#[test]
fn test_unsubscribed_events_are_still_tracked() {
    let (session, _media, host) = initialized();
    session.unsubscribe("AdStarted");
    session.unsubscribe("AdStarted");
    host.take();

    session.start().unwrap();
    assert!(host.take().is_empty());

    let last = session.tracking_log().pop().unwrap();
    assert_eq!(last.event, AdEvent::AdStarted);
    assert!(!last.subscribed);
}

// =============================================================================
// Host Control Tests
// =============================================================================

#[test]
fn test_skip_respects_skippable_state() {
    let (session, _media, host) = started();
    assert!(!session.skippable_state());
    session.skip().unwrap();
    assert!(host.take().is_empty());

    session
        .set_attribute("skippableState", AttributeValue::Bool(true))
        .unwrap();
    session.skip().unwrap();
    assert_eq!(host.take(), vec![AdEvent::AdSkipped]);
}

#[test]
fn test_resize_updates_media() {
    let (session, media, host) = started();
    session.resize(1280, 720, ViewMode::Fullscreen).unwrap();

    assert_eq!(host.take(), vec![AdEvent::AdSizeChange]);
    assert_eq!(media.state.lock().unwrap().dimensions, (1280, 720));
    assert_eq!(session.view_mode(), ViewMode::Fullscreen);
    assert_eq!(
        session.attribute("width").unwrap(),
        AttributeValue::Integer(1280)
    );
}

#[test]
fn test_click_thru() {
    let (session, _media, host) = initialized();
    assert!(session.click_thru().is_err());

    session.start().unwrap();
    host.take();
    session.click_thru().unwrap();
    assert_eq!(host.take(), vec![AdEvent::AdClickThru]);
}

#[test]
fn test_surface_receives_milestones() {
    #[derive(Clone, Default)]
    struct Surface(Arc<Mutex<Vec<String>>>);

    impl AdSurface for Surface {
        fn ad_loaded(&mut self, params: &kino_vpaid_core::AdParameters) {
            self.0.lock().unwrap().push(format!("loaded {}", params.video_url));
        }
        fn media_ready(&mut self, source: &str) {
            self.0.lock().unwrap().push(format!("media {}", source));
        }
        fn ad_started(&mut self) {
            self.0.lock().unwrap().push("started".into());
        }
        fn request_fullscreen(&mut self) {
            self.0.lock().unwrap().push("fullscreen".into());
        }
    }

    let surface = Surface::default();
    let session = AdSession::default();
    session.set_surface(Box::new(surface.clone()));
    session.handshake_version("2.0");
    session
        .initialize(640, 360, ViewMode::Normal, 300, PARAMS, Box::new(TestMedia::default()))
        .unwrap();
    session.start().unwrap();
    session.expand().unwrap();

    assert_eq!(
        *surface.0.lock().unwrap(),
        vec!["loaded a.mp4", "media a.mp4", "started", "fullscreen"]
    );
}

// =============================================================================
// Deferred Stop Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_stop_is_deferred() {
    let (session, _media, host) = started();
    let began = tokio::time::Instant::now();

    session.stop().unwrap();
    assert_eq!(session.state(), AdState::Stopped);
    assert!(host.take().is_empty());

    tokio::time::sleep(Duration::from_millis(74)).await;
    assert!(!session.is_stop_delivered());
    assert!(host.seen().is_empty());

    session.stopped().await;
    assert!(began.elapsed() >= Duration::from_millis(75));
    assert_eq!(host.take(), vec![AdEvent::AdStopped]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let (session, _media, host) = started();
    session.stop().unwrap();
    session.stop().unwrap();

    session.stopped().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(host.take(), vec![AdEvent::AdStopped]);
    assert!(session.pause().is_err());
    assert!(session.expand().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_quartile_before_stop_delivers_first() {
    let (session, media, host) = started();
    media.advance(8.0, 30.0).unwrap();
    session.stop().unwrap();

    session.stopped().await;
    assert_eq!(
        host.take(),
        vec![
            AdEvent::AdVideoStart,
            AdEvent::AdVideoFirstQuartile,
            AdEvent::AdStopped,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_natural_completion_schedules_stop() {
    let (session, media, host) = started();
    let mut states = session.subscribe_state();

    media.advance(30.0, 30.0).unwrap();
    assert_eq!(*states.borrow_and_update(), AdState::Stopped);

    session.stopped().await;
    assert_eq!(host.seen().last(), Some(&AdEvent::AdStopped));
    assert_eq!(
        session
            .tracking_log()
            .iter()
            .filter(|r| r.event == AdEvent::AdStopped)
            .count(),
        1
    );
}

#[test]
fn test_stop_without_runtime() {
    let config = AdSessionConfig {
        stop_delay_ms: 5,
        ..Default::default()
    };
    let session = AdSession::new(config).unwrap();
    let host = Host::default();
    host.subscribe_all(&session);
    session.handshake_version("2.0");
    session
        .initialize(640, 360, ViewMode::Normal, 300, PARAMS, Box::new(TestMedia::default()))
        .unwrap();
    session.stop().unwrap();

    for _ in 0..200 {
        if session.is_stop_delivered() {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(session.is_stop_delivered());
    assert_eq!(host.seen().last(), Some(&AdEvent::AdStopped));
}
