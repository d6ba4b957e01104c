//! Headless integration tests for adLoop.
//!
//! These tests exercise CarouselCore and CarouselSession end-to-end the
//! way an embedding host would, with mock collaborators standing in for
//! the backend and the browser.

use adloop::ad::{Ad, MediaKind};
use adloop::clicks::ClickOutcome;
use adloop::cooldown::MemorySeedStore;
use adloop::core::{CarouselCore, CarouselSession, SlideView};
use adloop::engagement::{ClickReceipt, EngagementSink, Navigator};
use adloop::probe::{DimensionProbe, MediaDimensions, StaticProbe};
use adloop::promo::HousePromo;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Mock collaborators ────────────────────────────────────────────────────

struct MockSink {
    impressions: Mutex<Vec<String>>,
    clicks: Mutex<Vec<String>>,
    count_clicks_as_new: bool,
}

impl MockSink {
    fn new() -> Self {
        MockSink {
            impressions: Mutex::new(Vec::new()),
            clicks: Mutex::new(Vec::new()),
            count_clicks_as_new: true,
        }
    }

    fn rejecting_duplicates() -> Self {
        MockSink {
            count_clicks_as_new: false,
            ..Self::new()
        }
    }

    fn impressions(&self) -> Vec<String> {
        self.impressions.lock().unwrap().clone()
    }

    fn clicks(&self) -> Vec<String> {
        self.clicks.lock().unwrap().clone()
    }
}

impl EngagementSink for MockSink {
    fn record_impression(&self, ad_id: &str) -> Result<(), String> {
        self.impressions.lock().unwrap().push(ad_id.to_string());
        Ok(())
    }

    fn record_click(&self, ad_id: &str) -> Result<ClickReceipt, String> {
        self.clicks.lock().unwrap().push(ad_id.to_string());
        Ok(ClickReceipt {
            counted_as_new: self.count_clicks_as_new,
        })
    }
}

struct MockNavigator {
    opened: Mutex<Vec<String>>,
}

impl MockNavigator {
    fn new() -> Self {
        MockNavigator {
            opened: Mutex::new(Vec::new()),
        }
    }

    fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl Navigator for MockNavigator {
    fn open(&self, url: &str) -> Result<(), String> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Probe wrapper that counts how often it is consulted.
struct CountingProbe {
    inner: StaticProbe,
    calls: AtomicUsize,
}

impl DimensionProbe for CountingProbe {
    fn probe(&self, ad: &Ad) -> Result<MediaDimensions, String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.probe(ad)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────

fn make_ad(id: &str) -> Ad {
    Ad::new(
        id.to_string(),
        MediaKind::Image,
        format!("https://cdn.example.com/{}.png", id),
        format!("https://example.com/go/{}", id),
        format!("Ad {}", id),
    )
}

fn make_video_ad(id: &str) -> Ad {
    let mut ad = make_ad(id);
    ad.media_type = MediaKind::Video;
    ad
}

fn make_core(sink: Arc<MockSink>, nav: Arc<MockNavigator>) -> CarouselCore {
    CarouselCore::new(sink, nav, Arc::new(MemorySeedStore::new()))
}

fn fast_session(core: CarouselCore, period_ms: u64) -> CarouselSession {
    CarouselSession::new(core)
        .with_period(Duration::from_millis(period_ms))
        .with_transition_delay(Duration::ZERO)
}

// ── Rotation workflow ─────────────────────────────────────────────────────

#[test]
fn automatic_rotation_credits_each_ad_once() {
    let sink = Arc::new(MockSink::new());
    let nav = Arc::new(MockNavigator::new());
    let mut session = fast_session(make_core(sink.clone(), nav), 30);

    session.configure_ads(vec![make_ad("a"), make_ad("b"), make_ad("c")]);
    assert!(session.is_rotating());

    // Plenty of time for multiple full loops around the carousel.
    std::thread::sleep(Duration::from_millis(400));
    session.shutdown();

    let mut seen = sink.impressions();
    seen.sort();
    assert_eq!(seen, vec!["a", "b", "c"]);

    let core = session.core();
    let core = core.lock().unwrap();
    let status = core.get_status();
    assert!(status.current_index.unwrap() < status.ad_count);
}

#[test]
fn single_ad_never_rotates() {
    let sink = Arc::new(MockSink::new());
    let nav = Arc::new(MockNavigator::new());
    let mut session = fast_session(make_core(sink.clone(), nav), 30);

    session.configure_ads(vec![make_ad("only")]);
    assert!(!session.is_rotating());

    // Manual navigation is a no-op too.
    session.next();
    session.prev();

    std::thread::sleep(Duration::from_millis(120));
    session.shutdown();

    assert_eq!(sink.impressions(), vec!["only"]);
    let core = session.core();
    let core = core.lock().unwrap();
    assert_eq!(core.get_status().current_index, Some(0));
}

#[test]
fn manual_navigation_wraps_and_shares_impression_bookkeeping() {
    let sink = Arc::new(MockSink::new());
    let nav = Arc::new(MockNavigator::new());
    // Long period: the timer never fires during this test.
    let mut session = fast_session(make_core(sink.clone(), nav), 60_000);

    session.configure_ads(vec![make_ad("a"), make_ad("b"), make_ad("c")]);

    session.prev(); // 0 -> 2
    {
        let core = session.core();
        let core = core.lock().unwrap();
        assert_eq!(core.get_status().current_index, Some(2));
    }

    session.next(); // 2 -> 0
    session.next(); // 0 -> 1
    session.next(); // 1 -> 2
    session.next(); // 2 -> 0 (second loop)
    session.shutdown();

    // Three distinct ads, three impressions, no matter how many passes.
    let mut seen = sink.impressions();
    seen.sort();
    assert_eq!(seen, vec!["a", "b", "c"]);
}

#[test]
fn ad_list_update_resets_position_and_rearms() {
    let sink = Arc::new(MockSink::new());
    let nav = Arc::new(MockNavigator::new());
    let mut session = fast_session(make_core(sink.clone(), nav), 60_000);

    session.configure_ads(vec![make_ad("a"), make_ad("b"), make_ad("c")]);
    session.next();
    session.next();

    session.configure_ads(vec![make_ad("x"), make_ad("y")]);
    {
        let core = session.core();
        let core = core.lock().unwrap();
        let status = core.get_status();
        assert_eq!(status.current_index, Some(0));
        assert_eq!(status.current_ad_id.as_deref(), Some("x"));
    }
    assert!(session.is_rotating());

    // Dropping to a single ad disarms the timer.
    session.configure_ads(vec![make_ad("z")]);
    assert!(!session.is_rotating());
    session.shutdown();
}

// ── Video workflow ────────────────────────────────────────────────────────

#[test]
fn video_playback_preempts_rotation() {
    let sink = Arc::new(MockSink::new());
    let nav = Arc::new(MockNavigator::new());
    // Period long enough that no tick fires before the video starts.
    let mut session = fast_session(make_core(sink.clone(), nav), 200);

    session.configure_ads(vec![make_video_ad("v"), make_ad("b")]);
    assert!(session.is_rotating());

    session.video_started();
    assert!(!session.is_rotating());

    // With the timer stopped nothing advances, even across what would
    // have been several periods.
    std::thread::sleep(Duration::from_millis(500));
    let core = session.core();
    {
        let core = core.lock().unwrap();
        assert_eq!(core.get_status().current_index, Some(0));
    }
    session.shutdown();
}

#[test]
fn video_end_advances_after_grace() {
    let sink = Arc::new(MockSink::new());
    let nav = Arc::new(MockNavigator::new());
    let mut session = fast_session(make_core(sink.clone(), nav), 60_000);

    session.configure_ads(vec![make_video_ad("v"), make_ad("b")]);
    session.video_started();
    session.video_ended();

    // Before the grace elapses the index is unchanged.
    {
        let core = session.core();
        let core = core.lock().unwrap();
        assert_eq!(core.get_status().current_index, Some(0));
        assert!(core.get_status().video_ended);
    }

    // The grace delay is a fixed 2s.
    std::thread::sleep(Duration::from_millis(2300));
    let core = session.core();
    let core = core.lock().unwrap();
    let status = core.get_status();
    assert_eq!(status.current_index, Some(1));
    assert!(!status.video_ended);
    assert!(sink.impressions().contains(&"b".to_string()));
}

#[test]
fn video_end_with_single_ad_stays_put() {
    let sink = Arc::new(MockSink::new());
    let nav = Arc::new(MockNavigator::new());
    let mut session = fast_session(make_core(sink.clone(), nav), 60_000);

    session.configure_ads(vec![make_video_ad("v")]);
    session.video_started();
    session.video_ended();

    std::thread::sleep(Duration::from_millis(2300));
    let core = session.core();
    let core = core.lock().unwrap();
    assert_eq!(core.get_status().current_index, Some(0));
}

// ── Click workflow ────────────────────────────────────────────────────────

#[test]
fn click_navigates_then_cooldown_blocks() {
    let sink = Arc::new(MockSink::new());
    let nav = Arc::new(MockNavigator::new());
    let mut session = fast_session(make_core(sink.clone(), nav.clone()), 60_000);

    session.configure_ads(vec![make_ad("a"), make_ad("b")]);

    let outcome = session.click_current().unwrap();
    assert_eq!(outcome, ClickOutcome::Navigated { counted_as_new: true });
    assert_eq!(nav.opened(), vec!["https://example.com/go/a"]);
    assert_eq!(sink.clicks(), vec!["a"]);

    // A second click on the same ad is blocked with a wait notice, and
    // nothing goes out.
    let outcome = session.click_current().unwrap();
    match outcome {
        ClickOutcome::CoolingDown { message, remaining } => {
            assert!(message.contains("minute"));
            assert!(remaining > Duration::ZERO);
        }
        other => panic!("expected CoolingDown, got {:?}", other),
    }
    assert_eq!(nav.opened().len(), 1);
    assert_eq!(sink.clicks().len(), 1);

    // A different ad is unaffected.
    session.next();
    let outcome = session.click_current().unwrap();
    assert_eq!(outcome, ClickOutcome::Navigated { counted_as_new: true });
    session.shutdown();
}

#[test]
fn server_duplicate_leaves_ad_clickable() {
    let sink = Arc::new(MockSink::rejecting_duplicates());
    let nav = Arc::new(MockNavigator::new());
    let mut session = fast_session(make_core(sink.clone(), nav.clone()), 60_000);

    session.configure_ads(vec![make_ad("a")]);

    let outcome = session.click_current().unwrap();
    assert_eq!(outcome, ClickOutcome::Navigated { counted_as_new: false });

    // The backend said "duplicate", so no cooldown was armed and the
    // next attempt navigates again.
    let outcome = session.click_current().unwrap();
    assert_eq!(outcome, ClickOutcome::Navigated { counted_as_new: false });
    assert_eq!(nav.opened().len(), 2);
    session.shutdown();
}

#[test]
fn cooldown_seeds_survive_remount() {
    let store = Arc::new(MemorySeedStore::new());
    let sink = Arc::new(MockSink::new());
    let nav = Arc::new(MockNavigator::new());

    {
        let core = CarouselCore::new(sink.clone(), nav.clone(), store.clone());
        let mut session = fast_session(core, 60_000);
        session.configure_ads(vec![make_ad("a")]);
        session.click_current().unwrap();
        session.shutdown();
    }

    // A fresh mount over the same store still refuses the rapid repeat.
    let core = CarouselCore::new(sink, nav.clone(), store);
    let mut session = fast_session(core, 60_000);
    session.configure_ads(vec![make_ad("a")]);
    let outcome = session.click_current().unwrap();
    assert!(matches!(outcome, ClickOutcome::CoolingDown { .. }));
    assert_eq!(nav.opened().len(), 1);
    session.shutdown();
}

#[test]
fn host_is_notified_of_clicks() {
    let sink = Arc::new(MockSink::new());
    let nav = Arc::new(MockNavigator::new());
    let clicked: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let clicked_clone = clicked.clone();

    let mut core = make_core(sink, nav);
    core.set_on_ad_clicked(move |id| {
        clicked_clone.lock().unwrap().push(id.to_string());
    });
    let mut session = fast_session(core, 60_000);
    session.configure_ads(vec![make_ad("a")]);

    session.click_current().unwrap();
    assert_eq!(*clicked.lock().unwrap(), vec!["a"]);
    session.shutdown();
}

// ── Empty state ───────────────────────────────────────────────────────────

#[test]
fn empty_ad_list_falls_back_to_promo() {
    let sink = Arc::new(MockSink::new());
    let nav = Arc::new(MockNavigator::new());
    let mut core = make_core(sink.clone(), nav);
    core.set_promos(vec![HousePromo {
        title: "Advertise here".to_string(),
        banner_url: "https://cdn.example.com/promo.png".to_string(),
        click_url: Some("https://example.com/packages".to_string()),
        enabled: true,
    }]);

    let mut session = fast_session(core, 30);
    session.configure_ads(Vec::new());
    assert!(!session.is_rotating());

    let core = session.core();
    let core = core.lock().unwrap();
    match core.current_view() {
        SlideView::Promo { title, .. } => assert_eq!(title, "Advertise here"),
        other => panic!("expected promo view, got {:?}", other),
    }
    // Promos never generate impressions.
    assert!(sink.impressions().is_empty());
}

// ── Aspect-ratio probing ──────────────────────────────────────────────────

#[test]
fn aspect_ratio_probed_once_and_cached() {
    let sink = Arc::new(MockSink::new());
    let nav = Arc::new(MockNavigator::new());
    let probe = Arc::new(CountingProbe {
        inner: StaticProbe::new().with("a", 960, 200).with("b", 300, 250),
        calls: AtomicUsize::new(0),
    });

    let mut session =
        fast_session(make_core(sink, nav), 60_000).with_probe(probe.clone());

    session.configure_ads(vec![make_ad("a"), make_ad("b")]);
    std::thread::sleep(Duration::from_millis(100));

    {
        let core = session.core();
        let core = core.lock().unwrap();
        assert!((core.aspect_ratio("a") - 4.8).abs() < 0.001);
    }

    // Navigate to b and back to a: b gets probed, a does not re-probe.
    session.next();
    std::thread::sleep(Duration::from_millis(100));
    session.prev();
    std::thread::sleep(Duration::from_millis(100));

    {
        let core = session.core();
        let core = core.lock().unwrap();
        assert!((core.aspect_ratio("b") - 1.2).abs() < 0.001);
    }
    assert_eq!(probe.calls.load(Ordering::Relaxed), 2);
    session.shutdown();
}

#[test]
fn unprobed_ads_render_with_default_ratio() {
    let sink = Arc::new(MockSink::new());
    let nav = Arc::new(MockNavigator::new());
    // No probe attached at all.
    let mut session = fast_session(make_core(sink, nav), 60_000);
    session.configure_ads(vec![make_ad("a")]);

    let core = session.core();
    let core = core.lock().unwrap();
    match core.current_view() {
        SlideView::Ad { aspect_ratio, .. } => {
            assert!((aspect_ratio - adloop::probe::DEFAULT_BANNER_RATIO).abs() < 0.001)
        }
        other => panic!("expected ad view, got {:?}", other),
    }
}
