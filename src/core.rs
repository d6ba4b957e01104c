//! CarouselCore — central dispatcher for the ad-carousel engine.
//!
//! Unified interface for all engine operations. The embedding host, the
//! CLI, and the tests all drive the engine through these methods, so
//! gating and bookkeeping logic exists exactly once. `CarouselSession`
//! adds the thread wiring (rotation timer, probe worker) on top.

use crate::ad::{Ad, MediaKind};
use crate::carousel::Carousel;
use crate::clicks::{ClickOutcome, ClickPipeline};
use crate::cooldown::{CooldownSeedStore, CooldownTracker, MemorySeedStore};
use crate::engagement::{EngagementSink, Navigator, NullNavigator, NullSink};
use crate::impressions::ImpressionLog;
use crate::probe::{spawn_probe_worker, AspectRatioCache, DimensionProbe, ProbeEvent, ProbeHandle};
use crate::promo::{pick_promo, HousePromo};
use crate::rotation::{
    video_end_grace, RotationHandler, RotationSnapshot, VideoSnapshot, ROTATION_PERIOD,
    TRANSITION_DELAY,
};
use crate::stats::EngagementLogger;
use chrono::Local;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

// ── Log buffer ──────────────────────────────────────────────────────────────

const LOG_BUFFER_MAX: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
}

pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
}

impl LogBuffer {
    pub fn new() -> Self {
        LogBuffer {
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, level: &str, message: String) {
        let timestamp = Local::now().format("%H:%M:%S").to_string();
        self.entries.push_back(LogEntry {
            timestamp,
            level: level.to_string(),
            message,
        });
        while self.entries.len() > LOG_BUFFER_MAX {
            self.entries.pop_front();
        }
    }

    pub fn get(&self, since_index: usize) -> Vec<LogEntry> {
        self.entries.iter().skip(since_index).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ── Response data types ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CarouselStatus {
    pub ad_count: usize,
    pub current_index: Option<usize>,
    pub current_ad_id: Option<String>,
    pub current_title: Option<String>,
    pub is_transitioning: bool,
    pub video_ended: bool,
    pub impressions_recorded: usize,
    pub cooldown_entries: usize,
}

/// What the slot should render right now.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SlideView {
    Ad {
        id: String,
        title: String,
        media_type: MediaKind,
        banner_url: String,
        click_url: String,
        aspect_ratio: f32,
    },
    /// No live ads: a house promo fills the slot.
    Promo {
        title: String,
        banner_url: String,
        click_url: Option<String>,
    },
    /// No live ads and no promos either.
    Blank,
}

// ── CarouselCore ────────────────────────────────────────────────────────────

pub struct CarouselCore {
    pub carousel: Carousel,
    cooldowns: CooldownTracker,
    impressions: ImpressionLog,
    aspect_cache: AspectRatioCache,
    clicks: ClickPipeline,
    promos: Vec<HousePromo>,
    /// A video element for the current ad is mounted in the host.
    video_registered: bool,
    pending_probes: HashSet<String>,
    sink: Arc<dyn EngagementSink>,
    navigator: Arc<dyn Navigator>,
    seed_store: Arc<dyn CooldownSeedStore>,
    engagement_log: Option<EngagementLogger>,
    on_ad_clicked: Option<Box<dyn Fn(&str) + Send + Sync>>,
    log: LogBuffer,
}

impl CarouselCore {
    pub fn new(
        sink: Arc<dyn EngagementSink>,
        navigator: Arc<dyn Navigator>,
        seed_store: Arc<dyn CooldownSeedStore>,
    ) -> Self {
        CarouselCore {
            carousel: Carousel::new(),
            cooldowns: CooldownTracker::new(),
            impressions: ImpressionLog::new(),
            aspect_cache: AspectRatioCache::new(),
            clicks: ClickPipeline::new(),
            promos: Vec::new(),
            video_registered: false,
            pending_probes: HashSet::new(),
            sink,
            navigator,
            seed_store,
            engagement_log: None,
            on_ad_clicked: None,
            log: LogBuffer::new(),
        }
    }

    /// Core with null collaborators and an in-memory seed store.
    pub fn new_test() -> Self {
        Self::new(
            Arc::new(NullSink),
            Arc::new(NullNavigator),
            Arc::new(MemorySeedStore::new()),
        )
    }

    /// Attach a local engagement logger (dashboard accounting).
    pub fn set_engagement_logger(&mut self, logger: Option<EngagementLogger>) {
        self.engagement_log = logger;
    }

    /// Host callback fired after a click-through navigation starts.
    pub fn set_on_ad_clicked<F>(&mut self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_ad_clicked = Some(Box::new(callback));
    }

    /// Configure the promo pool shown when no ads are live.
    pub fn set_promos(&mut self, promos: Vec<HousePromo>) {
        self.promos = promos;
    }

    // ── Configuration ──────────────────────────────────────────────────

    /// Replace the ad list (already filtered/ordered by the caller).
    ///
    /// An identity change resets the index, drops video state, and seeds
    /// cooldowns for the new set from the seed store. Impressions stay
    /// marked for the whole mount — an ad that rotates back in after a
    /// refresh is not re-credited. The newly-current ad gets its
    /// impression either way.
    pub fn configure_ads(&mut self, ads: Vec<Ad>) -> bool {
        let ids: Vec<String> = ads.iter().map(|a| a.id.clone()).collect();
        let changed = self.carousel.configure(ads);
        if changed {
            self.video_registered = false;
            self.cooldowns.seed_from(&*self.seed_store, &ids);
            self.log
                .push("info", format!("Configured {} ad(s)", self.carousel.len()));
        }
        self.record_impression_for_current();
        changed
    }

    // ── Advance path ───────────────────────────────────────────────────

    /// Open the visual-transition window.
    pub fn begin_transition(&mut self) {
        if self.carousel.len() > 1 {
            self.carousel.is_transitioning = true;
        }
    }

    /// Commit an index change one step in `direction`.
    ///
    /// The single writer of `current_index`: the rotation timer, manual
    /// prev/next, and the video-end grace all land here, so impression
    /// bookkeeping cannot diverge. Returns the new index, or None when
    /// there is nothing to rotate.
    pub fn commit_advance(&mut self, direction: i32) -> Option<usize> {
        if self.carousel.len() < 2 {
            return None;
        }
        let next = self.carousel.step(direction)?;
        // set_index cannot fail for an index produced by step()
        self.carousel.set_index(next).ok()?;
        self.carousel.video_ended = false;
        self.video_registered = false;
        self.record_impression_for_current();
        Some(next)
    }

    /// Close the visual-transition window.
    pub fn end_transition(&mut self) {
        self.carousel.is_transitioning = false;
    }

    /// Full advance without the visual delays (manual navigation from
    /// hosts that animate on their own, and tests).
    pub fn advance(&mut self, direction: i32) -> Option<usize> {
        self.begin_transition();
        let committed = self.commit_advance(direction);
        self.end_transition();
        committed
    }

    fn record_impression_for_current(&mut self) {
        let ad_id = match self.carousel.current() {
            Some(ad) => ad.id.clone(),
            None => return,
        };
        if self.impressions.record_if_new(&ad_id, &*self.sink) {
            if let Some(logger) = &self.engagement_log {
                logger.log_impression(&ad_id);
            }
            self.log.push("info", format!("Impression recorded for '{}'", ad_id));
        }
    }

    // ── Video playback notifications ───────────────────────────────────

    /// The host mounted a video element for the current ad.
    pub fn register_video(&mut self) {
        self.video_registered = true;
    }

    /// Playback started (or restarted). Clears the end latch; the caller
    /// must also stop the rotation timer (manual engagement pre-empts
    /// automation).
    pub fn on_video_started(&mut self) {
        self.video_registered = true;
        self.carousel.video_ended = false;
        self.log.push("info", "Video playback started".to_string());
    }

    /// Playback genuinely ended. Latches the end flag and reports the
    /// grace delay after which the caller should advance, if there is
    /// anywhere to go.
    pub fn on_video_ended(&mut self) -> Option<Duration> {
        self.carousel.video_ended = true;
        self.log.push("info", "Video playback ended".to_string());
        video_end_grace(self.carousel.len())
    }

    /// Snapshot for the rotation timer.
    pub fn rotation_snapshot(&self) -> RotationSnapshot {
        let current_is_video = self
            .carousel
            .current()
            .map(|a| a.media_type == MediaKind::Video)
            .unwrap_or(false);
        RotationSnapshot {
            ad_count: self.carousel.len(),
            current_is_video,
            video: VideoSnapshot {
                registered: self.video_registered,
                element_ended: false,
                ended_flag: self.carousel.video_ended,
            },
        }
    }

    // ── Clicks ─────────────────────────────────────────────────────────

    /// Handle a user click on the ad with the given id.
    pub fn handle_click(&mut self, ad_id: &str) -> Result<ClickOutcome, String> {
        let ad = self
            .carousel
            .find(ad_id)
            .cloned()
            .ok_or_else(|| format!("Ad '{}' is not in the carousel", ad_id))?;

        let outcome = self
            .clicks
            .handle(&ad, &mut self.cooldowns, &*self.sink, &*self.navigator);

        match &outcome {
            ClickOutcome::Navigated { counted_as_new } => {
                if *counted_as_new {
                    let ids: Vec<String> =
                        self.carousel.ads().iter().map(|a| a.id.clone()).collect();
                    self.seed_store.persist(&self.cooldowns.snapshot_for(&ids));
                    if let Some(logger) = &self.engagement_log {
                        logger.log_click(&ad.id);
                    }
                }
                self.log.push(
                    "info",
                    format!("Click-through to '{}' ({})", ad.click_url, ad.id),
                );
                if let Some(callback) = &self.on_ad_clicked {
                    callback(&ad.id);
                }
            }
            ClickOutcome::CoolingDown { message, .. } => {
                self.log.push("warn", format!("Click blocked for '{}': {}", ad.id, message));
            }
            ClickOutcome::InFlight => {}
        }

        Ok(outcome)
    }

    /// Remaining cooldown for an ad.
    pub fn cooldown_remaining(&self, ad_id: &str) -> Duration {
        self.cooldowns.remaining(ad_id)
    }

    // ── Aspect ratios ──────────────────────────────────────────────────

    /// Cached ratio for an ad, or the wide-banner default.
    pub fn aspect_ratio(&self, ad_id: &str) -> f32 {
        self.aspect_cache.ratio_or_default(ad_id)
    }

    /// Mark an ad as needing a probe. False when it is already cached or
    /// already queued — an id is never probed twice.
    pub fn mark_probe_pending(&mut self, ad_id: &str) -> bool {
        if self.aspect_cache.contains(ad_id) || self.pending_probes.contains(ad_id) {
            return false;
        }
        self.pending_probes.insert(ad_id.to_string());
        true
    }

    /// Apply a probe result coming back from the worker.
    pub fn apply_probe_event(&mut self, event: ProbeEvent) {
        match event {
            ProbeEvent::Resolved { ad_id, ratio } => {
                self.pending_probes.remove(&ad_id);
                match self.aspect_cache.insert(&ad_id, ratio) {
                    Ok(()) => self
                        .log
                        .push("info", format!("Aspect ratio for '{}': {:.2}", ad_id, ratio)),
                    Err(e) => self.log.push("warn", e),
                }
            }
            ProbeEvent::Failed { ad_id, error } => {
                self.pending_probes.remove(&ad_id);
                self.log
                    .push("warn", format!("Aspect probe failed for '{}': {}", ad_id, error));
            }
        }
    }

    // ── Views & status ─────────────────────────────────────────────────

    /// What the slot should render right now.
    pub fn current_view(&self) -> SlideView {
        if let Some(ad) = self.carousel.current() {
            return SlideView::Ad {
                id: ad.id.clone(),
                title: ad.title.clone(),
                media_type: ad.media_type,
                banner_url: ad.banner_url.clone(),
                click_url: ad.click_url.clone(),
                aspect_ratio: self.aspect_cache.ratio_or_default(&ad.id),
            };
        }
        match pick_promo(&self.promos) {
            Some(promo) => SlideView::Promo {
                title: promo.title.clone(),
                banner_url: promo.banner_url.clone(),
                click_url: promo.click_url.clone(),
            },
            None => SlideView::Blank,
        }
    }

    pub fn get_status(&self) -> CarouselStatus {
        let current = self.carousel.current();
        CarouselStatus {
            ad_count: self.carousel.len(),
            current_index: if self.carousel.is_empty() {
                None
            } else {
                Some(self.carousel.current_index())
            },
            current_ad_id: current.map(|a| a.id.clone()),
            current_title: current.map(|a| a.title.clone()),
            is_transitioning: self.carousel.is_transitioning,
            video_ended: self.carousel.video_ended,
            impressions_recorded: self.impressions.count(),
            cooldown_entries: self.cooldowns.entries().len(),
        }
    }

    /// Full remount: forget impressions, transition state, and the
    /// aspect cache. Cooldowns survive via the seed store.
    pub fn reset(&mut self) {
        self.impressions.reset();
        self.aspect_cache = AspectRatioCache::new();
        self.pending_probes.clear();
        self.carousel = Carousel::new();
        self.video_registered = false;
        self.log.push("info", "Carousel reset".to_string());
    }

    // ── Logs ───────────────────────────────────────────────────────────

    pub fn log(&mut self, level: &str, message: String) {
        self.log.push(level, message);
    }

    pub fn get_logs(&self, since: Option<usize>) -> Vec<LogEntry> {
        self.log.get(since.unwrap_or(0))
    }

    pub fn clear_logs(&mut self) {
        self.log.clear();
    }
}

// ── CarouselSession ─────────────────────────────────────────────────────────

/// A mounted carousel: the core behind a mutex, plus the rotation timer
/// and the probe worker. Dropping the session disarms everything;
/// whatever the worker still resolves afterwards is ignored.
pub struct CarouselSession {
    core: Arc<Mutex<CarouselCore>>,
    rotation: RotationHandler,
    probe_handle: Option<ProbeHandle>,
    period: Duration,
    transition_delay: Duration,
}

impl CarouselSession {
    pub fn new(core: CarouselCore) -> Self {
        CarouselSession {
            core: Arc::new(Mutex::new(core)),
            rotation: RotationHandler::new(),
            probe_handle: None,
            period: ROTATION_PERIOD,
            transition_delay: TRANSITION_DELAY,
        }
    }

    /// Override the rotation period (tests, CLI simulation).
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Override the visual transition delay (tests run with zero).
    pub fn with_transition_delay(mut self, delay: Duration) -> Self {
        self.transition_delay = delay;
        self
    }

    /// Attach a dimension probe; spawns the worker thread wired back
    /// into the core's aspect cache.
    pub fn with_probe(mut self, probe: Arc<dyn DimensionProbe>) -> Self {
        let core = self.core.clone();
        let handle = spawn_probe_worker(probe, move |event| {
            if let Ok(mut core) = core.lock() {
                core.apply_probe_event(event);
            }
        });
        self.probe_handle = Some(handle);
        self
    }

    /// Shared handle to the core (host rendering, tests).
    pub fn core(&self) -> Arc<Mutex<CarouselCore>> {
        self.core.clone()
    }

    /// Supply a fresh ad list. Always tears down the previous timer,
    /// then re-arms it if the new list rotates.
    pub fn configure_ads(&mut self, ads: Vec<Ad>) {
        self.rotation.stop();

        let ad_count = {
            let mut core = self.core.lock().unwrap();
            core.configure_ads(ads);
            core.carousel.len()
        };
        self.request_probe_for_current();

        if ad_count > 1 {
            self.arm_rotation();
        }
    }

    fn arm_rotation(&mut self) {
        let state_core = self.core.clone();
        let advance_core = self.core.clone();
        let delay = self.transition_delay;
        self.rotation.start_with_period(
            self.period,
            move || state_core.lock().ok().map(|core| core.rotation_snapshot()),
            move || run_advance(&advance_core, 1, delay),
        );
    }

    /// Manual next/prev. Shares the advance path with the timer.
    pub fn next(&mut self) {
        run_advance(&self.core, 1, self.transition_delay);
        self.request_probe_for_current();
    }

    pub fn prev(&mut self) {
        run_advance(&self.core, -1, self.transition_delay);
        self.request_probe_for_current();
    }

    /// Click the ad currently showing.
    pub fn click_current(&mut self) -> Result<ClickOutcome, String> {
        let ad_id = {
            let core = self.core.lock().unwrap();
            match core.carousel.current() {
                Some(ad) => ad.id.clone(),
                None => return Err("Nothing to click: carousel is empty".to_string()),
            }
        };
        self.click(&ad_id)
    }

    pub fn click(&mut self, ad_id: &str) -> Result<ClickOutcome, String> {
        self.core.lock().unwrap().handle_click(ad_id)
    }

    /// Host notification: video playback started. Stops the timer —
    /// manual engagement pre-empts automation; only a later
    /// `configure_ads` re-arms it.
    pub fn video_started(&mut self) {
        self.core.lock().unwrap().on_video_started();
        self.rotation.stop();
    }

    /// Host notification: video playback ended. After the grace delay
    /// the carousel advances once, through the normal path.
    pub fn video_ended(&mut self) {
        let grace = self.core.lock().unwrap().on_video_ended();
        if let Some(grace) = grace {
            let core = self.core.clone();
            let delay = self.transition_delay;
            thread::spawn(move || {
                thread::sleep(grace);
                run_advance(&core, 1, delay);
            });
        }
    }

    pub fn is_rotating(&self) -> bool {
        self.rotation.is_running()
    }

    fn request_probe_for_current(&self) {
        let handle = match &self.probe_handle {
            Some(h) => h.clone(),
            None => return,
        };
        let ad = {
            let mut core = self.core.lock().unwrap();
            match core.carousel.current().cloned() {
                Some(ad) => {
                    if core.mark_probe_pending(&ad.id) {
                        Some(ad)
                    } else {
                        None
                    }
                }
                None => None,
            }
        };
        if let Some(ad) = ad {
            handle.request(ad);
        }
    }

    /// Unmount: disarm the timer and the probe worker.
    pub fn shutdown(&mut self) {
        self.rotation.stop();
        if let Some(handle) = self.probe_handle.take() {
            handle.shutdown();
        }
    }
}

impl Drop for CarouselSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The shared advance path: transition window around an index commit.
/// The lock is released during the delays so rendering never stalls.
fn run_advance(core: &Arc<Mutex<CarouselCore>>, direction: i32, delay: Duration) {
    {
        let mut core = match core.lock() {
            Ok(c) => c,
            Err(_) => return,
        };
        if core.carousel.len() < 2 {
            return;
        }
        core.begin_transition();
    }
    if !delay.is_zero() {
        thread::sleep(delay);
    }
    {
        if let Ok(mut core) = core.lock() {
            core.commit_advance(direction);
        }
    }
    if !delay.is_zero() {
        thread::sleep(delay);
    }
    if let Ok(mut core) = core.lock() {
        core.end_transition();
    }
}
