//! Rotation scheduling — the timer that drives automatic advancement.
//!
//! The tick decision is a pure function so it is testable without
//! threads; `RotationHandler` owns the background thread and asks the
//! host for a fresh state snapshot each tick (no stale captures).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

// --- Constants ---

/// Fixed period between automatic advancement ticks.
pub const ROTATION_PERIOD: Duration = Duration::from_secs(10);

/// Visual transition window on each side of an index commit.
pub const TRANSITION_DELAY: Duration = Duration::from_millis(300);

/// Pause after a video finishes before auto-advancing, so the viewer
/// sees the final frame.
pub const VIDEO_END_GRACE: Duration = Duration::from_secs(2);

// --- Tick decision (pure) ---

/// Playback snapshot for the current ad's video element, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoSnapshot {
    /// A video element for the current ad is registered with the host.
    pub registered: bool,
    /// The element itself reports ended playback. Transiently unreliable
    /// across replays, which is why the latch below exists too.
    pub element_ended: bool,
    /// The engine's own end latch: set on a genuine end event, cleared on
    /// a genuine (re)play.
    pub ended_flag: bool,
}

/// What a rotation tick should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// Fewer than two ads: nothing to rotate.
    Idle,
    /// Current ad is a still-playing video: hold this tick.
    Hold,
    /// Advance to the next ad.
    Advance,
}

/// State snapshot the handler requests from the host each tick.
#[derive(Debug, Clone, Copy)]
pub struct RotationSnapshot {
    pub ad_count: usize,
    pub current_is_video: bool,
    pub video: VideoSnapshot,
}

/// Core decision flow for a rotation tick.
///
/// Holds only while an actual registered video is mid-playback: an
/// unregistered video (element never mounted, media failed) must not
/// stall rotation forever.
pub fn decide_tick(snapshot: &RotationSnapshot) -> TickDecision {
    if snapshot.ad_count < 2 {
        return TickDecision::Idle;
    }
    if snapshot.current_is_video
        && snapshot.video.registered
        && !snapshot.video.element_ended
        && !snapshot.video.ended_flag
    {
        return TickDecision::Hold;
    }
    TickDecision::Advance
}

/// Grace delay before the post-video-end advance, or None when there is
/// nothing to advance to.
pub fn video_end_grace(ad_count: usize) -> Option<Duration> {
    if ad_count > 1 {
        Some(VIDEO_END_GRACE)
    } else {
        None
    }
}

// --- RotationHandler ---

enum RotationCmd {
    Shutdown,
}

/// Background rotation timer.
///
/// `get_state` is called on every tick for a fresh snapshot; `on_advance`
/// fires when the tick decides to advance. Stopping joins the thread.
pub struct RotationHandler {
    running: Arc<AtomicBool>,
    tx: Option<mpsc::Sender<RotationCmd>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl RotationHandler {
    /// Create a new handler (not yet started).
    pub fn new() -> Self {
        RotationHandler {
            running: Arc::new(AtomicBool::new(false)),
            tx: None,
            thread_handle: None,
        }
    }

    /// Whether the timer thread is currently armed.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Arm the timer with the standard period.
    pub fn start<F, G>(&mut self, get_state: F, on_advance: G)
    where
        F: Fn() -> Option<RotationSnapshot> + Send + 'static,
        G: Fn() + Send + 'static,
    {
        self.start_with_period(ROTATION_PERIOD, get_state, on_advance);
    }

    /// Arm the timer with an explicit period (tests and the CLI
    /// simulator run much faster than 10s).
    pub fn start_with_period<F, G>(&mut self, period: Duration, get_state: F, on_advance: G)
    where
        F: Fn() -> Option<RotationSnapshot> + Send + 'static,
        G: Fn() + Send + 'static,
    {
        if self.is_running() {
            return;
        }
        self.running.store(true, Ordering::Relaxed);

        let running = self.running.clone();
        let (tx, rx) = mpsc::channel::<RotationCmd>();
        self.tx = Some(tx);

        let handle = thread::Builder::new()
            .name("rotation-timer".into())
            .spawn(move || {
                loop {
                    match rx.recv_timeout(period) {
                        Ok(RotationCmd::Shutdown) => break,
                        Err(mpsc::RecvTimeoutError::Disconnected) => break,
                        Err(mpsc::RecvTimeoutError::Timeout) => {
                            if !running.load(Ordering::Relaxed) {
                                break;
                            }
                            if let Some(snapshot) = get_state() {
                                if decide_tick(&snapshot) == TickDecision::Advance {
                                    on_advance();
                                }
                            }
                        }
                    }
                }
                running.store(false, Ordering::Relaxed);
            })
            .expect("failed to spawn rotation-timer thread");

        self.thread_handle = Some(handle);
    }

    /// Disarm the timer and wait for the thread to finish. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(RotationCmd::Shutdown);
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Default for RotationHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RotationHandler {
    fn drop(&mut self) {
        self.stop();
    }
}
