//! Media-dimension probing and the aspect-ratio cache.
//!
//! The engine never touches media itself: the host injects a
//! `DimensionProbe` (off-DOM probe element, HTTP HEAD, whatever fits) and
//! the worker thread runs it so a slow probe never blocks rotation.
//! Results for a torn-down core are simply dropped.

use crate::ad::Ad;
use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread;

/// Fallback width/height ratio used until a probe lands (wide banner).
pub const DEFAULT_BANNER_RATIO: f32 = 4.8;

/// Natural dimensions reported by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaDimensions {
    pub width: u32,
    pub height: u32,
}

impl MediaDimensions {
    /// Width/height ratio; None for degenerate dimensions.
    pub fn ratio(&self) -> Option<f32> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(self.width as f32 / self.height as f32)
    }
}

/// Measures the natural dimensions of an ad's banner media.
pub trait DimensionProbe: Send + Sync {
    fn probe(&self, ad: &Ad) -> Result<MediaDimensions, String>;
}

/// Fixed-answer probe for tests and the CLI simulator.
pub struct StaticProbe {
    dimensions: HashMap<String, MediaDimensions>,
}

impl StaticProbe {
    pub fn new() -> Self {
        StaticProbe {
            dimensions: HashMap::new(),
        }
    }

    pub fn with(mut self, ad_id: &str, width: u32, height: u32) -> Self {
        self.dimensions
            .insert(ad_id.to_string(), MediaDimensions { width, height });
        self
    }
}

impl Default for StaticProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl DimensionProbe for StaticProbe {
    fn probe(&self, ad: &Ad) -> Result<MediaDimensions, String> {
        self.dimensions
            .get(&ad.id)
            .copied()
            .ok_or_else(|| format!("No dimensions known for '{}'", ad.id))
    }
}

/// Memoized width/height ratios keyed by ad id.
///
/// Populated lazily, cached for the mount's lifetime, never re-probed.
pub struct AspectRatioCache {
    ratios: HashMap<String, f32>,
}

impl AspectRatioCache {
    pub fn new() -> Self {
        AspectRatioCache {
            ratios: HashMap::new(),
        }
    }

    /// The cached ratio, or the wide-banner default so initial render
    /// never divides by zero or waits.
    pub fn ratio_or_default(&self, ad_id: &str) -> f32 {
        self.ratios.get(ad_id).copied().unwrap_or(DEFAULT_BANNER_RATIO)
    }

    pub fn contains(&self, ad_id: &str) -> bool {
        self.ratios.contains_key(ad_id)
    }

    /// Store a probed ratio. Non-finite and non-positive values are
    /// rejected.
    pub fn insert(&mut self, ad_id: &str, ratio: f32) -> Result<(), String> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(format!("Invalid aspect ratio {} for '{}'", ratio, ad_id));
        }
        self.ratios.insert(ad_id.to_string(), ratio);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }
}

impl Default for AspectRatioCache {
    fn default() -> Self {
        Self::new()
    }
}

// --- Probe worker ---

/// Events emitted by the probe worker back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeEvent {
    Resolved { ad_id: String, ratio: f32 },
    Failed { ad_id: String, error: String },
}

enum ProbeCmd {
    Probe(Ad),
    Shutdown,
}

/// Thread-safe handle for submitting probe requests.
#[derive(Clone)]
pub struct ProbeHandle {
    tx: mpsc::Sender<ProbeCmd>,
}

impl ProbeHandle {
    /// Queue a probe for the ad. Requests after shutdown are dropped.
    pub fn request(&self, ad: Ad) {
        let _ = self.tx.send(ProbeCmd::Probe(ad));
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(ProbeCmd::Shutdown);
    }
}

/// Spawn the probe worker on a dedicated thread.
///
/// `on_event` is called from the worker thread per completed probe. The
/// caller decides what to do with results; dropping every handle ends
/// the thread, abandoning whatever was still queued.
pub fn spawn_probe_worker<F>(probe: Arc<dyn DimensionProbe>, on_event: F) -> ProbeHandle
where
    F: Fn(ProbeEvent) + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<ProbeCmd>();

    thread::Builder::new()
        .name("aspect-probe".into())
        .spawn(move || {
            while let Ok(cmd) = rx.recv() {
                match cmd {
                    ProbeCmd::Probe(ad) => match probe.probe(&ad) {
                        Ok(dims) => match dims.ratio() {
                            Some(ratio) => on_event(ProbeEvent::Resolved { ad_id: ad.id, ratio }),
                            None => on_event(ProbeEvent::Failed {
                                ad_id: ad.id,
                                error: format!("Degenerate dimensions {}x{}", dims.width, dims.height),
                            }),
                        },
                        Err(e) => on_event(ProbeEvent::Failed {
                            ad_id: ad.id,
                            error: e,
                        }),
                    },
                    ProbeCmd::Shutdown => break,
                }
            }
        })
        .expect("failed to spawn aspect-probe thread");

    ProbeHandle { tx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ad::MediaKind;
    use std::sync::Mutex;
    use std::time::Duration;

    fn make_ad(id: &str) -> Ad {
        Ad::new(
            id.to_string(),
            MediaKind::Image,
            format!("https://cdn.example.com/{}.png", id),
            format!("https://example.com/{}", id),
            id.to_string(),
        )
    }

    #[test]
    fn cache_defaults_to_wide_banner() {
        let cache = AspectRatioCache::new();
        assert_eq!(cache.ratio_or_default("x"), DEFAULT_BANNER_RATIO);
    }

    #[test]
    fn cache_stores_and_returns_ratio() {
        let mut cache = AspectRatioCache::new();
        cache.insert("x", 1.5).unwrap();
        assert_eq!(cache.ratio_or_default("x"), 1.5);
        assert!(cache.contains("x"));
    }

    #[test]
    fn cache_rejects_broken_ratios() {
        let mut cache = AspectRatioCache::new();
        assert!(cache.insert("x", 0.0).is_err());
        assert!(cache.insert("x", -2.0).is_err());
        assert!(cache.insert("x", f32::NAN).is_err());
        assert!(cache.insert("x", f32::INFINITY).is_err());
        assert!(!cache.contains("x"));
    }

    #[test]
    fn dimensions_ratio() {
        assert_eq!(
            MediaDimensions { width: 960, height: 200 }.ratio(),
            Some(4.8)
        );
        assert_eq!(MediaDimensions { width: 0, height: 200 }.ratio(), None);
        assert_eq!(MediaDimensions { width: 960, height: 0 }.ratio(), None);
    }

    #[test]
    fn worker_resolves_known_media() {
        let events: Arc<Mutex<Vec<ProbeEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();

        let probe = Arc::new(StaticProbe::new().with("a", 960, 200));
        let handle = spawn_probe_worker(probe, move |evt| {
            events_clone.lock().unwrap().push(evt);
        });

        handle.request(make_ad("a"));
        thread::sleep(Duration::from_millis(100));
        handle.shutdown();

        let evts = events.lock().unwrap();
        assert_eq!(
            *evts,
            vec![ProbeEvent::Resolved {
                ad_id: "a".to_string(),
                ratio: 4.8
            }]
        );
    }

    #[test]
    fn worker_reports_failures() {
        let events: Arc<Mutex<Vec<ProbeEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();

        let probe = Arc::new(StaticProbe::new());
        let handle = spawn_probe_worker(probe, move |evt| {
            events_clone.lock().unwrap().push(evt);
        });

        handle.request(make_ad("mystery"));
        thread::sleep(Duration::from_millis(100));
        handle.shutdown();

        let evts = events.lock().unwrap();
        assert!(matches!(evts[0], ProbeEvent::Failed { .. }));
    }

    #[test]
    fn worker_shutdown_is_clean() {
        let probe = Arc::new(StaticProbe::new());
        let handle = spawn_probe_worker(probe, |_| {});
        handle.shutdown();
        thread::sleep(Duration::from_millis(50));
        // Requests after shutdown are silently dropped.
        handle.request(make_ad("late"));
    }
}
