use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// How long an ad stays unclickable after a counted click.
pub const COOLDOWN_WINDOW_SECS: i64 = 5 * 60;

/// Map of ad id -> click-allowed-after timestamp.
pub type CooldownEntries = HashMap<String, DateTime<Utc>>;

/// Source for seeding cooldowns across remounts.
///
/// A UX guard, not a security boundary: the backend makes the
/// authoritative duplicate-click decision. Implementations are free to
/// lose data; the tracker tolerates stale or missing entries.
pub trait CooldownSeedStore: Send + Sync {
    fn load(&self) -> CooldownEntries;
    fn persist(&self, entries: &CooldownEntries);
}

/// Seed store backed by a JSON file. Missing or corrupt files read as
/// empty; write errors are swallowed.
pub struct JsonSeedStore {
    path: PathBuf,
}

impl JsonSeedStore {
    pub fn new(directory: &Path) -> Self {
        Self {
            path: directory.join("ad_cooldowns.json"),
        }
    }
}

impl CooldownSeedStore for JsonSeedStore {
    fn load(&self) -> CooldownEntries {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => CooldownEntries::default(),
        }
    }

    fn persist(&self, entries: &CooldownEntries) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string(entries) {
            let _ = std::fs::write(&self.path, json);
        }
    }
}

/// In-memory seed store for tests and the CLI simulator.
pub struct MemorySeedStore {
    entries: Mutex<CooldownEntries>,
}

impl MemorySeedStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(CooldownEntries::default()),
        }
    }

    pub fn with_entries(entries: CooldownEntries) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl Default for MemorySeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CooldownSeedStore for MemorySeedStore {
    fn load(&self) -> CooldownEntries {
        self.entries.lock().unwrap().clone()
    }

    fn persist(&self, entries: &CooldownEntries) {
        *self.entries.lock().unwrap() = entries.clone();
    }
}

/// Per-ad click rate limiter.
///
/// Entries are "allowed-after" timestamps; an entry in the past is simply
/// irrelevant, so nothing ever needs explicit cleanup.
pub struct CooldownTracker {
    entries: CooldownEntries,
}

impl CooldownTracker {
    pub fn new() -> Self {
        CooldownTracker {
            entries: CooldownEntries::default(),
        }
    }

    /// Seed entries from a store, keeping only the ads currently in view.
    pub fn seed_from(&mut self, store: &dyn CooldownSeedStore, ad_ids: &[String]) {
        let loaded = store.load();
        for id in ad_ids {
            if let Some(ts) = loaded.get(id) {
                self.entries.insert(id.clone(), *ts);
            }
        }
    }

    /// Pre-populate a single entry (e.g. from host-side state).
    pub fn seed_entry(&mut self, ad_id: &str, allowed_after: DateTime<Utc>) {
        self.entries.insert(ad_id.to_string(), allowed_after);
    }

    /// True iff no unexpired cooldown exists for the ad.
    pub fn can_click_at(&self, ad_id: &str, now: DateTime<Utc>) -> bool {
        match self.entries.get(ad_id) {
            Some(allowed_after) => now >= *allowed_after,
            None => true,
        }
    }

    pub fn can_click(&self, ad_id: &str) -> bool {
        self.can_click_at(ad_id, Utc::now())
    }

    /// Time left until the ad is clickable again. Zero when no entry
    /// exists or it has expired.
    pub fn remaining_at(&self, ad_id: &str, now: DateTime<Utc>) -> Duration {
        match self.entries.get(ad_id) {
            Some(allowed_after) if *allowed_after > now => {
                (*allowed_after - now).to_std().unwrap_or(Duration::ZERO)
            }
            _ => Duration::ZERO,
        }
    }

    pub fn remaining(&self, ad_id: &str) -> Duration {
        self.remaining_at(ad_id, Utc::now())
    }

    /// Arm the cooldown for a counted click. Callers invoke this only
    /// after the backend confirms the click was newly counted.
    pub fn record_click_at(&mut self, ad_id: &str, now: DateTime<Utc>) {
        self.entries.insert(
            ad_id.to_string(),
            now + ChronoDuration::seconds(COOLDOWN_WINDOW_SECS),
        );
    }

    pub fn record_click(&mut self, ad_id: &str) {
        self.record_click_at(ad_id, Utc::now());
    }

    /// Snapshot the entries for the given ads, for persisting to a seed
    /// store. Expired entries are included; they read back as irrelevant.
    pub fn snapshot_for(&self, ad_ids: &[String]) -> CooldownEntries {
        self.entries
            .iter()
            .filter(|(id, _)| ad_ids.iter().any(|a| a == *id))
            .map(|(id, ts)| (id.clone(), *ts))
            .collect()
    }

    /// All current entries (for display).
    pub fn entries(&self) -> &CooldownEntries {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// User-facing wait notice, minutes rounded up.
pub fn wait_message(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    let minutes = secs.div_ceil(60).max(1);
    if minutes == 1 {
        "You can click this ad again in 1 minute.".to_string()
    } else {
        format!("You can click this ad again in {} minutes.", minutes)
    }
}
