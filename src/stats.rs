use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Delivery-failure record (impression or click that never reached the
/// backend).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryFailure {
    /// Timestamp in "YYYY-MM-DD HH:MM" format.
    pub t: String,
    /// Ad id involved.
    pub ad_id: String,
    /// Error description (e.g. "click:timeout").
    pub err: String,
}

/// Engagement data: ad_id -> ISO date -> vec of hour integers.
pub type EngagementData = HashMap<String, HashMap<String, Vec<u8>>>;

/// Which engagement metric to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Impressions,
    Clicks,
}

const MAX_FAILURES: usize = 50;

/// JSON-based engagement statistics logger.
///
/// Records every delivered impression and click (per-ad, per-date,
/// per-hour) and tracks delivery failures. Loads from disk on each
/// operation and saves after mutations.
pub struct EngagementLogger {
    impressions_path: PathBuf,
    clicks_path: PathBuf,
    failures_path: PathBuf,
}

impl EngagementLogger {
    /// Create a new logger storing files in the given directory.
    pub fn new(directory: &Path) -> Self {
        Self {
            impressions_path: directory.join("ad_impressions.json"),
            clicks_path: directory.join("ad_clicks.json"),
            failures_path: directory.join("ad_delivery_failures.json"),
        }
    }

    /// Record an impression at the current date and hour.
    pub fn log_impression(&self, ad_id: &str) {
        let (date_key, hour) = now_keys();
        self.log_impression_at(ad_id, &date_key, hour);
    }

    /// Record an impression at a specific date and hour (for testing).
    pub fn log_impression_at(&self, ad_id: &str, date_key: &str, hour: u8) {
        let mut data = self.load(Metric::Impressions);
        record(&mut data, ad_id, date_key, hour);
        self.save(Metric::Impressions, &data);
    }

    /// Record a click at the current date and hour.
    pub fn log_click(&self, ad_id: &str) {
        let (date_key, hour) = now_keys();
        self.log_click_at(ad_id, &date_key, hour);
    }

    /// Record a click at a specific date and hour (for testing).
    pub fn log_click_at(&self, ad_id: &str, date_key: &str, hour: u8) {
        let mut data = self.load(Metric::Clicks);
        record(&mut data, ad_id, date_key, hour);
        self.save(Metric::Clicks, &data);
    }

    /// Record a delivery failure. Trims to MAX_FAILURES (oldest discarded).
    pub fn log_failure(&self, ad_id: &str, error: &str) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M").to_string();

        let mut failures = self.load_failures();
        failures.push(DeliveryFailure {
            t: timestamp,
            ad_id: ad_id.to_string(),
            err: error.to_string(),
        });
        if failures.len() > MAX_FAILURES {
            let excess = failures.len() - MAX_FAILURES;
            failures.drain(..excess);
        }
        self.save_failures(&failures);
    }

    /// Summary statistics over everything on record.
    pub fn get_statistics(&self) -> EngagementStatistics {
        Self::compute_statistics(&self.load(Metric::Impressions), &self.load(Metric::Clicks))
    }

    /// Statistics filtered to a date range (inclusive, YYYY-MM-DD).
    pub fn get_statistics_filtered(&self, start: &str, end: &str) -> EngagementStatistics {
        let impressions = filter_by_date_range(&self.load(Metric::Impressions), start, end);
        let clicks = filter_by_date_range(&self.load(Metric::Clicks), start, end);
        Self::compute_statistics(&impressions, &clicks)
    }

    /// Daily counts: {"YYYY-MM-DD": {ad_id: count}}.
    pub fn get_daily_counts(
        &self,
        metric: Metric,
        start: &str,
        end: &str,
    ) -> HashMap<String, HashMap<String, usize>> {
        let data = filter_by_date_range(&self.load(metric), start, end);
        let mut result: HashMap<String, HashMap<String, usize>> = HashMap::new();
        for (ad_id, dates) in &data {
            for (date, hours) in dates {
                result
                    .entry(date.clone())
                    .or_default()
                    .insert(ad_id.clone(), hours.len());
            }
        }
        result
    }

    /// Hourly counts: {"YYYY-MM-DD_HH": {ad_id: count}}.
    pub fn get_hourly_counts(
        &self,
        metric: Metric,
        start: &str,
        end: &str,
    ) -> HashMap<String, HashMap<String, usize>> {
        let data = filter_by_date_range(&self.load(metric), start, end);
        let mut result: HashMap<String, HashMap<String, usize>> = HashMap::new();
        for (ad_id, dates) in &data {
            for (date, hours) in dates {
                let mut hour_counts: HashMap<u8, usize> = HashMap::new();
                for &h in hours {
                    *hour_counts.entry(h).or_default() += 1;
                }
                for (hour, count) in hour_counts {
                    let key = format!("{}_{:02}", date, hour);
                    result.entry(key).or_default().insert(ad_id.clone(), count);
                }
            }
        }
        result
    }

    /// All failure records.
    pub fn get_failures(&self) -> Vec<DeliveryFailure> {
        self.load_failures()
    }

    /// Clear all engagement data and failures.
    pub fn reset_all(&self) {
        self.save(Metric::Impressions, &EngagementData::new());
        self.save(Metric::Clicks, &EngagementData::new());
        self.save_failures(&Vec::new());
    }

    // --- Private helpers ---

    fn path_for(&self, metric: Metric) -> &Path {
        match metric {
            Metric::Impressions => &self.impressions_path,
            Metric::Clicks => &self.clicks_path,
        }
    }

    fn load(&self, metric: Metric) -> EngagementData {
        load_json_or_default(self.path_for(metric))
    }

    fn save(&self, metric: Metric, data: &EngagementData) {
        save_json(self.path_for(metric), data);
    }

    fn load_failures(&self) -> Vec<DeliveryFailure> {
        load_json_or_default(&self.failures_path)
    }

    fn save_failures(&self, data: &Vec<DeliveryFailure>) {
        save_json(&self.failures_path, data);
    }

    fn compute_statistics(
        impressions: &EngagementData,
        clicks: &EngagementData,
    ) -> EngagementStatistics {
        let mut per_ad: HashMap<String, AdEngagementEntry> = HashMap::new();

        for (ad_id, dates) in impressions {
            let count: usize = dates.values().map(|h| h.len()).sum();
            per_ad
                .entry(ad_id.clone())
                .or_insert_with(|| AdEngagementEntry::new(ad_id))
                .impressions = count;
        }
        for (ad_id, dates) in clicks {
            let count: usize = dates.values().map(|h| h.len()).sum();
            per_ad
                .entry(ad_id.clone())
                .or_insert_with(|| AdEngagementEntry::new(ad_id))
                .clicks = count;
        }

        let total_impressions: usize = per_ad.values().map(|e| e.impressions).sum();
        let total_clicks: usize = per_ad.values().map(|e| e.clicks).sum();

        let mut per_ad: Vec<AdEngagementEntry> = per_ad.into_values().collect();
        // Sort by clicks descending, then impressions descending, then id
        per_ad.sort_by(|a, b| {
            b.clicks
                .cmp(&a.clicks)
                .then(b.impressions.cmp(&a.impressions))
                .then(a.ad_id.cmp(&b.ad_id))
        });

        EngagementStatistics {
            total_impressions,
            total_clicks,
            per_ad,
        }
    }
}

/// Summary statistics for ad engagement.
#[derive(Debug, Serialize)]
pub struct EngagementStatistics {
    pub total_impressions: usize,
    pub total_clicks: usize,
    pub per_ad: Vec<AdEngagementEntry>,
}

/// Per-ad engagement entry.
#[derive(Debug, Serialize)]
pub struct AdEngagementEntry {
    pub ad_id: String,
    pub impressions: usize,
    pub clicks: usize,
}

impl AdEngagementEntry {
    fn new(ad_id: &str) -> Self {
        AdEngagementEntry {
            ad_id: ad_id.to_string(),
            impressions: 0,
            clicks: 0,
        }
    }

    /// Click-through rate in percent. Zero when nothing was shown.
    pub fn ctr(&self) -> f64 {
        if self.impressions == 0 {
            return 0.0;
        }
        self.clicks as f64 / self.impressions as f64 * 100.0
    }
}

fn now_keys() -> (String, u8) {
    let now = Local::now();
    let date_key = now.format("%Y-%m-%d").to_string();
    let hour = now.format("%H").to_string().parse::<u8>().unwrap_or(0);
    (date_key, hour)
}

fn record(data: &mut EngagementData, ad_id: &str, date_key: &str, hour: u8) {
    data.entry(ad_id.to_string())
        .or_default()
        .entry(date_key.to_string())
        .or_default()
        .push(hour);
}

fn filter_by_date_range(data: &EngagementData, start: &str, end: &str) -> EngagementData {
    let mut filtered = EngagementData::new();
    for (ad_id, dates) in data {
        for (date_key, hours) in dates {
            if date_key.as_str() >= start && date_key.as_str() <= end {
                filtered
                    .entry(ad_id.clone())
                    .or_default()
                    .insert(date_key.clone(), hours.clone());
            }
        }
    }
    filtered
}

/// Load JSON from a file, returning a default value on missing/corrupt files.
fn load_json_or_default<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> T {
    match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
        Err(_) => T::default(),
    }
}

/// Save a value as JSON to a file.
fn save_json<T: Serialize>(path: &Path, data: &T) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Ok(json) = serde_json::to_string(data) {
        let _ = std::fs::write(path, json);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_logger() -> (EngagementLogger, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let logger = EngagementLogger::new(dir.path());
        (logger, dir)
    }

    #[test]
    fn log_impression_creates_file_and_records() {
        let (logger, _dir) = temp_logger();
        logger.log_impression_at("ad-1", "2026-06-01", 9);

        let stats = logger.get_statistics();
        assert_eq!(stats.total_impressions, 1);
        assert_eq!(stats.total_clicks, 0);
        assert_eq!(stats.per_ad[0].ad_id, "ad-1");
    }

    #[test]
    fn impressions_and_clicks_are_tracked_separately() {
        let (logger, _dir) = temp_logger();
        logger.log_impression_at("ad-1", "2026-06-01", 9);
        logger.log_impression_at("ad-1", "2026-06-01", 10);
        logger.log_click_at("ad-1", "2026-06-01", 10);

        let stats = logger.get_statistics();
        assert_eq!(stats.total_impressions, 2);
        assert_eq!(stats.total_clicks, 1);
        let entry = &stats.per_ad[0];
        assert_eq!(entry.impressions, 2);
        assert_eq!(entry.clicks, 1);
        assert_eq!(entry.ctr(), 50.0);
    }

    #[test]
    fn ctr_is_zero_without_impressions() {
        let (logger, _dir) = temp_logger();
        logger.log_click_at("ad-1", "2026-06-01", 9);
        let stats = logger.get_statistics();
        assert_eq!(stats.per_ad[0].ctr(), 0.0);
    }

    #[test]
    fn statistics_sorted_by_clicks_then_impressions() {
        let (logger, _dir) = temp_logger();
        logger.log_click_at("busy", "2026-06-01", 9);
        logger.log_click_at("busy", "2026-06-01", 10);
        logger.log_click_at("quiet", "2026-06-01", 11);
        logger.log_impression_at("shown-only", "2026-06-01", 9);

        let stats = logger.get_statistics();
        assert_eq!(stats.per_ad[0].ad_id, "busy");
        assert_eq!(stats.per_ad[1].ad_id, "quiet");
        assert_eq!(stats.per_ad[2].ad_id, "shown-only");
    }

    #[test]
    fn filtered_statistics_respect_date_range() {
        let (logger, _dir) = temp_logger();
        logger.log_click_at("ad-1", "2026-06-01", 9);
        logger.log_click_at("ad-1", "2026-06-15", 10);
        logger.log_click_at("ad-1", "2026-06-30", 11);

        let stats = logger.get_statistics_filtered("2026-06-10", "2026-06-20");
        assert_eq!(stats.total_clicks, 1);
    }

    #[test]
    fn daily_counts_aggregate_per_date() {
        let (logger, _dir) = temp_logger();
        logger.log_click_at("ad-1", "2026-06-01", 9);
        logger.log_click_at("ad-1", "2026-06-01", 10);
        logger.log_click_at("ad-2", "2026-06-01", 9);
        logger.log_click_at("ad-1", "2026-06-02", 14);

        let daily = logger.get_daily_counts(Metric::Clicks, "2026-06-01", "2026-06-30");
        assert_eq!(daily["2026-06-01"]["ad-1"], 2);
        assert_eq!(daily["2026-06-01"]["ad-2"], 1);
        assert_eq!(daily["2026-06-02"]["ad-1"], 1);
    }

    #[test]
    fn hourly_counts_aggregate_per_hour() {
        let (logger, _dir) = temp_logger();
        logger.log_impression_at("ad-1", "2026-06-01", 9);
        logger.log_impression_at("ad-1", "2026-06-01", 9);
        logger.log_impression_at("ad-1", "2026-06-01", 14);

        let hourly = logger.get_hourly_counts(Metric::Impressions, "2026-06-01", "2026-06-30");
        assert_eq!(hourly["2026-06-01_09"]["ad-1"], 2);
        assert_eq!(hourly["2026-06-01_14"]["ad-1"], 1);
    }

    #[test]
    fn failures_record_and_trim() {
        let (logger, _dir) = temp_logger();
        for i in 0..55 {
            logger.log_failure(&format!("ad-{}", i), &format!("click:error-{}", i));
        }

        let failures = logger.get_failures();
        assert_eq!(failures.len(), MAX_FAILURES);
        assert_eq!(failures[0].ad_id, "ad-5");
        assert_eq!(failures[49].ad_id, "ad-54");
    }

    #[test]
    fn reset_all_clears_everything() {
        let (logger, _dir) = temp_logger();
        logger.log_impression_at("ad-1", "2026-06-01", 9);
        logger.log_click_at("ad-1", "2026-06-01", 9);
        logger.log_failure("ad-1", "test error");

        logger.reset_all();

        let stats = logger.get_statistics();
        assert_eq!(stats.total_impressions, 0);
        assert_eq!(stats.total_clicks, 0);
        assert!(stats.per_ad.is_empty());
        assert!(logger.get_failures().is_empty());
    }

    #[test]
    fn handles_missing_files_gracefully() {
        let dir = tempfile::tempdir().unwrap();
        let logger = EngagementLogger::new(dir.path());
        let stats = logger.get_statistics();
        assert_eq!(stats.total_impressions, 0);
        assert!(logger.get_failures().is_empty());
    }

    #[test]
    fn handles_corrupt_json_gracefully() {
        let dir = tempfile::tempdir().unwrap();
        let logger = EngagementLogger::new(dir.path());
        fs::write(dir.path().join("ad_impressions.json"), "not valid json{{{").unwrap();
        fs::write(dir.path().join("ad_clicks.json"), "garbage").unwrap();

        let stats = logger.get_statistics();
        assert_eq!(stats.total_impressions, 0);
        assert_eq!(stats.total_clicks, 0);
    }
}
