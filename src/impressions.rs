use crate::engagement::EngagementSink;
use std::collections::HashSet;

/// Once-per-mount impression bookkeeping.
///
/// The id is inserted into the set *before* the sink call goes out, so a
/// slow backend response can never let a second rotation pass double-fire
/// the same impression.
pub struct ImpressionLog {
    recorded: HashSet<String>,
}

impl ImpressionLog {
    pub fn new() -> Self {
        ImpressionLog {
            recorded: HashSet::new(),
        }
    }

    /// Record an impression for the ad unless one was already sent this
    /// mount. Returns true if this call fired the impression.
    ///
    /// A sink failure is logged and swallowed; the id stays marked and
    /// is not retried.
    pub fn record_if_new(&mut self, ad_id: &str, sink: &dyn EngagementSink) -> bool {
        if self.recorded.contains(ad_id) {
            return false;
        }
        self.recorded.insert(ad_id.to_string());

        if let Err(e) = sink.record_impression(ad_id) {
            eprintln!("[Impressions] Failed to record impression for '{}': {}", ad_id, e);
        }
        true
    }

    pub fn is_recorded(&self, ad_id: &str) -> bool {
        self.recorded.contains(ad_id)
    }

    pub fn count(&self) -> usize {
        self.recorded.len()
    }

    /// Forget everything. Called on remount/reconfigure.
    pub fn reset(&mut self) {
        self.recorded.clear();
    }
}

impl Default for ImpressionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::ClickReceipt;
    use std::sync::Mutex;

    /// Sink that counts impression calls and optionally fails them.
    struct CountingSink {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl CountingSink {
        fn new(fail: bool) -> Self {
            CountingSink {
                calls: Mutex::new(Vec::new()),
                fail,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl EngagementSink for CountingSink {
        fn record_impression(&self, ad_id: &str) -> Result<(), String> {
            self.calls.lock().unwrap().push(ad_id.to_string());
            if self.fail {
                Err("503 from backend".to_string())
            } else {
                Ok(())
            }
        }

        fn record_click(&self, _ad_id: &str) -> Result<ClickReceipt, String> {
            Ok(ClickReceipt { counted_as_new: true })
        }
    }

    #[test]
    fn records_each_ad_exactly_once() {
        let sink = CountingSink::new(false);
        let mut log = ImpressionLog::new();

        assert!(log.record_if_new("a", &sink));
        assert!(!log.record_if_new("a", &sink));
        assert!(log.record_if_new("b", &sink));
        assert!(!log.record_if_new("a", &sink));

        assert_eq!(sink.call_count(), 2);
        assert_eq!(log.count(), 2);
    }

    #[test]
    fn sink_failure_still_marks_the_ad() {
        let sink = CountingSink::new(true);
        let mut log = ImpressionLog::new();

        assert!(log.record_if_new("a", &sink));
        assert!(log.is_recorded("a"));
        // No retry on revisit: the mark went in before the send.
        assert!(!log.record_if_new("a", &sink));
        assert_eq!(sink.call_count(), 1);
    }

    #[test]
    fn reset_allows_re_recording() {
        let sink = CountingSink::new(false);
        let mut log = ImpressionLog::new();

        log.record_if_new("a", &sink);
        log.reset();
        assert!(!log.is_recorded("a"));
        assert!(log.record_if_new("a", &sink));
        assert_eq!(sink.call_count(), 2);
    }
}
