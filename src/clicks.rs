use crate::ad::Ad;
use crate::cooldown::{wait_message, CooldownTracker};
use crate::engagement::{EngagementSink, Navigator};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;

/// What a click attempt resulted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// A click for this ad is already being processed; the repeat tap is
    /// silently ignored.
    InFlight,
    /// Blocked by an active cooldown; `message` is user-facing.
    CoolingDown { remaining: Duration, message: String },
    /// Navigation was initiated. `counted_as_new` is false when the
    /// backend rejected the click as a duplicate or was unreachable.
    Navigated { counted_as_new: bool },
}

/// Turns a user click into a gated, recorded external navigation.
///
/// The pipeline never lets a backend hiccup block the click-through: the
/// destination opens whether or not the click was recorded. Only a
/// confirmed newly-counted click arms the cooldown.
pub struct ClickPipeline {
    in_flight: HashSet<String>,
}

impl ClickPipeline {
    pub fn new() -> Self {
        ClickPipeline {
            in_flight: HashSet::new(),
        }
    }

    /// Handle a click on the given ad at an explicit instant (for tests).
    pub fn handle_at(
        &mut self,
        ad: &Ad,
        cooldowns: &mut CooldownTracker,
        sink: &dyn EngagementSink,
        navigator: &dyn Navigator,
        now: DateTime<Utc>,
    ) -> ClickOutcome {
        // Rapid repeat taps on the same ad collapse into the first.
        if self.in_flight.contains(&ad.id) {
            return ClickOutcome::InFlight;
        }

        // Cooldown gate: no navigation, user-facing wait notice.
        if !cooldowns.can_click_at(&ad.id, now) {
            let remaining = cooldowns.remaining_at(&ad.id, now);
            return ClickOutcome::CoolingDown {
                remaining,
                message: wait_message(remaining),
            };
        }

        // Record with the backend. Only a newly-counted click arms the
        // cooldown; a server-side duplicate must not extend it.
        self.in_flight.insert(ad.id.clone());

        let counted_as_new = match sink.record_click(&ad.id) {
            Ok(receipt) => {
                if receipt.counted_as_new {
                    cooldowns.record_click_at(&ad.id, now);
                }
                receipt.counted_as_new
            }
            Err(e) => {
                eprintln!("[Clicks] Failed to record click for '{}': {}", ad.id, e);
                false
            }
        };

        // Open the destination regardless of the network outcome.
        if let Err(e) = navigator.open(&ad.click_url) {
            eprintln!("[Clicks] Failed to open '{}': {}", ad.click_url, e);
        }

        // In-flight marker cleared on every path that set it.
        self.in_flight.remove(&ad.id);

        ClickOutcome::Navigated { counted_as_new }
    }

    /// Handle a click on the given ad right now.
    pub fn handle(
        &mut self,
        ad: &Ad,
        cooldowns: &mut CooldownTracker,
        sink: &dyn EngagementSink,
        navigator: &dyn Navigator,
    ) -> ClickOutcome {
        self.handle_at(ad, cooldowns, sink, navigator, Utc::now())
    }

    /// Whether a click for the ad is currently being processed.
    pub fn is_in_flight(&self, ad_id: &str) -> bool {
        self.in_flight.contains(ad_id)
    }
}

impl Default for ClickPipeline {
    fn default() -> Self {
        Self::new()
    }
}
