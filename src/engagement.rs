//! Engagement seams — the engine's boundary with the backend and browser.
//!
//! The surrounding application owns transport and auth; the engine talks to
//! it through these traits. Implementations are expected to be cheap to
//! call and to do their own dispatch if they need to go async.

/// Backend response for a recorded click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickReceipt {
    /// True when the backend counted this click as new. A server-side
    /// duplicate comes back false and must not re-arm the cooldown.
    pub counted_as_new: bool,
}

/// Records impressions and clicks with the external system.
pub trait EngagementSink: Send + Sync {
    fn record_impression(&self, ad_id: &str) -> Result<(), String>;
    fn record_click(&self, ad_id: &str) -> Result<ClickReceipt, String>;
}

/// Opens a click-through destination in a new, non-opener-linked browsing
/// context. The opened page must not receive a back-reference to the
/// originating one.
pub trait Navigator: Send + Sync {
    fn open(&self, url: &str) -> Result<(), String>;
}

/// Sink that accepts everything and reports every click as newly counted.
/// Used by the CLI simulator and as a harmless default.
pub struct NullSink;

impl EngagementSink for NullSink {
    fn record_impression(&self, _ad_id: &str) -> Result<(), String> {
        Ok(())
    }

    fn record_click(&self, _ad_id: &str) -> Result<ClickReceipt, String> {
        Ok(ClickReceipt { counted_as_new: true })
    }
}

/// Navigator that goes nowhere.
pub struct NullNavigator;

impl Navigator for NullNavigator {
    fn open(&self, _url: &str) -> Result<(), String> {
        Ok(())
    }
}
