use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Media kind of an ad banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaKind {
    Image,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

impl MediaKind {
    /// Parse a media kind from a string (case-insensitive).
    pub fn from_str_loose(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "image" | "img" => Ok(MediaKind::Image),
            "video" | "vid" => Ok(MediaKind::Video),
            _ => Err(format!("Unknown media kind '{}'. Expected: image, video", s)),
        }
    }
}

/// A single ad record as delivered by the backend.
///
/// Owned by the backend; the engine only reads these. The wire shape is
/// camelCase JSON, the same payload the dashboard endpoints serve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    /// Opaque id assigned by the backend.
    pub id: String,
    /// Whether the banner is an image or a video.
    pub media_type: MediaKind,
    /// URL of the banner media.
    pub banner_url: String,
    /// Destination URL opened on click-through.
    pub click_url: String,
    /// Display name of the ad.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Lifetime click count as last reported by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_clicks: Option<u64>,
    /// Display priority; higher shows first.
    #[serde(default)]
    pub priority: i32,
    /// Whether the ad is active at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Start of the active window. None = no lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    /// End of the active window. None = no upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

impl Ad {
    /// Create a new image ad with default settings.
    pub fn new(id: String, media_type: MediaKind, banner_url: String, click_url: String, title: String) -> Self {
        Ad {
            id,
            media_type,
            banner_url,
            click_url,
            title,
            description: None,
            total_clicks: None,
            priority: 0,
            enabled: true,
            starts_at: None,
            ends_at: None,
        }
    }

    /// Check if this ad is live at the given instant.
    ///
    /// Rules:
    /// 1. Disabled -> false
    /// 2. Before `starts_at` (when set) -> false
    /// 3. At or past `ends_at` (when set) -> false
    /// 4. Otherwise -> true
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        if let Some(start) = self.starts_at {
            if now < start {
                return false;
            }
        }
        if let Some(end) = self.ends_at {
            if now >= end {
                return false;
            }
        }
        true
    }

    /// Check if this ad is live right now.
    pub fn is_live(&self) -> bool {
        self.is_live_at(Utc::now())
    }

    /// Format the active window for display.
    pub fn window_display(&self) -> String {
        match (self.starts_at, self.ends_at) {
            (None, None) => "always".to_string(),
            (Some(s), None) => format!("from {}", s.format("%Y-%m-%d")),
            (None, Some(e)) => format!("until {}", e.format("%Y-%m-%d")),
            (Some(s), Some(e)) => {
                format!("{} to {}", s.format("%Y-%m-%d"), e.format("%Y-%m-%d"))
            }
        }
    }
}

/// Filter a backend ad list down to the ads live at `now`, ordered for
/// display: priority descending, original order preserved within a tier.
pub fn live_ads_at(ads: &[Ad], now: DateTime<Utc>) -> Vec<Ad> {
    let mut live: Vec<Ad> = ads.iter().filter(|a| a.is_live_at(now)).cloned().collect();
    live.sort_by(|a, b| b.priority.cmp(&a.priority));
    live
}

/// Filter and order the ads live right now.
pub fn live_ads(ads: &[Ad]) -> Vec<Ad> {
    live_ads_at(ads, Utc::now())
}
