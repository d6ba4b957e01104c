use serde::{Deserialize, Serialize};

/// A house promo shown when no paid ads are live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HousePromo {
    pub title: String,
    pub banner_url: String,
    /// Optional destination; a promo without one renders as a plain
    /// placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Pick a promo to fill the empty carousel slot.
///
/// Filters to enabled entries; with multiple candidates one is picked at
/// random so the placeholder doesn't go stale across remounts.
pub fn pick_promo(promos: &[HousePromo]) -> Option<&HousePromo> {
    let candidates: Vec<&HousePromo> = promos.iter().filter(|p| p.enabled).collect();
    if candidates.is_empty() {
        return None;
    }
    if candidates.len() == 1 {
        return Some(candidates[0]);
    }
    let idx = fastrand::usize(..candidates.len());
    Some(candidates[idx])
}

/// Built-in promo pool used when the host configures none.
pub fn default_promos() -> Vec<HousePromo> {
    vec![
        HousePromo {
            title: "Advertise your business here".to_string(),
            banner_url: "https://cdn.example.com/promos/advertise-here.png".to_string(),
            click_url: Some("https://example.com/packages".to_string()),
            enabled: true,
        },
        HousePromo {
            title: "Reach more customers today".to_string(),
            banner_url: "https://cdn.example.com/promos/reach-more.png".to_string(),
            click_url: Some("https://example.com/packages".to_string()),
            enabled: true,
        },
    ]
}
