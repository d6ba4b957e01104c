use crate::ad::{live_ads, Ad, MediaKind};
use crate::promo::{default_promos, HousePromo};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const STATE_FILE: &str = "adloop_state.json";

/// Local ad inventory backing the CLI.
///
/// The embedding host normally supplies ads straight from the backend;
/// the CLI plays that host role with a JSON state file instead. A `None`
/// state path (test mode) makes every save a no-op.
#[derive(Debug, Serialize, Deserialize)]
pub struct Inventory {
    pub ads: Vec<Ad>,
    #[serde(default)]
    pub promos: Vec<HousePromo>,
    next_id: u32,
    #[serde(skip)]
    state_path: Option<PathBuf>,
}

impl Inventory {
    pub fn new() -> Self {
        Inventory {
            ads: Vec::new(),
            promos: default_promos(),
            next_id: 1,
            state_path: None,
        }
    }

    /// Default state file location under the platform data directory.
    pub fn default_state_path() -> PathBuf {
        match dirs::data_dir() {
            Some(dir) => dir.join("adloop").join(STATE_FILE),
            None => PathBuf::from(STATE_FILE),
        }
    }

    /// Load inventory state from the default location, or create a new
    /// instance if not found.
    pub fn load() -> Self {
        Self::load_from(&Self::default_state_path())
    }

    /// Load inventory state from an explicit path.
    pub fn load_from(path: &Path) -> Self {
        let mut inventory = if path.exists() {
            match fs::read_to_string(path) {
                Ok(data) => match serde_json::from_str::<Inventory>(&data) {
                    Ok(inv) => inv,
                    Err(e) => {
                        eprintln!("Warning: corrupt state file, starting fresh: {}", e);
                        Inventory::new()
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read state file: {}", e);
                    Inventory::new()
                }
            }
        } else {
            Inventory::new()
        };
        inventory.state_path = Some(path.to_path_buf());
        inventory
    }

    /// The configured state path, if any.
    pub fn state_path(&self) -> Option<&Path> {
        self.state_path.as_deref()
    }

    /// Persist current state. No-op without a state path.
    pub fn save(&self) -> Result<(), String> {
        let path = match &self.state_path {
            Some(p) => p,
            None => return Ok(()),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("Create dir error: {}", e))?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| format!("Serialize error: {}", e))?;
        fs::write(path, json).map_err(|e| format!("Write error: {}", e))?;
        Ok(())
    }

    /// Create a new ad. Returns its id.
    pub fn add_ad(
        &mut self,
        media_type: MediaKind,
        banner_url: String,
        click_url: String,
        title: String,
    ) -> String {
        let id = format!("ad-{}", self.next_id);
        self.next_id += 1;
        self.ads.push(Ad::new(id.clone(), media_type, banner_url, click_url, title));
        id
    }

    /// Find an ad by id.
    pub fn find_ad(&self, id: &str) -> Option<&Ad> {
        self.ads.iter().find(|a| a.id == id)
    }

    /// Find an ad by id, mutable.
    pub fn find_ad_mut(&mut self, id: &str) -> Option<&mut Ad> {
        self.ads.iter_mut().find(|a| a.id == id)
    }

    /// Remove an ad by id. Returns the removed ad.
    pub fn remove_ad(&mut self, id: &str) -> Result<Ad, String> {
        let idx = self
            .ads
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| format!("Ad '{}' not found", id))?;
        Ok(self.ads.remove(idx))
    }

    /// Flip an ad's enabled flag. Returns the new state.
    pub fn toggle_ad(&mut self, id: &str) -> Result<bool, String> {
        let ad = self
            .find_ad_mut(id)
            .ok_or_else(|| format!("Ad '{}' not found", id))?;
        ad.enabled = !ad.enabled;
        Ok(ad.enabled)
    }

    /// Set an ad's display priority.
    pub fn set_priority(&mut self, id: &str, priority: i32) -> Result<(), String> {
        let ad = self
            .find_ad_mut(id)
            .ok_or_else(|| format!("Ad '{}' not found", id))?;
        ad.priority = priority;
        Ok(())
    }

    /// Move an ad from one position to another (0-based).
    pub fn reorder_ad(&mut self, from: usize, to: usize) -> Result<(), String> {
        if from >= self.ads.len() || to >= self.ads.len() {
            return Err(format!(
                "Index out of range (inventory has {} ads)",
                self.ads.len()
            ));
        }
        let ad = self.ads.remove(from);
        self.ads.insert(to, ad);
        Ok(())
    }

    /// The ads live right now, in display order.
    pub fn live(&self) -> Vec<Ad> {
        live_ads(&self.ads)
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}
