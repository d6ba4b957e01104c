use crate::ad::Ad;

/// Carousel state for one mounted view.
///
/// Owns the ordered ad list and the current position. Index maintenance
/// lives here; impression and cooldown bookkeeping live with the core.
#[derive(Debug, Clone)]
pub struct Carousel {
    ads: Vec<Ad>,
    current_index: usize,
    /// True only during the brief visual-transition window around an
    /// index change.
    pub is_transitioning: bool,
    /// Latched when the current video ad fired its end event; cleared on
    /// index commit and on replay.
    pub video_ended: bool,
}

impl Carousel {
    pub fn new() -> Self {
        Carousel {
            ads: Vec::new(),
            current_index: 0,
            is_transitioning: false,
            video_ended: false,
        }
    }

    /// Replace the ad list.
    ///
    /// Returns true if the ad-set identity changed (different ids or
    /// order), in which case `current_index` resets to 0 and the
    /// transition/video flags clear. A refresh that delivers the same ads
    /// in the same order keeps the current position.
    pub fn configure(&mut self, ads: Vec<Ad>) -> bool {
        let same_identity = self.ads.len() == ads.len()
            && self.ads.iter().zip(ads.iter()).all(|(a, b)| a.id == b.id);

        self.ads = ads;
        if same_identity {
            // Defensive clamp: identical ids imply identical length, but
            // an empty list still needs a valid index.
            if self.current_index >= self.ads.len() {
                self.current_index = 0;
            }
            return false;
        }
        self.current_index = 0;
        self.is_transitioning = false;
        self.video_ended = false;
        true
    }

    pub fn len(&self) -> usize {
        self.ads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ads.is_empty()
    }

    pub fn ads(&self) -> &[Ad] {
        &self.ads
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The ad currently showing, if any.
    pub fn current(&self) -> Option<&Ad> {
        self.ads.get(self.current_index)
    }

    /// Look up an ad by id.
    pub fn find(&self, ad_id: &str) -> Option<&Ad> {
        self.ads.iter().find(|a| a.id == ad_id)
    }

    /// Compute the index one step in `direction` from the current one,
    /// wrapping in both directions. Returns None for an empty carousel.
    pub fn step(&self, direction: i32) -> Option<usize> {
        step_index(self.current_index, direction, self.ads.len())
    }

    /// Commit a new current index. Out-of-range commits are rejected so
    /// the bounds invariant holds no matter what the caller does.
    pub fn set_index(&mut self, index: usize) -> Result<(), String> {
        if index >= self.ads.len() {
            return Err(format!(
                "Index {} out of range (carousel has {} ads)",
                index,
                self.ads.len()
            ));
        }
        self.current_index = index;
        Ok(())
    }
}

impl Default for Carousel {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap-around index stepping: `(current + direction + len) % len` with
/// both directions supported. None when the list is empty.
pub fn step_index(current: usize, direction: i32, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let len = len as i64;
    let next = (current as i64 + direction as i64).rem_euclid(len);
    Some(next as usize)
}
