//! Which posts get a slot, and how each slot is laid out.

use crate::config::{FlipInConfig, MAX_POSTS};
use crate::feeds::Post;
use std::collections::HashSet;

/// Layout shared by every slot. All slots use the same values, so they are
/// kept as scalars next to the cap instead of per-slot arrays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotConfig {
    pub cap: usize,
    /// Bottom margin below each card.
    pub spacing: f64,
    /// Maximum width of the text region of each card.
    pub max_width: f64,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            cap: MAX_POSTS,
            spacing: 20.0,
            max_width: 600.0,
        }
    }
}

impl From<&FlipInConfig> for SlotConfig {
    fn from(config: &FlipInConfig) -> Self {
        Self {
            cap: config.cap,
            spacing: config.spacing,
            max_width: config.max_width,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    pub index: usize,
    pub spacing: f64,
    pub max_width: f64,
}

impl SlotConfig {
    pub fn slot(&self, index: usize) -> Slot {
        Slot {
            index,
            spacing: self.spacing,
            max_width: self.max_width,
        }
    }

    /// Picks at most `cap` posts in provider order. A post id seen earlier in
    /// the sequence does not take a second slot.
    pub fn select<'a>(&self, posts: &'a [Post]) -> Vec<(Slot, &'a Post)> {
        let mut seen = HashSet::new();
        posts
            .iter()
            .filter(|post| seen.insert(post.id.as_str()))
            .take(self.cap)
            .enumerate()
            .map(|(index, post)| (self.slot(index), post))
            .collect()
    }
}
