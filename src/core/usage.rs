use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Color, RegionDict};

/// Number of regions holding each color within one scenario entry.
///
/// A color is present only while at least one region holds it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorUsage {
    counts: BTreeMap<Color, u32>,
}

impl ColorUsage {
    /// Recount from scratch. Used for validation, never for bookkeeping.
    pub fn from_regions(regions: &RegionDict) -> Self {
        let mut usage = Self::default();
        for color in regions.values().filter_map(|region| region.color) {
            usage.increment(color);
        }
        usage
    }

    pub fn count(&self, color: Color) -> u32 {
        self.counts.get(&color).copied().unwrap_or(0)
    }

    pub fn contains(&self, color: Color) -> bool {
        self.counts.contains_key(&color)
    }

    pub fn colors(&self) -> impl Iterator<Item = Color> + '_ {
        self.counts.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Color, u32)> + '_ {
        self.counts.iter().map(|(color, count)| (*color, *count))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Returns `true` when this created a new color key.
    pub(crate) fn increment(&mut self, color: Color) -> bool {
        let count = self.counts.entry(color).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Returns `true` when the count reached zero and the key was removed.
    pub(crate) fn decrement(&mut self, color: Color) -> bool {
        match self.counts.get_mut(&color) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.counts.remove(&color);
                true
            }
            None => {
                tracing::warn!(%color, "decrement of a color with no recorded usage");
                false
            }
        }
    }
}
