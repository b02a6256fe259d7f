use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

/// Index of a region, assigned once from base-map feature order.
pub type RegionIndex = usize;

/// Per-entry region attributes keyed by region index.
pub type RegionDict = BTreeMap<RegionIndex, Region>;

/// RGB color, read and written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('#')
            .ok_or_else(|| anyhow::anyhow!("Color {:?} must start with '#'", s))?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            anyhow::bail!("Color {:?} contains non-hex digits", s);
        }
        let channel = |hex: &str| u8::from_str_radix(hex, 16);
        match digits.len() {
            6 => Ok(Color {
                r: channel(&digits[0..2])?,
                g: channel(&digits[2..4])?,
                b: channel(&digits[4..6])?,
            }),
            // #rgb shorthand: each digit is doubled
            3 => {
                let expand = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
                Ok(Color {
                    r: expand(0)?,
                    g: expand(1)?,
                    b: expand(2)?,
                })
            }
            _ => Err(anyhow::anyhow!("Color {:?} must have 3 or 6 hex digits", s)),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Mutable attributes of one region within one scenario entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub color: Option<Color>,
}

/// One timeline point: a date, an event description and a full region coloring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioEntry {
    pub date: String,
    pub event: String,
    region_dict: Arc<RegionDict>,
}

impl ScenarioEntry {
    pub(crate) fn from_parts(date: String, event: String, region_dict: RegionDict) -> Self {
        Self {
            date,
            event,
            region_dict: Arc::new(region_dict),
        }
    }

    pub fn regions(&self) -> &RegionDict {
        &self.region_dict
    }

    /// Copy-on-write access: clones the dictionary only if a snapshot still holds it.
    pub(crate) fn regions_mut(&mut self) -> &mut RegionDict {
        Arc::make_mut(&mut self.region_dict)
    }

    pub fn region_color(&self, index: RegionIndex) -> Option<Color> {
        self.region_dict.get(&index).and_then(|region| region.color)
    }

    /// Whether both entries point at the very same dictionary allocation.
    pub fn shares_regions_with(&self, other: &ScenarioEntry) -> bool {
        Arc::ptr_eq(&self.region_dict, &other.region_dict)
    }
}
