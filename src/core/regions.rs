use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::models::{Region, RegionDict, RegionIndex, ScenarioEntry};

/// Static base-map geometry: a GeoJSON `FeatureCollection`.
///
/// Feature order defines region indices for the lifetime of the session.
#[derive(Debug, Clone, Deserialize)]
pub struct BaseMap {
    features: Vec<BaseMapFeature>,
}

#[derive(Debug, Clone, Deserialize)]
struct BaseMapFeature {
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
}

impl BaseMap {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse base map GeoJSON")
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read base map {:?}", path))?;
        Self::from_json(&json).with_context(|| format!("Invalid base map {:?}", path))
    }

    pub fn region_count(&self) -> usize {
        self.features.len()
    }

    /// Display name of a region, taken from the `name` (or `NAME`) property.
    pub fn region_name(&self, index: RegionIndex) -> Option<&str> {
        let properties = &self.features.get(index)?.properties;
        properties
            .get("name")
            .or_else(|| properties.get("NAME"))
            .and_then(|value| value.as_str())
    }
}

/// Derive an uncolored region dictionary from base-map feature order.
pub fn build_region_dict(base_map: &BaseMap) -> RegionDict {
    (0..base_map.region_count())
        .map(|index| (index, Region::default()))
        .collect()
}

/// Build a timeline entry from a deep copy of `source`.
pub fn make_scenario_entry(
    source: &RegionDict,
    date: impl Into<String>,
    event: impl Into<String>,
) -> ScenarioEntry {
    ScenarioEntry::from_parts(date.into(), event.into(), source.clone())
}
