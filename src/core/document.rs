use serde::{Deserialize, Serialize};

use crate::core::{ColorUsage, CoreError, PluginData};
use crate::models::{RegionDict, ScenarioEntry};

/// Whole-document snapshot exchanged with save files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveData {
    pub scenario_data: Vec<ScenarioEntry>,
    pub color_data: Vec<ColorUsage>,
    #[serde(default)]
    pub plugin_data: PluginData,
}

impl SaveData {
    /// Structural checks against the base map's default region dictionary.
    pub fn validate(&self, default_regions: &RegionDict) -> Result<(), CoreError> {
        if self.scenario_data.is_empty() {
            return Err(CoreError::InvalidSave("document has no scenario entries".into()));
        }
        if self.color_data.len() != self.scenario_data.len() {
            return Err(CoreError::InvalidSave(format!(
                "{} color usage records for {} scenario entries",
                self.color_data.len(),
                self.scenario_data.len()
            )));
        }
        for (i, (entry, usage)) in self.scenario_data.iter().zip(&self.color_data).enumerate() {
            if !entry.regions().keys().eq(default_regions.keys()) {
                return Err(CoreError::InvalidSave(format!(
                    "entry {} has {} regions that do not match the {} regions of the base map",
                    i,
                    entry.regions().len(),
                    default_regions.len()
                )));
            }
            if *usage != ColorUsage::from_regions(entry.regions()) {
                return Err(CoreError::InvalidSave(format!(
                    "color usage of entry {} does not match its region colors",
                    i
                )));
            }
        }
        Ok(())
    }
}
