//! Legend: a user-editable label for every color in use in the document.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::{AppCore, ColorUsage, Plugin, RegionAssignment};
use crate::models::{Color, ScenarioEntry};

pub const LEGEND_PLUGIN: &str = "legend";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Legend {
    pub labels: BTreeMap<Color, String>,
}

impl Legend {
    fn from_colors(colors: impl IntoIterator<Item = Color>) -> Self {
        Self {
            labels: colors.into_iter().map(|color| (color, String::new())).collect(),
        }
    }

    /// The plugin state slot, laid out as the serde form of `Legend`.
    fn to_state(&self) -> Value {
        let labels: Map<String, Value> = self
            .labels
            .iter()
            .map(|(color, label)| (color.to_string(), Value::String(label.clone())))
            .collect();
        let mut state = Map::new();
        state.insert("labels".to_string(), Value::Object(labels));
        Value::Object(state)
    }

    /// Drop labels of colors that vanished; add empty labels for new ones.
    fn reconcile(&mut self, in_use: &BTreeSet<Color>) {
        self.labels.retain(|color, _| in_use.contains(color));
        for color in in_use {
            self.labels.entry(*color).or_default();
        }
    }
}

pub fn plugin() -> Plugin {
    Plugin::new(LEGEND_PLUGIN, |scenario| {
        Legend::from_colors(scenario_colors(scenario)).to_state()
    })
    .on_assign_regions(on_assign_regions)
    .on_delete_entry(|core, _index| reconcile(core))
    .on_load_save(|core, _save| reconcile(core))
}

/// Current legend held by the core.
pub fn legend(core: &AppCore) -> anyhow::Result<Legend> {
    match core.plugin_data_of(LEGEND_PLUGIN) {
        Some(value) => serde_json::from_value(value.clone()).context("Corrupt legend plugin state"),
        None => Ok(Legend::default()),
    }
}

/// Name a color. Only colors painted somewhere in the document have labels.
pub fn set_label(core: &mut AppCore, color: Color, label: impl Into<String>) -> anyhow::Result<()> {
    let mut current = legend(core)?;
    let Some(slot) = current.labels.get_mut(&color) else {
        anyhow::bail!("Color {} is not used by any entry", color);
    };
    *slot = label.into();
    store(core, &current)
}

fn on_assign_regions(core: &mut AppCore, assignment: &RegionAssignment) -> anyhow::Result<()> {
    if !assignment.added_color && assignment.removed_colors.is_empty() {
        return Ok(());
    }
    let mut current = legend(core)?;
    if let (true, Some(color)) = (assignment.added_color, assignment.color) {
        current.labels.entry(color).or_default();
    }
    for color in &assignment.removed_colors {
        let still_used = core.color_usage().iter().any(|usage| usage.contains(*color));
        if !still_used {
            current.labels.remove(color);
        }
    }
    store(core, &current)
}

fn reconcile(core: &mut AppCore) -> anyhow::Result<()> {
    let in_use = usage_colors(core.color_usage());
    let mut current = legend(core)?;
    current.reconcile(&in_use);
    store(core, &current)
}

fn store(core: &mut AppCore, legend: &Legend) -> anyhow::Result<()> {
    core.update_plugin_data(LEGEND_PLUGIN, legend.to_state())?;
    Ok(())
}

fn scenario_colors(scenario: &[ScenarioEntry]) -> BTreeSet<Color> {
    scenario
        .iter()
        .flat_map(|entry| entry.regions().values())
        .filter_map(|region| region.color)
        .collect()
}

fn usage_colors(usage: &[ColorUsage]) -> BTreeSet<Color> {
    usage.iter().flat_map(|u| u.colors()).collect()
}
