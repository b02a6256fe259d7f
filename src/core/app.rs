use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::CoreConfig;
use crate::core::collaborators::{ColorPicker, HeadlessMap, MapView, SwatchPicker};
use crate::core::plugin::{HookEvent, HookKind, PluginData, PluginRegistry, RegionAssignment};
use crate::core::regions::{BaseMap, build_region_dict, make_scenario_entry};
use crate::core::{ColorUsage, CoreError, SaveData};
use crate::models::{Color, RegionDict, RegionIndex, ScenarioEntry};
use crate::pipeline::{Callback, PostCommit, Resync};

/// UI tool modes deciding how region gestures are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolModes {
    pub lasso_selecting: bool,
    pub erasing: bool,
    pub picking: bool,
    pub help_on: bool,
}

/// Owner of the editable scenario document for one session.
///
/// Every mutation commits its next state first, then runs a [`PostCommit`]
/// (map resync, optional callback, plugin hooks).
pub struct AppCore {
    default_regions: RegionDict,
    default_scenario: Vec<ScenarioEntry>,
    entries: Vec<ScenarioEntry>,
    color_usage: Vec<ColorUsage>,
    plugin_data: PluginData,
    active_entry: usize,
    modes: ToolModes,
    plugins: Arc<PluginRegistry>,
    map: Box<dyn MapView>,
    picker: Box<dyn ColorPicker>,
    /// (plugin slot, hook kind) pairs currently running. A plugin is never
    /// re-entered for a kind it is still handling; other plugins still are.
    dispatching: Vec<(usize, HookKind)>,
}

impl std::fmt::Debug for AppCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCore")
            .field("entries", &self.entries.len())
            .field("active_entry", &self.active_entry)
            .field("modes", &self.modes)
            .field("plugins", &self.plugins)
            .finish()
    }
}

pub struct AppCoreBuilder<'a> {
    base_map: &'a BaseMap,
    config: CoreConfig,
    plugins: PluginRegistry,
    map: Box<dyn MapView>,
    picker: Box<dyn ColorPicker>,
}

impl<'a> AppCoreBuilder<'a> {
    pub fn config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn plugins(mut self, plugins: PluginRegistry) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn map(mut self, map: Box<dyn MapView>) -> Self {
        self.map = map;
        self
    }

    pub fn picker(mut self, picker: Box<dyn ColorPicker>) -> Self {
        self.picker = picker;
        self
    }

    pub fn build(self) -> AppCore {
        let default_regions = build_region_dict(self.base_map);
        let mut default_scenario: Vec<ScenarioEntry> = self
            .config
            .default_entries
            .iter()
            .map(|seed| make_scenario_entry(&default_regions, &seed.date, &seed.event))
            .collect();
        if default_scenario.is_empty() {
            warn!("config defines no default entries, starting with one blank entry");
            default_scenario.push(make_scenario_entry(&default_regions, "", ""));
        }

        let plugin_data = self.plugins.init_states(&default_scenario);
        let color_usage = vec![ColorUsage::default(); default_scenario.len()];
        info!(
            regions = default_regions.len(),
            entries = default_scenario.len(),
            plugins = self.plugins.len(),
            "session created"
        );

        AppCore {
            entries: default_scenario.clone(),
            default_regions,
            default_scenario,
            color_usage,
            plugin_data,
            active_entry: 0,
            modes: ToolModes {
                lasso_selecting: false,
                erasing: false,
                picking: false,
                help_on: self.config.help_on_start,
            },
            plugins: Arc::new(self.plugins),
            map: self.map,
            picker: self.picker,
            dispatching: Vec::new(),
        }
    }
}

impl AppCore {
    pub fn builder(base_map: &BaseMap) -> AppCoreBuilder<'_> {
        AppCoreBuilder {
            base_map,
            config: CoreConfig::default(),
            plugins: PluginRegistry::new(),
            map: Box::new(HeadlessMap),
            picker: Box::new(SwatchPicker::default()),
        }
    }

    // ---- reads ----

    pub fn entries(&self) -> &[ScenarioEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&ScenarioEntry> {
        self.entries.get(index)
    }

    pub fn active_entry(&self) -> usize {
        self.active_entry
    }

    pub fn active(&self) -> &ScenarioEntry {
        &self.entries[self.active_entry]
    }

    pub fn color_usage(&self) -> &[ColorUsage] {
        &self.color_usage
    }

    pub fn plugin_data(&self) -> &PluginData {
        &self.plugin_data
    }

    pub fn plugin_data_of(&self, name: &str) -> Option<&Value> {
        self.plugin_data.get(name)
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn modes(&self) -> ToolModes {
        self.modes
    }

    pub fn default_regions(&self) -> &RegionDict {
        &self.default_regions
    }

    pub fn default_scenario(&self) -> &[ScenarioEntry] {
        &self.default_scenario
    }

    /// The color `assign_regions` would apply: `None` while erasing.
    pub fn get_color(&self) -> Option<Color> {
        if self.modes.erasing {
            None
        } else {
            Some(self.picker.color())
        }
    }

    pub fn get_region_color_by_index(&self, index: RegionIndex) -> Option<Color> {
        self.active().region_color(index)
    }

    /// Snapshot for saving. Region dictionaries are shared copy-on-write,
    /// later edits never show through.
    pub fn save(&self) -> SaveData {
        SaveData {
            scenario_data: self.entries.clone(),
            color_data: self.color_usage.clone(),
            plugin_data: self.plugin_data.clone(),
        }
    }

    // ---- timeline ----

    /// Insert an entry at `index`, seeded from the entry before it (or from
    /// the defaults at index 0), and make it active.
    pub fn add_entry(&mut self, index: usize) -> Result<(), CoreError> {
        let len = self.entries.len();
        if index > len {
            return Err(CoreError::EntryOutOfRange { index, len });
        }

        let (entry, usage) = match index.checked_sub(1) {
            Some(previous) => (
                make_scenario_entry(self.entries[previous].regions(), "", ""),
                self.color_usage[previous].clone(),
            ),
            None => (
                make_scenario_entry(&self.default_regions, "", ""),
                ColorUsage::default(),
            ),
        };
        self.entries.insert(index, entry);
        self.color_usage.insert(index, usage);
        self.active_entry = index;
        info!(index, entries = self.entries.len(), "entry added");

        PostCommit::new()
            .with_resync(Resync::AllRegions)
            .with_event(HookEvent::AddEntry(index))
            .with_event(HookEvent::UpdateActiveEntry(index))
            .run(self)
    }

    pub fn delete_entry(&mut self, index: usize) -> Result<(), CoreError> {
        let len = self.entries.len();
        if index >= len {
            return Err(CoreError::EntryOutOfRange { index, len });
        }
        if len == 1 {
            return Err(CoreError::SoleEntry);
        }

        // Re-point before removing so the active index is never past the end.
        let previous_active = self.active_entry;
        self.active_entry = if index == len - 1 {
            index - 1
        } else {
            previous_active.min(len - 2)
        };
        self.entries.remove(index);
        self.color_usage.remove(index);
        info!(index, active = self.active_entry, entries = self.entries.len(), "entry deleted");

        let mut commit = PostCommit::new()
            .with_resync(Resync::AllRegions)
            .with_event(HookEvent::DeleteEntry(index));
        if index == len - 1 || self.active_entry != previous_active {
            commit = commit.with_event(HookEvent::UpdateActiveEntry(self.active_entry));
        }
        commit.run(self)
    }

    pub fn update_event_date(&mut self, date: impl Into<String>) -> Result<(), CoreError> {
        let date = date.into();
        self.entries[self.active_entry].date = date.clone();
        debug!(entry = self.active_entry, %date, "event date updated");
        PostCommit::new()
            .with_event(HookEvent::UpdateEventDate(date))
            .run(self)
    }

    pub fn update_event(&mut self, event: impl Into<String>) -> Result<(), CoreError> {
        let event = event.into();
        self.entries[self.active_entry].event = event.clone();
        debug!(entry = self.active_entry, "event text updated");
        PostCommit::new()
            .with_event(HookEvent::UpdateEvent(event))
            .run(self)
    }

    /// Blank the active entry's date and event; its coloring is kept.
    pub fn clear_entry(&mut self) {
        let entry = &mut self.entries[self.active_entry];
        entry.date.clear();
        entry.event.clear();
        debug!(entry = self.active_entry, "entry cleared");
    }

    pub fn update_active_entry(&mut self, new_index: usize) -> Result<(), CoreError> {
        self.update_active_entry_with(new_index, None)
    }

    /// Like [`AppCore::update_active_entry`], running `callback` after the
    /// map has been repainted and before plugins are notified.
    pub fn update_active_entry_then<'a>(
        &mut self,
        new_index: usize,
        callback: impl FnOnce(&mut AppCore) + 'a,
    ) -> Result<(), CoreError> {
        self.update_active_entry_with(new_index, Some(Box::new(callback)))
    }

    fn update_active_entry_with(
        &mut self,
        new_index: usize,
        callback: Option<Callback<'_>>,
    ) -> Result<(), CoreError> {
        let len = self.entries.len();
        if new_index >= len {
            return Err(CoreError::EntryOutOfRange { index: new_index, len });
        }
        self.active_entry = new_index;
        debug!(active = new_index, "active entry changed");

        PostCommit::new()
            .with_resync(Resync::AllRegions)
            .with_callback(callback)
            .with_event(HookEvent::UpdateActiveEntry(new_index))
            .run(self)
    }

    // ---- coloring ----

    /// Paint `indices` of the active entry with [`AppCore::get_color`].
    pub fn assign_regions(&mut self, indices: &[RegionIndex]) -> Result<(), CoreError> {
        self.assign_regions_with(indices, None)
    }

    /// Like [`AppCore::assign_regions`], running `callback` after the changed
    /// regions have been repainted and before plugins are notified.
    pub fn assign_regions_then<'a>(
        &mut self,
        indices: &[RegionIndex],
        callback: impl FnOnce(&mut AppCore) + 'a,
    ) -> Result<(), CoreError> {
        self.assign_regions_with(indices, Some(Box::new(callback)))
    }

    fn assign_regions_with(
        &mut self,
        indices: &[RegionIndex],
        callback: Option<Callback<'_>>,
    ) -> Result<(), CoreError> {
        let color = self.get_color();
        let active = self.active_entry;

        if let Some(&index) = indices
            .iter()
            .find(|index| !self.entries[active].regions().contains_key(*index))
        {
            return Err(CoreError::UnknownRegion { index });
        }

        let regions = self.entries[active].regions_mut();
        let usage = &mut self.color_usage[active];
        let mut changed = Vec::new();
        let mut removed_colors = Vec::new();
        let mut added_color = false;

        for &index in indices {
            let Some(region) = regions.get_mut(&index) else {
                continue;
            };
            let previous = region.color;
            if previous == color {
                continue;
            }
            region.color = color;
            changed.push(index);

            if let Some(previous) = previous {
                if usage.decrement(previous) {
                    removed_colors.push(previous);
                }
            }
            if let Some(color) = color {
                if usage.increment(color) {
                    added_color = true;
                }
            }
        }
        debug!(
            entry = active,
            color = ?color,
            requested = indices.len(),
            changed = changed.len(),
            "regions assigned"
        );

        PostCommit::new()
            .with_resync(Resync::Regions(changed))
            .with_callback(callback)
            .with_event(HookEvent::AssignRegions(RegionAssignment {
                indices: indices.to_vec(),
                color,
                removed_colors,
                added_color,
            }))
            .run(self)
    }

    /// Copy a region's color into the picker and leave picking mode.
    pub fn sample_region_color(&mut self, index: RegionIndex) -> Option<Color> {
        let color = self.get_region_color_by_index(index);
        if let Some(color) = color {
            self.set_color_bar_color(color);
        }
        self.update_picking(false);
        color
    }

    pub fn set_color_bar_color(&mut self, color: Color) {
        self.picker.set_color(color);
    }

    // ---- tool modes ----

    pub fn update_lasso_selecting(&mut self, state: bool) {
        self.modes.lasso_selecting = state;
    }

    pub fn update_lasso_selecting_then<'a>(
        &mut self,
        state: bool,
        callback: impl FnOnce(&mut AppCore) + 'a,
    ) -> Result<(), CoreError> {
        self.modes.lasso_selecting = state;
        PostCommit::new()
            .with_callback(Some(Box::new(callback)))
            .run(self)
    }

    pub fn update_erasing(&mut self, state: bool) {
        self.modes.erasing = state;
    }

    pub fn update_picking(&mut self, state: bool) {
        self.modes.picking = state;
    }

    pub fn open_help(&mut self) {
        self.modes.help_on = true;
    }

    pub fn close_help(&mut self) {
        self.modes.help_on = false;
    }

    // ---- map gestures ----

    pub fn process_region_hovered_on(&mut self, index: RegionIndex) -> Result<(), CoreError> {
        PostCommit::new()
            .with_event(HookEvent::RegionHoveredOn(index))
            .run(self)
    }

    pub fn process_region_hovered_out(&mut self, index: RegionIndex) -> Result<(), CoreError> {
        PostCommit::new()
            .with_event(HookEvent::RegionHoveredOut(index))
            .run(self)
    }

    // ---- plugins and documents ----

    /// Replace one plugin's state slot wholesale.
    pub fn update_plugin_data(&mut self, key: &str, data: Value) -> Result<(), CoreError> {
        if !self.plugins.contains(key) {
            return Err(CoreError::UnknownPlugin {
                name: key.to_string(),
            });
        }
        self.plugin_data.insert(key.to_string(), data);
        Ok(())
    }

    /// Replace the whole document. On a validation error nothing changes.
    pub fn load_save(&mut self, save: SaveData) -> Result<(), CoreError> {
        save.validate(&self.default_regions)?;
        let save = self.reconcile_plugin_slots(save);

        self.entries = save.scenario_data.clone();
        self.color_usage = save.color_data.clone();
        self.plugin_data = save.plugin_data.clone();
        self.active_entry = 0;
        info!(entries = self.entries.len(), "document loaded");

        PostCommit::new()
            .with_resync(Resync::AllRegions)
            .with_event(HookEvent::LoadSave(save))
            .with_event(HookEvent::UpdateActiveEntry(0))
            .run(self)
    }

    /// Give every registered plugin a slot. Slots of plugins that are not
    /// registered are kept as they are, so saving again round-trips them.
    fn reconcile_plugin_slots(&self, mut save: SaveData) -> SaveData {
        for name in save.plugin_data.keys().filter(|name| !self.plugins.contains(name)) {
            debug!(plugin = %name, "keeping state of unregistered plugin");
        }
        for plugin in self.plugins.iter() {
            if !save.plugin_data.contains_key(plugin.name()) {
                info!(plugin = plugin.name(), "initialising plugin state missing from save");
                let state = plugin.init_state(&save.scenario_data);
                save.plugin_data.insert(plugin.name().to_string(), state);
            }
        }
        save
    }

    // ---- post-commit plumbing ----

    pub(crate) fn resync_all_regions(&mut self) {
        self.map
            .reset_all_region_style(self.entries[self.active_entry].regions());
    }

    pub(crate) fn resync_regions(&mut self, indices: &[RegionIndex]) {
        self.map
            .reset_specified_region_style(self.entries[self.active_entry].regions(), indices);
    }

    /// Run `event` through every plugin in registration order, skipping any
    /// plugin whose hook of the same kind is further up the call stack.
    pub(crate) fn fan_out(&mut self, event: &HookEvent) -> Result<(), CoreError> {
        let kind = event.kind();
        let plugins = Arc::clone(&self.plugins);
        let mut first_failure = None;
        for (slot, plugin) in plugins.iter().enumerate() {
            if !plugin.hooks().implements(kind) {
                continue;
            }
            if self.dispatching.contains(&(slot, kind)) {
                debug!(plugin = plugin.name(), hook = %kind, "skipping re-entrant hook");
                continue;
            }

            self.dispatching.push((slot, kind));
            let result = plugin.hooks().dispatch(self, event);
            self.dispatching.pop();
            if let Err(source) = result {
                warn!(plugin = plugin.name(), hook = %kind, error = %source, "plugin hook failed");
                first_failure.get_or_insert(CoreError::Hook {
                    plugin: plugin.name().to_string(),
                    hook: kind,
                    source,
                });
            }
        }

        first_failure.map_or(Ok(()), Err)
    }
}
