use std::{collections::BTreeMap, fmt, sync::Arc};

use serde_json::Value;

use crate::core::{AppCore, CoreError, SaveData};
use crate::models::{Color, RegionIndex, ScenarioEntry};

/// Plugin-owned state, one slot per registered plugin name.
pub type PluginData = BTreeMap<String, Value>;

/// A hook receives the core itself plus the operation's arguments.
pub type Hook<A> = Arc<dyn Fn(&mut AppCore, &A) -> anyhow::Result<()>>;

type InitState = Arc<dyn Fn(&[ScenarioEntry]) -> Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    AddEntry,
    DeleteEntry,
    UpdateEventDate,
    UpdateEvent,
    UpdateActiveEntry,
    AssignRegions,
    LoadSave,
    RegionHoveredOn,
    RegionHoveredOut,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookKind::AddEntry => "onAddEntry",
            HookKind::DeleteEntry => "onDeleteEntry",
            HookKind::UpdateEventDate => "onUpdateEventDate",
            HookKind::UpdateEvent => "onUpdateEvent",
            HookKind::UpdateActiveEntry => "onUpdateActiveEntry",
            HookKind::AssignRegions => "onAssignRegions",
            HookKind::LoadSave => "onLoadSave",
            HookKind::RegionHoveredOn => "onProcessRegionHoveredOn",
            HookKind::RegionHoveredOut => "onProcessRegionHoveredOut",
        };
        f.write_str(name)
    }
}

/// Arguments reported to `onAssignRegions`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAssignment {
    /// Every index passed in, changed or not.
    pub indices: Vec<RegionIndex>,
    /// `None` when erasing.
    pub color: Option<Color>,
    /// Colors whose count in the active entry dropped to zero.
    pub removed_colors: Vec<Color>,
    /// Whether `color` was not present in the active entry before.
    pub added_color: bool,
}

/// A committed mutation, as seen by plugins.
#[derive(Debug, Clone)]
pub enum HookEvent {
    AddEntry(usize),
    DeleteEntry(usize),
    UpdateEventDate(String),
    UpdateEvent(String),
    UpdateActiveEntry(usize),
    AssignRegions(RegionAssignment),
    LoadSave(SaveData),
    RegionHoveredOn(RegionIndex),
    RegionHoveredOut(RegionIndex),
}

impl HookEvent {
    pub fn kind(&self) -> HookKind {
        match self {
            HookEvent::AddEntry(_) => HookKind::AddEntry,
            HookEvent::DeleteEntry(_) => HookKind::DeleteEntry,
            HookEvent::UpdateEventDate(_) => HookKind::UpdateEventDate,
            HookEvent::UpdateEvent(_) => HookKind::UpdateEvent,
            HookEvent::UpdateActiveEntry(_) => HookKind::UpdateActiveEntry,
            HookEvent::AssignRegions(_) => HookKind::AssignRegions,
            HookEvent::LoadSave(_) => HookKind::LoadSave,
            HookEvent::RegionHoveredOn(_) => HookKind::RegionHoveredOn,
            HookEvent::RegionHoveredOut(_) => HookKind::RegionHoveredOut,
        }
    }
}

/// Optional hooks of one plugin; a missing hook is a no-op.
#[derive(Clone, Default)]
pub struct Hooks {
    pub on_add_entry: Option<Hook<usize>>,
    pub on_delete_entry: Option<Hook<usize>>,
    pub on_update_event_date: Option<Hook<str>>,
    pub on_update_event: Option<Hook<str>>,
    pub on_update_active_entry: Option<Hook<usize>>,
    pub on_assign_regions: Option<Hook<RegionAssignment>>,
    pub on_load_save: Option<Hook<SaveData>>,
    pub on_region_hovered_on: Option<Hook<RegionIndex>>,
    pub on_region_hovered_out: Option<Hook<RegionIndex>>,
}

fn call<A: ?Sized>(hook: &Option<Hook<A>>, core: &mut AppCore, arg: &A) -> anyhow::Result<()> {
    match hook {
        Some(hook) => hook(core, arg),
        None => Ok(()),
    }
}

impl Hooks {
    pub fn implements(&self, kind: HookKind) -> bool {
        match kind {
            HookKind::AddEntry => self.on_add_entry.is_some(),
            HookKind::DeleteEntry => self.on_delete_entry.is_some(),
            HookKind::UpdateEventDate => self.on_update_event_date.is_some(),
            HookKind::UpdateEvent => self.on_update_event.is_some(),
            HookKind::UpdateActiveEntry => self.on_update_active_entry.is_some(),
            HookKind::AssignRegions => self.on_assign_regions.is_some(),
            HookKind::LoadSave => self.on_load_save.is_some(),
            HookKind::RegionHoveredOn => self.on_region_hovered_on.is_some(),
            HookKind::RegionHoveredOut => self.on_region_hovered_out.is_some(),
        }
    }

    pub(crate) fn dispatch(&self, core: &mut AppCore, event: &HookEvent) -> anyhow::Result<()> {
        match event {
            HookEvent::AddEntry(index) => call(&self.on_add_entry, core, index),
            HookEvent::DeleteEntry(index) => call(&self.on_delete_entry, core, index),
            HookEvent::UpdateEventDate(date) => call(&self.on_update_event_date, core, date.as_str()),
            HookEvent::UpdateEvent(event) => call(&self.on_update_event, core, event.as_str()),
            HookEvent::UpdateActiveEntry(index) => call(&self.on_update_active_entry, core, index),
            HookEvent::AssignRegions(assignment) => call(&self.on_assign_regions, core, assignment),
            HookEvent::LoadSave(save) => call(&self.on_load_save, core, save),
            HookEvent::RegionHoveredOn(index) => call(&self.on_region_hovered_on, core, index),
            HookEvent::RegionHoveredOut(index) => call(&self.on_region_hovered_out, core, index),
        }
    }
}

/// A named extension: an initializer for its state slot plus optional hooks.
#[derive(Clone)]
pub struct Plugin {
    name: String,
    init_state: InitState,
    hooks: Hooks,
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin").field("name", &self.name).finish()
    }
}

impl Plugin {
    pub fn new(
        name: impl Into<String>,
        init_state: impl Fn(&[ScenarioEntry]) -> Value + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            init_state: Arc::new(init_state),
            hooks: Hooks::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub fn init_state(&self, scenario: &[ScenarioEntry]) -> Value {
        (self.init_state)(scenario)
    }

    pub fn on_add_entry(
        mut self,
        hook: impl Fn(&mut AppCore, &usize) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.hooks.on_add_entry = Some(Arc::new(hook));
        self
    }

    pub fn on_delete_entry(
        mut self,
        hook: impl Fn(&mut AppCore, &usize) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.hooks.on_delete_entry = Some(Arc::new(hook));
        self
    }

    pub fn on_update_event_date(
        mut self,
        hook: impl Fn(&mut AppCore, &str) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.hooks.on_update_event_date = Some(Arc::new(hook));
        self
    }

    pub fn on_update_event(
        mut self,
        hook: impl Fn(&mut AppCore, &str) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.hooks.on_update_event = Some(Arc::new(hook));
        self
    }

    pub fn on_update_active_entry(
        mut self,
        hook: impl Fn(&mut AppCore, &usize) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.hooks.on_update_active_entry = Some(Arc::new(hook));
        self
    }

    pub fn on_assign_regions(
        mut self,
        hook: impl Fn(&mut AppCore, &RegionAssignment) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.hooks.on_assign_regions = Some(Arc::new(hook));
        self
    }

    pub fn on_load_save(
        mut self,
        hook: impl Fn(&mut AppCore, &SaveData) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.hooks.on_load_save = Some(Arc::new(hook));
        self
    }

    pub fn on_region_hovered_on(
        mut self,
        hook: impl Fn(&mut AppCore, &RegionIndex) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.hooks.on_region_hovered_on = Some(Arc::new(hook));
        self
    }

    pub fn on_region_hovered_out(
        mut self,
        hook: impl Fn(&mut AppCore, &RegionIndex) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.hooks.on_region_hovered_out = Some(Arc::new(hook));
        self
    }
}

/// Plugins in registration order. Hooks fan out in this order.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Plugin) -> Result<(), CoreError> {
        if self.contains(plugin.name()) {
            return Err(CoreError::DuplicatePlugin {
                name: plugin.name().to_string(),
            });
        }
        self.plugins.push(plugin);
        Ok(())
    }

    /// Builder form of [`PluginRegistry::register`].
    pub fn with(mut self, plugin: Plugin) -> Result<Self, CoreError> {
        self.register(plugin)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|plugin| plugin.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn init_states(&self, scenario: &[ScenarioEntry]) -> PluginData {
        self.plugins
            .iter()
            .map(|plugin| (plugin.name().to_string(), plugin.init_state(scenario)))
            .collect()
    }
}
