mod app;
pub mod archive;
mod collaborators;
mod document;
mod error;
pub mod plugin;
mod regions;
mod usage;

pub use app::{AppCore, AppCoreBuilder, ToolModes};
pub use archive::{DocumentMeta, LoadedDocument, load_document, save_document};
pub use collaborators::{ColorPicker, HeadlessMap, MapView, SwatchPicker};
pub use document::SaveData;
pub use error::CoreError;
pub use plugin::{
    Hook, HookEvent, HookKind, Hooks, Plugin, PluginData, PluginRegistry, RegionAssignment,
};
pub use regions::{BaseMap, build_region_dict, make_scenario_entry};
pub use usage::ColorUsage;
