#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from mapchron for tests
pub use mapchron::core::{
    CoreError, HookKind, Plugin, PluginRegistry, RegionAssignment, SaveData, load_document,
    save_document,
};
pub use mapchron::{AppCore, Color, ColorUsage, RegionDict, RegionIndex, ScenarioEntry};
