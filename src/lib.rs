pub mod config;
pub mod core;
pub mod models;
pub mod pipeline;
pub mod plugins;

pub use config::{CoreConfig, EntrySeed};
pub use core::{AppCore, BaseMap, ColorUsage, CoreError, SaveData};
pub use models::{Color, Region, RegionDict, RegionIndex, ScenarioEntry};
pub use pipeline::{PostCommit, Resync, Stage};
