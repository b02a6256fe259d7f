use thiserror::Error;

use crate::core::plugin::HookKind;
use crate::models::RegionIndex;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("entry index {index} is out of range for {len} entries")]
    EntryOutOfRange { index: usize, len: usize },
    #[error("cannot delete the only remaining entry")]
    SoleEntry,
    #[error("region {index} does not exist in the base map")]
    UnknownRegion { index: RegionIndex },
    #[error("no plugin named {name:?} is registered")]
    UnknownPlugin { name: String },
    #[error("a plugin named {name:?} is already registered")]
    DuplicatePlugin { name: String },
    #[error("invalid save data: {0}")]
    InvalidSave(String),
    #[error("plugin {plugin:?} failed in {hook}: {source}")]
    Hook {
        plugin: String,
        hook: HookKind,
        #[source]
        source: anyhow::Error,
    },
}
