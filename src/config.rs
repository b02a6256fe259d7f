use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Date and event text of one entry of a fresh document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySeed {
    pub date: String,
    pub event: String,
}

impl EntrySeed {
    pub fn new(date: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            event: event.into(),
        }
    }
}

/// Settings for constructing a new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreConfig {
    /// Timeline of a fresh document. Must not be empty.
    pub default_entries: Vec<EntrySeed>,
    pub help_on_start: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            default_entries: vec![
                EntrySeed::new("2000 January 1", "An Event"),
                EntrySeed::new("2010 January 1", "Another Event"),
            ],
            help_on_start: true,
        }
    }
}

impl CoreConfig {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: CoreConfig = serde_json::from_str(json).context("Failed to parse config")?;
        if config.default_entries.is_empty() {
            anyhow::bail!("Config must define at least one default entry");
        }
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        Self::from_json(&json).with_context(|| format!("Invalid config {:?}", path))
    }
}
