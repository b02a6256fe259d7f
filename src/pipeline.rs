use crate::core::{AppCore, CoreError};
use crate::core::plugin::HookEvent;
use crate::models::RegionIndex;

/// Caller-supplied continuation run after the map resync.
pub type Callback<'a> = Box<dyn FnOnce(&mut AppCore) + 'a>;

/// Which part of the map has to be repainted after a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resync {
    Nothing,
    AllRegions,
    Regions(Vec<RegionIndex>),
}

/// One side-effect stage of a committed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resync,
    Callback,
    Hooks,
}

/// Side effects of one committed mutation.
///
/// Stages always run in the order resync, callback, hooks. A stage with
/// nothing to do is skipped.
pub struct PostCommit<'a> {
    resync: Resync,
    callback: Option<Callback<'a>>,
    events: Vec<HookEvent>,
}

impl<'a> PostCommit<'a> {
    pub fn new() -> Self {
        Self {
            resync: Resync::Nothing,
            callback: None,
            events: Vec::new(),
        }
    }

    pub fn with_resync(mut self, resync: Resync) -> Self {
        self.resync = resync;
        self
    }

    pub fn with_callback(mut self, callback: Option<Callback<'a>>) -> Self {
        self.callback = callback;
        self
    }

    /// Queue a hook event; events fan out in the order they were queued.
    pub fn with_event(mut self, event: HookEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn resync(&self) -> &Resync {
        &self.resync
    }

    pub fn events(&self) -> &[HookEvent] {
        &self.events
    }

    /// The stages `run` will execute, in execution order.
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = Vec::new();
        let repaint = match &self.resync {
            Resync::Nothing => false,
            Resync::AllRegions => true,
            Resync::Regions(indices) => !indices.is_empty(),
        };
        if repaint {
            stages.push(Stage::Resync);
        }
        if self.callback.is_some() {
            stages.push(Stage::Callback);
        }
        if !self.events.is_empty() {
            stages.push(Stage::Hooks);
        }
        stages
    }

    /// Run every stage. Hook failures do not stop later events; the first
    /// one is returned once all events have fanned out.
    pub(crate) fn run(self, core: &mut AppCore) -> Result<(), CoreError> {
        match &self.resync {
            Resync::Nothing => {}
            Resync::AllRegions => core.resync_all_regions(),
            Resync::Regions(indices) if indices.is_empty() => {}
            Resync::Regions(indices) => core.resync_regions(indices),
        }

        if let Some(callback) = self.callback {
            callback(core);
        }

        let mut first_failure = None;
        for event in &self.events {
            if let Err(e) = core.fan_out(event) {
                first_failure.get_or_insert(e);
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}

impl Default for PostCommit<'_> {
    fn default() -> Self {
        Self::new()
    }
}
