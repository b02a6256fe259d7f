pub mod legend;

use crate::core::{CoreError, PluginRegistry};

/// Plugins shipped with the crate, in registration order.
pub fn builtin_plugins() -> Result<PluginRegistry, CoreError> {
    PluginRegistry::new().with(legend::plugin())
}
