use crate::config::schema::{ActionConfig, AppConfig};
use std::sync::Arc;

/// Events flowing through the broadcast channel connecting all subsystems.
#[derive(Debug, Clone)]
pub enum ModuleEvent {
    /// The control surface asked for an action.
    Action(ActionConfig),

    /// The control surface asked to print part of the current state.
    Show(Listing),

    /// Configuration was reloaded from disk.
    ConfigReloaded(Arc<AppConfig>),

    /// Shutdown the daemon.
    Shutdown,
}

/// What a `Show` event prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Macros,
    Events,
    Variables,
    Status,
}
