/// Bot command definitions
pub mod commands;
/// Update dispatch and command/callback handlers
pub mod handlers;

use std::sync::Arc;

use crate::platform::hub::MarkerHub;
use crate::train::{Registry, TrainDeps};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppContext {
    pub registry: Arc<Registry>,
    pub deps: TrainDeps,
    pub hub: Arc<MarkerHub>,
}
