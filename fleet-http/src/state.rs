//! Shared application state threaded through every handler (spec.md §4.8).

use std::sync::Arc;

use fleet_controller::FleetController;
use fleet_core::config::FleetConfig;
use parking_lot::RwLock;

/// Cloned into every handler; cheap because the controller and config are
/// behind `Arc`/`RwLock` (SPEC_FULL §4.9 "process-wide registries").
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<FleetController>,
    pub config: Arc<RwLock<FleetConfig>>,
    pub config_path: Arc<str>,
}

impl AppState {
    pub fn new(controller: Arc<FleetController>, config: FleetConfig, config_path: impl Into<Arc<str>>) -> Self {
        Self { controller, config: Arc::new(RwLock::new(config)), config_path: config_path.into() }
    }
}
