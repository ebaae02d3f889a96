//! # Web Application State

use crate::health::HealthProbe;

/// Shared state for the HTTP handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub probe: HealthProbe,
}

impl AppState {
    pub fn new(probe: HealthProbe) -> Self {
        Self { probe }
    }
}
