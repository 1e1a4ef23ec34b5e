//! # Configuration
//!
//! Controller settings loaded from environment variables at startup.

mod controller;

pub use controller::ControllerConfig;

use std::sync::Arc;

/// Configuration shared between the watch loops, the error policy and the server
pub type SharedControllerConfig = Arc<ControllerConfig>;

/// Load configuration from the environment and wrap it for sharing
#[must_use]
pub fn create_shared_config() -> SharedControllerConfig {
    Arc::new(ControllerConfig::from_env())
}
