//! Error types for building the entitlements engine
//!
//! Queries and resolution passes never fail; the only fallible step is
//! wiring the engine up from configuration.

use chravel_billing::{BackendError, ConfigError};
use thiserror::Error;

/// Entitlements engine setup errors.
#[derive(Debug, Error)]
pub enum EntitlementsError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The backend client could not be built.
    #[error("Backend client error: {0}")]
    Backend(#[from] BackendError),
}

/// Result type for engine setup.
pub type EntitlementsResult<T> = Result<T, EntitlementsError>;
