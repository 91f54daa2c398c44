//! Billing configuration.
//!
//! Provides configuration for the hosted backend endpoint, the native
//! billing switch, and HTTP timeout/retry settings. Configuration is loaded
//! from environment variables with defaults suited to a local backend.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::native::Runtime;
use crate::retry::RetryConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Billing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Hosted backend configuration.
    pub backend: BackendEndpoint,

    /// Runtime the app is running on.
    pub runtime: Runtime,

    /// Whether native in-app purchases are reconciled on native runtimes.
    pub native_billing_enabled: bool,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum attempts for a backend call, including the first.
    pub max_retries: u32,
}

impl Default for BillingConfig {
    /// Returns default configuration suitable for a local backend.
    fn default() -> Self {
        Self {
            backend: BackendEndpoint {
                base_url: "http://localhost:54321".to_string(),
                api_key: None,
            },
            runtime: Runtime::Web,
            native_billing_enabled: false,
            timeout_secs: 15,
            max_retries: 3,
        }
    }
}

impl BillingConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CHRAVEL_BACKEND_URL`: Backend base URL (default: http://localhost:54321)
    /// - `CHRAVEL_BACKEND_KEY`: Backend API key
    /// - `CHRAVEL_RUNTIME`: `web`, `ios` or `android` (default: web)
    /// - `CHRAVEL_NATIVE_BILLING_ENABLED`: Reconcile native purchases (default: false)
    /// - `CHRAVEL_REQUEST_TIMEOUT_SECS`: Request timeout in seconds (default: 15)
    /// - `CHRAVEL_MAX_RETRIES`: Maximum attempts per backend call (default: 3)
    ///
    /// Unparseable values fall back to the defaults; `CHRAVEL_RUNTIME` is
    /// the exception because guessing the runtime would hide a broken build.
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();

        let runtime = match std::env::var("CHRAVEL_RUNTIME") {
            Ok(value) => Runtime::parse(&value).ok_or_else(|| ConfigError::InvalidValue {
                key: "CHRAVEL_RUNTIME".to_string(),
                message: format!("unknown runtime '{}'", value),
            })?,
            Err(_) => default.runtime,
        };

        Ok(Self {
            backend: BackendEndpoint {
                base_url: std::env::var("CHRAVEL_BACKEND_URL").unwrap_or(default.backend.base_url),
                api_key: std::env::var("CHRAVEL_BACKEND_KEY").ok(),
            },
            runtime,
            native_billing_enabled: std::env::var("CHRAVEL_NATIVE_BILLING_ENABLED")
                .map(|s| s != "false" && s != "0")
                .unwrap_or(default.native_billing_enabled),
            timeout_secs: std::env::var("CHRAVEL_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.timeout_secs),
            max_retries: std::env::var("CHRAVEL_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_retries),
        })
    }

    /// Get the request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Retry policy for backend calls.
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_retries.max(1),
            ..RetryConfig::standard()
        }
    }

    /// Whether native purchases should be reconciled in this process.
    pub fn reconciles_native(&self) -> bool {
        self.native_billing_enabled && self.runtime.is_native()
    }

    /// Validate that required configuration is present for production.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if self.backend.api_key.is_none() {
            return Err(ConfigError::MissingEnvVar("CHRAVEL_BACKEND_KEY".to_string()));
        }
        if self.backend.base_url.contains("localhost") || self.backend.base_url.contains("127.0.0.1") {
            return Err(ConfigError::InvalidValue {
                key: "CHRAVEL_BACKEND_URL".to_string(),
                message: "points at a local backend".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration for the hosted backend endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendEndpoint {
    /// Base URL for the backend (e.g., "https://xyz.supabase.co").
    pub base_url: String,

    /// API key sent with every request.
    pub api_key: Option<String>,
}

impl BackendEndpoint {
    /// Build a full URL by appending a path to the base URL.
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Check if API key authentication is available.
    pub fn has_auth(&self) -> bool {
        self.api_key.is_some()
    }
}
