//! Error types for billing-provider calls
//!
//! Every call into a billing provider returns one of these errors instead of
//! panicking, so the entitlements engine can choose to keep its last known
//! state when a provider is unavailable.

use thiserror::Error;

/// Backend entitlement endpoint errors.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Response body did not match the canonical record shape.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Record names a plan this build does not know.
    #[error("Unknown plan in entitlement record: {0}")]
    UnknownPlan(String),

    /// Authentication failed.
    #[error("Authentication failed")]
    AuthenticationFailed,
}

/// Result type for backend calls.
pub type BackendResult<T> = Result<T, BackendError>;

impl BackendError {
    /// Check if a retry might succeed.
    ///
    /// Transport failures, rate limiting and server errors are transient;
    /// everything else will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::RequestFailed(_) => true,
            BackendError::ApiError { status, .. } => *status == 429 || *status >= 500,
            BackendError::InvalidResponse(_)
            | BackendError::UnknownPlan(_)
            | BackendError::AuthenticationFailed => false,
        }
    }

    /// Get error code for logs and diagnostics.
    pub fn error_code(&self) -> &'static str {
        match self {
            BackendError::RequestFailed(_) => "REQUEST_FAILED",
            BackendError::ApiError { .. } => "API_ERROR",
            BackendError::InvalidResponse(_) => "INVALID_RESPONSE",
            BackendError::UnknownPlan(_) => "UNKNOWN_PLAN",
            BackendError::AuthenticationFailed => "AUTHENTICATION_FAILED",
        }
    }
}

/// Native in-app purchase SDK errors.
#[derive(Debug, Error)]
pub enum NativeBillingError {
    /// The SDK is not available on this runtime.
    #[error("Native billing is not supported on this platform")]
    Unsupported,

    /// The SDK was called before `configure` succeeded.
    #[error("Native billing is not configured")]
    NotConfigured,

    /// The SDK reported a failure.
    #[error("Native billing SDK error: {0}")]
    Sdk(String),
}

/// Result type for native billing calls.
pub type NativeResult<T> = Result<T, NativeBillingError>;
