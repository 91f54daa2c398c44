//! # Chravel Billing
//!
//! Billing-provider clients used by the Chravel entitlements engine.
//!
//! ## Overview
//!
//! The chravel-billing crate handles:
//! - **Backend**: The hosted backend's canonical entitlement record, the
//!   tie-breaker for web (Stripe) subscriptions
//! - **Native billing**: The seam to the mobile in-app purchase SDK and the
//!   reconciliation of its purchases into the canonical record
//! - **Configuration**: Endpoint, runtime and retry settings from the environment
//! - **Retry**: Exponential backoff for transient provider failures
//!
//! Neither provider is trusted blindly: native purchases are forwarded to the
//! backend, and the record the backend returns is the one that counts.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chravel_billing::{BackendClient, BillingConfig, EntitlementBackend};
//! use uuid::Uuid;
//!
//! async fn lookup(user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BillingConfig::from_env()?;
//!     let client = BackendClient::from_config(&config)?;
//!
//!     let record = client.fetch_entitlements(user_id).await?;
//!     println!("{} ({})", record.plan.display_name(), record.status.as_str());
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod native;
pub mod record;
pub mod retry;

// Re-export main types
pub use backend::{BackendClient, EntitlementBackend, GET_ENTITLEMENTS_PATH, SYNC_NATIVE_PATH};
pub use config::{BackendEndpoint, BillingConfig, ConfigError};
pub use error::{BackendError, BackendResult, NativeBillingError, NativeResult};
pub use native::{CustomerInfo, NativeBilling, NativeSupport, Runtime, UnsupportedNativeBilling};
pub use record::{CanonicalRecord, EntitlementSource, RecordPayload};
pub use retry::{with_retry_if, RetryConfig};
