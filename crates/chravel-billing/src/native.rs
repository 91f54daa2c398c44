//! Native in-app purchase billing.
//!
//! The mobile billing SDK is an external collaborator; this module defines
//! the seam the entitlements engine talks to and the customer record it
//! forwards to the backend for reconciliation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chravel_tiers::EntitlementSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NativeBillingError, NativeResult};

/// Runtime the app process is running on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    /// Browser or desktop web view
    Web,

    /// Native iOS shell
    Ios,

    /// Native Android shell
    Android,
}

impl Runtime {
    /// Parse runtime from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "web" | "browser" => Some(Runtime::Web),
            "ios" => Some(Runtime::Ios),
            "android" => Some(Runtime::Android),
            _ => None,
        }
    }

    /// Whether the native billing SDK can exist on this runtime.
    pub fn is_native(&self) -> bool {
        matches!(self, Runtime::Ios | Runtime::Android)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::Web
    }
}

/// Outcome of configuring the SDK for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeSupport {
    /// SDK configured for the user; customer records can be fetched
    Configured,

    /// SDK not available here; there is no native signal
    Unsupported,
}

/// Customer purchase record as reported by the native billing SDK.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    /// SDK-side user id (the Chravel user id once configured)
    pub original_app_user_id: String,

    /// Active entitlement identifiers
    #[serde(default)]
    pub active_entitlements: Vec<String>,

    /// Active store product identifiers
    #[serde(default)]
    pub active_subscriptions: Vec<String>,

    /// Latest expiration across all purchases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_expiration_date: Option<DateTime<Utc>>,

    /// Store management URL for the subscription
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "managementURL")]
    pub management_url: Option<String>,
}

impl CustomerInfo {
    /// Active entitlements as a set.
    pub fn entitlement_set(&self) -> EntitlementSet {
        EntitlementSet::from_strings(self.active_entitlements.as_slice())
    }

    /// Whether the customer holds any active purchase.
    pub fn has_active_purchase(&self) -> bool {
        !self.active_entitlements.is_empty() || !self.active_subscriptions.is_empty()
    }
}

/// Native billing SDK seam.
///
/// Only called on native runtimes with native billing enabled.
#[async_trait]
pub trait NativeBilling: Send + Sync {
    /// Configure the SDK for a user.
    async fn configure(&self, user_id: Uuid) -> NativeResult<NativeSupport>;

    /// Fetch the configured user's purchase record.
    async fn customer_info(&self) -> NativeResult<CustomerInfo>;

    /// Release the SDK session for the current user.
    async fn logout(&self) -> NativeResult<()>;
}

/// Native billing for runtimes without an SDK (the web build).
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedNativeBilling;

#[async_trait]
impl NativeBilling for UnsupportedNativeBilling {
    async fn configure(&self, _user_id: Uuid) -> NativeResult<NativeSupport> {
        Ok(NativeSupport::Unsupported)
    }

    async fn customer_info(&self) -> NativeResult<CustomerInfo> {
        Err(NativeBillingError::Unsupported)
    }

    async fn logout(&self) -> NativeResult<()> {
        Ok(())
    }
}
