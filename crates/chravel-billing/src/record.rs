//! Canonical entitlement records
//!
//! The backend's record of a user's subscription is the tie-breaker for web
//! (Stripe) subscriptions and the reconciliation target for native
//! (RevenueCat) purchases.

use chrono::{DateTime, Utc};
use chravel_tiers::{EntitlementSet, SubscriptionStatus, SubscriptionTier};
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Authority that asserted an entitlement state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementSource {
    /// Native in-app purchase, reconciled through RevenueCat
    Revenuecat,

    /// Web subscription billed through Stripe
    Stripe,

    /// Operator override
    Admin,

    /// Local demo mode
    Demo,

    /// No authority; free or signed out
    None,
}

impl EntitlementSource {
    /// Parse source from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "revenuecat" | "revenue_cat" | "app_store" | "play_store" => {
                Some(EntitlementSource::Revenuecat)
            }
            "stripe" | "web" => Some(EntitlementSource::Stripe),
            "admin" => Some(EntitlementSource::Admin),
            "demo" => Some(EntitlementSource::Demo),
            "none" | "" => Some(EntitlementSource::None),
            _ => None,
        }
    }

    /// Get string representation of the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntitlementSource::Revenuecat => "revenuecat",
            EntitlementSource::Stripe => "stripe",
            EntitlementSource::Admin => "admin",
            EntitlementSource::Demo => "demo",
            EntitlementSource::None => "none",
        }
    }

    /// Whether this source is a local override rather than a billing provider.
    pub fn is_override(&self) -> bool {
        matches!(self, EntitlementSource::Admin | EntitlementSource::Demo)
    }
}

impl Default for EntitlementSource {
    fn default() -> Self {
        EntitlementSource::None
    }
}

/// The backend's authoritative entitlement record for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    /// Plan the user holds
    pub plan: SubscriptionTier,

    /// Billing status of the plan
    pub status: SubscriptionStatus,

    /// Provider that owns the subscription
    pub source: EntitlementSource,

    /// Capability flags granted
    pub entitlements: EntitlementSet,

    /// End of the current billing period, if subscribed
    pub current_period_end: Option<DateTime<Utc>>,
}

impl CanonicalRecord {
    /// Record for a user with no subscription.
    pub fn free() -> Self {
        Self {
            plan: SubscriptionTier::Free,
            status: SubscriptionStatus::Expired,
            source: EntitlementSource::None,
            entitlements: EntitlementSet::new(),
            current_period_end: None,
        }
    }

    /// Whether the record grants its plan's paid features.
    pub fn is_subscribed(&self) -> bool {
        self.plan.is_paid() && self.status.grants_access()
    }
}

/// Wire shape of an entitlement record as returned by the backend.
///
/// Plans and statuses arrive as free-form strings and are validated in
/// [`RecordPayload::into_record`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayload {
    /// Plan name
    pub plan: String,

    /// Status name
    #[serde(default)]
    pub status: Option<String>,

    /// Source name
    #[serde(default)]
    pub source: Option<String>,

    /// Entitlement ids
    #[serde(default)]
    pub entitlements: Vec<String>,

    /// End of the current billing period
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<DateTime<Utc>>,
}

impl RecordPayload {
    /// Validate the payload into a [`CanonicalRecord`].
    ///
    /// Unknown plans are rejected; a missing status reads as expired and
    /// an unknown or missing source reads as `none`.
    pub fn into_record(self) -> Result<CanonicalRecord, BackendError> {
        let plan = SubscriptionTier::parse(&self.plan)
            .ok_or_else(|| BackendError::UnknownPlan(self.plan.clone()))?;

        let status = match self.status.as_deref() {
            None => SubscriptionStatus::Expired,
            Some(raw) => SubscriptionStatus::parse(raw).ok_or_else(|| {
                BackendError::InvalidResponse(format!("unknown subscription status '{}'", raw))
            })?,
        };

        let source = self
            .source
            .as_deref()
            .and_then(EntitlementSource::parse)
            .unwrap_or_default();

        Ok(CanonicalRecord {
            plan,
            status,
            source,
            entitlements: EntitlementSet::from_strings(self.entitlements.as_slice()),
            current_period_end: self.current_period_end,
        })
    }
}
