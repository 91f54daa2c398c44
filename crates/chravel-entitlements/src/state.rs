//! Authority state
//!
//! [`AuthorityState`] is the engine's only mutable state: the resolved
//! billing position of the current user. It is never edited in place; every
//! resolution pass produces a whole new value.
//!
//! Allow-all overrides (super-admin, demo) are recorded in
//! `override_source` and applied by [`AuthorityState::effective`]. They never
//! change the billing fields, so turning an override off reveals the last
//! billing state that was actually resolved.

use chrono::{DateTime, Utc};
use chravel_billing::{CanonicalRecord, EntitlementSource};
use chravel_tiers::{EntitlementSet, SubscriptionStatus, SubscriptionTier};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resolved billing position of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityState {
    /// User the snapshot belongs to; `None` when signed out
    pub user_id: Option<Uuid>,

    /// Plan the user holds
    pub plan: SubscriptionTier,

    /// Billing status of the plan
    pub status: SubscriptionStatus,

    /// Authority the billing fields came from
    pub source: EntitlementSource,

    /// Whether the plan is paid and its status grants access
    pub is_subscribed: bool,

    /// Whether the user holds an active pro plan
    pub is_pro: bool,

    /// Whether the user is on the super-admin allowlist
    pub is_super_admin: bool,

    /// Capability flags granted
    pub entitlements: EntitlementSet,

    /// End of the current billing period
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<DateTime<Utc>>,

    /// Allow-all override in force, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_source: Option<EntitlementSource>,

    /// True until a resolution pass has committed
    pub is_loading: bool,

    /// When the state was last resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl AuthorityState {
    /// State at process start: nothing known yet.
    pub fn initial() -> Self {
        Self {
            user_id: None,
            plan: SubscriptionTier::Free,
            status: SubscriptionStatus::Expired,
            source: EntitlementSource::None,
            is_subscribed: false,
            is_pro: false,
            is_super_admin: false,
            entitlements: EntitlementSet::new(),
            current_period_end: None,
            override_source: None,
            is_loading: true,
            resolved_at: None,
        }
    }

    /// Empty, authoritative state for a user with no billing data.
    pub fn empty_for(user_id: Option<Uuid>) -> Self {
        Self {
            user_id,
            is_loading: false,
            resolved_at: Some(Utc::now()),
            ..Self::initial()
        }
    }

    /// State after sign-out.
    pub fn unauthenticated() -> Self {
        Self::empty_for(None)
    }

    /// State resolved from the backend's canonical record.
    pub fn from_record(user_id: Uuid, record: &CanonicalRecord) -> Self {
        Self {
            user_id: Some(user_id),
            plan: record.plan,
            status: record.status,
            source: record.source,
            is_subscribed: record.is_subscribed(),
            is_pro: record.plan.is_pro() && record.status.grants_access(),
            is_super_admin: false,
            entitlements: record.entitlements.clone(),
            current_period_end: record.current_period_end,
            override_source: None,
            is_loading: false,
            resolved_at: Some(Utc::now()),
        }
    }

    /// `previous` with an allow-all override in force.
    ///
    /// Billing fields carry over when `previous` belongs to the same user;
    /// otherwise they start empty so one user's plan never shows under
    /// another user's override.
    pub fn allow_all(previous: &Self, user_id: Option<Uuid>, source: EntitlementSource) -> Self {
        Self {
            is_super_admin: source == EntitlementSource::Admin,
            override_source: Some(source),
            is_loading: false,
            resolved_at: Some(Utc::now()),
            ..previous.carried_over(user_id)
        }
    }

    /// `previous` kept after a failed pass, with any override lifted.
    pub fn kept(previous: &Self, user_id: Option<Uuid>) -> Self {
        Self {
            is_super_admin: false,
            override_source: None,
            is_loading: false,
            ..previous.carried_over(user_id)
        }
    }

    fn carried_over(&self, user_id: Option<Uuid>) -> Self {
        if self.user_id == user_id {
            self.clone()
        } else {
            Self::empty_for(user_id)
        }
    }

    /// The state queries should see, with any override applied.
    pub fn effective(&self) -> Self {
        match self.override_source {
            Some(source) => Self {
                plan: SubscriptionTier::MOST_PERMISSIVE,
                status: SubscriptionStatus::Active,
                source,
                is_subscribed: true,
                is_pro: true,
                ..self.clone()
            },
            None => self.clone(),
        }
    }

    /// Whether an allow-all override is in force.
    pub fn is_override_active(&self) -> bool {
        self.override_source.is_some()
    }

    /// Whether demo mode is the override in force.
    pub fn is_demo(&self) -> bool {
        self.override_source == Some(EntitlementSource::Demo)
    }

    /// Equality ignoring `resolved_at`.
    pub fn same_resolution(&self, other: &Self) -> bool {
        self.user_id == other.user_id
            && self.plan == other.plan
            && self.status == other.status
            && self.source == other.source
            && self.is_subscribed == other.is_subscribed
            && self.is_pro == other.is_pro
            && self.is_super_admin == other.is_super_admin
            && self.entitlements == other.entitlements
            && self.current_period_end == other.current_period_end
            && self.override_source == other.override_source
            && self.is_loading == other.is_loading
    }
}

impl Default for AuthorityState {
    fn default() -> Self {
        Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chravel_tiers::EntitlementId;

    fn growth_record() -> CanonicalRecord {
        CanonicalRecord {
            plan: SubscriptionTier::ProGrowth,
            status: SubscriptionStatus::Active,
            source: EntitlementSource::Stripe,
            entitlements: [EntitlementId::pro_growth()].into_iter().collect(),
            current_period_end: None,
        }
    }

    #[test]
    fn test_initial_state_is_loading() {
        let state = AuthorityState::initial();
        assert!(state.is_loading);
        assert_eq!(state.plan, SubscriptionTier::Free);
        assert_eq!(state.source, EntitlementSource::None);
        assert!(state.resolved_at.is_none());
    }

    #[test]
    fn test_unauthenticated_state() {
        let state = AuthorityState::unauthenticated();
        assert!(!state.is_loading);
        assert_eq!(state.user_id, None);
        assert_eq!(state.status, SubscriptionStatus::Expired);
        assert!(state.entitlements.is_empty());
    }

    #[test]
    fn test_from_record() {
        let user = Uuid::now_v7();
        let state = AuthorityState::from_record(user, &growth_record());
        assert_eq!(state.user_id, Some(user));
        assert!(state.is_subscribed);
        assert!(state.is_pro);
        assert!(!state.is_loading);

        let mut lapsed = growth_record();
        lapsed.status = SubscriptionStatus::Canceled;
        let state = AuthorityState::from_record(user, &lapsed);
        assert!(!state.is_subscribed);
        assert!(!state.is_pro);
    }

    #[test]
    fn test_allow_all_keeps_billing_fields() {
        let user = Uuid::now_v7();
        let stored = AuthorityState::from_record(user, &growth_record());
        let admin = AuthorityState::allow_all(&stored, Some(user), EntitlementSource::Admin);

        assert_eq!(admin.plan, SubscriptionTier::ProGrowth);
        assert_eq!(admin.source, EntitlementSource::Stripe);
        assert!(admin.is_super_admin);
        assert!(admin.is_override_active());

        let effective = admin.effective();
        assert_eq!(effective.plan, SubscriptionTier::ProEnterprise);
        assert_eq!(effective.source, EntitlementSource::Admin);
        assert_eq!(effective.status, SubscriptionStatus::Active);
        assert!(effective.is_subscribed && effective.is_pro);
    }

    #[test]
    fn test_allow_all_for_new_user_starts_empty() {
        let stored = AuthorityState::from_record(Uuid::now_v7(), &growth_record());
        let other = Uuid::now_v7();
        let demo = AuthorityState::allow_all(&stored, Some(other), EntitlementSource::Demo);

        assert_eq!(demo.user_id, Some(other));
        assert_eq!(demo.plan, SubscriptionTier::Free);
        assert!(demo.entitlements.is_empty());
        assert!(demo.is_demo());
        assert!(!demo.is_super_admin);
    }

    #[test]
    fn test_kept_lifts_override() {
        let user = Uuid::now_v7();
        let stored = AuthorityState::from_record(user, &growth_record());
        let demo = AuthorityState::allow_all(&stored, Some(user), EntitlementSource::Demo);
        let kept = AuthorityState::kept(&demo, Some(user));

        assert!(!kept.is_override_active());
        assert_eq!(kept.plan, SubscriptionTier::ProGrowth);
        assert_eq!(kept.effective().plan, SubscriptionTier::ProGrowth);
    }

    #[test]
    fn test_kept_for_loading_state_clears_loading() {
        let kept = AuthorityState::kept(&AuthorityState::initial(), None);
        assert!(!kept.is_loading);
        assert_eq!(kept.plan, SubscriptionTier::Free);
    }

    #[test]
    fn test_same_resolution_ignores_timestamp() {
        let user = Uuid::now_v7();
        let a = AuthorityState::from_record(user, &growth_record());
        let mut b = a.clone();
        b.resolved_at = Some(Utc::now() + chrono::Duration::seconds(30));
        assert!(a.same_resolution(&b));
        assert_ne!(a, b);

        b.is_loading = true;
        assert!(!a.same_resolution(&b));
    }

    #[test]
    fn test_serialization() {
        let state = AuthorityState::from_record(Uuid::now_v7(), &growth_record());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["plan"], "pro-growth");
        assert_eq!(json["source"], "stripe");
        assert_eq!(json["entitlements"], serde_json::json!(["chravel_pro_growth"]));
        assert!(json.get("override_source").is_none());
    }
}
