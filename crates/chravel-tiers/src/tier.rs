//! Subscription tiers and subscription status
//!
//! This module defines the plans a Chravel user can hold and the billing
//! status attached to a plan.

use serde::{Deserialize, Serialize};

/// Subscription tier for a user.
///
/// Tiers determine feature access and usage limits.
///
/// # Tier Families
///
/// Consumer tiers:
/// - **Free**: Basic free tier
/// - **Explorer**: Entry paid consumer tier
/// - **FrequentChraveler**: Top consumer tier (unlimited concierge, voice)
///
/// Pro tiers (organizations running group travel):
/// - **ProStarter**: Small teams
/// - **ProGrowth**: Growing teams
/// - **ProEnterprise**: Full-featured enterprise
///
/// Consumer and pro tiers unlock disjoint feature sets, so tiers are
/// not ordered. Compare access through the policy table,
/// never by position in this enum.
///
/// # Examples
///
/// ```
/// use chravel_tiers::SubscriptionTier;
///
/// let tier = SubscriptionTier::parse("frequent-chraveler").unwrap();
/// assert_eq!(tier, SubscriptionTier::FrequentChraveler);
/// assert!(!tier.is_pro());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SubscriptionTier {
    /// Free consumer tier
    Free,

    /// Entry paid consumer tier
    Explorer,

    /// Top consumer tier
    #[serde(alias = "frequent_chraveler", alias = "frequent")]
    FrequentChraveler,

    /// Pro tier for small teams
    #[serde(alias = "pro_starter", alias = "starter")]
    ProStarter,

    /// Pro tier for growing teams
    #[serde(alias = "pro_growth", alias = "growth")]
    ProGrowth,

    /// Pro tier for large organizations
    #[serde(alias = "pro_enterprise", alias = "enterprise")]
    ProEnterprise,
}

impl SubscriptionTier {
    /// Every tier, in declaration order.
    pub const ALL: [SubscriptionTier; 6] = [
        SubscriptionTier::Free,
        SubscriptionTier::Explorer,
        SubscriptionTier::FrequentChraveler,
        SubscriptionTier::ProStarter,
        SubscriptionTier::ProGrowth,
        SubscriptionTier::ProEnterprise,
    ];

    /// The tier reported to callers while an allow-all override is active.
    pub const MOST_PERMISSIVE: SubscriptionTier = SubscriptionTier::ProEnterprise;

    /// Parse tier from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive, `-` and `_` interchangeable)
    ///
    /// # Returns
    ///
    /// `Some(SubscriptionTier)` if valid, `None` otherwise
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(&['-', '_'][..], "").as_str() {
            "free" => Some(SubscriptionTier::Free),
            "explorer" => Some(SubscriptionTier::Explorer),
            "frequentchraveler" | "frequent" => Some(SubscriptionTier::FrequentChraveler),
            "prostarter" | "starter" => Some(SubscriptionTier::ProStarter),
            "progrowth" | "growth" => Some(SubscriptionTier::ProGrowth),
            "proenterprise" | "enterprise" => Some(SubscriptionTier::ProEnterprise),
            _ => None,
        }
    }

    /// Get string representation of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Explorer => "explorer",
            SubscriptionTier::FrequentChraveler => "frequent-chraveler",
            SubscriptionTier::ProStarter => "pro-starter",
            SubscriptionTier::ProGrowth => "pro-growth",
            SubscriptionTier::ProEnterprise => "pro-enterprise",
        }
    }

    /// Get a human-readable display name for the tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "Free",
            SubscriptionTier::Explorer => "Explorer",
            SubscriptionTier::FrequentChraveler => "Frequent Chraveler",
            SubscriptionTier::ProStarter => "Pro Starter",
            SubscriptionTier::ProGrowth => "Pro Growth",
            SubscriptionTier::ProEnterprise => "Pro Enterprise",
        }
    }

    /// Check if this is a paid tier.
    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }

    /// Check if this is one of the pro (organization) tiers.
    pub fn is_pro(&self) -> bool {
        matches!(
            self,
            SubscriptionTier::ProStarter | SubscriptionTier::ProGrowth | SubscriptionTier::ProEnterprise
        )
    }

    /// Check if this is a paid consumer tier.
    pub fn is_consumer_paid(&self) -> bool {
        matches!(
            self,
            SubscriptionTier::Explorer | SubscriptionTier::FrequentChraveler
        )
    }
}

impl Default for SubscriptionTier {
    fn default() -> Self {
        SubscriptionTier::Free
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing status attached to a subscription.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and in good standing
    Active,

    /// Inside a trial period
    Trialing,

    /// Lapsed, or never subscribed
    Expired,

    /// Canceled by the user or the provider
    Canceled,
}

impl SubscriptionStatus {
    /// Parse status from string representation.
    ///
    /// Provider spellings such as `trial`, `past_due` and `cancelled` are
    /// folded onto the four canonical statuses.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(SubscriptionStatus::Active),
            "trialing" | "trial" | "in_trial" => Some(SubscriptionStatus::Trialing),
            "expired" | "past_due" | "unpaid" | "inactive" => Some(SubscriptionStatus::Expired),
            "canceled" | "cancelled" => Some(SubscriptionStatus::Canceled),
            _ => None,
        }
    }

    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// Whether a subscription in this status grants its tier's features.
    pub fn grants_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        SubscriptionStatus::Expired
    }
}
