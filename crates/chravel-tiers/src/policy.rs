//! Tier policy table
//!
//! Static mapping from `(feature, tier)` to a usage [`Limit`]. The table is
//! pure data: no state, no I/O.
//!
//! # Lookup order
//!
//! 1. The exact `(feature, tier)` row
//! 2. The `(feature, free)` row
//! 3. [`Limit::Unlimited`]
//!
//! Step 3 is default-open: a feature nobody has written a row for is
//! unlimited until a row is added.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::feature::{FeatureName, Limit};
use crate::tier::SubscriptionTier;

use crate::feature::FeatureName as F;
use crate::tier::SubscriptionTier as T;

/// Rows of the shipped policy table. Cells missing here fall back to the
/// feature's `free` row.
const STANDARD_ROWS: &[(FeatureName, SubscriptionTier, i64)] = &[
    // Consumer features
    (F::AiConcierge, T::Free, 10),
    (F::AiConcierge, T::Explorer, 25),
    (F::AiConcierge, T::FrequentChraveler, -1),
    (F::AiConcierge, T::ProStarter, -1),
    (F::AiConcierge, T::ProGrowth, -1),
    (F::AiConcierge, T::ProEnterprise, -1),
    (F::TripCreation, T::Free, 3),
    (F::TripCreation, T::Explorer, -1),
    (F::TripCreation, T::FrequentChraveler, -1),
    (F::TripCreation, T::ProStarter, -1),
    (F::TripCreation, T::ProGrowth, -1),
    (F::TripCreation, T::ProEnterprise, -1),
    (F::MediaUpload, T::Free, 50),
    (F::MediaUpload, T::Explorer, 500),
    (F::MediaUpload, T::FrequentChraveler, -1),
    (F::MediaUpload, T::ProStarter, -1),
    (F::MediaUpload, T::ProGrowth, -1),
    (F::MediaUpload, T::ProEnterprise, -1),
    (F::PaymentSplitting, T::Free, 0),
    (F::PaymentSplitting, T::Explorer, -1),
    (F::PaymentSplitting, T::FrequentChraveler, -1),
    (F::PaymentSplitting, T::ProStarter, -1),
    (F::PaymentSplitting, T::ProGrowth, -1),
    (F::PaymentSplitting, T::ProEnterprise, -1),
    (F::PdfExport, T::Free, 0),
    (F::PdfExport, T::Explorer, -1),
    (F::PdfExport, T::FrequentChraveler, -1),
    (F::PdfExport, T::ProStarter, -1),
    (F::PdfExport, T::ProGrowth, -1),
    (F::PdfExport, T::ProEnterprise, -1),
    (F::CalendarSync, T::Free, 0),
    (F::CalendarSync, T::Explorer, -1),
    (F::CalendarSync, T::FrequentChraveler, -1),
    (F::CalendarSync, T::ProStarter, -1),
    (F::CalendarSync, T::ProGrowth, -1),
    (F::CalendarSync, T::ProEnterprise, -1),
    (F::Voice, T::Free, 0),
    (F::Voice, T::FrequentChraveler, -1),
    (F::Voice, T::ProEnterprise, -1),
    // Pro features
    (F::Channels, T::Free, 0),
    (F::Channels, T::ProStarter, 5),
    (F::Channels, T::ProGrowth, 25),
    (F::Channels, T::ProEnterprise, -1),
    (F::Roles, T::Free, 0),
    (F::Roles, T::ProStarter, 3),
    (F::Roles, T::ProGrowth, 10),
    (F::Roles, T::ProEnterprise, -1),
    (F::Roster, T::Free, 0),
    (F::Roster, T::ProStarter, 50),
    (F::Roster, T::ProGrowth, 100),
    (F::Roster, T::ProEnterprise, -1),
    (F::Logistics, T::Free, 0),
    (F::Logistics, T::ProStarter, -1),
    (F::Logistics, T::ProGrowth, -1),
    (F::Logistics, T::ProEnterprise, -1),
    (F::Approvals, T::Free, 0),
    (F::Approvals, T::ProStarter, 0),
    (F::Approvals, T::ProGrowth, 0),
    (F::Approvals, T::ProEnterprise, -1),
    (F::Integrations, T::Free, 0),
    (F::Integrations, T::ProStarter, 0),
    (F::Integrations, T::ProGrowth, 5),
    (F::Integrations, T::ProEnterprise, -1),
    (F::Audit, T::Free, 0),
    (F::Audit, T::ProStarter, 0),
    (F::Audit, T::ProGrowth, -1),
    (F::Audit, T::ProEnterprise, -1),
];

/// One explicit cell of a policy table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyRow {
    /// Feature this row gates
    pub feature: FeatureName,

    /// Tier this row applies to
    pub tier: SubscriptionTier,

    /// Limit for the pair
    pub limit: Limit,
}

/// Table of per-tier feature limits.
///
/// # Examples
///
/// ```
/// use chravel_tiers::{FeatureName, Limit, SubscriptionTier, TierPolicy};
///
/// let policy = TierPolicy::standard();
/// assert_eq!(
///     policy.limit_for(FeatureName::TripCreation, SubscriptionTier::Free),
///     Limit::Quota(3)
/// );
/// assert_eq!(
///     policy.limit_for(FeatureName::Approvals, SubscriptionTier::ProEnterprise),
///     Limit::Unlimited
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct TierPolicy {
    rows: HashMap<(FeatureName, SubscriptionTier), Limit>,
}

impl TierPolicy {
    /// The table shipped with the product.
    pub fn standard() -> Self {
        Self::from_rows(STANDARD_ROWS.iter().map(|&(feature, tier, raw)| PolicyRow {
            feature,
            tier,
            limit: Limit::from_raw(raw),
        }))
    }

    /// Build a table from explicit rows. Later rows replace earlier ones
    /// for the same pair.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = PolicyRow>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| ((row.feature, row.tier), row.limit))
                .collect(),
        }
    }

    /// Look up the limit for a feature on a tier.
    ///
    /// Exact row, then the feature's `free` row, then unlimited.
    pub fn limit_for(&self, feature: FeatureName, tier: SubscriptionTier) -> Limit {
        self.rows
            .get(&(feature, tier))
            .or_else(|| self.rows.get(&(feature, SubscriptionTier::Free)))
            .copied()
            .unwrap_or(Limit::Unlimited)
    }

    /// The explicit row for a pair, without fallback.
    pub fn explicit(&self, feature: FeatureName, tier: SubscriptionTier) -> Option<Limit> {
        self.rows.get(&(feature, tier)).copied()
    }

    /// Answer a usage check for a tier.
    ///
    /// `usage` is the caller's current count; `None` means unknown and is
    /// treated as not yet exhausted.
    pub fn allows(&self, feature: FeatureName, tier: SubscriptionTier, usage: Option<u32>) -> bool {
        self.limit_for(feature, tier).allows(usage)
    }

    /// All explicit rows, sorted by feature then tier declaration order.
    pub fn rows(&self) -> Vec<PolicyRow> {
        let mut rows = Vec::with_capacity(self.rows.len());
        for feature in FeatureName::ALL {
            for tier in SubscriptionTier::ALL {
                if let Some(limit) = self.explicit(feature, tier) {
                    rows.push(PolicyRow { feature, tier, limit });
                }
            }
        }
        rows
    }

    /// Tiers on which a feature is not blocked.
    pub fn tiers_unlocking(&self, feature: FeatureName) -> Vec<SubscriptionTier> {
        SubscriptionTier::ALL
            .into_iter()
            .filter(|tier| self.limit_for(feature, *tier) != Limit::Blocked)
            .collect()
    }

    /// Number of explicit rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
