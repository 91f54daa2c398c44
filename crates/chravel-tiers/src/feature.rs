//! # Features
//!
//! Gateable capabilities and the usage limit attached to each one.

use serde::{Deserialize, Serialize};

/// A gateable capability.
///
/// Each feature has a [`Limit`] per subscription tier, looked up through
/// [`TierPolicy`](crate::TierPolicy).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeatureName {
    /// AI concierge queries.
    AiConcierge,

    /// Creating trips.
    TripCreation,

    /// Uploading photos, videos and files to a trip.
    MediaUpload,

    /// Splitting payments between travellers.
    PaymentSplitting,

    /// Exporting a trip itinerary to PDF.
    #[serde(alias = "export")]
    PdfExport,

    /// Syncing trip events to external calendars.
    CalendarSync,

    /// Broadcast channels inside a pro trip.
    Channels,

    /// Custom roles inside a pro trip.
    Roles,

    /// Roster (team member) management.
    Roster,

    /// Logistics boards (rooms, transport, credentials).
    Logistics,

    /// Approval workflows.
    Approvals,

    /// Third-party integrations.
    Integrations,

    /// Audit log access.
    Audit,

    /// Voice concierge.
    Voice,
}

impl FeatureName {
    /// Every feature, in declaration order.
    pub const ALL: [FeatureName; 14] = [
        FeatureName::AiConcierge,
        FeatureName::TripCreation,
        FeatureName::MediaUpload,
        FeatureName::PaymentSplitting,
        FeatureName::PdfExport,
        FeatureName::CalendarSync,
        FeatureName::Channels,
        FeatureName::Roles,
        FeatureName::Roster,
        FeatureName::Logistics,
        FeatureName::Approvals,
        FeatureName::Integrations,
        FeatureName::Audit,
        FeatureName::Voice,
    ];

    /// Get the string representation of the feature.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureName::AiConcierge => "ai_concierge",
            FeatureName::TripCreation => "trip_creation",
            FeatureName::MediaUpload => "media_upload",
            FeatureName::PaymentSplitting => "payment_splitting",
            FeatureName::PdfExport => "pdf_export",
            FeatureName::CalendarSync => "calendar_sync",
            FeatureName::Channels => "channels",
            FeatureName::Roles => "roles",
            FeatureName::Roster => "roster",
            FeatureName::Logistics => "logistics",
            FeatureName::Approvals => "approvals",
            FeatureName::Integrations => "integrations",
            FeatureName::Audit => "audit",
            FeatureName::Voice => "voice",
        }
    }

    /// Parse feature from string representation.
    ///
    /// Unknown names return `None`; callers fall back to the policy
    /// table's default rather than failing.
    ///
    /// # Example
    ///
    /// ```
    /// use chravel_tiers::FeatureName;
    ///
    /// assert_eq!(FeatureName::parse("ai-concierge"), Some(FeatureName::AiConcierge));
    /// assert_eq!(FeatureName::parse("export"), Some(FeatureName::PdfExport));
    /// assert_eq!(FeatureName::parse("teleport"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        if normalized == "export" {
            return Some(FeatureName::PdfExport);
        }
        FeatureName::ALL
            .into_iter()
            .find(|feature| feature.as_str() == normalized)
    }
}

impl std::fmt::Display for FeatureName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usage limit for a feature on a given tier.
///
/// Serialized as the raw integer used by the billing backend:
/// `-1` unlimited, `0` blocked, `N > 0` a consumable quota.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "i64", into = "i64")]
pub enum Limit {
    /// No cap.
    Unlimited,

    /// Feature is not available.
    Blocked,

    /// Consumable quota; callers supply the current usage count.
    Quota(u32),
}

impl Limit {
    /// Raw integer form (`-1`, `0`, or the quota).
    pub fn raw(&self) -> i64 {
        match self {
            Limit::Unlimited => -1,
            Limit::Blocked => 0,
            Limit::Quota(n) => i64::from(*n),
        }
    }

    /// Build from the raw integer form. Any negative value is unlimited.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            r if r < 0 => Limit::Unlimited,
            0 => Limit::Blocked,
            r => Limit::Quota(u32::try_from(r).unwrap_or(u32::MAX)),
        }
    }

    /// Whether `usage` more uses are allowed under this limit.
    ///
    /// A missing usage count is treated as "not yet exhausted".
    pub fn allows(&self, usage: Option<u32>) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::Blocked => false,
            Limit::Quota(cap) => usage.map_or(true, |used| used < *cap),
        }
    }

    /// Remaining uses, or `None` when unlimited.
    pub fn remaining(&self, usage: u32) -> Option<u32> {
        match self {
            Limit::Unlimited => None,
            Limit::Blocked => Some(0),
            Limit::Quota(cap) => Some(cap.saturating_sub(usage)),
        }
    }

    /// Check if this limit is unlimited.
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }
}

impl From<i64> for Limit {
    fn from(raw: i64) -> Self {
        Limit::from_raw(raw)
    }
}

impl From<Limit> for i64 {
    fn from(limit: Limit) -> Self {
        limit.raw()
    }
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Limit::Unlimited => f.write_str("unlimited"),
            Limit::Blocked => f.write_str("blocked"),
            Limit::Quota(n) => write!(f, "{}", n),
        }
    }
}
