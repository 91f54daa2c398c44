//! # Chravel Tiers
//!
//! This crate provides the static billing vocabulary for Chravel: the
//! subscription tiers a user can hold, the features those tiers gate, and
//! the policy table mapping each `(feature, tier)` pair to a usage limit.
//!
//! ## Overview
//!
//! The chravel-tiers crate handles:
//! - **Tiers**: Consumer and pro subscription plans, plus billing status
//! - **Features**: The closed set of gateable capabilities
//! - **Limits**: `-1` unlimited, `0` blocked, `N` a consumable quota
//! - **Entitlements**: Fine-grained capability flags held as a set
//! - **Policy**: The tier policy table and its fallback rules
//!
//! ## Architecture
//!
//! ```text
//! TierPolicy
//!   └─ (FeatureName, SubscriptionTier) ─→ Limit
//!        lookup: exact row → free row → unlimited
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use chravel_tiers::{FeatureName, SubscriptionTier, TierPolicy};
//!
//! let policy = TierPolicy::standard();
//!
//! // Free users may create three trips.
//! assert!(policy.allows(FeatureName::TripCreation, SubscriptionTier::Free, Some(2)));
//! assert!(!policy.allows(FeatureName::TripCreation, SubscriptionTier::Free, Some(3)));
//!
//! // Approvals are only unlocked on Pro Enterprise.
//! assert!(!policy.allows(FeatureName::Approvals, SubscriptionTier::ProStarter, None));
//! ```
//!
//! Everything here is pure data. State, providers, and overrides live in
//! `chravel-entitlements`.

pub mod entitlement;
pub mod feature;
pub mod policy;
pub mod tier;

// Re-export main types for convenience
pub use entitlement::{EntitlementId, EntitlementSet};
pub use feature::{FeatureName, Limit};
pub use policy::{PolicyRow, TierPolicy};
pub use tier::{SubscriptionStatus, SubscriptionTier};
