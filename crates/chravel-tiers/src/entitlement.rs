//! # Entitlements
//!
//! Fine-grained capability flags granted by a billing provider. Holding an
//! entitlement implies access regardless of numeric limits.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::tier::SubscriptionTier;

/// A capability flag as reported by the billing backend.
///
/// Ids are opaque strings; the well-known ones are exposed as constants.
///
/// # Example
///
/// ```
/// use chravel_tiers::EntitlementId;
///
/// let id = EntitlementId::new("chravel_pro_growth");
/// assert_eq!(id, EntitlementId::pro_growth());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(from = "String", into = "String")]
pub struct EntitlementId(String);

impl EntitlementId {
    /// Create an entitlement id. Surrounding whitespace is dropped.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.len() == id.len() {
            Self(id)
        } else {
            Self(trimmed.to_string())
        }
    }

    /// Explorer subscription entitlement.
    pub fn explorer() -> Self {
        Self::new("chravel_explorer")
    }

    /// Frequent Chraveler subscription entitlement.
    pub fn frequent_chraveler() -> Self {
        Self::new("chravel_frequent_chraveler")
    }

    /// Pro Starter subscription entitlement.
    pub fn pro_starter() -> Self {
        Self::new("chravel_pro_starter")
    }

    /// Pro Growth subscription entitlement.
    pub fn pro_growth() -> Self {
        Self::new("chravel_pro_growth")
    }

    /// Pro Enterprise subscription entitlement.
    pub fn pro_enterprise() -> Self {
        Self::new("chravel_pro_enterprise")
    }

    /// The entitlement a paid tier grants, if any.
    pub fn for_tier(tier: SubscriptionTier) -> Option<Self> {
        match tier {
            SubscriptionTier::Free => None,
            SubscriptionTier::Explorer => Some(Self::explorer()),
            SubscriptionTier::FrequentChraveler => Some(Self::frequent_chraveler()),
            SubscriptionTier::ProStarter => Some(Self::pro_starter()),
            SubscriptionTier::ProGrowth => Some(Self::pro_growth()),
            SubscriptionTier::ProEnterprise => Some(Self::pro_enterprise()),
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntitlementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntitlementId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntitlementId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<EntitlementId> for String {
    fn from(id: EntitlementId) -> Self {
        id.0
    }
}

/// A set of entitlements held by a user.
///
/// Ordered so that two sets with the same members compare and serialize
/// identically. Deserialization applies the same trimming and blank-id
/// filtering as [`EntitlementSet::add`].
///
/// # Example
///
/// ```
/// use chravel_tiers::{EntitlementId, EntitlementSet};
///
/// let set = EntitlementSet::from_strings(&["chravel_explorer", "beta_voice"]);
/// assert!(set.has(&EntitlementId::explorer()));
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "Vec<EntitlementId>", into = "Vec<EntitlementId>")]
pub struct EntitlementSet {
    ids: BTreeSet<EntitlementId>,
}

impl EntitlementSet {
    /// Create a new empty set.
    pub fn new() -> Self {
        Self {
            ids: BTreeSet::new(),
        }
    }

    /// Create from a list of id strings. Blank strings are skipped.
    pub fn from_strings<S: AsRef<str>>(ids: &[S]) -> Self {
        ids.iter().map(|id| EntitlementId::new(id.as_ref())).collect()
    }

    /// Add an entitlement. Blank ids are ignored.
    ///
    /// # Returns
    ///
    /// `true` if the id was newly inserted
    pub fn add(&mut self, id: EntitlementId) -> bool {
        if id.as_str().is_empty() {
            return false;
        }
        self.ids.insert(id)
    }

    /// Remove an entitlement.
    pub fn remove(&mut self, id: &EntitlementId) -> bool {
        self.ids.remove(id)
    }

    /// Check if the set contains an entitlement.
    pub fn has(&self, id: &EntitlementId) -> bool {
        self.ids.contains(id)
    }

    /// Merge another set into this one.
    pub fn merge(&mut self, other: &EntitlementSet) {
        for id in &other.ids {
            self.ids.insert(id.clone());
        }
    }

    /// Iterate over the entitlements in order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitlementId> {
        self.ids.iter()
    }

    /// Get the count of entitlements.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<EntitlementId> for EntitlementSet {
    fn from_iter<T: IntoIterator<Item = EntitlementId>>(iter: T) -> Self {
        let mut set = EntitlementSet::new();
        for id in iter {
            set.add(id);
        }
        set
    }
}

impl From<Vec<EntitlementId>> for EntitlementSet {
    fn from(ids: Vec<EntitlementId>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<EntitlementSet> for Vec<EntitlementId> {
    fn from(set: EntitlementSet) -> Self {
        set.ids.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entitlement_id_trims() {
        assert_eq!(EntitlementId::new("  chravel_explorer "), EntitlementId::explorer());
    }

    #[test]
    fn test_entitlement_for_tier() {
        assert_eq!(EntitlementId::for_tier(SubscriptionTier::Free), None);
        assert_eq!(
            EntitlementId::for_tier(SubscriptionTier::ProEnterprise),
            Some(EntitlementId::pro_enterprise())
        );
    }

    #[test]
    fn test_set_membership() {
        let mut set = EntitlementSet::new();
        assert!(set.add(EntitlementId::pro_starter()));
        assert!(!set.add(EntitlementId::pro_starter()));
        assert!(!set.add(EntitlementId::new("   ")));

        assert!(set.has(&EntitlementId::pro_starter()));
        assert!(!set.has(&EntitlementId::pro_growth()));
        assert_eq!(set.len(), 1);

        assert!(set.remove(&EntitlementId::pro_starter()));
        assert!(set.is_empty());
    }

    #[test]
    fn test_set_merge() {
        let mut a = EntitlementSet::from_strings(&["chravel_explorer"]);
        let b = EntitlementSet::from_strings(&["chravel_explorer", "beta_voice"]);
        a.merge(&b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_set_serializes_as_sorted_array() {
        let set = EntitlementSet::from_strings(&["b", "a"]);
        assert_eq!(serde_json::to_string(&set).unwrap(), "[\"a\",\"b\"]");

        let parsed: EntitlementSet = serde_json::from_str("[\"x\",\"x\"]").unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_deserialize_normalizes_ids() {
        let parsed: EntitlementSet =
            serde_json::from_str("[\"\", \" chravel_explorer \", \"   \", \"chravel_explorer\"]")
                .unwrap();
        assert_eq!(parsed, EntitlementSet::from_strings(&["chravel_explorer"]));

        let id: EntitlementId = serde_json::from_str("\"  beta_voice\\n\"").unwrap();
        assert_eq!(id.as_str(), "beta_voice");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"beta_voice\"");
    }
}
