//! Identity and session context
//!
//! This module provides the signed-in identity as the entitlements engine
//! sees it, the super-admin allowlist matched against that identity, and
//! the session context every resolution pass reads.

use chravel_billing::Runtime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A signed-in user as reported by the identity provider.
///
/// # Examples
///
/// ```
/// use chravel_entitlements::Identity;
/// use uuid::Uuid;
///
/// let identity = Identity::new(Uuid::now_v7()).with_email("ops@chravel.app");
/// assert_eq!(identity.email.as_deref(), Some("ops@chravel.app"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// User ID
    pub id: Uuid,

    /// Primary email, when the provider exposes one
    #[serde(default)]
    pub email: Option<String>,
}

impl Identity {
    /// Creates an identity with no email.
    pub fn new(id: Uuid) -> Self {
        Self { id, email: None }
    }

    /// Sets the identity's email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Emails granted unconditional access.
///
/// Matching is case-insensitive and ignores surrounding whitespace on both
/// the configured entries and the identity's email.
///
/// # Examples
///
/// ```
/// use chravel_entitlements::{Identity, SuperAdminAllowlist};
/// use uuid::Uuid;
///
/// let allowlist = SuperAdminAllowlist::parse(" Ops@Chravel.app , founder@chravel.app");
/// let admin = Identity::new(Uuid::now_v7()).with_email("ops@chravel.app ");
///
/// assert!(allowlist.is_super_admin(&admin));
/// assert_eq!(allowlist.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuperAdminAllowlist {
    emails: BTreeSet<String>,
}

impl SuperAdminAllowlist {
    /// Builds an allowlist from email entries. Blank entries are ignored.
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|email| normalize_email(email.as_ref()))
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }

    /// Parses a comma-separated list of emails.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Whether the email is on the allowlist.
    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&normalize_email(email))
    }

    /// Whether the identity is a super-admin.
    pub fn is_super_admin(&self, identity: &Identity) -> bool {
        identity
            .email
            .as_deref()
            .map(|email| self.contains(email))
            .unwrap_or(false)
    }

    /// Normalized entries, sorted.
    pub fn emails(&self) -> impl Iterator<Item = &str> {
        self.emails.iter().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.emails.len()
    }

    /// Whether the allowlist is empty.
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Everything a resolution pass needs to know about the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Signed-in identity, if any
    pub identity: Option<Identity>,

    /// Whether demo mode is on
    pub demo_mode: bool,

    /// Runtime the app is running on
    pub runtime: Runtime,
}

impl SessionContext {
    /// Creates a signed-out session on the given runtime.
    pub fn new(runtime: Runtime) -> Self {
        Self {
            identity: None,
            demo_mode: false,
            runtime,
        }
    }

    /// ID of the signed-in user.
    pub fn user_id(&self) -> Option<Uuid> {
        self.identity.as_ref().map(|identity| identity.id)
    }

    /// Whether a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}
