//! Entitlements configuration.
//!
//! Billing settings plus the super-admin allowlist, loaded from environment
//! variables.

use chravel_billing::{BillingConfig, ConfigError};
use serde::{Deserialize, Serialize};

use crate::identity::SuperAdminAllowlist;

/// Entitlements engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntitlementsConfig {
    /// Backend, runtime and retry settings.
    #[serde(flatten)]
    pub billing: BillingConfig,

    /// Emails granted unconditional access.
    #[serde(default)]
    pub super_admin_emails: Vec<String>,
}

impl EntitlementsConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads everything [`BillingConfig::from_env`] reads, plus:
    /// - `CHRAVEL_SUPER_ADMIN_EMAILS`: Comma-separated super-admin emails (default: none)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            billing: BillingConfig::from_env()?,
            super_admin_emails: std::env::var("CHRAVEL_SUPER_ADMIN_EMAILS")
                .map(|list| parse_email_list(&list))
                .unwrap_or_default(),
        })
    }

    /// Super-admin allowlist built from the configured emails.
    pub fn allowlist(&self) -> SuperAdminAllowlist {
        SuperAdminAllowlist::new(&self.super_admin_emails)
    }

    /// Validate that required configuration is present for production.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        self.billing.validate_for_production()
    }
}

/// Split a comma-separated email list, dropping blank entries.
pub fn parse_email_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chravel_billing::Runtime;

    #[test]
    fn test_parse_email_list() {
        assert_eq!(
            parse_email_list(" ops@chravel.app, ,Founder@Chravel.app ,"),
            vec!["ops@chravel.app".to_string(), "Founder@Chravel.app".to_string()]
        );
        assert!(parse_email_list("").is_empty());
    }

    #[test]
    fn test_allowlist_from_config() {
        let config = EntitlementsConfig {
            super_admin_emails: vec!["Founder@Chravel.app".to_string()],
            ..EntitlementsConfig::default()
        };
        let allowlist = config.allowlist();
        assert!(allowlist.contains("founder@chravel.app"));
        assert_eq!(allowlist.len(), 1);
    }

    #[test]
    fn test_config_deserializes_flat() {
        let config: EntitlementsConfig = serde_json::from_value(serde_json::json!({
            "backend": { "base_url": "https://xyz.supabase.co", "api_key": "anon-key" },
            "runtime": "ios",
            "native_billing_enabled": true,
            "timeout_secs": 10,
            "max_retries": 2,
            "super_admin_emails": ["ops@chravel.app"]
        }))
        .unwrap();

        assert_eq!(config.billing.runtime, Runtime::Ios);
        assert!(config.billing.reconciles_native());
        assert_eq!(config.super_admin_emails.len(), 1);
        assert!(config.validate_for_production().is_ok());
    }
}
