//! # Chravel Entitlements
//!
//! The unified entitlements and feature-gating engine for Chravel.
//!
//! ## Overview
//!
//! Given the signed-in identity, billing signals from native in-app
//! purchases and web subscriptions, and two local overrides (super-admin and
//! demo mode), this crate answers one question consistently: may this user
//! use this feature right now?
//!
//! The chravel-entitlements crate handles:
//! - **Facade**: `can_use`, `get_limit`, `has_entitlement` and
//!   `refresh_entitlements`, plus derived views
//! - **Sources**: The ordered chain of authorities consulted on each pass
//! - **Store**: The single mutable [`AuthorityState`], replaced wholesale
//! - **Signals**: Session events that trigger re-resolution
//! - **Configuration**: Billing settings and the super-admin allowlist
//!
//! ## Architecture
//!
//! ```text
//! SessionSignal ─→ UnifiedEntitlements ─→ resolution pass
//!                        │                    │
//!                        │      SuperAdmin → Demo → NoIdentity
//!                        │        → NativeReconciliation → Canonical
//!                        │                    │
//!                        │                    ▼
//!                        └──── reads ──── EntitlementsStore (watch)
//!                                  + TierPolicy
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chravel_billing::UnsupportedNativeBilling;
//! use chravel_entitlements::{EntitlementsConfig, SignalHub, SessionSignal, UnifiedEntitlements};
//! use chravel_tiers::{FeatureName, Limit};
//! use std::sync::Arc;
//!
//! async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EntitlementsConfig::from_env()?;
//!     let entitlements = Arc::new(UnifiedEntitlements::from_config(
//!         &config,
//!         Arc::new(UnsupportedNativeBilling),
//!     )?);
//!
//!     let hub = SignalHub::new();
//!     let _listener = entitlements.spawn_signal_listener(hub.subscribe());
//!     hub.publish(SessionSignal::RefreshRequested);
//!
//!     if entitlements.get_limit(FeatureName::Channels) == Limit::Blocked {
//!         println!("channels are a pro feature");
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod facade;
pub mod identity;
pub mod signals;
pub mod sources;
pub mod state;
pub mod store;

// Re-export main types
pub use config::EntitlementsConfig;
pub use error::{EntitlementsError, EntitlementsResult};
pub use facade::{UnifiedEntitlements, UsageContext};
pub use identity::{Identity, SessionContext, SuperAdminAllowlist};
pub use signals::{SessionSignal, SignalHub, SignalHubStats};
pub use sources::{
    default_chain, AuthoritySource, CanonicalSource, DemoModeSource, NativeReconciliationSource,
    NoIdentitySource, Resolution, SuperAdminSource,
};
pub use state::AuthorityState;
pub use store::{CommitOutcome, EntitlementsStore, PassTicket, PendingPass, ResolutionStats};
