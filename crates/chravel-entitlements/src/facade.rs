//! Unified entitlements facade
//!
//! [`UnifiedEntitlements`] is the only surface the rest of the app talks
//! to. Queries (`can_use`, `get_limit`, `has_entitlement` and the derived
//! views) are synchronous reads of the store and the tier policy table and
//! never fail or perform I/O. Session triggers update the session context
//! and run a resolution pass through the authority chain.
//!
//! # Examples
//!
//! ```rust,no_run
//! use chravel_billing::UnsupportedNativeBilling;
//! use chravel_entitlements::{EntitlementsConfig, Identity, UnifiedEntitlements, UsageContext};
//! use chravel_tiers::FeatureName;
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EntitlementsConfig::from_env()?;
//!     let entitlements = UnifiedEntitlements::from_config(&config, Arc::new(UnsupportedNativeBilling))?;
//!
//!     entitlements
//!         .set_identity(Some(Identity::new(Uuid::now_v7())))
//!         .await;
//!
//!     if entitlements.can_use(FeatureName::TripCreation, &UsageContext::with_usage(2)) {
//!         println!("room for another trip");
//!     }
//!     Ok(())
//! }
//! ```

use chravel_billing::{BackendClient, EntitlementBackend, NativeBilling, Runtime};
use chravel_tiers::{EntitlementId, FeatureName, Limit, SubscriptionTier, TierPolicy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::EntitlementsConfig;
use crate::error::EntitlementsResult;
use crate::identity::{Identity, SessionContext};
use crate::signals::SessionSignal;
use crate::sources::{default_chain, AuthoritySource, Resolution};
use crate::state::AuthorityState;
use crate::store::{CommitOutcome, EntitlementsStore, PendingPass, ResolutionStats};

/// Caller-supplied usage for quota checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageContext {
    /// How much of the feature the user has already consumed, if known
    pub usage_count: Option<u32>,
}

impl UsageContext {
    /// No usage known; quota checks pass.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Known usage.
    pub fn with_usage(usage_count: u32) -> Self {
        Self {
            usage_count: Some(usage_count),
        }
    }
}

/// Entitlement decisions for the current session.
pub struct UnifiedEntitlements {
    policy: TierPolicy,
    store: EntitlementsStore,
    session: watch::Sender<SessionContext>,
    chain: Vec<Arc<dyn AuthoritySource>>,
}

impl std::fmt::Debug for UnifiedEntitlements {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<&str> = self.chain.iter().map(|source| source.name()).collect();
        f.debug_struct("UnifiedEntitlements")
            .field("session", &*self.session.borrow())
            .field("store", &self.store)
            .field("chain", &sources)
            .finish()
    }
}

impl UnifiedEntitlements {
    /// Create a facade over an explicit policy table and resolution chain.
    pub fn new(
        policy: TierPolicy,
        chain: Vec<Arc<dyn AuthoritySource>>,
        runtime: Runtime,
    ) -> Self {
        let (session, _) = watch::channel(SessionContext::new(runtime));
        Self {
            policy,
            store: EntitlementsStore::new(),
            session,
            chain,
        }
    }

    /// Create a facade with the standard policy table and default chain.
    pub fn with_backend(
        config: &EntitlementsConfig,
        native: Arc<dyn NativeBilling>,
        backend: Arc<dyn EntitlementBackend>,
    ) -> Self {
        let chain = default_chain(
            config.allowlist(),
            native,
            backend,
            config.billing.native_billing_enabled,
        );
        Self::new(TierPolicy::standard(), chain, config.billing.runtime)
    }

    /// Create a facade talking to the configured hosted backend.
    pub fn from_config(
        config: &EntitlementsConfig,
        native: Arc<dyn NativeBilling>,
    ) -> EntitlementsResult<Self> {
        let backend = BackendClient::from_config(&config.billing)?;
        Ok(Self::with_backend(config, native, Arc::new(backend)))
    }

    // Queries

    /// Whether the user may use `feature` given their current usage.
    ///
    /// Overrides always allow. Otherwise unlimited allows, blocked denies,
    /// and a quota allows while `usage_count` is below it. Unknown usage
    /// allows.
    pub fn can_use(&self, feature: FeatureName, usage: &UsageContext) -> bool {
        let state = self.store.snapshot();
        if state.is_override_active() {
            return true;
        }
        self.policy.allows(feature, state.plan, usage.usage_count)
    }

    /// Numeric limit of `feature` for the user's plan.
    pub fn get_limit(&self, feature: FeatureName) -> Limit {
        let state = self.store.snapshot();
        if state.is_override_active() {
            return Limit::Unlimited;
        }
        self.policy.limit_for(feature, state.plan)
    }

    /// Whether the user holds a capability flag.
    pub fn has_entitlement(&self, id: &EntitlementId) -> bool {
        let state = self.store.snapshot();
        state.is_override_active() || state.entitlements.has(id)
    }

    /// Quota left for `feature` after `usage`; `None` when unlimited.
    pub fn remaining(&self, feature: FeatureName, usage: u32) -> Option<u32> {
        self.get_limit(feature).remaining(usage)
    }

    /// Effective state, with any override applied.
    pub fn authority(&self) -> AuthorityState {
        self.store.snapshot().effective()
    }

    /// State as stored, without overrides applied.
    pub fn stored_authority(&self) -> Arc<AuthorityState> {
        self.store.snapshot()
    }

    /// Effective plan.
    pub fn plan(&self) -> SubscriptionTier {
        self.authority().plan
    }

    /// Whether the user effectively holds a pro plan.
    pub fn is_pro(&self) -> bool {
        self.authority().is_pro
    }

    /// Whether the user effectively has an active subscription.
    pub fn is_subscribed(&self) -> bool {
        self.authority().is_subscribed
    }

    /// Whether the super-admin override is in force.
    pub fn is_super_admin(&self) -> bool {
        self.store.snapshot().is_super_admin
    }

    /// Whether the demo override is in force.
    pub fn is_demo(&self) -> bool {
        self.store.snapshot().is_demo()
    }

    /// Whether the state is not yet authoritative.
    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    /// Whether the user may create a pro trip.
    pub fn can_create_pro_trip(&self) -> bool {
        self.is_pro()
    }

    /// Current session context.
    pub fn session(&self) -> SessionContext {
        self.session.borrow().clone()
    }

    /// Receiver notified whenever the stored state is replaced.
    pub fn subscribe(&self) -> watch::Receiver<Arc<AuthorityState>> {
        self.store.subscribe()
    }

    /// Resolution statistics.
    pub fn resolution_stats(&self) -> ResolutionStats {
        self.store.stats()
    }

    /// The tier policy table in use.
    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    // Triggers

    /// Re-resolve entitlements and wait for the store to be updated.
    ///
    /// Safe to cancel: dropping the future abandons the pass, and the
    /// loading flag it raised is cleared unless a newer pass is running.
    pub async fn refresh_entitlements(&self) {
        self.run_pass().await;
    }

    /// Switch the signed-in identity and re-resolve.
    pub async fn set_identity(&self, identity: Option<Identity>) {
        self.session.send_modify(|session| session.identity = identity);
        self.run_pass().await;
    }

    /// Turn demo mode on or off and re-resolve.
    pub async fn set_demo_mode(&self, enabled: bool) {
        self.session.send_modify(|session| session.demo_mode = enabled);
        self.run_pass().await;
    }

    /// Re-resolve after the native app returns to the foreground.
    ///
    /// Ignored on the web runtime.
    pub async fn app_foregrounded(&self) {
        let runtime = self.session.borrow().runtime;
        if !runtime.is_native() {
            debug!("Ignoring foreground signal on web runtime");
            return;
        }
        self.run_pass().await;
    }

    /// Apply a session signal.
    pub async fn handle_signal(&self, signal: SessionSignal) {
        debug!(signal = signal.kind(), "Handling session signal");
        match signal {
            SessionSignal::IdentityChanged { identity } => self.set_identity(identity).await,
            SessionSignal::DemoModeToggled { enabled } => self.set_demo_mode(enabled).await,
            SessionSignal::AppForegrounded => self.app_foregrounded().await,
            SessionSignal::RefreshRequested => self.refresh_entitlements().await,
        }
    }

    /// Spawn a task applying every signal received on `signals`.
    ///
    /// The task ends when the signal channel closes. If it falls behind and
    /// signals are dropped, it runs one refresh to catch up.
    pub fn spawn_signal_listener(
        self: &Arc<Self>,
        mut signals: broadcast::Receiver<SessionSignal>,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match signals.recv().await {
                    Ok(signal) => this.handle_signal(signal).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Session signal listener lagged; refreshing");
                        this.refresh_entitlements().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Session signal channel closed");
                        break;
                    }
                }
            }
        })
    }

    #[instrument(skip(self))]
    async fn run_pass(&self) {
        let pass = PendingPass::begin(&self.store);
        let session = self.session();
        let user_id = session.user_id();

        let mut decision = None;
        for source in &self.chain {
            let resolution = source.resolve(&session).await;
            if resolution.is_terminal() {
                debug!(source = source.name(), "Authority source decided");
                decision = Some(resolution);
                break;
            }
        }

        let resolution = decision.unwrap_or_else(|| {
            Resolution::KeepPrevious("no authority source decided".to_string())
        });

        if let Resolution::KeepPrevious(ref reason) = resolution {
            warn!(reason = %reason, "Keeping previous entitlements");
            self.store.record_source_failure();
        }

        let outcome = pass.commit(|current| match resolution {
            Resolution::Resolved(state) => state,
            Resolution::AllowAll(source) => AuthorityState::allow_all(current, user_id, source),
            Resolution::KeepPrevious(_) | Resolution::Defer => {
                AuthorityState::kept(current, user_id)
            }
        });

        if outcome == CommitOutcome::Committed {
            let state = self.store.snapshot();
            info!(
                plan = state.plan.as_str(),
                source = state.source.as_str(),
                override_source = state.override_source.map(|s| s.as_str()),
                "Entitlements updated"
            );
        }
    }
}
