//! Authority sources
//!
//! A resolution pass walks an ordered chain of [`AuthoritySource`]s. Each
//! source either decides the outcome of the pass or defers to the next one;
//! the first decision wins and later sources are not consulted.
//!
//! The default chain, highest priority first:
//!
//! | Source | Decides |
//! |---|---|
//! | [`SuperAdminSource`] | allow-all when the identity's email is allowlisted |
//! | [`DemoModeSource`] | allow-all while demo mode is on |
//! | [`NoIdentitySource`] | the signed-out state, releasing the native SDK |
//! | [`NativeReconciliationSource`] | nothing; forwards native purchases to the backend |
//! | [`CanonicalSource`] | the backend's record, or keep-previous on failure |

use async_trait::async_trait;
use chravel_billing::{EntitlementBackend, EntitlementSource, NativeBilling, NativeSupport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::identity::{SessionContext, SuperAdminAllowlist};
use crate::state::AuthorityState;

/// What a source decided for a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Replace the stored state
    Resolved(AuthorityState),

    /// Grant everything, attributed to the given source
    AllowAll(EntitlementSource),

    /// No opinion; ask the next source
    Defer,

    /// Keep the stored billing state; the reason is logged
    KeepPrevious(String),
}

impl Resolution {
    /// Whether this resolution ends the chain.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Resolution::Defer)
    }
}

/// One link in the resolution chain.
#[async_trait]
pub trait AuthoritySource: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Decide, or defer, for the given session.
    async fn resolve(&self, session: &SessionContext) -> Resolution;
}

/// Super-admin override by identity.
#[derive(Debug, Clone)]
pub struct SuperAdminSource {
    allowlist: SuperAdminAllowlist,
}

impl SuperAdminSource {
    /// Create a source over the given allowlist.
    pub fn new(allowlist: SuperAdminAllowlist) -> Self {
        Self { allowlist }
    }
}

#[async_trait]
impl AuthoritySource for SuperAdminSource {
    fn name(&self) -> &'static str {
        "super_admin"
    }

    async fn resolve(&self, session: &SessionContext) -> Resolution {
        match session.identity {
            Some(ref identity) if self.allowlist.is_super_admin(identity) => {
                Resolution::AllowAll(EntitlementSource::Admin)
            }
            _ => Resolution::Defer,
        }
    }
}

/// Demo mode override.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoModeSource;

#[async_trait]
impl AuthoritySource for DemoModeSource {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn resolve(&self, session: &SessionContext) -> Resolution {
        if session.demo_mode {
            Resolution::AllowAll(EntitlementSource::Demo)
        } else {
            Resolution::Defer
        }
    }
}

/// Clears state when nobody is signed in.
///
/// Logs the native SDK out once per sign-out, and only on native runtimes
/// with native billing enabled.
pub struct NoIdentitySource {
    native: Arc<dyn NativeBilling>,
    enabled: bool,
    /// Set when a signed-in pass got past this source on a native runtime
    pending_logout: AtomicBool,
}

impl NoIdentitySource {
    /// Create a source that logs the native SDK out on sign-out.
    pub fn new(native: Arc<dyn NativeBilling>, enabled: bool) -> Self {
        Self {
            native,
            enabled,
            pending_logout: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl AuthoritySource for NoIdentitySource {
    fn name(&self) -> &'static str {
        "no_identity"
    }

    async fn resolve(&self, session: &SessionContext) -> Resolution {
        let native = self.enabled && session.runtime.is_native();

        if session.is_authenticated() {
            if native {
                self.pending_logout.store(true, Ordering::SeqCst);
            }
            return Resolution::Defer;
        }

        if native && self.pending_logout.swap(false, Ordering::SeqCst) {
            if let Err(e) = self.native.logout().await {
                warn!(error = %e, "Native billing logout failed");
            }
        }
        Resolution::Resolved(AuthorityState::unauthenticated())
    }
}

/// Forwards native in-app purchases to the backend for reconciliation.
///
/// Runs only on native runtimes with native billing enabled. Never decides
/// the pass: the backend's record, fetched by [`CanonicalSource`], is what
/// counts.
pub struct NativeReconciliationSource {
    native: Arc<dyn NativeBilling>,
    backend: Arc<dyn EntitlementBackend>,
    enabled: bool,
}

impl NativeReconciliationSource {
    /// Create a reconciliation source.
    pub fn new(
        native: Arc<dyn NativeBilling>,
        backend: Arc<dyn EntitlementBackend>,
        enabled: bool,
    ) -> Self {
        Self {
            native,
            backend,
            enabled,
        }
    }

    async fn reconcile(&self, session: &SessionContext) {
        let Some(user_id) = session.user_id() else {
            return;
        };

        match self.native.configure(user_id).await {
            Ok(NativeSupport::Configured) => {}
            Ok(NativeSupport::Unsupported) => {
                debug!("Native billing unsupported on this device");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Native billing configure failed");
                return;
            }
        }

        let customer = match self.native.customer_info().await {
            Ok(customer) => customer,
            Err(e) => {
                warn!(error = %e, "Native customer info unavailable");
                return;
            }
        };

        match self.backend.reconcile_native(user_id, &customer).await {
            Ok(record) => info!(
                plan = record.plan.as_str(),
                status = record.status.as_str(),
                "Native purchases reconciled"
            ),
            Err(e) => warn!(error = %e, code = e.error_code(), "Native reconciliation failed"),
        }
    }
}

#[async_trait]
impl AuthoritySource for NativeReconciliationSource {
    fn name(&self) -> &'static str {
        "native_reconciliation"
    }

    async fn resolve(&self, session: &SessionContext) -> Resolution {
        if self.enabled && session.runtime.is_native() {
            self.reconcile(session).await;
        }
        Resolution::Defer
    }
}

/// The backend's canonical entitlement record.
pub struct CanonicalSource {
    backend: Arc<dyn EntitlementBackend>,
}

impl CanonicalSource {
    /// Create a source reading from the given backend.
    pub fn new(backend: Arc<dyn EntitlementBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl AuthoritySource for CanonicalSource {
    fn name(&self) -> &'static str {
        "canonical"
    }

    async fn resolve(&self, session: &SessionContext) -> Resolution {
        let Some(user_id) = session.user_id() else {
            return Resolution::Defer;
        };

        match self.backend.fetch_entitlements(user_id).await {
            Ok(record) => Resolution::Resolved(AuthorityState::from_record(user_id, &record)),
            Err(e) => Resolution::KeepPrevious(format!("{} ({})", e, e.error_code())),
        }
    }
}

/// Build the default resolution chain.
pub fn default_chain(
    allowlist: SuperAdminAllowlist,
    native: Arc<dyn NativeBilling>,
    backend: Arc<dyn EntitlementBackend>,
    native_billing_enabled: bool,
) -> Vec<Arc<dyn AuthoritySource>> {
    vec![
        Arc::new(SuperAdminSource::new(allowlist)),
        Arc::new(DemoModeSource),
        Arc::new(NoIdentitySource::new(
            native.clone(),
            native_billing_enabled,
        )),
        Arc::new(NativeReconciliationSource::new(
            native,
            backend.clone(),
            native_billing_enabled,
        )),
        Arc::new(CanonicalSource::new(backend)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use chravel_billing::{
        BackendError, BackendResult, CanonicalRecord, CustomerInfo, NativeBillingError,
        NativeResult, Runtime,
    };
    use chravel_tiers::SubscriptionTier;
    use std::sync::atomic::AtomicU32;
    use uuid::Uuid;

    #[derive(Default)]
    struct FakeBackend {
        fail: bool,
        fetches: AtomicU32,
        reconciles: AtomicU32,
    }

    #[async_trait]
    impl EntitlementBackend for FakeBackend {
        async fn fetch_entitlements(&self, _user_id: Uuid) -> BackendResult<CanonicalRecord> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BackendError::ApiError {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            Ok(CanonicalRecord::free())
        }

        async fn reconcile_native(
            &self,
            _user_id: Uuid,
            _customer: &CustomerInfo,
        ) -> BackendResult<CanonicalRecord> {
            self.reconciles.fetch_add(1, Ordering::SeqCst);
            Ok(CanonicalRecord::free())
        }
    }

    #[derive(Default)]
    struct FakeNative {
        fail_customer_info: bool,
        configures: AtomicU32,
        logouts: AtomicU32,
    }

    #[async_trait]
    impl NativeBilling for FakeNative {
        async fn configure(&self, _user_id: Uuid) -> NativeResult<NativeSupport> {
            self.configures.fetch_add(1, Ordering::SeqCst);
            Ok(NativeSupport::Configured)
        }

        async fn customer_info(&self) -> NativeResult<CustomerInfo> {
            if self.fail_customer_info {
                return Err(NativeBillingError::Sdk("store unavailable".to_string()));
            }
            Ok(CustomerInfo {
                original_app_user_id: "user".to_string(),
                active_entitlements: Vec::new(),
                active_subscriptions: Vec::new(),
                latest_expiration_date: None,
                management_url: None,
            })
        }

        async fn logout(&self) -> NativeResult<()> {
            self.logouts.fetch_add(1, Ordering::SeqCst);
            Err(NativeBillingError::NotConfigured)
        }
    }

    fn signed_in(runtime: Runtime) -> SessionContext {
        SessionContext {
            identity: Some(Identity::new(Uuid::now_v7()).with_email("traveler@chravel.app")),
            demo_mode: false,
            runtime,
        }
    }

    #[tokio::test]
    async fn test_super_admin_source() {
        let source = SuperAdminSource::new(SuperAdminAllowlist::parse("TRAVELER@chravel.app"));
        assert_eq!(
            source.resolve(&signed_in(Runtime::Web)).await,
            Resolution::AllowAll(EntitlementSource::Admin)
        );
        assert_eq!(
            source.resolve(&SessionContext::default()).await,
            Resolution::Defer
        );
    }

    #[tokio::test]
    async fn test_demo_source() {
        let mut session = SessionContext::default();
        assert_eq!(DemoModeSource.resolve(&session).await, Resolution::Defer);

        session.demo_mode = true;
        assert_eq!(
            DemoModeSource.resolve(&session).await,
            Resolution::AllowAll(EntitlementSource::Demo)
        );
    }

    fn signed_out(runtime: Runtime) -> SessionContext {
        SessionContext {
            runtime,
            ..SessionContext::default()
        }
    }

    #[tokio::test]
    async fn test_no_identity_source_swallows_logout_failure() {
        let native = Arc::new(FakeNative::default());
        let source = NoIdentitySource::new(native.clone(), true);

        assert_eq!(source.resolve(&signed_in(Runtime::Ios)).await, Resolution::Defer);
        assert_eq!(native.logouts.load(Ordering::SeqCst), 0);

        let resolution = source.resolve(&signed_out(Runtime::Ios)).await;
        match resolution {
            Resolution::Resolved(state) => {
                assert_eq!(state.user_id, None);
                assert!(!state.is_loading);
            }
            other => panic!("expected Resolved, got {:?}", other),
        }
        assert_eq!(native.logouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_identity_source_logs_out_once_per_sign_out() {
        let native = Arc::new(FakeNative::default());
        let source = NoIdentitySource::new(native.clone(), true);

        source.resolve(&signed_out(Runtime::Android)).await;
        assert_eq!(native.logouts.load(Ordering::SeqCst), 0);

        source.resolve(&signed_in(Runtime::Android)).await;
        source.resolve(&signed_out(Runtime::Android)).await;
        source.resolve(&signed_out(Runtime::Android)).await;
        assert_eq!(native.logouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_identity_source_leaves_native_alone_when_gated() {
        let native = Arc::new(FakeNative::default());
        let web = NoIdentitySource::new(native.clone(), true);
        web.resolve(&signed_in(Runtime::Web)).await;
        assert!(matches!(
            web.resolve(&signed_out(Runtime::Web)).await,
            Resolution::Resolved(_)
        ));

        let disabled = NoIdentitySource::new(native.clone(), false);
        disabled.resolve(&signed_in(Runtime::Ios)).await;
        assert!(matches!(
            disabled.resolve(&signed_out(Runtime::Ios)).await,
            Resolution::Resolved(_)
        ));

        assert_eq!(native.logouts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_native_reconciliation_only_on_native_runtime() {
        let native = Arc::new(FakeNative::default());
        let backend = Arc::new(FakeBackend::default());
        let source = NativeReconciliationSource::new(native.clone(), backend.clone(), true);

        assert_eq!(source.resolve(&signed_in(Runtime::Web)).await, Resolution::Defer);
        assert_eq!(native.configures.load(Ordering::SeqCst), 0);

        assert_eq!(source.resolve(&signed_in(Runtime::Ios)).await, Resolution::Defer);
        assert_eq!(native.configures.load(Ordering::SeqCst), 1);
        assert_eq!(backend.reconciles.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_native_reconciliation_disabled() {
        let native = Arc::new(FakeNative::default());
        let backend = Arc::new(FakeBackend::default());
        let source = NativeReconciliationSource::new(native.clone(), backend.clone(), false);

        assert_eq!(source.resolve(&signed_in(Runtime::Android)).await, Resolution::Defer);
        assert_eq!(native.configures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_native_reconciliation_swallows_sdk_failure() {
        let native = Arc::new(FakeNative {
            fail_customer_info: true,
            ..FakeNative::default()
        });
        let backend = Arc::new(FakeBackend::default());
        let source = NativeReconciliationSource::new(native.clone(), backend.clone(), true);

        assert_eq!(source.resolve(&signed_in(Runtime::Ios)).await, Resolution::Defer);
        assert_eq!(native.configures.load(Ordering::SeqCst), 1);
        assert_eq!(backend.reconciles.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_canonical_source() {
        let backend = Arc::new(FakeBackend::default());
        let source = CanonicalSource::new(backend.clone());
        let session = signed_in(Runtime::Web);

        match source.resolve(&session).await {
            Resolution::Resolved(state) => {
                assert_eq!(state.user_id, session.user_id());
                assert_eq!(state.plan, SubscriptionTier::Free);
            }
            other => panic!("expected Resolved, got {:?}", other),
        }

        let failing = CanonicalSource::new(Arc::new(FakeBackend {
            fail: true,
            ..FakeBackend::default()
        }));
        let resolution = failing.resolve(&session).await;
        assert!(matches!(resolution, Resolution::KeepPrevious(ref reason) if reason.contains("503")));
        assert!(resolution.is_terminal());
    }

    #[test]
    fn test_default_chain_order() {
        let chain = default_chain(
            SuperAdminAllowlist::default(),
            Arc::new(FakeNative::default()),
            Arc::new(FakeBackend::default()),
            true,
        );
        let names: Vec<&str> = chain.iter().map(|source| source.name()).collect();
        assert_eq!(
            names,
            vec!["super_admin", "demo", "no_identity", "native_reconciliation", "canonical"]
        );
    }
}
