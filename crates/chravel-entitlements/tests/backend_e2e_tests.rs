//! End-to-end tests: the facade resolving against a mocked hosted backend.
//!
//! The real `BackendClient` talks to a wiremock server, so these tests cover
//! the wire format, retry and failure handling as the facade sees them.

use chravel_billing::{
    BackendClient, BackendEndpoint, EntitlementSource, RetryConfig, UnsupportedNativeBilling,
    GET_ENTITLEMENTS_PATH,
};
use chravel_entitlements::{EntitlementsConfig, Identity, UnifiedEntitlements, UsageContext};
use chravel_tiers::{EntitlementId, FeatureName, Limit, SubscriptionTier};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Test fixture providing a mock backend and a facade wired to it.
struct TestFixture {
    /// Mock backend server.
    server: MockServer,
    /// Facade under test.
    facade: UnifiedEntitlements,
}

impl TestFixture {
    async fn new() -> Self {
        let server = MockServer::start().await;

        let mut config = EntitlementsConfig::default();
        config.billing.backend = BackendEndpoint {
            base_url: server.uri(),
            api_key: Some("test-backend-key".to_string()),
        };
        config.super_admin_emails = vec!["ops@chravel.app".to_string()];

        let client = BackendClient::new(config.billing.backend.clone(), Duration::from_secs(5))
            .unwrap()
            .with_retry(RetryConfig {
                max_attempts: 2,
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(10),
                exponential_base: 1.0,
            });

        let facade = UnifiedEntitlements::with_backend(
            &config,
            Arc::new(UnsupportedNativeBilling),
            Arc::new(client),
        );

        Self { server, facade }
    }
}

#[tokio::test]
async fn test_sign_in_resolves_backend_record() {
    let fixture = TestFixture::new().await;
    let user_id = Uuid::now_v7();

    Mock::given(method("POST"))
        .and(path(GET_ENTITLEMENTS_PATH))
        .and(header("apikey", "test-backend-key"))
        .and(body_json(json!({ "user_id": user_id })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "plan": "pro_growth",
            "status": "trialing",
            "source": "stripe",
            "entitlements": ["chravel_pro_growth"],
            "current_period_end": "2026-11-19T00:00:00Z"
        })))
        .expect(1)
        .mount(&fixture.server)
        .await;

    fixture
        .facade
        .set_identity(Some(Identity::new(user_id).with_email("lead@chravel.app")))
        .await;

    let facade = &fixture.facade;
    assert!(!facade.is_loading());
    assert_eq!(facade.plan(), SubscriptionTier::ProGrowth);
    assert!(facade.is_subscribed());
    assert!(facade.has_entitlement(&EntitlementId::pro_growth()));
    assert_eq!(facade.get_limit(FeatureName::Integrations), Limit::Quota(5));
    assert!(!facade.can_use(FeatureName::Integrations, &UsageContext::with_usage(5)));
    assert_eq!(facade.authority().source, EntitlementSource::Stripe);
}

#[tokio::test]
async fn test_transient_failure_is_retried_within_a_pass() {
    let fixture = TestFixture::new().await;

    Mock::given(method("POST"))
        .and(path(GET_ENTITLEMENTS_PATH))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&fixture.server)
        .await;

    Mock::given(method("POST"))
        .and(path(GET_ENTITLEMENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "plan": "explorer",
            "status": "active",
            "source": "revenuecat"
        })))
        .expect(1)
        .mount(&fixture.server)
        .await;

    fixture
        .facade
        .set_identity(Some(Identity::new(Uuid::now_v7())))
        .await;

    assert_eq!(fixture.facade.plan(), SubscriptionTier::Explorer);
    assert_eq!(fixture.facade.resolution_stats().source_failures, 0);
}

#[tokio::test]
async fn test_outage_keeps_previous_entitlements() {
    let fixture = TestFixture::new().await;

    Mock::given(method("POST"))
        .and(path(GET_ENTITLEMENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "plan": "frequent-chraveler",
            "status": "active",
            "source": "revenuecat"
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&fixture.server)
        .await;

    Mock::given(method("POST"))
        .and(path(GET_ENTITLEMENTS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .expect(2)
        .mount(&fixture.server)
        .await;

    fixture
        .facade
        .set_identity(Some(Identity::new(Uuid::now_v7())))
        .await;
    assert_eq!(fixture.facade.plan(), SubscriptionTier::FrequentChraveler);

    fixture.facade.refresh_entitlements().await;

    assert_eq!(fixture.facade.plan(), SubscriptionTier::FrequentChraveler);
    assert!(!fixture.facade.is_loading());
    assert!(fixture
        .facade
        .can_use(FeatureName::Voice, &UsageContext::unknown()));
    assert_eq!(fixture.facade.resolution_stats().source_failures, 1);
}

#[tokio::test]
async fn test_rejected_credentials_keep_signed_in_user_free() {
    let fixture = TestFixture::new().await;

    Mock::given(method("POST"))
        .and(path(GET_ENTITLEMENTS_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&fixture.server)
        .await;

    let user_id = Uuid::now_v7();
    fixture
        .facade
        .set_identity(Some(Identity::new(user_id)))
        .await;

    let stored = fixture.facade.stored_authority();
    assert_eq!(stored.user_id, Some(user_id));
    assert_eq!(stored.plan, SubscriptionTier::Free);
    assert!(!stored.is_loading);
    assert_eq!(
        fixture.facade.get_limit(FeatureName::TripCreation),
        Limit::Quota(3)
    );
}

#[tokio::test]
async fn test_super_admin_never_calls_backend() {
    let fixture = TestFixture::new().await;

    Mock::given(method("POST"))
        .and(path(GET_ENTITLEMENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "plan": "free" })))
        .expect(0)
        .mount(&fixture.server)
        .await;

    fixture
        .facade
        .set_identity(Some(Identity::new(Uuid::now_v7()).with_email("Ops@Chravel.app")))
        .await;

    assert!(fixture.facade.is_super_admin());
    assert_eq!(fixture.facade.get_limit(FeatureName::Approvals), Limit::Unlimited);
}
