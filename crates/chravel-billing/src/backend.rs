//! Backend entitlement client.
//!
//! HTTP client for the hosted backend's entitlement functions. Provides the
//! canonical record lookup and native-purchase reconciliation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::config::{BackendEndpoint, BillingConfig};
use crate::error::{BackendError, BackendResult};
use crate::native::CustomerInfo;
use crate::record::{CanonicalRecord, RecordPayload};
use crate::retry::{with_retry_if, RetryConfig};

/// Path of the canonical entitlement lookup.
pub const GET_ENTITLEMENTS_PATH: &str = "/functions/v1/get-entitlements";

/// Path of the native-purchase reconciliation function.
pub const SYNC_NATIVE_PATH: &str = "/functions/v1/sync-revenuecat-entitlement";

/// Source of canonical entitlement records.
#[async_trait]
pub trait EntitlementBackend: Send + Sync {
    /// Fetch the authoritative record for a user.
    async fn fetch_entitlements(&self, user_id: Uuid) -> BackendResult<CanonicalRecord>;

    /// Forward a native customer record for reconciliation into the
    /// canonical record, returning the reconciled record.
    async fn reconcile_native(
        &self,
        user_id: Uuid,
        customer: &CustomerInfo,
    ) -> BackendResult<CanonicalRecord>;
}

/// Request body for the canonical lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchEntitlementsParams {
    /// User to look up.
    pub user_id: Uuid,
}

/// Request body for native reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileNativeParams {
    /// User the purchase belongs to.
    pub user_id: Uuid,

    /// Customer record from the native SDK.
    pub customer_info: CustomerInfo,
}

/// Hosted backend client.
#[derive(Clone)]
pub struct BackendClient {
    /// HTTP client instance.
    client: Client,

    /// Backend endpoint configuration.
    endpoint: BackendEndpoint,

    /// Retry policy for transient failures.
    retry: RetryConfig,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.endpoint.base_url)
            .field("has_auth", &self.endpoint.has_auth())
            .field("retry", &self.retry)
            .finish()
    }
}

impl BackendClient {
    /// Create a new backend client.
    pub fn new(endpoint: BackendEndpoint, timeout: Duration) -> BackendResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            retry: RetryConfig::standard(),
        })
    }

    /// Create a client from billing configuration.
    pub fn from_config(config: &BillingConfig) -> BackendResult<Self> {
        Ok(Self::new(config.backend.clone(), config.timeout())?.with_retry(config.retry()))
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Endpoint this client talks to.
    pub fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }

    /// POST `body` to `path`, retrying transient failures.
    async fn post_record<B>(&self, path: &str, body: &B) -> BackendResult<CanonicalRecord>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint.url(path);

        with_retry_if(
            &self.retry,
            || self.send_once(&url, body),
            BackendError::is_transient,
        )
        .await
    }

    async fn send_once<B>(&self, url: &str, body: &B) -> BackendResult<CanonicalRecord>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.client.post(url).json(body);

        if let Some(ref api_key) = self.endpoint.api_key {
            request = request
                .header("Authorization", format!("Bearer {}", api_key))
                .header("apikey", api_key.as_str());
        }

        let response = request.send().await?;
        let payload: RecordPayload = self.handle_response(response).await?;
        payload.into_record()
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T>(&self, response: reqwest::Response) -> BackendResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            error!(status = status.as_u16(), "Backend rejected entitlement request credentials");
            return Err(BackendError::AuthenticationFailed);
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("Backend entitlement error ({}): {}", status.as_u16(), message);
            return Err(BackendError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl EntitlementBackend for BackendClient {
    #[instrument(skip(self))]
    async fn fetch_entitlements(&self, user_id: Uuid) -> BackendResult<CanonicalRecord> {
        debug!("Fetching canonical entitlements");
        self.post_record(GET_ENTITLEMENTS_PATH, &FetchEntitlementsParams { user_id })
            .await
    }

    #[instrument(skip(self, customer))]
    async fn reconcile_native(
        &self,
        user_id: Uuid,
        customer: &CustomerInfo,
    ) -> BackendResult<CanonicalRecord> {
        debug!(
            active_entitlements = customer.active_entitlements.len(),
            "Reconciling native purchases"
        );
        let params = ReconcileNativeParams {
            user_id,
            customer_info: customer.clone(),
        };
        self.post_record(SYNC_NATIVE_PATH, &params).await
    }
}
