//! HTTP client for the PulseAPI backend.
//!
//! [`BackendClient`] talks to three parts of the backend:
//!
//! - `auth/v1/user` - resolves the identity behind an access token
//!   ([`SessionAccessor`])
//! - `functions/v1/fetch-openai-usage` - live usage numbers
//!   ([`UsageEnricher`])
//! - `functions/v1/trigger-alerts` - alert delivery ([`AlertSink`])
//!
//! It also implements [`ProviderStore`](crate::store::ProviderStore) over
//! the REST interface (see [`crate::rest_store`]).
//!
//! ## Example
//!
//! ```no_run
//! use pulse_data::backend::BackendClient;
//! use pulse_data::session::SessionAccessor;
//! use std::time::Duration;
//!
//! # async fn example() -> pulse_data::error::DataResult<()> {
//! let client = BackendClient::new("https://abc.supabase.co", Some("anon-key".into()), Duration::from_secs(30))?
//!     .with_access_token("user-jwt");
//! let identity = client.current_identity().await;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use pulse_config::PulseConfig;
use pulse_core::Identity;
use pulse_core::types::DEFAULT_DEMO_EMAIL;
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::alerts::AlertSink;
use crate::error::{DataError, DataResult};
use crate::models::{AlertReceipt, AlertRequest, UsageSnapshot};
use crate::repository::UsageEnricher;
use crate::session::SessionAccessor;

/// Edge function returning live OpenAI usage.
pub const USAGE_FUNCTION: &str = "fetch-openai-usage";

/// Edge function delivering alerts.
pub const ALERT_FUNCTION: &str = "trigger-alerts";

/// Client for the backend's auth, REST, and function endpoints.
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: Option<String>,
    access_token: Option<String>,
    demo_email: String,
}

/// User object returned by the auth endpoint.
#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl BackendClient {
    /// Create a client for `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        anon_key: Option<String>,
        timeout: Duration,
    ) -> DataResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key,
            access_token: None,
            demo_email: DEFAULT_DEMO_EMAIL.to_string(),
        })
    }

    /// Create a client from configuration. A missing anon key is tolerated;
    /// requests then go out without the `apikey` header.
    pub fn from_config(config: &PulseConfig) -> DataResult<Self> {
        let anon_key = match config.anon_key() {
            Ok(key) => Some(key),
            Err(e) => {
                debug!(error = %e, "anon key not set");
                None
            }
        };
        Ok(
            Self::new(
                config.backend_url(),
                anon_key,
                Duration::from_secs(config.backend.timeout_secs),
            )?
            .with_demo_email(config.demo.email.clone()),
        )
    }

    /// Authenticate requests as a signed-in user.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Email that marks the demo identity.
    pub fn with_demo_email(mut self, email: impl Into<String>) -> Self {
        self.demo_email = email.into();
        self
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a request with the backend's auth headers.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}/{}", self.base_url, path.trim_start_matches('/')));
        if let Some(key) = &self.anon_key {
            builder = builder.header("apikey", key);
        }
        if let Some(bearer) = self.access_token.as_ref().or(self.anon_key.as_ref()) {
            builder = builder.bearer_auth(bearer);
        }
        builder
    }

    /// Send a request, mapping non-success statuses to [`DataError::Api`].
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> DataResult<T> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::from_http_status(status.as_u16(), &body));
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Invoke a backend function with a JSON body.
    async fn call_function<B, T>(&self, name: &str, body: &B) -> DataResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!(function = name, "invoking backend function");
        self.send_json(
            self.request(Method::POST, &format!("functions/v1/{name}"))
                .json(body),
        )
        .await
    }

    /// Fetch the user behind the access token.
    async fn fetch_user(&self) -> DataResult<Identity> {
        let user: AuthUser = self
            .send_json(self.request(Method::GET, "auth/v1/user"))
            .await?;
        Ok(Identity::classify(
            user.id,
            user.email.unwrap_or_default(),
            &self.demo_email,
        ))
    }
}

#[async_trait]
impl SessionAccessor for BackendClient {
    async fn current_identity(&self) -> Option<Identity> {
        if self.access_token.is_none() {
            return None;
        }
        match self.fetch_user().await {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!(error = %e, "session lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl UsageEnricher for BackendClient {
    async fn fetch_usage(&self, identity: &Identity) -> DataResult<UsageSnapshot> {
        debug!(user_id = %identity.id, "fetching live usage");
        self.call_function(USAGE_FUNCTION, &serde_json::json!({}))
            .await
    }
}

#[async_trait]
impl AlertSink for BackendClient {
    async fn deliver(&self, request: &AlertRequest) -> DataResult<AlertReceipt> {
        self.call_function(ALERT_FUNCTION, request).await
    }
}
