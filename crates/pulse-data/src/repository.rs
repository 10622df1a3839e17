//! Provider listing and credential management.
//!
//! [`ProviderRepository`] turns persisted [`ProviderRecord`]s into
//! [`ProviderView`]s for the identity it is given:
//!
//! - no identity: nothing
//! - demo identity: the demo dataset's providers, writes skipped
//! - real identity: the identity's records, zeroed, with the `openai` record
//!   enriched by a live usage call when one is configured
//!
//! An enrichment failure never fails the listing; the affected view keeps
//! its zeroed defaults and [`DataSource::Stored`](pulse_core::DataSource).

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use pulse_core::Identity;
use tracing::{debug, info, warn};

use crate::demo::DemoDataset;
use crate::error::{DataResult, Result, ServiceError};
use crate::models::{
    CredentialSummary, ENRICHED_PROVIDER, NewProviderRecord, ProviderRecord, ProviderView,
    UsageSnapshot, WriteOutcome,
};
use crate::store::ProviderStore;

/// Notice shown when a write is attempted from the demo account.
pub const DEMO_WRITE_NOTICE: &str =
    "Demo account: API keys are not saved. Sign up to connect your own providers.";

/// Source of live usage numbers for a provider record.
#[async_trait]
pub trait UsageEnricher: Send + Sync {
    /// Fetch live usage for the identity's enriched provider.
    async fn fetch_usage(&self, identity: &Identity) -> DataResult<UsageSnapshot>;
}

/// Reads and writes provider connections on behalf of an identity.
pub struct ProviderRepository {
    store: Arc<dyn ProviderStore>,
    enricher: Option<Arc<dyn UsageEnricher>>,
    demo: Arc<DemoDataset>,
    demo_connected: Vec<String>,
}

impl ProviderRepository {
    /// Create a repository without live enrichment.
    pub fn new(store: Arc<dyn ProviderStore>, demo: Arc<DemoDataset>) -> Self {
        Self {
            store,
            enricher: None,
            demo,
            demo_connected: Vec::new(),
        }
    }

    /// Enrich the `openai` record through `enricher`.
    pub fn with_enricher(mut self, enricher: Arc<dyn UsageEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Providers reported as connected for the demo identity.
    pub fn with_demo_connected<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.demo_connected = providers.into_iter().map(Into::into).collect();
        self
    }

    /// List the providers visible to `identity`.
    ///
    /// The result keeps the store's record order regardless of which
    /// enrichment call finishes first.
    pub async fn list_providers(&self, identity: Option<&Identity>) -> Result<Vec<ProviderView>> {
        let Some(identity) = identity else {
            return Ok(Vec::new());
        };
        if identity.is_demo() {
            return Ok(self.demo.providers.clone());
        }

        let records = self
            .store
            .select_by_owner(&identity.id)
            .await
            .map_err(|e| {
                warn!(user_id = %identity.id, store = self.store.name(), error = %e, "provider query failed");
                ServiceError::collaborator(self.store.name(), e)
            })?;
        debug!(user_id = %identity.id, count = records.len(), "provider records loaded");

        Ok(join_all(records.iter().map(|record| self.to_view(identity, record))).await)
    }

    async fn to_view(&self, identity: &Identity, record: &ProviderRecord) -> ProviderView {
        let mut view = ProviderView::from_record(record);
        if record.provider_name != ENRICHED_PROVIDER {
            return view;
        }
        let Some(enricher) = &self.enricher else {
            return view;
        };

        match enricher.fetch_usage(identity).await {
            Ok(usage) => view.apply_usage(&usage),
            Err(e) => {
                warn!(
                    user_id = %identity.id,
                    provider = %record.provider_name,
                    error = %e,
                    "usage enrichment failed, keeping defaults"
                );
            }
        }
        view
    }

    /// Connected credentials with their keys masked.
    ///
    /// The demo identity sees the demo keys of its connected providers.
    pub async fn list_credentials(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Vec<CredentialSummary>> {
        let Some(identity) = identity else {
            return Ok(Vec::new());
        };
        if identity.is_demo() {
            return Ok(self
                .demo
                .api_keys
                .iter()
                .filter(|k| {
                    self.demo_connected
                        .iter()
                        .any(|p| p.eq_ignore_ascii_case(&k.provider_id))
                })
                .cloned()
                .collect());
        }

        let records = self
            .store
            .select_by_owner(&identity.id)
            .await
            .map_err(|e| {
                warn!(user_id = %identity.id, store = self.store.name(), error = %e, "credential query failed");
                ServiceError::collaborator(self.store.name(), e)
            })?;
        Ok(records.iter().map(CredentialSummary::from_record).collect())
    }

    /// Whether `identity` has `provider_name` connected. Lookup errors read as `false`.
    pub async fn is_provider_connected(
        &self,
        identity: Option<&Identity>,
        provider_name: &str,
    ) -> bool {
        let Some(identity) = identity else {
            return false;
        };
        if identity.is_demo() {
            let name = provider_name.trim();
            return self
                .demo_connected
                .iter()
                .any(|p| p.eq_ignore_ascii_case(name));
        }

        match self.lookup_provider(Some(identity), provider_name).await {
            Ok(record) => record.is_some(),
            Err(e) => {
                warn!(user_id = %identity.id, provider = provider_name, error = %e, "provider lookup failed");
                false
            }
        }
    }

    /// Point lookup of the persisted record, with failures reported.
    ///
    /// The demo identity has no persisted records.
    pub async fn lookup_provider(
        &self,
        identity: Option<&Identity>,
        provider_name: &str,
    ) -> Result<Option<ProviderRecord>> {
        let Some(identity) = identity else {
            return Ok(None);
        };
        if identity.is_demo() {
            return Ok(None);
        }
        self.store
            .find(&identity.id, &normalize(provider_name))
            .await
            .map_err(|e| ServiceError::collaborator(self.store.name(), e))
    }

    /// Store a credential for `provider_name`.
    pub async fn store_api_key(
        &self,
        identity: Option<&Identity>,
        provider_name: &str,
        credential: &str,
    ) -> Result<WriteOutcome> {
        let identity = identity.ok_or(ServiceError::Unauthorized)?;
        if identity.is_demo() {
            info!(provider = provider_name, "skipping credential write for demo account");
            return Ok(WriteOutcome::Skipped {
                notice: DEMO_WRITE_NOTICE.to_string(),
            });
        }

        let name = normalize(provider_name);
        if name.is_empty() {
            return Err(ServiceError::InvalidInput("provider name is empty".to_string()));
        }
        if credential.trim().is_empty() {
            return Err(ServiceError::InvalidInput("API key is empty".to_string()));
        }

        self.store
            .upsert(NewProviderRecord::new(&identity.id, &name, credential.trim()))
            .await
            .map_err(|e| {
                warn!(user_id = %identity.id, provider = %name, error = %e, "storing API key failed");
                ServiceError::collaborator(self.store.name(), e)
            })?;

        info!(user_id = %identity.id, provider = %name, "API key stored");
        Ok(WriteOutcome::Stored { provider: name })
    }

    /// Remove the credential for `provider_name`.
    pub async fn remove_api_key(
        &self,
        identity: Option<&Identity>,
        provider_name: &str,
    ) -> Result<WriteOutcome> {
        let identity = identity.ok_or(ServiceError::Unauthorized)?;
        if identity.is_demo() {
            info!(provider = provider_name, "skipping credential removal for demo account");
            return Ok(WriteOutcome::Skipped {
                notice: DEMO_WRITE_NOTICE.to_string(),
            });
        }

        let name = normalize(provider_name);
        let deleted = self.store.delete(&identity.id, &name).await.map_err(|e| {
            warn!(user_id = %identity.id, provider = %name, error = %e, "removing API key failed");
            ServiceError::collaborator(self.store.name(), e)
        })?;

        if deleted == 0 {
            return Err(ServiceError::NotFound {
                what: format!("{name} is not connected"),
            });
        }

        info!(user_id = %identity.id, provider = %name, "API key removed");
        Ok(WriteOutcome::Removed { provider: name })
    }
}

/// Provider names are stored lowercase and trimmed.
fn normalize(provider_name: &str) -> String {
    provider_name.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ProviderDatabase;
    use crate::error::DataError;
    use chrono::NaiveDate;
    use pulse_core::{DataSource, ProviderStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedUsage(AtomicUsize);

    #[async_trait]
    impl UsageEnricher for FixedUsage {
        async fn fetch_usage(&self, _identity: &Identity) -> DataResult<UsageSnapshot> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(UsageSnapshot {
                total_spend: 14.23,
                requests: 12540,
                latency: 245.0,
                status: ProviderStatus::Operational,
            })
        }
    }

    struct BrokenUsage;

    #[async_trait]
    impl UsageEnricher for BrokenUsage {
        async fn fetch_usage(&self, _identity: &Identity) -> DataResult<UsageSnapshot> {
            Err(DataError::EmptyResponse("fetch-openai-usage".into()))
        }
    }

    fn demo_data() -> Arc<DemoDataset> {
        Arc::new(DemoDataset::generate(
            Some(1),
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        ))
    }

    fn repository() -> (Arc<ProviderDatabase>, ProviderRepository) {
        let db = Arc::new(ProviderDatabase::open_in_memory().unwrap());
        let repo = ProviderRepository::new(db.clone(), demo_data())
            .with_demo_connected(["openai", "anthropic", "google", "aws"]);
        (db, repo)
    }

    fn demo() -> Identity {
        Identity::demo("demo-id", "demo@pulseapi.com")
    }

    fn real() -> Identity {
        Identity::real("u-1", "dev@example.com")
    }

    #[tokio::test]
    async fn test_no_identity_reads_empty() {
        let (_, repo) = repository();
        assert!(repo.list_providers(None).await.unwrap().is_empty());
        assert!(!repo.is_provider_connected(None, "openai").await);
        assert!(repo.lookup_provider(None, "openai").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_demo_lists_demo_providers() {
        let (_, repo) = repository();
        let providers = repo.list_providers(Some(&demo())).await.unwrap();
        assert_eq!(providers.len(), 6);
        let openai = providers.iter().find(|p| p.name == "OpenAI").unwrap();
        assert_eq!(openai.spend, 14.23);
    }

    #[tokio::test]
    async fn test_demo_connected_allow_list() {
        let (_, repo) = repository();
        assert!(repo.is_provider_connected(Some(&demo()), "openai").await);
        assert!(repo.is_provider_connected(Some(&demo()), "OpenAI").await);
        assert!(!repo.is_provider_connected(Some(&demo()), "stripe").await);
    }

    #[tokio::test]
    async fn test_demo_writes_skipped() {
        let (db, repo) = repository();
        let outcome = repo
            .store_api_key(Some(&demo()), "openai", "sk-test")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WriteOutcome::Skipped {
                notice: DEMO_WRITE_NOTICE.to_string()
            }
        );
        assert!(db.records_for_user("demo-id").unwrap().is_empty());

        let removed = repo.remove_api_key(Some(&demo()), "openai").await.unwrap();
        assert!(matches!(removed, WriteOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_writes_require_identity() {
        let (_, repo) = repository();
        let err = repo.store_api_key(None, "openai", "sk").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized));
        let err = repo.remove_api_key(None, "openai").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized));
    }

    #[tokio::test]
    async fn test_list_credentials_masks_keys() {
        let (_, repo) = repository();
        let who = real();
        repo.store_api_key(Some(&who), "openai", "sk-proj-abcdefghijklmnopqrstXm4z")
            .await
            .unwrap();

        let keys = repo.list_credentials(Some(&who)).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].provider_id, "openai");
        assert!(keys[0].masked_key.starts_with("sk-proj-***"));
        assert!(keys[0].masked_key.ends_with("Xm4z"));
        assert!(!keys[0].masked_key.contains("abcdefgh"));
        assert!(keys[0].connected_at.is_some());

        assert!(repo.list_credentials(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_demo_credentials_follow_allow_list() {
        let (_, repo) = repository();
        let keys = repo.list_credentials(Some(&demo())).await.unwrap();
        let ids: Vec<_> = keys.iter().map(|k| k.provider_id.as_str()).collect();
        assert_eq!(ids, vec!["openai", "anthropic", "google", "aws"]);
    }

    #[tokio::test]
    async fn test_real_without_records_is_empty() {
        let (_, repo) = repository();
        assert!(repo.list_providers(Some(&real())).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_then_remove_roundtrip() {
        let (_, repo) = repository();
        let who = real();

        let stored = repo.store_api_key(Some(&who), " OpenAI ", "sk-test").await.unwrap();
        assert_eq!(stored, WriteOutcome::Stored { provider: "openai".into() });
        assert!(repo.is_provider_connected(Some(&who), "openai").await);

        let removed = repo.remove_api_key(Some(&who), "openai").await.unwrap();
        assert_eq!(removed, WriteOutcome::Removed { provider: "openai".into() });
        assert!(!repo.is_provider_connected(Some(&who), "openai").await);

        let err = repo.remove_api_key(Some(&who), "openai").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_store_rejects_empty_values() {
        let (_, repo) = repository();
        let err = repo.store_api_key(Some(&real()), "  ", "sk").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        let err = repo.store_api_key(Some(&real()), "openai", " ").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_real_records_mapped_with_defaults() {
        let (_, repo) = repository();
        let who = real();
        repo.store_api_key(Some(&who), "stripe", "sk_live").await.unwrap();
        repo.store_api_key(Some(&who), "twilio", "AC123").await.unwrap();

        let views = repo.list_providers(Some(&who)).await.unwrap();
        let names: Vec<_> = views.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Stripe", "Twilio"]);
        assert!(views.iter().all(|v| v.spend == 0.0 && v.requests == 0));
        assert!(views.iter().all(|v| v.source == DataSource::Stored));
    }

    #[tokio::test]
    async fn test_openai_enriched_only() {
        let (db, _) = repository();
        let usage = Arc::new(FixedUsage(AtomicUsize::new(0)));
        let repo = ProviderRepository::new(db, demo_data()).with_enricher(usage.clone());
        let who = real();
        repo.store_api_key(Some(&who), "anthropic", "k").await.unwrap();
        repo.store_api_key(Some(&who), "openai", "k").await.unwrap();

        let views = repo.list_providers(Some(&who)).await.unwrap();
        assert_eq!(usage.0.load(Ordering::SeqCst), 1);
        assert_eq!(views[0].name, "Anthropic");
        assert_eq!(views[0].source, DataSource::Stored);
        assert_eq!(views[1].name, "Openai");
        assert_eq!(views[1].requests, 12540);
        assert_eq!(views[1].spend, 14.23);
        assert_eq!(views[1].source, DataSource::Live);
    }

    #[tokio::test]
    async fn test_enrichment_failure_is_isolated() {
        let (db, _) = repository();
        let repo = ProviderRepository::new(db, demo_data()).with_enricher(Arc::new(BrokenUsage));
        let who = real();
        repo.store_api_key(Some(&who), "openai", "k").await.unwrap();
        repo.store_api_key(Some(&who), "aws", "k").await.unwrap();

        let views = repo.list_providers(Some(&who)).await.unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].name, "Openai");
        assert_eq!(views[0].spend, 0.0);
        assert_eq!(views[0].source, DataSource::Stored);
        assert_eq!(views[1].name, "Aws");
        assert_eq!(views[1].color, "#ff9900");
    }
}
