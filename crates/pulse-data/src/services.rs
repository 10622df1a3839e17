//! Service wiring and page loads.
//!
//! [`PulseServices`] builds the repository, aggregator, and dispatcher from
//! configuration and shares them behind `Arc`s. [`PulseServices::load_dashboard_for`]
//! passes one resolved identity to every component.

use std::sync::Arc;

use pulse_config::{PulseConfig, StoreKind};
use pulse_core::Identity;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::alerts::AlertDispatcher;
use crate::backend::BackendClient;
use crate::db::ProviderDatabase;
use crate::demo::DemoDataset;
use crate::error::{DataResult, Degrade};
use crate::metrics::MetricsAggregator;
use crate::models::{AlertRecord, KpiSet, ProviderView, SpendSlice, TrendPoint};
use crate::repository::ProviderRepository;
use crate::session::SessionAccessor;
use crate::store::ProviderStore;

/// Alerts shown on the dashboard overview.
pub const DASHBOARD_ALERT_LIMIT: usize = 4;

/// Everything the dashboard overview shows for one page load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub providers: Vec<ProviderView>,
    pub kpis: Option<KpiSet>,
    pub cost_trend: Vec<TrendPoint>,
    pub spend_breakdown: Vec<SpendSlice>,
    pub recent_alerts: Vec<AlertRecord>,
}

/// The data-access services of one process.
pub struct PulseServices {
    pub session: Arc<dyn SessionAccessor>,
    pub repository: Arc<ProviderRepository>,
    pub metrics: Arc<MetricsAggregator>,
    pub alerts: Arc<AlertDispatcher>,
}

impl PulseServices {
    /// Wire services from configuration.
    ///
    /// The backend client enriches usage and delivers alerts in every mode;
    /// it also stores provider records when `store.kind` is `backend`.
    pub fn from_config(
        config: &PulseConfig,
        session: Arc<dyn SessionAccessor>,
        backend: Arc<BackendClient>,
    ) -> DataResult<Self> {
        let store: Arc<dyn ProviderStore> = match config.store.kind {
            StoreKind::Sqlite => {
                debug!(path = %config.store.database_path.display(), "opening provider database");
                Arc::new(ProviderDatabase::open(&config.store.database_path)?)
            }
            StoreKind::Backend => backend.clone(),
        };
        info!(store = store.name(), backend = backend.base_url(), "services ready");

        let demo = DemoDataset::shared(config.demo.seed);
        let repository = ProviderRepository::new(store, demo.clone())
            .with_enricher(backend.clone())
            .with_demo_connected(config.demo.connected_providers.iter().cloned());

        Ok(Self {
            session,
            repository: Arc::new(repository),
            metrics: Arc::new(MetricsAggregator::new(demo)),
            alerts: Arc::new(AlertDispatcher::new(backend)),
        })
    }

    /// Resolve the current identity.
    pub async fn identity(&self) -> Option<Identity> {
        self.session.current_identity().await
    }

    /// Load the dashboard overview for the current session.
    pub async fn load_dashboard(&self) -> DashboardSnapshot {
        let identity = self.identity().await;
        self.load_dashboard_for(identity.as_ref()).await
    }

    /// Load the dashboard overview for an identity the caller already resolved.
    /// Failed reads degrade to empty values.
    pub async fn load_dashboard_for(&self, identity: Option<&Identity>) -> DashboardSnapshot {
        DashboardSnapshot {
            providers: self
                .repository
                .list_providers(identity)
                .await
                .degrade("list_providers"),
            kpis: self.metrics.kpis(identity),
            cost_trend: self.metrics.cost_trend(identity),
            spend_breakdown: self.metrics.spend_breakdown(identity),
            recent_alerts: self.metrics.recent_alerts(identity, DASHBOARD_ALERT_LIMIT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::LocalSession;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::tempdir;

    /// Session that counts how often it is asked.
    struct CountingSession {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SessionAccessor for CountingSession {
        async fn current_identity(&self) -> Option<Identity> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(Identity::demo("d", "demo@pulseapi.com"))
        }
    }

    fn services(dir: &std::path::Path, session: Arc<dyn SessionAccessor>) -> PulseServices {
        let config = PulseConfig::default()
            .with_database_path(dir.join("pulse.db"))
            .with_demo_seed(3);
        let backend = Arc::new(
            BackendClient::new("http://127.0.0.1:9", None, Duration::from_millis(200)).unwrap(),
        );
        PulseServices::from_config(&config, session, backend).unwrap()
    }

    #[tokio::test]
    async fn test_dashboard_signed_out_is_empty() {
        let dir = tempdir().unwrap();
        let services = services(dir.path(), Arc::new(LocalSession::new()));

        let snapshot = services.load_dashboard().await;
        assert_eq!(snapshot, DashboardSnapshot::default());
    }

    #[tokio::test]
    async fn test_dashboard_demo_uses_dataset() {
        let dir = tempdir().unwrap();
        let session = Arc::new(LocalSession::new());
        session.sign_in("demo@pulseapi.com");
        let services = services(dir.path(), session);

        let snapshot = services.load_dashboard().await;
        assert_eq!(snapshot.providers.len(), 6);
        assert_eq!(snapshot.kpis.unwrap().total_spend.value, "$2,433");
        // Only three demo alerts are unacknowledged, below the limit of four.
        assert_eq!(snapshot.recent_alerts.len(), 3);
        assert!(snapshot.recent_alerts.iter().all(|a| !a.acknowledged));
    }

    #[tokio::test]
    async fn test_dashboard_for_resolved_identity_skips_session() {
        let dir = tempdir().unwrap();
        let session = Arc::new(CountingSession {
            calls: AtomicUsize::new(0),
        });
        let services = services(dir.path(), session.clone());

        let who = services.identity().await;
        let snapshot = services.load_dashboard_for(who.as_ref()).await;
        assert_eq!(snapshot.providers.len(), 6);
        assert_eq!(session.calls.load(Ordering::SeqCst), 1);

        services.load_dashboard().await;
        assert_eq!(session.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dashboard_follows_sign_out() {
        let dir = tempdir().unwrap();
        let session = Arc::new(LocalSession::new());
        session.sign_in("dev@example.com");
        let services = services(dir.path(), session.clone());

        let snapshot = services.load_dashboard().await;
        assert!(snapshot.providers.is_empty());
        assert_eq!(snapshot.kpis, Some(KpiSet::zeroed()));

        session.sign_out();
        assert!(services.identity().await.is_none());
        assert!(services.load_dashboard().await.kpis.is_none());
    }
}
