//! # pulse-data
//!
//! Data access and service layer for the PulseAPI dashboard.
//!
//! Every operation takes the caller's identity explicitly and branches three
//! ways: no identity, the demo identity, or a real account.
//!
//! - [`session`] - who is signed in
//! - [`repository`] - connected providers and their credentials
//! - [`metrics`] - KPI, trend, and breakdown series
//! - [`alerts`] - alert delivery
//! - [`store`], [`db`], [`rest_store`] - persisted provider records
//! - [`backend`] - HTTP client for the backend
//! - [`demo`] - sample data for the demo account
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pulse_config::PulseConfig;
//! use pulse_data::{BackendClient, LocalSession, PulseServices};
//!
//! # async fn example() -> pulse_data::error::DataResult<()> {
//! let config = PulseConfig::default();
//! let session = Arc::new(LocalSession::new());
//! session.sign_in("demo@pulseapi.com");
//!
//! let backend = Arc::new(BackendClient::from_config(&config)?);
//! let services = PulseServices::from_config(&config, session, backend)?;
//! let dashboard = services.load_dashboard().await;
//! println!("{} providers", dashboard.providers.len());
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod backend;
pub mod db;
pub mod demo;
pub mod error;
pub mod metrics;
pub mod models;
pub mod repository;
pub mod rest_store;
pub mod services;
pub mod session;
pub mod store;

pub use alerts::{AlertDispatcher, AlertSink};
pub use backend::BackendClient;
pub use db::ProviderDatabase;
pub use demo::DemoDataset;
pub use error::{DataError, DataResult, Degrade, DispatchError, Result, ServiceError};
pub use metrics::MetricsAggregator;
pub use models::{
    AlertReceipt, AlertRecord, AlertRequest, AlertRule, BudgetSummary, CredentialSummary,
    EndpointUsage, Incident, KeyStatus, Kpi, KpiSet, ModelCost, NewProviderRecord,
    ProviderBudget, ProviderDetail, ProviderRecord, ProviderView, SpendSlice, TrendPoint,
    UsageSnapshot, WeeklyComparison, WriteOutcome, mask_credential,
};
pub use repository::{ProviderRepository, UsageEnricher};
pub use services::{DashboardSnapshot, PulseServices};
pub use session::{LocalSession, SessionAccessor};
pub use store::ProviderStore;
