//! Dashboard metrics selection.
//!
//! [`MetricsAggregator`] picks the source for every dashboard chart based on
//! the identity: demo accounts see the demo dataset, real accounts see empty
//! series (usage history is not collected yet) and anonymous callers see
//! nothing. No statistics are computed here.

use std::sync::Arc;

use pulse_core::Identity;

use crate::demo::DemoDataset;
use crate::models::{
    AlertRecord, AlertRule, BudgetSummary, Incident, KpiSet, ModelCost, ProviderDetail,
    SpendSlice, TrendPoint, WeeklyComparison,
};

/// Selects metric series for an identity.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    demo: Arc<DemoDataset>,
}

impl MetricsAggregator {
    pub fn new(demo: Arc<DemoDataset>) -> Self {
        Self { demo }
    }

    /// Demo slice for demo identities, empty otherwise.
    fn demo_slice<T: Clone>(
        &self,
        identity: Option<&Identity>,
        select: impl FnOnce(&DemoDataset) -> &Vec<T>,
    ) -> Vec<T> {
        match identity {
            Some(identity) if identity.is_demo() => select(&self.demo).clone(),
            _ => Vec::new(),
        }
    }

    /// KPI cards. `None` without an identity; zeroed for real accounts.
    pub fn kpis(&self, identity: Option<&Identity>) -> Option<KpiSet> {
        let identity = identity?;
        if identity.is_demo() {
            Some(self.demo.kpis.clone())
        } else {
            Some(KpiSet::zeroed())
        }
    }

    /// Daily spend per provider.
    pub fn cost_trend(&self, identity: Option<&Identity>) -> Vec<TrendPoint> {
        self.demo_slice(identity, |d| &d.cost_trend)
    }

    /// Spend share per provider, largest first.
    pub fn spend_breakdown(&self, identity: Option<&Identity>) -> Vec<SpendSlice> {
        self.demo_slice(identity, |d| &d.spend_breakdown)
    }

    pub fn cost_by_model(&self, identity: Option<&Identity>) -> Vec<ModelCost> {
        self.demo_slice(identity, |d| &d.cost_by_model)
    }

    pub fn weekly_comparison(&self, identity: Option<&Identity>) -> Vec<WeeklyComparison> {
        self.demo_slice(identity, |d| &d.weekly_comparison)
    }

    /// All alerts, acknowledged or not.
    pub fn alerts(&self, identity: Option<&Identity>) -> Vec<AlertRecord> {
        self.demo_slice(identity, |d| &d.alerts)
    }

    /// The first `limit` unacknowledged alerts.
    pub fn recent_alerts(&self, identity: Option<&Identity>, limit: usize) -> Vec<AlertRecord> {
        self.alerts(identity)
            .into_iter()
            .filter(|a| !a.acknowledged)
            .take(limit)
            .collect()
    }

    pub fn alert_rules(&self, identity: Option<&Identity>) -> Vec<AlertRule> {
        self.demo_slice(identity, |d| &d.alert_rules)
    }

    /// Category, uptime, error rate, models and endpoints per provider.
    pub fn provider_details(&self, identity: Option<&Identity>) -> Vec<ProviderDetail> {
        self.demo_slice(identity, |d| &d.provider_details)
    }

    /// Budget utilization and month-end projection. `None` without an identity.
    pub fn budget_summary(&self, identity: Option<&Identity>) -> Option<BudgetSummary> {
        let identity = identity?;
        if identity.is_demo() {
            Some(self.demo.budget_summary.clone())
        } else {
            Some(BudgetSummary::zeroed())
        }
    }

    /// Incident timeline, newest first.
    pub fn incidents(&self, identity: Option<&Identity>) -> Vec<Incident> {
        self.demo_slice(identity, |d| &d.incidents)
    }
}
