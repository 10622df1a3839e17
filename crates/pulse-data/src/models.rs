//! Data models for providers, metrics, and alerts.
//!
//! Persisted records ([`ProviderRecord`]) are kept separate from the view
//! models handed to the UI ([`ProviderView`], [`KpiSet`], [`TrendPoint`], ...).
//! View models are rebuilt on every call and never cached.

use chrono::{DateTime, Utc};
use pulse_core::{DataSource, ProviderStatus, Severity, TrendDirection};
use serde::{Deserialize, Serialize};

/// Provider whose persisted record gets live usage enrichment.
pub const ENRICHED_PROVIDER: &str = "openai";

/// Color used for providers without a brand color.
pub const DEFAULT_PROVIDER_COLOR: &str = "#6366f1";

/// A persisted provider connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Record id
    pub id: String,

    /// Owning identity id
    pub user_id: String,

    /// Provider name (e.g., "openai")
    pub provider_name: String,

    /// Credential material as stored
    pub api_key_encrypted: String,

    /// Nonce for sealed credentials
    #[serde(default)]
    pub nonce: Option<String>,

    /// Creation time
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Values written by "connect provider".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProviderRecord {
    pub user_id: String,
    pub provider_name: String,
    pub api_key_encrypted: String,
    pub nonce: Option<String>,
}

impl NewProviderRecord {
    /// Create a record for `user_id` with the given credential.
    pub fn new(
        user_id: impl Into<String>,
        provider_name: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            provider_name: provider_name.into(),
            api_key_encrypted: credential.into(),
            nonce: None,
        }
    }
}

/// UI-facing view of one monitored provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderView {
    /// Provider id (record id for stored providers)
    pub id: String,

    /// Display name
    pub name: String,

    /// Health status
    pub status: ProviderStatus,

    /// Average latency in milliseconds
    pub latency_ms: u64,

    /// Request count for the period
    pub requests: u64,

    /// Spend in USD for the period
    pub spend: f64,

    /// Display color (hex)
    pub color: String,

    /// Where the numbers came from
    pub source: DataSource,
}

impl ProviderView {
    /// Default view for a persisted record: operational, zeroed metrics.
    pub fn from_record(record: &ProviderRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: capitalize(&record.provider_name),
            status: ProviderStatus::Operational,
            latency_ms: 0,
            requests: 0,
            spend: 0.0,
            color: provider_color(&record.provider_name).to_string(),
            source: DataSource::Stored,
        }
    }

    /// Overlay live usage numbers.
    pub fn apply_usage(&mut self, usage: &UsageSnapshot) {
        self.status = usage.status;
        self.latency_ms = usage.latency.max(0.0).round() as u64;
        self.requests = usage.requests;
        self.spend = usage.total_spend.max(0.0);
        self.source = DataSource::Live;
    }
}

/// Live usage numbers returned by the enrichment call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Spend in USD
    pub total_spend: f64,

    /// Request count
    pub requests: u64,

    /// Average latency in milliseconds
    pub latency: f64,

    /// Reported status
    #[serde(default)]
    pub status: ProviderStatus,
}

/// Traffic and cost of one endpoint of a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointUsage {
    pub name: String,
    pub requests: u64,
    pub latency_ms: u64,
    pub cost: f64,
}

/// Extended provider facts shown on the providers page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDetail {
    pub id: String,
    pub name: String,
    /// Product category (e.g., "Claude Models")
    pub kind: String,
    /// Uptime percentage for the period
    pub uptime: f64,
    /// Error rate percentage for the period
    pub error_rate: f64,
    pub models: Vec<String>,
    pub endpoints: Vec<EndpointUsage>,
}

/// Spend against budget for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderBudget {
    pub id: String,
    pub name: String,
    pub spend: f64,
    pub budget: f64,
    /// `spend / budget` as a percentage, 0 without a budget
    pub used_pct: f64,
}

impl ProviderBudget {
    pub fn new(id: impl Into<String>, name: impl Into<String>, spend: f64, budget: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            spend,
            budget,
            used_pct: percent_of(spend, budget),
        }
    }
}

/// Month-to-date budget utilization and the projection to month end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub total_spend: f64,
    pub total_budget: f64,
    pub utilization_pct: f64,
    /// Spend extrapolated linearly to the end of the month
    pub projected_monthly: f64,
    pub projected_over_budget: bool,
    pub providers: Vec<ProviderBudget>,
}

impl BudgetSummary {
    /// Summarize `providers` after `day_of_month` of `days_in_month` days.
    pub fn from_providers(providers: Vec<ProviderBudget>, day_of_month: u32, days_in_month: u32) -> Self {
        let total_spend = round_cents(providers.iter().map(|p| p.spend).sum());
        let total_budget = round_cents(providers.iter().map(|p| p.budget).sum());
        let projected_monthly = if day_of_month == 0 {
            0.0
        } else {
            round_cents(total_spend / f64::from(day_of_month) * f64::from(days_in_month))
        };
        Self {
            total_spend,
            total_budget,
            utilization_pct: percent_of(total_spend, total_budget),
            projected_monthly,
            projected_over_budget: projected_monthly > total_budget,
            providers,
        }
    }

    /// Summary for accounts without usage data.
    pub fn zeroed() -> Self {
        Self::from_providers(Vec::new(), 0, 0)
    }
}

/// State of a stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyStatus {
    #[default]
    Active,
    /// The provider behind the key is degraded
    Warning,
}

/// A connected credential as listed on the settings page. Never holds the key itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSummary {
    /// Provider name as stored (e.g., "openai")
    pub provider_id: String,
    /// Display name
    pub provider: String,
    pub masked_key: String,
    pub color: String,
    pub status: KeyStatus,
    /// Relative label of the last use, when known
    #[serde(default)]
    pub last_used: Option<String>,
    #[serde(default)]
    pub connected_at: Option<DateTime<Utc>>,
}

impl CredentialSummary {
    /// Summary of a persisted record with the credential masked.
    pub fn from_record(record: &ProviderRecord) -> Self {
        Self {
            provider_id: record.provider_name.clone(),
            provider: capitalize(&record.provider_name),
            masked_key: mask_credential(&record.api_key_encrypted),
            color: provider_color(&record.provider_name).to_string(),
            status: KeyStatus::Active,
            last_used: None,
            connected_at: Some(record.created_at),
        }
    }
}

/// One KPI card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub label: String,
    pub value: String,
    pub sub_value: String,
    pub trend: String,
    pub trend_direction: TrendDirection,
}

impl Kpi {
    pub fn new(
        label: impl Into<String>,
        value: impl Into<String>,
        sub_value: impl Into<String>,
        trend: impl Into<String>,
        trend_direction: TrendDirection,
    ) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            sub_value: sub_value.into(),
            trend: trend.into(),
            trend_direction,
        }
    }
}

/// The four dashboard KPI cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSet {
    pub total_spend: Kpi,
    pub active_apis: Kpi,
    pub avg_latency: Kpi,
    pub uptime: Kpi,
}

impl KpiSet {
    /// Zero-valued KPIs for accounts without usage data.
    pub fn zeroed() -> Self {
        Self {
            total_spend: Kpi::new(
                "Monthly Spend (MTD)",
                format_usd_whole(0.0),
                format!("of {} budget", format_usd_whole(0.0)),
                "0%",
                TrendDirection::Up,
            ),
            active_apis: Kpi::new("Active APIs", "0", "0 endpoints", "0", TrendDirection::Up),
            avg_latency: Kpi::new("Avg Latency", "0ms", "p95: 0ms", "0%", TrendDirection::Up),
            uptime: Kpi::new("Overall Uptime", "0%", "no incidents", "0%", TrendDirection::Up),
        }
    }
}

/// One day of per-provider spend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub openai: f64,
    pub anthropic: f64,
    pub google: f64,
    pub aws: f64,
    /// Sum of the per-provider values, rounded to cents
    pub total: f64,
}

impl TrendPoint {
    /// Build a point; `total` is computed from the provider values.
    pub fn new(date: impl Into<String>, openai: f64, anthropic: f64, google: f64, aws: f64) -> Self {
        Self {
            date: date.into(),
            openai,
            anthropic,
            google,
            aws,
            total: round_cents(openai + anthropic + google + aws),
        }
    }
}

/// One slice of the spend donut chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendSlice {
    pub name: String,
    pub value: f64,
    pub color: String,
}

/// Cost attributed to one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCost {
    pub model: String,
    pub provider: String,
    pub requests: u64,
    pub cost: f64,
    pub avg_cost: f64,
    pub trend: String,
}

/// Budget vs. actual spend for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyComparison {
    pub week: String,
    pub budget: f64,
    pub actual: f64,
}

/// An alert shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub provider: String,
    pub severity: Severity,
    /// Relative time label (e.g., "2 min ago")
    pub timestamp: String,
    pub acknowledged: bool,
}

impl AlertRecord {
    /// Mark the alert as acknowledged. In-memory only.
    pub fn acknowledge(&mut self) {
        self.acknowledged = true;
    }
}

/// A configured alerting rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: u32,
    pub name: String,
    /// Rule category (cost, performance, reliability, ...)
    pub kind: String,
    pub condition: String,
    pub providers: Vec<String>,
    pub enabled: bool,
    pub channel: String,
}

/// One entry of the incident timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub time: String,
    /// Severity, or "healthy" for recovery entries
    pub severity: String,
    pub title: String,
    pub description: String,
}

/// Payload sent to the alert-delivery endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRequest {
    pub alert_title: String,
    pub provider_name: String,
    pub severity: Severity,
    pub cost: f64,
}

/// Response from the alert-delivery endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertReceipt {
    pub success: bool,
    #[serde(default)]
    pub id: Option<String>,
}

/// Result of a credential write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WriteOutcome {
    /// Credential stored (inserted or replaced)
    Stored { provider: String },
    /// Credential removed
    Removed { provider: String },
    /// Write skipped by policy; `notice` is meant for the user
    Skipped { notice: String },
}

/// Uppercase the first character, leaving the rest as is.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Brand color for a known provider name.
pub fn provider_color(provider_name: &str) -> &'static str {
    match provider_name.to_ascii_lowercase().as_str() {
        "openai" => "#10a37f",
        "anthropic" => "#d4a27f",
        "google" => "#4285f4",
        "aws" => "#ff9900",
        "stripe" => "#635bff",
        "twilio" => "#f22f46",
        _ => DEFAULT_PROVIDER_COLOR,
    }
}

/// Stars between the visible prefix and suffix of a masked key.
pub const MASK_WIDTH: usize = 28;

/// Mask a credential, keeping its vendor prefix and last four characters.
///
/// The prefix runs up to the last `-` or `_` among the first eight
/// characters (`sk-proj-`, `sk_live_`); keys without one keep four leading
/// characters. Keys of twelve characters or fewer are masked entirely.
pub fn mask_credential(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    let stars = "*".repeat(MASK_WIDTH);
    if chars.len() <= 12 {
        return stars;
    }

    let head = &chars[..8];
    let prefix_len = head
        .iter()
        .rposition(|c| *c == '-' || *c == '_')
        .map(|i| i + 1)
        .unwrap_or(4);
    let prefix: String = chars[..prefix_len].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}{stars}{suffix}")
}

/// `part` as a percentage of `whole`, rounded to two decimals; 0 when `whole` is 0.
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        0.0
    } else {
        round_cents(part / whole * 100.0)
    }
}

/// Round to two decimal places.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format whole dollars with thousands separators (e.g., `$2,433`).
pub fn format_usd_whole(amount: f64) -> String {
    let digits = (amount.max(0.0).round() as u64).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${grouped}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> ProviderRecord {
        ProviderRecord {
            id: "rec-1".to_string(),
            user_id: "u-1".to_string(),
            provider_name: name.to_string(),
            api_key_encrypted: "sk-test".to_string(),
            nonce: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_view_from_record_defaults() {
        let view = ProviderView::from_record(&record("openai"));
        assert_eq!(view.name, "Openai");
        assert_eq!(view.status, ProviderStatus::Operational);
        assert_eq!(view.latency_ms, 0);
        assert_eq!(view.requests, 0);
        assert_eq!(view.spend, 0.0);
        assert_eq!(view.color, "#10a37f");
        assert_eq!(view.source, DataSource::Stored);

        let custom = ProviderView::from_record(&record("mistral"));
        assert_eq!(custom.color, DEFAULT_PROVIDER_COLOR);
    }

    #[test]
    fn test_apply_usage() {
        let mut view = ProviderView::from_record(&record("openai"));
        view.apply_usage(&UsageSnapshot {
            total_spend: 14.23,
            requests: 12540,
            latency: 245.4,
            status: ProviderStatus::Degraded,
        });
        assert_eq!(view.latency_ms, 245);
        assert_eq!(view.requests, 12540);
        assert!((view.spend - 14.23).abs() < 1e-9);
        assert_eq!(view.status, ProviderStatus::Degraded);
        assert_eq!(view.source, DataSource::Live);
    }

    #[test]
    fn test_usage_snapshot_rejects_negative_requests() {
        let parsed = serde_json::from_str::<UsageSnapshot>(
            r#"{"total_spend": 1.0, "requests": -3, "latency": 10, "status": "operational"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_trend_point_total() {
        let point = TrendPoint::new("Oct 19", 101.11, 60.02, 30.5, 45.456);
        assert_eq!(point.total, 237.09);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("openai"), "Openai");
        assert_eq!(capitalize("aws"), "Aws");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_format_usd_whole() {
        assert_eq!(format_usd_whole(0.0), "$0");
        assert_eq!(format_usd_whole(999.4), "$999");
        assert_eq!(format_usd_whole(2432.83), "$2,433");
        assert_eq!(format_usd_whole(1_234_567.0), "$1,234,567");
        assert_eq!(format_usd_whole(-5.0), "$0");
    }

    #[test]
    fn test_mask_credential() {
        let stars = "*".repeat(28);
        assert_eq!(
            mask_credential("sk-proj-abcdefghijklmnopqrstXm4z"),
            format!("sk-proj-{stars}Xm4z")
        );
        assert_eq!(
            mask_credential("sk_live_0123456789mN7x"),
            format!("sk_live_{stars}mN7x")
        );
        assert_eq!(
            mask_credential("sk-ant-REDACTED"),
            format!("sk-ant-{stars}8kPq")
        );
        assert_eq!(mask_credential("AKIAIOSFODNN7Q9Lp"), format!("AKIA{stars}Q9Lp"));
        assert_eq!(mask_credential("short-key"), stars);
    }

    #[test]
    fn test_credential_summary_hides_key() {
        let summary = CredentialSummary::from_record(&record("stripe"));
        assert_eq!(summary.provider, "Stripe");
        assert_eq!(summary.masked_key, "*".repeat(28));
        assert_eq!(summary.color, "#635bff");
        assert_eq!(summary.status, KeyStatus::Active);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("sk-test"));
    }

    #[test]
    fn test_budget_summary_projection() {
        let summary = BudgetSummary::from_providers(
            vec![
                ProviderBudget::new("anthropic", "Anthropic", 892.40, 1500.0),
                ProviderBudget::new("twilio", "Twilio", 223.60, 300.0),
            ],
            10,
            30,
        );
        assert_eq!(summary.total_spend, 1116.0);
        assert_eq!(summary.total_budget, 1800.0);
        assert_eq!(summary.utilization_pct, 62.0);
        assert_eq!(summary.projected_monthly, 3348.0);
        assert!(summary.projected_over_budget);
        assert_eq!(summary.providers[1].used_pct, 74.53);
    }

    #[test]
    fn test_budget_summary_zeroed() {
        let summary = BudgetSummary::zeroed();
        assert_eq!(summary.total_budget, 0.0);
        assert_eq!(summary.utilization_pct, 0.0);
        assert_eq!(summary.projected_monthly, 0.0);
        assert!(!summary.projected_over_budget);
        assert!(summary.providers.is_empty());
    }

    #[test]
    fn test_acknowledge() {
        let mut alert = AlertRecord {
            id: 1,
            title: "Latency".into(),
            description: String::new(),
            provider: "Twilio".into(),
            severity: Severity::Critical,
            timestamp: "2 min ago".into(),
            acknowledged: false,
        };
        alert.acknowledge();
        assert!(alert.acknowledged);
    }

    #[test]
    fn test_alert_request_wire_format() {
        let request = AlertRequest {
            alert_title: "Budget".into(),
            provider_name: "OpenAI".into(),
            severity: Severity::Warning,
            cost: 12.5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "alertTitle": "Budget",
                "providerName": "OpenAI",
                "severity": "warning",
                "cost": 12.5
            })
        );
    }

    #[test]
    fn test_write_outcome_tagging() {
        let json = serde_json::to_value(WriteOutcome::Skipped {
            notice: "demo".into(),
        })
        .unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["notice"], "demo");
    }
}
