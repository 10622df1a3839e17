//! Static sample data served to the demo account.
//!
//! The dataset is built once per process ([`DemoDataset::shared`]) and never
//! changes afterwards. The 30-day cost trend uses random jitter around a
//! per-provider base; it differs between processes unless a seed is given.

use std::sync::{Arc, OnceLock};

use chrono::{Datelike, Duration, NaiveDate, Utc};
use pulse_core::{DataSource, ProviderStatus, Severity, TrendDirection};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::models::{
    AlertRecord, AlertRule, BudgetSummary, CredentialSummary, EndpointUsage, Incident, KeyStatus,
    Kpi, KpiSet, MASK_WIDTH, ModelCost, ProviderBudget, ProviderDetail, ProviderView, SpendSlice,
    TrendPoint, WeeklyComparison, format_usd_whole, round_cents,
};

/// Days covered by the demo cost trend.
pub const TREND_DAYS: usize = 30;

static SHARED: OnceLock<Arc<DemoDataset>> = OnceLock::new();

/// Fixed sample providers, KPIs, series, and alerts.
#[derive(Debug, Clone)]
pub struct DemoDataset {
    pub providers: Vec<ProviderView>,
    pub kpis: KpiSet,
    pub cost_trend: Vec<TrendPoint>,
    pub spend_breakdown: Vec<SpendSlice>,
    pub cost_by_model: Vec<ModelCost>,
    pub weekly_comparison: Vec<WeeklyComparison>,
    pub alerts: Vec<AlertRecord>,
    pub alert_rules: Vec<AlertRule>,
    pub incidents: Vec<Incident>,
    pub provider_details: Vec<ProviderDetail>,
    pub budget_summary: BudgetSummary,
    /// Masked keys for every demo provider
    pub api_keys: Vec<CredentialSummary>,
}

/// Per-provider static facts that don't belong on [`ProviderView`].
struct DemoProvider {
    view: ProviderView,
    budget: f64,
}

impl DemoDataset {
    /// The process-wide dataset. The seed of the first call wins.
    pub fn shared(seed: Option<u64>) -> Arc<DemoDataset> {
        SHARED
            .get_or_init(|| Arc::new(Self::generate(seed, Utc::now().date_naive())))
            .clone()
    }

    /// Build a dataset whose trend ends on `today`.
    pub fn generate(seed: Option<u64>, today: NaiveDate) -> Self {
        debug!(?seed, %today, "generating demo dataset");

        let providers = demo_providers();
        let total_spend: f64 = providers.iter().map(|p| p.view.spend).sum();
        let total_budget: f64 = providers.iter().map(|p| p.budget).sum();
        let avg_latency = providers.iter().map(|p| p.view.latency_ms).sum::<u64>() as f64
            / providers.len() as f64;

        let kpis = KpiSet {
            total_spend: Kpi::new(
                "Monthly Spend (MTD)",
                format_usd_whole(total_spend),
                format!("of {} budget", format_usd_whole(total_budget)),
                "+12.3%",
                TrendDirection::Up,
            ),
            active_apis: Kpi::new(
                "Active APIs",
                providers.len().to_string(),
                "15 endpoints",
                "+1",
                TrendDirection::Up,
            ),
            avg_latency: Kpi::new(
                "Avg Latency",
                format!("{}ms", avg_latency.round() as u64),
                "p95: 680ms",
                "-8.2%",
                TrendDirection::Up,
            ),
            uptime: Kpi::new(
                "Overall Uptime",
                "99.86%",
                "1 incident today",
                "-0.14%",
                TrendDirection::Down,
            ),
        };

        let mut spend_breakdown: Vec<SpendSlice> = providers
            .iter()
            .map(|p| SpendSlice {
                name: p.view.name.clone(),
                value: p.view.spend,
                color: p.view.color.clone(),
            })
            .collect();
        spend_breakdown.sort_by(|a, b| b.value.total_cmp(&a.value));

        let budget_summary = BudgetSummary::from_providers(
            providers
                .iter()
                .map(|p| ProviderBudget::new(&p.view.id, &p.view.name, p.view.spend, p.budget))
                .collect(),
            today.day(),
            days_in_month(today),
        );

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            providers: providers.into_iter().map(|p| p.view).collect(),
            kpis,
            cost_trend: cost_trend(&mut rng, today),
            spend_breakdown,
            cost_by_model: cost_by_model(),
            weekly_comparison: weekly_comparison(),
            alerts: alerts(),
            alert_rules: alert_rules(),
            incidents: incidents(),
            provider_details: provider_details(),
            budget_summary,
            api_keys: api_keys(),
        }
    }
}

fn provider(
    id: &str,
    name: &str,
    color: &str,
    status: ProviderStatus,
    latency_ms: u64,
    requests: u64,
    spend: f64,
    budget: f64,
) -> DemoProvider {
    DemoProvider {
        view: ProviderView {
            id: id.to_string(),
            name: name.to_string(),
            status,
            latency_ms,
            requests,
            spend,
            color: color.to_string(),
            source: DataSource::Demo,
        },
        budget,
    }
}

fn demo_providers() -> Vec<DemoProvider> {
    use ProviderStatus::*;
    vec![
        provider("openai", "OpenAI", "#10a37f", Operational, 245, 12_540, 14.23, 2000.0),
        provider("anthropic", "Anthropic", "#d4a27f", Operational, 312, 28_450, 892.40, 1500.0),
        provider("google", "Google AI", "#4285f4", Warning, 456, 18_900, 534.20, 800.0),
        provider("aws", "AWS Bedrock", "#ff9900", Operational, 189, 32_100, 678.90, 1000.0),
        provider("stripe", "Stripe", "#635bff", Operational, 145, 8_920, 89.50, 200.0),
        provider("twilio", "Twilio", "#f22f46", Critical, 890, 12_400, 223.60, 300.0),
    ]
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = match date.month() {
        12 => (date.year() + 1, 1),
        m => (date.year(), m + 1),
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(30)
}

fn detail(
    id: &str,
    name: &str,
    kind: &str,
    uptime: f64,
    error_rate: f64,
    models: &[&str],
    endpoints: &[(&str, u64, u64, f64)],
) -> ProviderDetail {
    ProviderDetail {
        id: id.to_string(),
        name: name.to_string(),
        kind: kind.to_string(),
        uptime,
        error_rate,
        models: models.iter().map(|m| m.to_string()).collect(),
        endpoints: endpoints
            .iter()
            .map(|&(name, requests, latency_ms, cost)| EndpointUsage {
                name: name.to_string(),
                requests,
                latency_ms,
                cost,
            })
            .collect(),
    }
}

/// Per-provider details; endpoint requests and cost add up to the provider totals.
fn provider_details() -> Vec<ProviderDetail> {
    vec![
        detail(
            "openai",
            "OpenAI",
            "LLM / GPT Models",
            99.97,
            0.12,
            &["GPT-4o", "GPT-4o-mini", "o1-preview", "DALL·E 3"],
            &[
                ("/v1/chat/completions", 10_590, 280, 11.18),
                ("/v1/embeddings", 1_420, 45, 0.14),
                ("/v1/images/generations", 530, 2100, 2.91),
            ],
        ),
        detail(
            "anthropic",
            "Anthropic",
            "Claude Models",
            99.94,
            0.08,
            &["Claude 3.5 Sonnet", "Claude 3.5 Haiku", "Claude 3 Opus"],
            &[
                ("/v1/messages", 27_800, 320, 870.40),
                ("/v1/complete", 650, 180, 22.00),
            ],
        ),
        detail(
            "google",
            "Google AI",
            "Gemini Models",
            99.82,
            0.34,
            &["Gemini 2.0 Flash", "Gemini 1.5 Pro", "Gemini 1.5 Flash"],
            &[
                ("/v1/models/generate", 17_200, 480, 498.20),
                ("/v1/models/embed", 1_700, 62, 36.00),
            ],
        ),
        detail(
            "aws",
            "AWS Bedrock",
            "Multi-Model Gateway",
            99.99,
            0.05,
            &["Claude (Bedrock)", "Titan", "Llama 3"],
            &[
                ("InvokeModel", 28_400, 195, 612.90),
                ("InvokeModelStream", 3_700, 340, 66.00),
            ],
        ),
        detail(
            "stripe",
            "Stripe",
            "Payment Processing",
            99.99,
            0.02,
            &[],
            &[
                ("/v1/charges", 4_200, 130, 42.00),
                ("/v1/customers", 3_100, 95, 31.00),
                ("/v1/subscriptions", 1_620, 110, 16.50),
            ],
        ),
        detail(
            "twilio",
            "Twilio",
            "Communications API",
            98.45,
            2.8,
            &[],
            &[
                ("/Messages", 9_800, 920, 176.40),
                ("/Calls", 1_200, 780, 36.00),
                ("/Verify", 1_400, 340, 11.20),
            ],
        ),
    ]
}

fn api_keys() -> Vec<CredentialSummary> {
    let stars = "*".repeat(MASK_WIDTH);
    let key = |id: &str, name: &str, prefix: &str, suffix: &str, color: &str, last_used: &str, status| {
        CredentialSummary {
            provider_id: id.to_string(),
            provider: name.to_string(),
            masked_key: format!("{prefix}{stars}{suffix}"),
            color: color.to_string(),
            status,
            last_used: Some(last_used.to_string()),
            connected_at: None,
        }
    };
    vec![
        key("openai", "OpenAI", "sk-proj-", "Xm4z", "#10a37f", "2 min ago", KeyStatus::Active),
        key("anthropic", "Anthropic", "sk-ant-", "8kPq", "#d4a27f", "5 min ago", KeyStatus::Active),
        key("google", "Google AI", "AIza", "tR2w", "#4285f4", "18 min ago", KeyStatus::Active),
        key("aws", "AWS Bedrock", "AKIA", "Q9Lp", "#ff9900", "1 hour ago", KeyStatus::Active),
        key("stripe", "Stripe", "sk_live_", "mN7x", "#635bff", "3 hours ago", KeyStatus::Active),
        key("twilio", "Twilio", "AC", "bR4s", "#f22f46", "45 min ago", KeyStatus::Warning),
    ]
}

/// Daily spend for the last [`TREND_DAYS`] days, ending on `today`.
fn cost_trend(rng: &mut StdRng, today: NaiveDate) -> Vec<TrendPoint> {
    // (low, spread) multipliers of the daily base per provider
    const OPENAI: (f64, f64) = (0.9, 0.3);
    const ANTHROPIC: (f64, f64) = (0.55, 0.2);
    const GOOGLE: (f64, f64) = (0.3, 0.15);
    const AWS: (f64, f64) = (0.4, 0.2);

    let mut jitter = |base: f64, (low, spread): (f64, f64)| {
        round_cents(base * (low + rng.random::<f64>() * spread))
    };

    (0..TREND_DAYS)
        .map(|i| {
            let date = today - Duration::days((TREND_DAYS - 1 - i) as i64);
            let base = 95.0 + (i as f64 * 0.3).sin() * 25.0;
            TrendPoint::new(
                date.format("%b %-d").to_string(),
                jitter(base, OPENAI),
                jitter(base, ANTHROPIC),
                jitter(base, GOOGLE),
                jitter(base, AWS),
            )
        })
        .collect()
}

fn cost_by_model() -> Vec<ModelCost> {
    let row = |model: &str, provider: &str, requests: u64, cost: f64, avg_cost: f64, trend: &str| {
        ModelCost {
            model: model.to_string(),
            provider: provider.to_string(),
            requests,
            cost,
            avg_cost,
            trend: trend.to_string(),
        }
    };
    vec![
        row("GPT-4o", "OpenAI", 24_500, 720.50, 0.0294, "+5.2%"),
        row("Claude 3.5 Sonnet", "Anthropic", 18_200, 580.40, 0.0319, "+2.1%"),
        row("GPT-4o-mini", "OpenAI", 13_700, 260.00, 0.0190, "-1.8%"),
        row("Gemini 2.0 Flash", "Google AI", 12_400, 310.20, 0.0250, "+8.4%"),
        row("Claude (Bedrock)", "AWS Bedrock", 11_200, 448.90, 0.0401, "+0.9%"),
        row("Gemini 1.5 Pro", "Google AI", 4_800, 188.00, 0.0392, "-3.2%"),
        row("Claude 3.5 Haiku", "Anthropic", 9_600, 192.00, 0.0200, "+12.1%"),
        row("DALL·E 3", "OpenAI", 1_930, 255.00, 0.1321, "-0.5%"),
    ]
}

fn weekly_comparison() -> Vec<WeeklyComparison> {
    [1320.0, 1580.0, 1410.0, 1356.0]
        .iter()
        .enumerate()
        .map(|(i, actual)| WeeklyComparison {
            week: format!("Week {}", i + 1),
            budget: 1450.0,
            actual: *actual,
        })
        .collect()
}

fn alerts() -> Vec<AlertRecord> {
    let alert = |id: u32,
                 severity: Severity,
                 title: &str,
                 description: &str,
                 provider: &str,
                 timestamp: &str,
                 acknowledged: bool| AlertRecord {
        id,
        title: title.to_string(),
        description: description.to_string(),
        provider: provider.to_string(),
        severity,
        timestamp: timestamp.to_string(),
        acknowledged,
    };
    vec![
        alert(
            1,
            Severity::Critical,
            "Twilio API Degraded Performance",
            "Twilio Messages endpoint latency exceeded 800ms threshold. Error rate at 2.8%.",
            "Twilio",
            "2 min ago",
            false,
        ),
        alert(
            2,
            Severity::Warning,
            "Google AI Latency Spike",
            "Gemini model generation latency increased by 34% compared to baseline.",
            "Google AI",
            "18 min ago",
            false,
        ),
        alert(
            3,
            Severity::Warning,
            "Anthropic Budget 59% Utilized",
            "Monthly Anthropic spend has reached $892.40 of $1,500 budget (59%).",
            "Anthropic",
            "1 hour ago",
            true,
        ),
        alert(
            4,
            Severity::Info,
            "AWS Bedrock: New Model Available",
            "Claude 3.5 Sonnet v2 is now available on AWS Bedrock.",
            "AWS Bedrock",
            "3 hours ago",
            true,
        ),
        alert(
            5,
            Severity::Critical,
            "Twilio Service Outage: SMS Delivery",
            "Complete SMS delivery failure detected. 342 messages queued.",
            "Twilio",
            "45 min ago",
            false,
        ),
        alert(
            6,
            Severity::Warning,
            "Anthropic Rate Limit Approaching",
            "Claude 3.5 Sonnet usage at 78% of rate limit. Consider request queuing.",
            "Anthropic",
            "2 hours ago",
            true,
        ),
        alert(
            7,
            Severity::Info,
            "Weekly Cost Report Ready",
            "Your weekly API cost summary is ready.",
            "System",
            "6 hours ago",
            true,
        ),
    ]
}

fn alert_rules() -> Vec<AlertRule> {
    let rule = |id: u32,
                name: &str,
                kind: &str,
                condition: &str,
                providers: &[&str],
                enabled: bool,
                channel: &str| AlertRule {
        id,
        name: name.to_string(),
        kind: kind.to_string(),
        condition: condition.to_string(),
        providers: providers.iter().map(|p| p.to_string()).collect(),
        enabled,
        channel: channel.to_string(),
    };
    vec![
        rule(1, "Budget Threshold", "cost", "Spend > 80% of budget", &["All"], true, "Email + Slack"),
        rule(
            2,
            "Latency Spike",
            "performance",
            "p95 Latency > 500ms",
            &["OpenAI", "Anthropic"],
            true,
            "Slack",
        ),
        rule(
            3,
            "Error Rate",
            "reliability",
            "Error Rate > 1%",
            &["All"],
            true,
            "Email + Slack + Webhook",
        ),
        rule(
            4,
            "Downtime Detection",
            "availability",
            "Uptime < 99.5%",
            &["All"],
            true,
            "Email + Slack",
        ),
        rule(
            5,
            "Rate Limit Warning",
            "throttle",
            "Usage > 75% of limit",
            &["OpenAI", "Anthropic", "Google AI"],
            false,
            "Slack",
        ),
        rule(6, "Cost Anomaly", "cost", "Daily spend > 150% of avg", &["All"], true, "Email"),
    ]
}

fn incidents() -> Vec<Incident> {
    let incident = |time: &str, severity: &str, title: &str, description: &str| Incident {
        time: time.to_string(),
        severity: severity.to_string(),
        title: title.to_string(),
        description: description.to_string(),
    };
    vec![
        incident("14:32", "critical", "Twilio SMS Outage", "SMS delivery failures detected across all regions."),
        incident("14:18", "warning", "Google AI Latency +34%", "Gemini API response times elevated."),
        incident("11:45", "healthy", "OpenAI Restored", "GPT-4o completions endpoint fully recovered."),
        incident("10:30", "warning", "OpenAI Degraded", "Intermittent 429 errors on chat completions."),
        incident("08:15", "info", "Daily cost report", "Yesterday's total: $128.42 (within budget)."),
        incident("06:00", "healthy", "All systems operational", "Morning health check passed for all providers."),
    ]
}
