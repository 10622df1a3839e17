//! PulseAPI - API usage, cost, and alert monitoring
//!
//! Command-line front end for the PulseAPI data layer. Every command
//! resolves the session once and prints its view model as JSON.
//!
//! ## Usage
//!
//! ```bash
//! # Dashboard overview for the demo account
//! pulse --email demo@pulseapi.com dashboard
//!
//! # Connect a provider for a local account
//! pulse --email dev@example.com connect openai sk-...
//!
//! # Use a backend session
//! pulse --token <jwt> providers
//!
//! # With verbose logging
//! pulse -v --email demo@pulseapi.com kpis
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pulse_config::PulseConfig;
use pulse_core::{Identity, LogGuard, PulseError, Severity, init_logging};
use pulse_data::{
    BackendClient, LocalSession, PulseServices, SessionAccessor, services::DASHBOARD_ALERT_LIMIT,
};
use serde::Serialize;
use tracing::{debug, error, info};

/// PulseAPI monitoring CLI
///
/// Lists connected providers, dashboard metrics, and alerts, manages
/// provider API keys, and sends alert notifications.
#[derive(Parser, Debug)]
#[command(name = "pulse")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Sign in locally with this email
    #[arg(long, global = true, conflicts_with = "token")]
    email: Option<String>,

    /// User id for --email (defaults to the email)
    #[arg(long, global = true, requires = "email")]
    user_id: Option<String>,

    /// Backend access token; the session is resolved by the backend
    #[arg(long, global = true)]
    token: Option<String>,

    /// Configuration file (defaults to ~/.pulse/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (increases log level)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.pulse/logs/)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connected providers with usage
    Providers,
    /// Dashboard overview (providers, KPIs, trend, breakdown, recent alerts)
    Dashboard,
    /// KPI cards
    Kpis,
    /// Daily cost trend
    Trend,
    /// Spend breakdown by provider
    Breakdown,
    /// Cost by model
    Models,
    /// Weekly budget vs. actual
    Weekly,
    /// Per-provider category, uptime, models, and endpoints
    Details,
    /// Budget utilization and month-end projection
    Budgets,
    /// Connected API keys, masked
    Keys,
    /// Alerts
    Alerts {
        /// Only the most recent unacknowledged alerts
        #[arg(long)]
        recent: bool,

        /// How many recent alerts to show
        #[arg(long, default_value_t = DASHBOARD_ALERT_LIMIT)]
        limit: usize,
    },
    /// Alert rules
    Rules,
    /// Incident timeline
    Incidents,
    /// Check whether a provider is connected
    Connected { provider: String },
    /// Store an API key for a provider
    Connect { provider: String, api_key: String },
    /// Remove the API key for a provider
    Disconnect { provider: String },
    /// Send an alert notification
    TriggerAlert {
        /// Alert title
        #[arg(long)]
        title: String,

        /// Provider the alert concerns
        #[arg(long)]
        provider: String,

        /// critical, warning, or info
        #[arg(long, default_value = "warning")]
        severity: Severity,

        /// Cost associated with the alert, in USD
        #[arg(long, default_value_t = 0.0)]
        cost: f64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            if let Some(hint) = e.guidance() {
                eprintln!("  hint: {}", hint);
            }
            return ExitCode::from(1);
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("pulse error: {:#}", e);
            eprintln!("Error: {:#}", e);
            if let Some(hint) = guidance(&e) {
                eprintln!("  hint: {}", hint);
            }
            ExitCode::from(1)
        }
    }
}

/// The setup hint carried by a configuration or logging failure.
fn guidance(e: &anyhow::Error) -> Option<String> {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<PulseError>())
        .and_then(PulseError::guidance)
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> pulse_core::Result<LogGuard> {
    init_logging(cli.log_dir.clone(), cli.verbose > 0)
}

fn load_config(cli: &Cli) -> Result<PulseConfig> {
    let config = match &cli.config {
        Some(path) => PulseConfig::load(path)?,
        None => PulseConfig::load_default()?,
    };
    config.validate()?;
    Ok(config)
}

/// Build the session named by the CLI flags.
fn session(cli: &Cli, config: &PulseConfig, backend: &Arc<BackendClient>) -> Arc<dyn SessionAccessor> {
    if cli.token.is_some() {
        return backend.clone();
    }

    let session = LocalSession::with_demo_email(config.demo.email.clone());
    if let Some(email) = &cli.email {
        let id = cli
            .user_id
            .clone()
            .unwrap_or_else(|| email.trim().to_ascii_lowercase());
        session.sign_in_as(id, email.trim());
    }
    Arc::new(session)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    let mut backend = BackendClient::from_config(&config)?;
    if let Some(token) = &cli.token {
        backend = backend.with_access_token(token.clone());
    }
    let backend = Arc::new(backend);

    let session = session(&cli, &config, &backend);
    let services = PulseServices::from_config(&config, session, backend)
        .context("failed to initialize services")?;

    let identity = services.identity().await;
    log_identity(identity.as_ref());
    let who = identity.as_ref();

    match cli.command {
        Command::Providers => print_json(
            &services
                .repository
                .list_providers(who)
                .await
                .map_err(service_error)?,
        ),
        Command::Dashboard => print_json(&services.load_dashboard_for(who).await),
        Command::Kpis => print_json(&services.metrics.kpis(who)),
        Command::Trend => print_json(&services.metrics.cost_trend(who)),
        Command::Breakdown => print_json(&services.metrics.spend_breakdown(who)),
        Command::Models => print_json(&services.metrics.cost_by_model(who)),
        Command::Weekly => print_json(&services.metrics.weekly_comparison(who)),
        Command::Details => print_json(&services.metrics.provider_details(who)),
        Command::Budgets => print_json(&services.metrics.budget_summary(who)),
        Command::Keys => print_json(
            &services
                .repository
                .list_credentials(who)
                .await
                .map_err(service_error)?,
        ),
        Command::Alerts { recent, limit } => {
            if recent {
                print_json(&services.metrics.recent_alerts(who, limit))
            } else {
                print_json(&services.metrics.alerts(who))
            }
        }
        Command::Rules => print_json(&services.metrics.alert_rules(who)),
        Command::Incidents => print_json(&services.metrics.incidents(who)),
        Command::Connected { provider } => {
            let connected = services.repository.is_provider_connected(who, &provider).await;
            print_json(&serde_json::json!({ "provider": provider, "connected": connected }))
        }
        Command::Connect { provider, api_key } => print_json(
            &services
                .repository
                .store_api_key(who, &provider, &api_key)
                .await
                .map_err(service_error)?,
        ),
        Command::Disconnect { provider } => print_json(
            &services
                .repository
                .remove_api_key(who, &provider)
                .await
                .map_err(service_error)?,
        ),
        Command::TriggerAlert {
            title,
            provider,
            severity,
            cost,
        } => {
            let receipt = services
                .alerts
                .trigger_alert(who, &title, &provider, severity, cost)
                .await
                .map_err(|e| anyhow::anyhow!(e.friendly_message()))?;
            info!(provider = %provider, "alert sent");
            print_json(&receipt)
        }
    }
}

/// Attach the user-facing message to a service failure.
fn service_error(e: pulse_data::ServiceError) -> anyhow::Error {
    let message = e.friendly_message();
    anyhow::Error::new(e).context(message)
}

fn log_identity(identity: Option<&Identity>) {
    match identity {
        Some(identity) => debug!(user_id = %identity.id, demo = identity.is_demo(), "session resolved"),
        None => debug!("no session"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_invalid_config_carries_hint() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend: 42").unwrap();

        let cli = Cli::parse_from(["pulse", "--config", file.path().to_str().unwrap(), "kpis"]);
        let err = load_config(&cli).unwrap_err();
        let hint = guidance(&err).unwrap();
        assert!(hint.starts_with("Fix the YAML in"));
        assert!(hint.contains("--config"));
    }

    #[test]
    fn test_hint_found_under_context() {
        let err = anyhow::Error::new(PulseError::config_validation("backend.url is empty"))
            .context("failed to start");
        assert!(guidance(&err).unwrap().contains("~/.pulse/config.yaml"));
        assert!(guidance(&anyhow::anyhow!("plain failure")).is_none());
    }
}
