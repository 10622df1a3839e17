//! Shared type definitions used across PulseAPI crates.

use serde::{Deserialize, Serialize};

/// Email address of the shared demo account.
pub const DEFAULT_DEMO_EMAIL: &str = "demo@pulseapi.com";

/// Whether an identity is the shared demo account or a real user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    /// Served from the static demo dataset, writes disabled
    Demo,
    /// Served from persisted records and the backend
    Real,
}

/// The authenticated principal on whose behalf data is read or written.
///
/// The [`IdentityKind`] is decided once, when the session is resolved, and
/// every downstream call branches on it instead of re-checking the email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque user id from the auth provider
    pub id: String,
    /// Account email
    pub email: String,
    /// Demo or real account
    pub kind: IdentityKind,
}

impl Identity {
    /// Build an identity, tagging it as demo when `email` matches `demo_email`.
    pub fn classify(id: impl Into<String>, email: impl Into<String>, demo_email: &str) -> Self {
        let email = email.into();
        let kind = if is_demo_email(&email, demo_email) {
            IdentityKind::Demo
        } else {
            IdentityKind::Real
        };
        Self {
            id: id.into(),
            email,
            kind,
        }
    }

    /// Build a real-account identity.
    pub fn real(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            kind: IdentityKind::Real,
        }
    }

    /// Build the demo identity.
    pub fn demo(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            kind: IdentityKind::Demo,
        }
    }

    /// Returns true for the shared demo account.
    pub fn is_demo(&self) -> bool {
        self.kind == IdentityKind::Demo
    }
}

/// Compare an email against the demo sentinel (trimmed, case-insensitive).
pub fn is_demo_email(email: &str, demo_email: &str) -> bool {
    email.trim().eq_ignore_ascii_case(demo_email.trim())
}

/// Health status of a monitored provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    /// Responding normally
    #[default]
    #[serde(alias = "healthy")]
    Operational,
    /// Responding slowly or with elevated errors
    Degraded,
    /// Failing or unreachable
    Critical,
    /// Approaching a threshold
    Warning,
}

impl std::fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operational => write!(f, "operational"),
            Self::Degraded => write!(f, "degraded"),
            Self::Critical => write!(f, "critical"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// Alert severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Direction of a KPI trend arrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    #[default]
    Up,
    Down,
}

/// Where the numbers in a provider view came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Static demo dataset
    Demo,
    /// Persisted record with zeroed defaults (enrichment absent or failed)
    Stored,
    /// Persisted record enriched by the usage backend
    Live,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_demo_identity() {
        let id = Identity::classify("u-1", " Demo@PulseAPI.com ", DEFAULT_DEMO_EMAIL);
        assert!(id.is_demo());
        assert_eq!(id.kind, IdentityKind::Demo);

        let real = Identity::classify("u-2", "dev@example.com", DEFAULT_DEMO_EMAIL);
        assert!(!real.is_demo());
    }

    #[test]
    fn test_provider_status_accepts_healthy_alias() {
        let status: ProviderStatus = serde_json::from_str("\"healthy\"").unwrap();
        assert_eq!(status, ProviderStatus::Operational);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"operational\"");
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("CRITICAL".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("info".parse::<Severity>().unwrap(), Severity::Info);
        assert!("loud".parse::<Severity>().is_err());
        assert_eq!(Severity::Warning.to_string(), "warning");
    }
}
