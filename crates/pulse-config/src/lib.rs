//! # pulse-config
//!
//! Configuration for PulseAPI, read from `~/.pulse/config.yaml`.
//!
//! Every field has a default, so a missing file or a partial file is valid:
//!
//! ```yaml
//! backend:
//!   url: https://abc.supabase.co
//!   anon_key_env: PULSE_ANON_KEY
//!   timeout_secs: 15
//! demo:
//!   email: demo@pulseapi.com
//!   connected_providers: [openai, anthropic]
//!   seed: 42
//! store:
//!   kind: sqlite
//!   database_path: /var/lib/pulse/pulse.db
//! ```

use std::path::{Path, PathBuf};

use pulse_core::types::DEFAULT_DEMO_EMAIL;
use pulse_core::{PulseError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PulseConfig {
    /// Backend (auth, REST, and edge functions) settings
    pub backend: BackendConfig,

    /// Demo account settings
    pub demo: DemoConfig,

    /// Where provider records are persisted
    pub store: StoreConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend project
    pub url: String,

    /// Environment variable holding the anonymous API key
    pub anon_key_env: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            anon_key_env: "PULSE_ANON_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Demo account settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    /// Email of the shared demo account
    pub email: String,

    /// Providers reported as connected for the demo account
    pub connected_providers: Vec<String>,

    /// Seed for the demo trend generator; unseeded when absent
    pub seed: Option<u64>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            email: DEFAULT_DEMO_EMAIL.to_string(),
            connected_providers: ["openai", "anthropic", "google", "aws"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
            seed: None,
        }
    }
}

/// Provider record storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Local SQLite database
    #[default]
    Sqlite,
    /// Backend REST interface
    Backend,
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Storage backend
    pub kind: StoreKind,

    /// SQLite database path (used when `kind` is `sqlite`)
    pub database_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            kind: StoreKind::Sqlite,
            database_path: home.join(".pulse").join("pulse.db"),
        }
    }
}

impl PulseConfig {
    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| PulseError::io("reading", path, e))?;
        Self::from_yaml(&content).map_err(|e| match e {
            PulseError::ConfigInvalid { message, .. } => PulseError::config_invalid(path, message),
            other => other,
        })
    }

    /// Load configuration from the default location.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path()?)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| PulseError::config_invalid("<inline>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let url = self.backend.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(PulseError::config_validation(format!(
                "backend.url must start with http:// or https://, got {url:?}"
            )));
        }
        if self.backend.timeout_secs == 0 {
            return Err(PulseError::config_validation(
                "backend.timeout_secs must be greater than zero",
            ));
        }
        if self.demo.email.trim().is_empty() {
            return Err(PulseError::config_validation("demo.email must not be empty"));
        }
        Ok(())
    }

    /// Read the anonymous API key from the configured environment variable.
    pub fn anon_key(&self) -> Result<String> {
        std::env::var(&self.backend.anon_key_env).map_err(|_| PulseError::ConfigMissingField {
            field: self.backend.anon_key_env.clone(),
        })
    }

    /// Backend URL without a trailing slash.
    pub fn backend_url(&self) -> &str {
        self.backend.url.trim_end_matches('/')
    }

    /// Set the backend URL.
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend.url = url.into();
        self
    }

    /// Set the demo generator seed.
    pub fn with_demo_seed(mut self, seed: u64) -> Self {
        self.demo.seed = Some(seed);
        self
    }

    /// Use a SQLite database at `path`.
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store.kind = StoreKind::Sqlite;
        self.store.database_path = path.into();
        self
    }

    /// Persist provider records through the backend REST interface.
    pub fn with_backend_store(mut self) -> Self {
        self.store.kind = StoreKind::Backend;
        self
    }
}

/// Default config location (`~/.pulse/config.yaml`).
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| PulseError::internal("home directory not found"))?;
    Ok(home.join(".pulse").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = PulseConfig::default();
        assert_eq!(config.demo.email, "demo@pulseapi.com");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.store.kind, StoreKind::Sqlite);
        assert!(config.demo.connected_providers.contains(&"openai".to_string()));
        assert!(!config.demo.connected_providers.contains(&"stripe".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = PulseConfig::from_yaml(
            "backend:\n  url: https://abc.supabase.co/\ndemo:\n  seed: 7\n",
        )
        .unwrap();
        assert_eq!(config.backend_url(), "https://abc.supabase.co");
        assert_eq!(config.backend.anon_key_env, "PULSE_ANON_KEY");
        assert_eq!(config.demo.seed, Some(7));
        assert_eq!(config.demo.email, "demo@pulseapi.com");
    }

    #[test]
    fn test_store_kind_from_yaml() {
        let config = PulseConfig::from_yaml("store:\n  kind: backend\n").unwrap();
        assert_eq!(config.store.kind, StoreKind::Backend);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(PulseConfig::from_yaml("  \n").unwrap(), PulseConfig::default());
    }

    #[test]
    fn test_invalid_yaml() {
        let err = PulseConfig::from_yaml("backend: [unclosed").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let err = PulseConfig::from_yaml("backend:\n  url: ftp://example.com\n").unwrap_err();
        assert!(err.to_string().contains("backend.url"));

        let err = PulseConfig::from_yaml("backend:\n  timeout_secs: 0\n").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));

        let err = PulseConfig::from_yaml("demo:\n  email: ''\n").unwrap_err();
        assert!(err.to_string().contains("demo.email"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PulseConfig::load(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, PulseConfig::default());
    }

    #[test]
    fn test_load_reports_path_on_invalid_file() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(b"demo: {email: [").unwrap();
        file.flush().unwrap();

        let err = PulseConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    #[serial]
    fn test_anon_key_from_env() {
        let config = PulseConfig::default();
        // SAFETY: serialized with the other env-mutating test
        unsafe { std::env::set_var("PULSE_ANON_KEY", "anon-123") };
        assert_eq!(config.anon_key().unwrap(), "anon-123");
        unsafe { std::env::remove_var("PULSE_ANON_KEY") };
        assert!(config.anon_key().is_err());
    }

    #[test]
    fn test_builders() {
        let config = PulseConfig::default()
            .with_backend_url("https://x.example")
            .with_demo_seed(3)
            .with_database_path("/tmp/p.db");
        assert_eq!(config.backend.url, "https://x.example");
        assert_eq!(config.demo.seed, Some(3));
        assert_eq!(config.store.database_path, PathBuf::from("/tmp/p.db"));
        assert_eq!(config.with_backend_store().store.kind, StoreKind::Backend);
    }
}
