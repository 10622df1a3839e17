//! Error types for the data layer.
//!
//! Three levels:
//! - [`DataError`] - a collaborator (database, backend) failed
//! - [`ServiceError`] - what a repository operation reports to its caller
//! - [`DispatchError`] - why an alert was not delivered

use thiserror::Error;
use tracing::warn;

/// Collaborator failures raised by stores and the backend client.
#[derive(Error, Debug)]
pub enum DataError {
    /// SQLite error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("backend returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the body, or the raw body
        message: String,
    },

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend answered successfully but without the expected payload
    #[error("empty response from {0}")]
    EmptyResponse(String),

    /// Connection lock was poisoned
    #[error("lock error: {0}")]
    Lock(String),

    /// Schema migration failed
    #[error("migration error: {0}")]
    Migration(String),

    /// Client could not be configured
    #[error("configuration error: {0}")]
    Config(String),
}

impl DataError {
    /// Build an [`DataError::Api`] from a status and response body.
    ///
    /// Backend functions answer failures with `{"error": "..."}`; that message
    /// is preferred over the raw body when present.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.trim().to_string());
        DataError::Api { status, message }
    }
}

/// Result type for collaborator calls.
pub type DataResult<T> = std::result::Result<T, DataError>;

/// Failure reasons reported by repository operations.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No identity was supplied for an operation that needs one
    #[error("not signed in")]
    Unauthorized,

    /// A collaborator failed
    #[error("{collaborator} unavailable: {source}")]
    CollaboratorUnavailable {
        /// Name of the failing collaborator
        collaborator: String,
        #[source]
        source: DataError,
    },

    /// The targeted record does not exist
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing record
        what: String,
    },

    /// Caller passed an unusable value
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ServiceError {
    /// Wrap a collaborator failure.
    pub fn collaborator(collaborator: impl Into<String>, source: DataError) -> Self {
        ServiceError::CollaboratorUnavailable {
            collaborator: collaborator.into(),
            source,
        }
    }

    /// Check if the failure came from a collaborator rather than the caller.
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, ServiceError::CollaboratorUnavailable { .. })
    }

    /// Get a user-friendly error message.
    pub fn friendly_message(&self) -> String {
        match self {
            ServiceError::Unauthorized => "Sign in to manage providers.".to_string(),
            ServiceError::CollaboratorUnavailable { collaborator, .. } => {
                format!("{collaborator} is unavailable right now. Please try again.")
            }
            ServiceError::NotFound { what } => format!("Nothing to remove: {what}."),
            ServiceError::InvalidInput(msg) => msg.clone(),
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Degrade a failed read to its default value, logging the failure.
pub trait Degrade<T> {
    /// Return the value, or `T::default()` after logging the error.
    fn degrade(self, operation: &str) -> T;
}

impl<T: Default> Degrade<T> for Result<T> {
    fn degrade(self, operation: &str) -> T {
        self.unwrap_or_else(|e| {
            warn!(
                operation,
                collaborator = e.is_collaborator_failure(),
                error = %e,
                "degrading to default value"
            );
            T::default()
        })
    }
}

/// Why an alert was not delivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Alerts are disabled for the demo account
    #[error("alerts are disabled in demo mode")]
    DemoMode,

    /// No identity was supplied
    #[error("not signed in")]
    Unauthorized,

    /// The alert-delivery endpoint rejected the request or was unreachable
    #[error("alert delivery failed: {0}")]
    Remote(String),
}

impl DispatchError {
    /// Get a user-friendly error message.
    pub fn friendly_message(&self) -> String {
        match self {
            DispatchError::DemoMode => {
                "Demo mode: alerts are not sent. Sign up to receive real alerts.".to_string()
            }
            DispatchError::Unauthorized => "Sign in to send alerts.".to_string(),
            DispatchError::Remote(msg) => format!("Could not send alert: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status_prefers_error_field() {
        let err = DataError::from_http_status(400, r#"{"error":"Unauthorized"}"#);
        match err {
            DataError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_http_status_falls_back_to_body() {
        let err = DataError::from_http_status(502, " bad gateway \n");
        assert_eq!(err.to_string(), "backend returned 502: bad gateway");
    }

    #[test]
    fn test_degrade_returns_default_on_error() {
        let failed: Result<Vec<u32>> = Err(ServiceError::collaborator(
            "sqlite",
            DataError::Lock("poisoned".into()),
        ));
        assert!(failed.degrade("list_providers").is_empty());

        let ok: Result<Vec<u32>> = Ok(vec![1, 2]);
        assert_eq!(ok.degrade("list_providers"), vec![1, 2]);
    }

    #[test]
    fn test_service_error_classification() {
        let err = ServiceError::collaborator("backend", DataError::EmptyResponse("upsert".into()));
        assert!(err.is_collaborator_failure());
        assert!(err.friendly_message().contains("backend"));
        assert!(!ServiceError::Unauthorized.is_collaborator_failure());
    }

    #[test]
    fn test_dispatch_error_messages() {
        assert!(DispatchError::DemoMode.friendly_message().contains("Demo mode"));
        assert_eq!(
            DispatchError::Remote("boom".into()).to_string(),
            "alert delivery failed: boom"
        );
    }
}
