//! Session resolution.
//!
//! [`SessionAccessor`] answers "who is signed in" and is the first step of
//! every page load. The resolved [`Identity`] is then passed explicitly to
//! the repository, aggregator, and dispatcher.
//!
//! [`LocalSession`] keeps the session in process and lets callers subscribe
//! to sign-in/sign-out changes. The backend client implements the trait too
//! (see [`crate::backend`]).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use pulse_core::Identity;
use pulse_core::types::DEFAULT_DEMO_EMAIL;
use tokio::sync::watch;
use tracing::{debug, info};

/// Resolves the current identity.
#[async_trait]
pub trait SessionAccessor: Send + Sync {
    /// The signed-in identity, or `None`. Never fails.
    async fn current_identity(&self) -> Option<Identity>;
}

/// In-process session with change notification.
pub struct LocalSession {
    demo_email: String,
    current: watch::Sender<Option<Identity>>,
    /// Ids handed out per email, so signing in again restores the same id
    known: Mutex<HashMap<String, String>>,
}

impl LocalSession {
    /// Create a signed-out session using the default demo email.
    pub fn new() -> Self {
        Self::with_demo_email(DEFAULT_DEMO_EMAIL)
    }

    /// Create a signed-out session with a custom demo email.
    pub fn with_demo_email(demo_email: impl Into<String>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            demo_email: demo_email.into(),
            current,
            known: Mutex::new(HashMap::new()),
        }
    }

    /// Sign in by email, reusing the id from an earlier sign-in of the same email.
    pub fn sign_in(&self, email: &str) -> Identity {
        let key = email.trim().to_ascii_lowercase();
        let id = match self.known.lock() {
            Ok(mut known) => known
                .entry(key)
                .or_insert_with(|| uuid::Uuid::new_v4().to_string())
                .clone(),
            Err(_) => uuid::Uuid::new_v4().to_string(),
        };
        self.sign_in_as(id, email.trim())
    }

    /// Sign in with a known user id.
    pub fn sign_in_as(&self, id: impl Into<String>, email: impl Into<String>) -> Identity {
        let identity = Identity::classify(id, email, &self.demo_email);
        if let Ok(mut known) = self.known.lock() {
            known.insert(identity.email.to_ascii_lowercase(), identity.id.clone());
        }
        info!(user_id = %identity.id, demo = identity.is_demo(), "signed in");
        self.current.send_replace(Some(identity.clone()));
        identity
    }

    /// Sign out. Subscribers observe `None`.
    pub fn sign_out(&self) {
        if self.current.send_replace(None).is_some() {
            info!("signed out");
        } else {
            debug!("sign out without an active session");
        }
    }

    /// Subscribe to identity changes. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}

impl Default for LocalSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionAccessor for LocalSession {
    async fn current_identity(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signed_out_by_default() {
        let session = LocalSession::new();
        assert!(session.current_identity().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_in_classifies_demo() {
        let session = LocalSession::new();
        let demo = session.sign_in("demo@pulseapi.com");
        assert!(demo.is_demo());

        let real = session.sign_in("dev@example.com");
        assert!(!real.is_demo());
        assert_eq!(session.current_identity().await, Some(real));
    }

    #[tokio::test]
    async fn test_sign_in_reuses_id() {
        let session = LocalSession::new();
        let first = session.sign_in("Dev@Example.com");
        session.sign_out();
        let second = session.sign_in("dev@example.com ");
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_subscribe_observes_changes() {
        let session = LocalSession::with_demo_email("sandbox@example.com");
        let mut rx = session.subscribe();
        assert!(rx.borrow().is_none());

        session.sign_in_as("u-9", "sandbox@example.com");
        rx.changed().await.unwrap();
        let seen = rx.borrow_and_update().clone().unwrap();
        assert_eq!(seen.id, "u-9");
        assert!(seen.is_demo());

        session.sign_out();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }
}
