//! Alert delivery.
//!
//! [`AlertDispatcher`] forwards alert requests to an [`AlertSink`]. The
//! demo identity and anonymous callers never reach the sink. Delivery is
//! attempted once; failures are returned to the caller as
//! [`DispatchError::Remote`].

use std::sync::Arc;

use async_trait::async_trait;
use pulse_core::{Identity, Severity, log_alert_event};
use tracing::warn;

use crate::error::{DataResult, DispatchError};
use crate::models::{AlertReceipt, AlertRequest};

/// Destination for alert notifications.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one alert.
    async fn deliver(&self, request: &AlertRequest) -> DataResult<AlertReceipt>;
}

/// Sends alerts on behalf of the current identity.
pub struct AlertDispatcher {
    sink: Arc<dyn AlertSink>,
}

impl AlertDispatcher {
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        Self { sink }
    }

    /// Trigger an alert notification.
    pub async fn trigger_alert(
        &self,
        identity: Option<&Identity>,
        title: &str,
        provider_name: &str,
        severity: Severity,
        cost: f64,
    ) -> Result<AlertReceipt, DispatchError> {
        let identity = identity.ok_or(DispatchError::Unauthorized)?;
        if identity.is_demo() {
            log_alert_event!(provider_name, "suppressed", reason = "demo");
            return Err(DispatchError::DemoMode);
        }

        let request = AlertRequest {
            alert_title: title.to_string(),
            provider_name: provider_name.to_string(),
            severity,
            cost,
        };

        let receipt = self.sink.deliver(&request).await.map_err(|e| {
            warn!(user_id = %identity.id, provider = provider_name, error = %e, "alert delivery failed");
            DispatchError::Remote(e.to_string())
        })?;

        if !receipt.success {
            warn!(user_id = %identity.id, provider = provider_name, "alert endpoint reported failure");
            return Err(DispatchError::Remote(
                "delivery endpoint reported failure".to_string(),
            ));
        }

        log_alert_event!(
            provider_name,
            "sent",
            severity = %severity,
            id = receipt.id.as_deref().unwrap_or("-")
        );
        Ok(receipt)
    }
}
