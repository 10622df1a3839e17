//! [`ProviderStore`] over the backend's REST interface.
//!
//! Rows live in the `providers` table and are filtered with
//! `column=eq.value` query parameters. Upserts resolve conflicts on
//! `(user_id, provider_name)` by merging.

use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;

use crate::backend::BackendClient;
use crate::error::{DataError, DataResult};
use crate::models::{NewProviderRecord, ProviderRecord};
use crate::store::ProviderStore;

const PROVIDERS_PATH: &str = "rest/v1/providers";

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl ProviderStore for BackendClient {
    async fn select_by_owner(&self, user_id: &str) -> DataResult<Vec<ProviderRecord>> {
        self.send_json(
            self.request(Method::GET, PROVIDERS_PATH)
                .query(&[("select", "*".to_string()), ("user_id", eq(user_id))]),
        )
        .await
    }

    async fn find(
        &self,
        user_id: &str,
        provider_name: &str,
    ) -> DataResult<Option<ProviderRecord>> {
        let rows: Vec<ProviderRecord> = self
            .send_json(self.request(Method::GET, PROVIDERS_PATH).query(&[
                ("select", "*".to_string()),
                ("user_id", eq(user_id)),
                ("provider_name", eq(provider_name)),
                ("limit", "1".to_string()),
            ]))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert(&self, record: NewProviderRecord) -> DataResult<ProviderRecord> {
        debug!(user_id = %record.user_id, provider = %record.provider_name, "upserting provider row");
        let rows: Vec<ProviderRecord> = self
            .send_json(
                self.request(Method::POST, PROVIDERS_PATH)
                    .query(&[("on_conflict", "user_id,provider_name")])
                    .header("Prefer", "resolution=merge-duplicates,return=representation")
                    .json(&record),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DataError::EmptyResponse("provider upsert".to_string()))
    }

    async fn delete(&self, user_id: &str, provider_name: &str) -> DataResult<usize> {
        let rows: Vec<ProviderRecord> = self
            .send_json(
                self.request(Method::DELETE, PROVIDERS_PATH)
                    .query(&[("user_id", eq(user_id)), ("provider_name", eq(provider_name))])
                    .header("Prefer", "return=representation"),
            )
            .await?;
        Ok(rows.len())
    }

    fn name(&self) -> &str {
        "backend"
    }
}
