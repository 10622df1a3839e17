//! Persisted provider records.
//!
//! [`ProviderStore`] is the row-oriented boundary over the `providers`
//! collection, keyed by `(user_id, provider_name)`. Implementations:
//!
//! - [`ProviderDatabase`](crate::db::ProviderDatabase) - local SQLite
//! - [`BackendClient`](crate::backend::BackendClient) - backend REST interface

use async_trait::async_trait;

use crate::error::DataResult;
use crate::models::{NewProviderRecord, ProviderRecord};

/// Query/write interface over persisted provider records.
#[async_trait]
pub trait ProviderStore: Send + Sync {
    /// All records owned by `user_id`, in the store's natural order.
    async fn select_by_owner(&self, user_id: &str) -> DataResult<Vec<ProviderRecord>>;

    /// The record for `(user_id, provider_name)`, if any.
    async fn find(&self, user_id: &str, provider_name: &str)
    -> DataResult<Option<ProviderRecord>>;

    /// Insert, or replace the credential of an existing `(user_id, provider_name)` row.
    async fn upsert(&self, record: NewProviderRecord) -> DataResult<ProviderRecord>;

    /// Delete matching records; returns how many were removed.
    async fn delete(&self, user_id: &str, provider_name: &str) -> DataResult<usize>;

    /// Store name for logging.
    fn name(&self) -> &str;
}
