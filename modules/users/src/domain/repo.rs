use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::model::{User, UserId};

/// Errors surfaced by a [`UserRepository`] backend.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("invalid id '{id}': {source}")]
    InvalidId {
        id: String,
        #[source]
        source: bson::oid::Error,
    },

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("store error: {0}")]
    Backend(String),
}

/// Persistence port for user records.
///
/// Implementations are shared by all in-flight requests and must be safe to
/// call concurrently without outside locking.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Store `document` (a JSON object) as-is and return its new id.
    async fn insert(&self, document: Value) -> Result<UserId, RepositoryError>;

    /// Look a record up by its textual id. Parsing the id is the store's job.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError>;
}

/// Connected store handle passed from the runner to the service.
pub type UserStore = Arc<dyn UserRepository>;
