//! Store doubles for fault and deadline tests.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::model::{User, UserId};
use crate::domain::repo::{RepositoryError, UserRepository};

/// Every call fails with a backend error.
pub struct FailingUserRepo {
    message: String,
}

impl FailingUserRepo {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl UserRepository for FailingUserRepo {
    async fn insert(&self, _document: Value) -> Result<UserId, RepositoryError> {
        Err(RepositoryError::Backend(self.message.clone()))
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<User>, RepositoryError> {
        Err(RepositoryError::Backend(self.message.clone()))
    }
}

/// Every call sleeps for `delay` before answering as an empty store.
pub struct SlowUserRepo {
    delay: Duration,
}

impl SlowUserRepo {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl UserRepository for SlowUserRepo {
    async fn insert(&self, _document: Value) -> Result<UserId, RepositoryError> {
        tokio::time::sleep(self.delay).await;
        Ok(UserId::new())
    }

    async fn find_by_id(&self, _id: &str) -> Result<Option<User>, RepositoryError> {
        tokio::time::sleep(self.delay).await;
        Ok(None)
    }
}
