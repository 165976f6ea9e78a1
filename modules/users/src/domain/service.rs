use std::future::Future;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::error::DomainError;
use super::model::{User, UserId};
use super::repo::{RepositoryError, UserStore};

/// User operations over a shared store, each bounded by a deadline.
#[derive(Clone)]
pub struct UserService {
    store: UserStore,
    timeout: Option<Duration>,
}

impl UserService {
    /// `timeout: None` lets store calls run unbounded.
    #[must_use]
    pub fn new(store: UserStore, timeout: Option<Duration>) -> Self {
        Self { store, timeout }
    }

    /// Fetch one user by id.
    ///
    /// # Errors
    /// - [`DomainError::Validation`] if `id` is empty
    /// - [`DomainError::NotFound`] if no record matches
    /// - [`DomainError::Store`] / [`DomainError::Timeout`] on store faults,
    ///   including ids the store cannot parse
    pub async fn get(&self, id: &str) -> Result<User, DomainError> {
        if id.is_empty() {
            return Err(DomainError::validation("id must be set"));
        }
        debug!(id, "Looking up user");
        self.bounded("find user", self.store.find_by_id(id))
            .await?
            .ok_or_else(|| DomainError::not_found(id))
    }

    /// Insert `document` unchanged; an absent body (`null`) is an empty record.
    ///
    /// # Errors
    /// [`DomainError::Store`] / [`DomainError::Timeout`] on store faults,
    /// including documents that are not JSON objects.
    pub async fn create(&self, document: Value) -> Result<UserId, DomainError> {
        let document = match document {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let id = self.bounded("insert user", self.store.insert(document)).await?;
        debug!(%id, "Inserted user");
        Ok(id)
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, RepositoryError>>,
    ) -> Result<T, DomainError> {
        let Some(timeout) = self.timeout else {
            return fut.await.map_err(|e| store_fault(operation, e));
        };
        match tokio::time::timeout(timeout, fut).await {
            Ok(res) => res.map_err(|e| store_fault(operation, e)),
            Err(_) => {
                warn!(operation, ?timeout, "Store call timed out");
                Err(DomainError::Timeout { operation, timeout })
            }
        }
    }
}

fn store_fault(operation: &'static str, e: RepositoryError) -> DomainError {
    warn!(operation, error = %e, "Store call failed");
    DomainError::from(e)
}
