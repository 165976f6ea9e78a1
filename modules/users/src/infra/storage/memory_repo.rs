use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::domain::model::{User, UserId};
use crate::domain::repo::{RepositoryError, UserRepository};

/// Ephemeral user store backed by `DashMap`, named after the scope it serves.
pub struct InMemoryUserRepo {
    scope: String,
    store: DashMap<UserId, Map<String, Value>>,
}

impl InMemoryUserRepo {
    #[must_use]
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            store: DashMap::new(),
        }
    }

    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepo {
    async fn insert(&self, document: Value) -> Result<UserId, RepositoryError> {
        let mut fields = match document {
            Value::Object(fields) => fields,
            other => {
                return Err(RepositoryError::InvalidDocument(format!(
                    "expected a JSON object, got {}",
                    kind(&other)
                )));
            }
        };
        // The store owns the id.
        fields.remove("_id");
        let id = UserId::new();
        self.store.insert(id, fields);
        Ok(id)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let id: UserId = id.parse().map_err(|source| RepositoryError::InvalidId {
            id: id.to_owned(),
            source,
        })?;
        Ok(self
            .store
            .get(&id)
            .map(|fields| User::new(id, fields.clone())))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
