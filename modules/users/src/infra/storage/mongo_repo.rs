use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, Bson, Document, doc};
use mongodb::{Client, Collection};
use serde_json::Value;
use tracing::info;

use crate::domain::model::{User, UserId};
use crate::domain::repo::{RepositoryError, UserRepository};

/// User store backed by a MongoDB-compatible document database.
pub struct MongoUserRepo {
    collection: Collection<Document>,
}

impl MongoUserRepo {
    /// Connect with `uri` and verify the server answers a ping.
    ///
    /// # Errors
    /// Returns an error if the connection string is invalid or the server is unreachable.
    pub async fn connect(uri: &str, database: &str, collection: &str) -> anyhow::Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }).await?;
        info!(database, collection, "Connected to document store");
        Ok(Self {
            collection: db.collection(collection),
        })
    }
}

fn backend(e: &mongodb::error::Error) -> RepositoryError {
    RepositoryError::Backend(e.to_string())
}

#[async_trait::async_trait]
impl UserRepository for MongoUserRepo {
    async fn insert(&self, document: Value) -> Result<UserId, RepositoryError> {
        let Value::Object(mut fields) = document else {
            return Err(RepositoryError::InvalidDocument(
                "expected a JSON object".to_owned(),
            ));
        };
        // The store owns the id; insert_one then always generates an ObjectId.
        fields.remove("_id");
        let doc = bson::to_document(&fields)
            .map_err(|e| RepositoryError::InvalidDocument(e.to_string()))?;

        let res = self.collection.insert_one(doc).await.map_err(|e| backend(&e))?;
        res.inserted_id
            .as_object_id()
            .map(UserId::from)
            .ok_or_else(|| RepositoryError::Backend("inserted id is not an ObjectId".to_owned()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let oid = ObjectId::parse_str(id).map_err(|source| RepositoryError::InvalidId {
            id: id.to_owned(),
            source,
        })?;
        let Some(mut found) = self
            .collection
            .find_one(doc! { "_id": oid })
            .await
            .map_err(|e| backend(&e))?
        else {
            return Ok(None);
        };

        found.remove("_id");
        match Bson::Document(found).into_relaxed_extjson() {
            Value::Object(fields) => Ok(Some(User::new(UserId::from(oid), fields))),
            _ => Err(RepositoryError::Backend(
                "stored record is not a document".to_owned(),
            )),
        }
    }
}
