use std::fmt;
use std::str::FromStr;

use bson::oid::ObjectId;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Store-assigned record identifier (24 hex characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(ObjectId);

impl UserId {
    #[must_use]
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    #[must_use]
    pub fn as_object_id(&self) -> ObjectId {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ObjectId> for UserId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl FromStr for UserId {
    type Err = bson::oid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s).map(Self)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_hex())
    }
}

/// A stored user record.
///
/// `first` and `last` are conventional but not enforced; every field of the
/// inserted document is kept as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub fields: Map<String, Value>,
}

impl User {
    #[must_use]
    pub fn new(id: UserId, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Renders as the document fields plus `"id"`; the stored id wins over any
/// `id` field in the document.
impl Serialize for User {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = self.fields.keys().filter(|k| k.as_str() != "id").count();
        let mut map = serializer.serialize_map(Some(extra + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (k, v) in self.fields.iter().filter(|(k, _)| k.as_str() != "id") {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
