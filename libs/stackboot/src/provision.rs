//! Provisioning collaborator seam.
//!
//! Everything with real side effects (source control, cloud trust, managed
//! databases, service gateways, local stores) goes through [`Provisioner`].
//! The registry only wires these calls into bootstrap closures.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source-control repository coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Repository permission granted to a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Pull,
    Triage,
    #[default]
    Push,
    Maintain,
    Admin,
}

impl Permission {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Triage => "triage",
            Self::Push => "push",
            Self::Maintain => "maintain",
            Self::Admin => "admin",
        }
    }
}

/// Collaborator login -> permission.
pub type Collaborators = BTreeMap<String, Permission>;

/// Flattened outputs of a provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackOutputs(BTreeMap<String, serde_json::Value>);

impl StackOutputs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(serde_json::Value::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, serde_json::Value)> for StackOutputs {
    fn from_iter<T: IntoIterator<Item = (String, serde_json::Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Idempotent provisioning operations invoked by bootstraps and store factories.
///
/// Implementations must be safe to re-run: every call means "ensure this
/// exists", never "create a new one".
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Connected store handle produced by [`Provisioner::local_store`].
    type Store: Send + 'static;

    /// Ensure the repository exists and every collaborator has access.
    async fn ensure_repository(
        &self,
        repo: &RepoRef,
        collaborators: &Collaborators,
    ) -> anyhow::Result<()>;

    /// Establish the trust relationship that lets CI assume a cloud role.
    async fn ensure_ci_trust(&self, stack: &str, repo: &RepoRef) -> anyhow::Result<()>;

    /// Ensure a branch environment and its CI wiring exist.
    async fn ensure_branch(&self, branch: &str, repo: &RepoRef, whoami: &str)
    -> anyhow::Result<()>;

    /// Provision the managed document store for `name`.
    async fn provision_managed_store(&self, name: &str) -> anyhow::Result<StackOutputs>;

    /// Provision compute and routing for `name`, wired to `store`.
    async fn provision_service(
        &self,
        name: &str,
        store: &StackOutputs,
    ) -> anyhow::Result<StackOutputs>;

    /// Bring up an ephemeral store scoped to `scope` and connect to it.
    async fn local_store(&self, scope: &str) -> anyhow::Result<Self::Store>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_ref_displays_as_owner_slash_name() {
        assert_eq!(RepoRef::new("acme", "todo-app").to_string(), "acme/todo-app");
    }

    #[test]
    fn permission_round_trips_lowercase() {
        let p: Permission = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(p, Permission::Admin);
        assert_eq!(serde_json::to_string(&Permission::Maintain).unwrap(), "\"maintain\"");
        assert_eq!(Permission::Triage.as_str(), "triage");
    }

    #[test]
    fn stack_outputs_string_lookup() {
        let outputs: StackOutputs = [
            ("url".to_owned(), serde_json::json!("https://api.example")),
            ("port".to_owned(), serde_json::json!(27017)),
        ]
        .into_iter()
        .collect();

        assert_eq!(outputs.get_str("url"), Some("https://api.example"));
        assert_eq!(outputs.get_str("port"), None);
        assert_eq!(outputs.get("port"), Some(&serde_json::json!(27017)));
    }
}
