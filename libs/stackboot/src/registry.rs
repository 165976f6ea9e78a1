use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use tracing::debug;

use crate::config::StacksConfig;
use crate::descriptor::{Bootstrap, StackDescriptor, StoreFactory};
use crate::provision::Provisioner;

/// Identity of the administrative stack.
pub const ROOT_IDENTITY: &str = "root";

/// Prefix of every CI identity.
pub const CI_PREFIX: &str = "github-actions-";

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("stack identity '{identity}' is registered more than once")]
    DuplicateIdentity { identity: String },

    #[error(
        "you are '{identity}', but that is not a registered stack identity; add it to the stack registry"
    )]
    UnknownIdentity { identity: String },
}

/// What to do when a key is inserted twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Fail the build with [`RegistryError::DuplicateIdentity`].
    #[default]
    Reject,
    /// Replace the earlier descriptor with the later one.
    LastWins,
}

/// Immutable identity -> descriptor table.
pub struct Registry<S> {
    stacks: BTreeMap<String, Arc<StackDescriptor<S>>>,
}

impl<S> Registry<S> {
    #[must_use]
    pub fn builder() -> RegistryBuilder<S> {
        RegistryBuilder::new(DuplicatePolicy::default())
    }

    /// Resolve an identity to its descriptor.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownIdentity`] if nothing is registered under `identity`.
    pub fn lookup(&self, identity: &str) -> Result<Arc<StackDescriptor<S>>, RegistryError> {
        self.stacks
            .get(identity)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownIdentity {
                identity: identity.to_owned(),
            })
    }

    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.stacks.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    /// Identities whose descriptor can never reach `Serving` nor `Terminated`.
    #[must_use]
    pub fn misconfigured(&self) -> Vec<&str> {
        self.stacks
            .iter()
            .filter(|(_, d)| d.is_misconfigured())
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

/// Ordered, explicit construction of a [`Registry`].
pub struct RegistryBuilder<S> {
    policy: DuplicatePolicy,
    stacks: BTreeMap<String, Arc<StackDescriptor<S>>>,
}

impl<S> RegistryBuilder<S> {
    #[must_use]
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            stacks: BTreeMap::new(),
        }
    }

    /// Register `descriptor` under `identity`.
    ///
    /// # Errors
    /// Returns [`RegistryError::DuplicateIdentity`] when `identity` is already
    /// present and the policy is [`DuplicatePolicy::Reject`].
    pub fn insert(
        &mut self,
        identity: impl Into<String>,
        descriptor: StackDescriptor<S>,
    ) -> Result<&mut Self, RegistryError> {
        let identity = identity.into();
        match self.stacks.entry(identity) {
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(descriptor));
            }
            Entry::Occupied(mut slot) => match self.policy {
                DuplicatePolicy::Reject => {
                    return Err(RegistryError::DuplicateIdentity {
                        identity: slot.key().clone(),
                    });
                }
                DuplicatePolicy::LastWins => {
                    debug!(identity = %slot.key(), "Replacing previously registered stack");
                    slot.insert(Arc::new(descriptor));
                }
            },
        }
        Ok(self)
    }

    #[must_use]
    pub fn build(self) -> Registry<S> {
        Registry {
            stacks: self.stacks,
        }
    }
}

/// Compose the registry from static stack inputs.
///
/// Emits `root`, one `{collaborator}-{local_suffix}` entry per collaborator and
/// one `github-actions-{name}` entry per name in collaborators ∪ environments.
/// Performs no I/O; every side effect is deferred into bootstrap closures.
///
/// # Errors
/// Returns [`RegistryError::DuplicateIdentity`] if two layers produce the same key.
pub fn build_registry<P>(
    inputs: &StacksConfig,
    provisioner: &Arc<P>,
) -> Result<Registry<P::Store>, RegistryError>
where
    P: Provisioner + 'static,
{
    let mut builder = RegistryBuilder::new(DuplicatePolicy::Reject);

    builder.insert(ROOT_IDENTITY, root_stack(inputs, provisioner))?;

    for collaborator in inputs.collaborators.keys() {
        builder.insert(
            format!("{collaborator}-{}", inputs.local_suffix),
            local_stack(inputs, collaborator, provisioner),
        )?;
    }

    for name in ci_names(inputs) {
        builder.insert(format!("{CI_PREFIX}{name}"), ci_stack(name, provisioner))?;
    }

    Ok(builder.build())
}

/// Collaborators followed by environments, first occurrence wins.
fn ci_names(inputs: &StacksConfig) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for name in inputs
        .collaborators
        .keys()
        .map(String::as_str)
        .chain(inputs.environments.iter().map(String::as_str))
    {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

fn root_stack<P>(inputs: &StacksConfig, provisioner: &Arc<P>) -> StackDescriptor<P::Store>
where
    P: Provisioner + 'static,
{
    let repo = inputs.repo();

    let ensure_repository = {
        let p = Arc::clone(provisioner);
        let repo = repo.clone();
        let collaborators = inputs.collaborators.clone();
        Bootstrap::new("ensure-repository", move || {
            let p = Arc::clone(&p);
            let repo = repo.clone();
            let collaborators = collaborators.clone();
            async move { p.ensure_repository(&repo, &collaborators).await }
        })
    };

    let ci_trust = {
        let p = Arc::clone(provisioner);
        let repo = repo.clone();
        let stack = inputs.trust_stack.clone();
        Bootstrap::new("ci-cloud-trust", move || {
            let p = Arc::clone(&p);
            let repo = repo.clone();
            let stack = stack.clone();
            async move { p.ensure_ci_trust(&stack, &repo).await }
        })
    };

    let ensure_branch = {
        let p = Arc::clone(provisioner);
        let branch = inputs.root_branch.clone();
        Bootstrap::new(format!("ensure-branch:{branch}"), move || {
            let p = Arc::clone(&p);
            let repo = repo.clone();
            let branch = branch.clone();
            async move { p.ensure_branch(&branch, &repo, ROOT_IDENTITY).await }
        })
    };

    StackDescriptor::builder()
        .bootstrap(ensure_repository)
        .bootstrap(ci_trust)
        .bootstrap(ensure_branch)
        .bail_after_bootstrap()
        .build()
}

fn local_stack<P>(
    inputs: &StacksConfig,
    collaborator: &str,
    provisioner: &Arc<P>,
) -> StackDescriptor<P::Store>
where
    P: Provisioner + 'static,
{
    let ensure_branch = {
        let p = Arc::clone(provisioner);
        let repo = inputs.repo();
        let branch = collaborator.to_owned();
        let whoami = format!("{CI_PREFIX}{collaborator}");
        Bootstrap::new(format!("ensure-branch:{branch}"), move || {
            let p = Arc::clone(&p);
            let repo = repo.clone();
            let branch = branch.clone();
            let whoami = whoami.clone();
            async move { p.ensure_branch(&branch, &repo, &whoami).await }
        })
    };

    let store = {
        let p = Arc::clone(provisioner);
        let scope = collaborator.to_owned();
        StoreFactory::new(move || {
            let p = Arc::clone(&p);
            let scope = scope.clone();
            async move { p.local_store(&scope).await }
        })
    };

    StackDescriptor::builder()
        .bootstrap(ensure_branch)
        .store_factory(store)
        .build()
}

fn ci_stack<P>(name: &str, provisioner: &Arc<P>) -> StackDescriptor<P::Store>
where
    P: Provisioner + 'static,
{
    let p = Arc::clone(provisioner);
    let owned = name.to_owned();
    let provision = Bootstrap::new(format!("provision:{name}"), move || {
        let p = Arc::clone(&p);
        let name = owned.clone();
        async move {
            let store = p.provision_managed_store(&name).await?;
            p.provision_service(&name, &store).await?;
            Ok(())
        }
    });

    // CI runs provision then exit; they never serve traffic themselves.
    StackDescriptor::builder()
        .bootstrap(provision)
        .bail_after_bootstrap()
        .build()
}
