use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

type BootstrapFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
type StoreFn<S> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<S>> + Send + Sync>;

/// A named, one-shot setup action with external side effects.
///
/// The running service never depends on a bootstrap directly; bootstraps make
/// sure something exists (a repository, a CI secret, a database) before the
/// stack proceeds.
#[derive(Clone)]
pub struct Bootstrap {
    name: String,
    action: BootstrapFn,
}

impl Bootstrap {
    #[must_use]
    pub fn new<F, Fut>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            action: Arc::new(move || Box::pin(action())),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn invoke(&self) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.action)()
    }
}

impl fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bootstrap")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Async factory producing a connected store handle of type `S`.
pub struct StoreFactory<S> {
    connect: StoreFn<S>,
}

impl<S> StoreFactory<S> {
    #[must_use]
    pub fn new<F, Fut>(connect: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<S>> + Send + 'static,
    {
        Self {
            connect: Arc::new(move || Box::pin(connect())),
        }
    }

    pub(crate) fn connect(&self) -> BoxFuture<'static, anyhow::Result<S>> {
        (self.connect)()
    }
}

impl<S> Clone for StoreFactory<S> {
    fn clone(&self) -> Self {
        Self {
            connect: Arc::clone(&self.connect),
        }
    }
}

impl<S> fmt::Debug for StoreFactory<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StoreFactory")
    }
}

/// Configuration bundle for one deployable identity.
///
/// Immutable once built; the registry hands out shared references.
pub struct StackDescriptor<S> {
    bootstraps: Vec<Bootstrap>,
    bail_after_bootstrap: bool,
    store_factory: Option<StoreFactory<S>>,
}

impl<S> StackDescriptor<S> {
    #[must_use]
    pub fn builder() -> StackDescriptorBuilder<S> {
        StackDescriptorBuilder::default()
    }

    #[must_use]
    pub fn bootstraps(&self) -> &[Bootstrap] {
        &self.bootstraps
    }

    #[must_use]
    pub fn bails_after_bootstrap(&self) -> bool {
        self.bail_after_bootstrap
    }

    #[must_use]
    pub fn store_factory(&self) -> Option<&StoreFactory<S>> {
        self.store_factory.as_ref()
    }

    /// A descriptor that neither bails nor knows how to reach a store can
    /// never reach `Serving`.
    #[must_use]
    pub fn is_misconfigured(&self) -> bool {
        !self.bail_after_bootstrap && self.store_factory.is_none()
    }
}

impl<S> fmt::Debug for StackDescriptor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackDescriptor")
            .field("bootstraps", &self.bootstraps)
            .field("bail_after_bootstrap", &self.bail_after_bootstrap)
            .field("store_factory", &self.store_factory.is_some())
            .finish()
    }
}

/// Builder for [`StackDescriptor`].
pub struct StackDescriptorBuilder<S> {
    bootstraps: Vec<Bootstrap>,
    bail_after_bootstrap: bool,
    store_factory: Option<StoreFactory<S>>,
}

impl<S> Default for StackDescriptorBuilder<S> {
    fn default() -> Self {
        Self {
            bootstraps: Vec::new(),
            bail_after_bootstrap: false,
            store_factory: None,
        }
    }
}

impl<S> StackDescriptorBuilder<S> {
    /// Append a bootstrap; bootstraps run in the order they are added.
    #[must_use]
    pub fn bootstrap(mut self, bootstrap: Bootstrap) -> Self {
        self.bootstraps.push(bootstrap);
        self
    }

    #[must_use]
    pub fn bail_after_bootstrap(mut self) -> Self {
        self.bail_after_bootstrap = true;
        self
    }

    #[must_use]
    pub fn store_factory(mut self, factory: StoreFactory<S>) -> Self {
        self.store_factory = Some(factory);
        self
    }

    #[must_use]
    pub fn build(self) -> StackDescriptor<S> {
        StackDescriptor {
            bootstraps: self.bootstraps,
            bail_after_bootstrap: self.bail_after_bootstrap,
            store_factory: self.store_factory,
        }
    }
}
