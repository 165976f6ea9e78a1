//! Top-level test harness that wires the module around a chosen store.

use std::sync::Arc;

use crate::api::gateway::{GatewayEvent, GatewayResponse, handle_event};
use crate::config::UsersConfig;
use crate::domain::repo::UserStore;
use crate::infra::storage::InMemoryUserRepo;
use crate::module::UsersModule;

use super::api::UsersApi;

/// Fully-wired test environment for the users module.
pub struct AppHarness {
    module: UsersModule,
    router: axum::Router,
}

impl AppHarness {
    #[must_use]
    pub fn builder() -> AppHarnessBuilder {
        AppHarnessBuilder::default()
    }

    #[must_use]
    pub fn api(&self) -> UsersApi<'_> {
        UsersApi::new(self)
    }

    /// Run a proxy event through the same route table the router uses.
    pub async fn gateway(&self, event: GatewayEvent) -> GatewayResponse {
        handle_event(self.module.routes(), event).await
    }

    pub(crate) fn router(&self) -> &axum::Router {
        &self.router
    }
}

/// Builder for [`AppHarness`].
#[derive(Default)]
pub struct AppHarnessBuilder {
    store: Option<UserStore>,
    config: UsersConfig,
}

impl AppHarnessBuilder {
    /// Use `store` instead of a fresh in-memory one.
    #[must_use]
    pub fn with_store(mut self, store: UserStore) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_store_timeout_secs(mut self, secs: u64) -> Self {
        self.config.store_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.config.max_body_size_bytes = bytes;
        self
    }

    #[must_use]
    pub fn build(self) -> AppHarness {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryUserRepo::new("test")));
        let module = UsersModule::new(store, self.config);
        let router = module.router();
        AppHarness { module, router }
    }
}
