//! Minimal user record service.
//!
//! A transport-agnostic [`RouteTable`] answers `GET /`, `GET /users?id=` and
//! `POST /users`; thin binders expose it over axum or API-gateway proxy events.

// === MODULE DEFINITION ===
pub mod module;
pub use module::{UsersModule, serve, serve_with_shutdown, shutdown_signal};

// === PUBLIC API ===
pub use api::gateway::{GatewayEvent, GatewayResponse, handle_event};
pub use api::reply::{NormalizedResponse, Payload, Reply};
pub use api::routes::{NormalizedRequest, RouteTable};
pub use config::UsersConfig;
pub use domain::error::DomainError;
pub use domain::model::{User, UserId};
pub use domain::repo::{RepositoryError, UserRepository, UserStore};
pub use domain::service::UserService;
pub use infra::storage::InMemoryUserRepo;
#[cfg(feature = "mongo")]
pub use infra::storage::MongoUserRepo;

// === INTERNAL MODULES ===
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
pub(crate) mod domain;
pub(crate) mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;
