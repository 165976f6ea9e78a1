//! Test utilities for users integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

pub mod api;
pub mod body;
pub mod harness;
pub mod request;
pub mod response;
pub mod stores;

pub use api::UsersApi;
pub use body::{Form, IntoBody, Json};
pub use harness::{AppHarness, AppHarnessBuilder};
pub use request::RequestCase;
pub use response::TestResponse;
pub use stores::{FailingUserRepo, SlowUserRepo};
