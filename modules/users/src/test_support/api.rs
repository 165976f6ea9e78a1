//! Endpoint factory for the users API surface.

use http::Method;

use super::harness::AppHarness;
use super::request::RequestCase;

pub struct UsersApi<'a> {
    harness: &'a AppHarness,
}

impl<'a> UsersApi<'a> {
    pub(crate) fn new(harness: &'a AppHarness) -> Self {
        Self { harness }
    }

    #[must_use]
    pub fn hello(&self) -> RequestCase<'a> {
        RequestCase::new(self.harness, Method::GET, "/")
    }

    /// `GET /users` without an `id`; chain `.with_id(..)` as needed.
    #[must_use]
    pub fn get_users(&self) -> RequestCase<'a> {
        RequestCase::new(self.harness, Method::GET, "/users")
    }

    #[must_use]
    pub fn get_user(&self, id: &str) -> RequestCase<'a> {
        self.get_users().with_id(id)
    }

    #[must_use]
    pub fn post_user(&self) -> RequestCase<'a> {
        RequestCase::new(self.harness, Method::POST, "/users")
    }

    #[must_use]
    pub fn request(&self, method: Method, path: &str) -> RequestCase<'a> {
        RequestCase::new(self.harness, method, path)
    }
}
