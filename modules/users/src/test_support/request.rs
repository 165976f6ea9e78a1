//! Requests against the users router, driven through `tower::ServiceExt::oneshot`.

use axum::body::Body;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Method, Request};
use tower::ServiceExt;

use super::body::IntoBody;
use super::harness::AppHarness;
use super::response::TestResponse;

/// One request to the users API, built fluently and sent once.
pub struct RequestCase<'a> {
    harness: &'a AppHarness,
    method: Method,
    path: String,
    params: Vec<(String, String)>,
    content_type: Option<HeaderValue>,
    body: Body,
}

impl<'a> RequestCase<'a> {
    pub(crate) fn new(harness: &'a AppHarness, method: Method, path: impl Into<String>) -> Self {
        Self {
            harness,
            method,
            path: path.into(),
            params: Vec::new(),
            content_type: None,
            body: Body::empty(),
        }
    }

    /// Look up the record `id` (`?id=`).
    #[must_use]
    pub fn with_id(self, id: &str) -> Self {
        self.with_query("id", id)
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Attach a body. A content type supplied by the body replaces any earlier one.
    #[must_use]
    pub fn with_body(mut self, body: impl IntoBody) -> Self {
        let (body, content_type) = body.into_body();
        self.body = body;
        if content_type.is_some() {
            self.content_type = content_type;
        }
        self
    }

    /// Label the body as JSON whatever it contains.
    #[must_use]
    pub fn as_json(mut self) -> Self {
        self.content_type = Some(HeaderValue::from_static("application/json"));
        self
    }

    fn uri(&self) -> String {
        if self.params.is_empty() {
            return self.path.clone();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.params)
            .finish();
        format!("{}?{query}", self.path)
    }

    pub async fn send(self) -> TestResponse {
        let mut request = Request::builder().method(self.method.clone()).uri(self.uri());
        if let Some(content_type) = &self.content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        let request = request.body(self.body).expect("invalid test request");

        let response = self
            .harness
            .router()
            .clone()
            .oneshot(request)
            .await
            .expect("users router is infallible");
        TestResponse::collect(response).await
    }

    pub async fn expect_status(self, status: u16) -> TestResponse {
        let resp = self.send().await;
        resp.assert_status(status);
        resp
    }

    /// Send a `POST /users`, expect 200 and return the assigned id.
    pub async fn expect_created(self) -> String {
        self.expect_status(200).await.id()
    }
}
