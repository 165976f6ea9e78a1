//! Collected users API answers and the assertions tests make on them.

use axum::body::{Body, Bytes};
use http::StatusCode;
use http::header::CONTENT_TYPE;
use serde_json::Value;

/// A fully read response: status, media type and body.
pub struct TestResponse {
    status: StatusCode,
    content_type: Option<String>,
    body: Bytes,
}

impl TestResponse {
    pub(crate) async fn collect(resp: http::Response<Body>) -> Self {
        let (parts, body) = resp.into_parts();
        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .expect("response body could not be read");
        Self {
            status: parts.status,
            content_type,
            body,
        }
    }

    pub fn assert_status(&self, expected: u16) -> &Self {
        assert_eq!(
            self.status.as_u16(),
            expected,
            "unexpected status; body: {}",
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Compare the media type only; `charset` and other parameters are ignored.
    pub fn assert_content_type(&self, expected: &str) -> &Self {
        let media = self
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(str::trim);
        assert_eq!(media, Some(expected));
        self
    }

    pub fn assert_body_contains(&self, needle: &str) -> &Self {
        let text = String::from_utf8_lossy(&self.body);
        assert!(text.contains(needle), "'{needle}' not in body: {text}");
        self
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).expect("body is not UTF-8")
    }

    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("body is not JSON")
    }

    /// The record id in a create or fetch answer; always 24 hex digits.
    #[must_use]
    pub fn id(&self) -> String {
        let id = self.json()["id"]
            .as_str()
            .unwrap_or_else(|| panic!("no string id in {}", self.text()))
            .to_owned();
        assert!(
            id.len() == 24 && id.bytes().all(|b| b.is_ascii_hexdigit()),
            "id is not an ObjectId: {id}"
        );
        id
    }

    /// The `error` detail of a 400 or 500 answer.
    #[must_use]
    pub fn error(&self) -> String {
        self.json()["error"]
            .as_str()
            .unwrap_or_else(|| panic!("no error detail in {}", self.text()))
            .to_owned()
    }

    /// The request body a failed insert echoed back, if any.
    #[must_use]
    pub fn echo(&self) -> Option<Value> {
        self.json().get("body").cloned()
    }
}
