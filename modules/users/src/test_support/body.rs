//! Body conversion trait for the fluent request builder.

use axum::body::Body;
use http::header::HeaderValue;
use serde::Serialize;

/// Converts a value into a request body, optionally providing a Content-Type header.
pub trait IntoBody {
    fn into_body(self) -> (Body, Option<HeaderValue>);
}

/// Serialize the wrapped value as JSON.
pub struct Json<T>(pub T);

/// Encode the wrapped pairs as `application/x-www-form-urlencoded`.
pub struct Form<'a>(pub &'a [(&'a str, &'a str)]);

impl<T: Serialize> IntoBody for Json<T> {
    fn into_body(self) -> (Body, Option<HeaderValue>) {
        let bytes = serde_json::to_vec(&self.0).expect("failed to serialize body as JSON");
        (
            Body::from(bytes),
            Some(HeaderValue::from_static("application/json")),
        )
    }
}

impl IntoBody for serde_json::Value {
    fn into_body(self) -> (Body, Option<HeaderValue>) {
        Json(self).into_body()
    }
}

impl IntoBody for Form<'_> {
    fn into_body(self) -> (Body, Option<HeaderValue>) {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0)
            .finish();
        (
            Body::from(encoded),
            Some(HeaderValue::from_static(
                "application/x-www-form-urlencoded",
            )),
        )
    }
}

impl IntoBody for &str {
    fn into_body(self) -> (Body, Option<HeaderValue>) {
        (Body::from(self.to_owned()), None)
    }
}

impl IntoBody for String {
    fn into_body(self) -> (Body, Option<HeaderValue>) {
        (Body::from(self), None)
    }
}

impl IntoBody for Vec<u8> {
    fn into_body(self) -> (Body, Option<HeaderValue>) {
        (Body::from(self), None)
    }
}
