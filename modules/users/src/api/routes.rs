//! Transport-agnostic route table: path -> method -> handler.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use http::Method;
use serde_json::{Value, json};
use tracing::debug;

use super::reply::{NormalizedResponse, Reply};
use crate::domain::service::UserService;

/// Request after a binder has stripped away its transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRequest {
    /// Header names are lower-cased.
    pub headers: BTreeMap<String, String>,
    /// Query-string parameters; the last value wins on repeats.
    pub params: BTreeMap<String, String>,
    /// Parsed body; `Value::Null` when absent.
    pub body: Value,
}

impl NormalizedRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Decode a raw body according to its content type.
///
/// JSON types are parsed and urlencoded forms become an object of strings.
/// Other content types are not decoded, so they read as `null` like an empty
/// body.
pub(crate) fn parse_body(content_type: Option<&str>, raw: &[u8]) -> Result<Value, String> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if mime == "application/json" || mime.ends_with("+json") {
        serde_json::from_slice(raw).map_err(|e| format!("invalid JSON body: {e}"))
    } else if mime == "application/x-www-form-urlencoded" {
        Ok(Value::Object(
            form_urlencoded::parse(raw)
                .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                .collect(),
        ))
    } else {
        debug!(content_type = %mime, len = raw.len(), "Ignoring undecoded request body");
        Ok(Value::Null)
    }
}

type Handler = Arc<dyn Fn(NormalizedRequest) -> BoxFuture<'static, Reply> + Send + Sync>;

/// Immutable once handed to a binder; cloning shares the handlers.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<String, HashMap<Method, Handler>>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The user service routes: `GET /`, `GET /users`, `POST /users`.
    #[must_use]
    pub fn users(service: UserService) -> Self {
        let get_svc = service.clone();
        let post_svc = service;

        Self::new()
            .route("/", Method::GET, |_req| async { Reply::text("hello!") })
            .route("/users", Method::GET, move |req| {
                let svc = get_svc.clone();
                async move { get_user(&svc, &req).await }
            })
            .route("/users", Method::POST, move |req| {
                let svc = post_svc.clone();
                async move { create_user(&svc, req).await }
            })
    }

    /// Register `handler` for `method` on `path`, replacing any previous one.
    #[must_use]
    pub fn route<F, Fut>(mut self, path: &str, method: Method, handler: F) -> Self
    where
        F: Fn(NormalizedRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Reply> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |req| Box::pin(handler(req)));
        self.routes
            .entry(path.to_owned())
            .or_default()
            .insert(method, handler);
        self
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// `(method, path)` pairs in a stable order, for startup logging.
    #[must_use]
    pub fn endpoints(&self) -> Vec<(Method, &str)> {
        let mut out = Vec::new();
        for (path, methods) in &self.routes {
            let mut ms: Vec<&Method> = methods.keys().collect();
            ms.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            out.extend(ms.into_iter().map(|m| (m.clone(), path.as_str())));
        }
        out
    }

    /// Route a request: unknown path is 404, known path with another method is 405.
    pub async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        req: NormalizedRequest,
    ) -> NormalizedResponse {
        let Some(methods) = self.routes.get(path) else {
            debug!(%method, path, "No route for path");
            return Reply::NotFound.into_response();
        };
        let Some(handler) = methods.get(method) else {
            debug!(%method, path, "Method not allowed");
            return NormalizedResponse::method_not_allowed();
        };
        handler(req).await.into_response()
    }
}

async fn get_user(svc: &UserService, req: &NormalizedRequest) -> Reply {
    let id = req.param("id").unwrap_or_default();
    match svc.get(id).await {
        Ok(user) => match serde_json::to_value(&user) {
            Ok(body) => Reply::json(body),
            Err(e) => Reply::StoreError {
                detail: e.to_string(),
                echo: None,
            },
        },
        Err(e) => Reply::from_domain(e, None),
    }
}

async fn create_user(svc: &UserService, req: NormalizedRequest) -> Reply {
    let echo = req.body.clone();
    match svc.create(req.body).await {
        Ok(id) => Reply::json(json!({ "id": id })),
        Err(e) => Reply::from_domain(e, Some(echo)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new()
            .route("/ping", Method::GET, |_req| async { Reply::text("pong") })
            .route("/echo", Method::POST, |req: NormalizedRequest| async move {
                Reply::json(req.body)
            })
    }

    #[tokio::test]
    async fn dispatches_by_path_and_method() {
        let resp = table()
            .dispatch(&Method::GET, "/ping", NormalizedRequest::new())
            .await;
        assert_eq!(resp.status, http::StatusCode::OK);
        assert_eq!(resp.body.into_string(), "pong");

        let resp = table()
            .dispatch(
                &Method::POST,
                "/echo",
                NormalizedRequest::new().with_body(json!({"a": 1})),
            )
            .await;
        assert_eq!(resp.body.into_string(), r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn unknown_path_and_method() {
        let resp = table()
            .dispatch(&Method::GET, "/nope", NormalizedRequest::new())
            .await;
        assert_eq!(resp.status, http::StatusCode::NOT_FOUND);

        let resp = table()
            .dispatch(&Method::DELETE, "/ping", NormalizedRequest::new())
            .await;
        assert_eq!(resp.status, http::StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn endpoints_are_sorted() {
        let t = table().route("/ping", Method::DELETE, |_req| async { Reply::NotFound });
        let eps: Vec<String> = t
            .endpoints()
            .into_iter()
            .map(|(m, p)| format!("{m} {p}"))
            .collect();
        assert_eq!(eps, ["POST /echo", "DELETE /ping", "GET /ping"]);
    }

    #[test]
    fn body_parsing_follows_content_type() {
        assert_eq!(parse_body(None, b"").unwrap(), Value::Null);
        assert_eq!(
            parse_body(Some("application/json; charset=utf-8"), br#"{"first":"Ada"}"#).unwrap(),
            json!({"first": "Ada"})
        );
        assert_eq!(
            parse_body(Some("application/x-www-form-urlencoded"), b"first=Ada&last=Love+lace")
                .unwrap(),
            json!({"first": "Ada", "last": "Love lace"})
        );
        assert_eq!(parse_body(Some("text/plain"), b"hi").unwrap(), Value::Null);
        assert_eq!(parse_body(None, &[0xff, 0xfe]).unwrap(), Value::Null);
        assert!(parse_body(Some("application/json"), b"{oops").is_err());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = NormalizedRequest::new().with_header("Content-Type", "text/plain");
        assert_eq!(req.header("content-type"), Some("text/plain"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("text/plain"));
    }
}
