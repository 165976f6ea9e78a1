//! axum binder for the route table.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method, Uri};
use tower_http::trace::TraceLayer;

use super::reply::{NormalizedResponse, Reply};
use super::routes::{NormalizedRequest, RouteTable, parse_body};

/// Build an axum router exposing every path of `table`.
///
/// Bodies larger than `max_body_size_bytes` are answered with 413 before any
/// handler runs.
#[must_use]
pub fn router(table: RouteTable, max_body_size_bytes: usize) -> Router {
    let table = Arc::new(table);
    let mut router = Router::new();
    for path in table.paths() {
        router = router.route(path, any(handle));
    }
    router
        .fallback(handle)
        .layer(DefaultBodyLimit::max(max_body_size_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(table)
}

async fn handle(
    State(table): State<Arc<RouteTable>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let req = match normalize(&uri, &headers, &body) {
        Ok(req) => req,
        Err(reply) => return render(reply.into_response()),
    };
    render(table.dispatch(&method, uri.path(), req).await)
}

fn normalize(uri: &Uri, headers: &HeaderMap, body: &[u8]) -> Result<NormalizedRequest, Reply> {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let body = parse_body(content_type, body).map_err(Reply::ValidationError)?;

    let params = uri
        .query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect();

    Ok(NormalizedRequest {
        headers,
        params,
        body,
    })
}

fn render(resp: NormalizedResponse) -> Response {
    let content_type = resp.body.content_type();
    (
        resp.status,
        [(CONTENT_TYPE, content_type)],
        resp.body.into_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collects_query_headers_and_body() {
        let uri: Uri = "/users?id=abc&x=1&x=2".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
        headers.insert("X-Trace", "t-1".parse().unwrap());

        let req = normalize(&uri, &headers, br#"{"first":"Ada"}"#).unwrap();
        assert_eq!(req.param("id"), Some("abc"));
        assert_eq!(req.param("x"), Some("2"));
        assert_eq!(req.header("x-trace"), Some("t-1"));
        assert_eq!(req.body["first"], "Ada");
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let uri: Uri = "/users".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());

        let err = normalize(&uri, &headers, b"{").unwrap_err();
        assert!(matches!(err, Reply::ValidationError(_)));
    }
}
