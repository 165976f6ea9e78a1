//! API-gateway proxy event binder.
//!
//! Maps a proxy-integration event onto the route table and the reply back
//! onto a gateway response, so the same handlers can run in a serverless
//! function.

use std::collections::{BTreeMap, HashMap};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::reply::{NormalizedResponse, Reply};
use super::routes::{NormalizedRequest, RouteTable, parse_body};

/// Incoming proxy event. Fields the binder does not use are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    pub http_method: String,
    pub path: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub is_base64_encoded: bool,
}

impl From<NormalizedResponse> for GatewayResponse {
    fn from(resp: NormalizedResponse) -> Self {
        let headers = BTreeMap::from([(
            "content-type".to_owned(),
            resp.body.content_type().to_owned(),
        )]);
        Self {
            status_code: resp.status.as_u16(),
            headers,
            body: resp.body.into_string(),
            is_base64_encoded: false,
        }
    }
}

/// Run one proxy event through `table`.
pub async fn handle_event(table: &RouteTable, event: GatewayEvent) -> GatewayResponse {
    debug!(method = %event.http_method, path = %event.path, "Handling gateway event");

    let Ok(method) = Method::from_bytes(event.http_method.to_ascii_uppercase().as_bytes()) else {
        return NormalizedResponse::method_not_allowed().into();
    };

    let req = match normalize(
        event.headers,
        event.query_string_parameters,
        event.body,
        event.is_base64_encoded,
    ) {
        Ok(req) => req,
        Err(reply) => return reply.into_response().into(),
    };

    table.dispatch(&method, &event.path, req).await.into()
}

fn normalize(
    headers: Option<HashMap<String, String>>,
    params: Option<HashMap<String, String>>,
    body: Option<String>,
    is_base64: bool,
) -> Result<NormalizedRequest, Reply> {
    let headers: BTreeMap<String, String> = headers
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v))
        .collect();

    let raw = match body {
        Some(b) if is_base64 => STANDARD
            .decode(b.as_bytes())
            .map_err(|e| Reply::ValidationError(format!("invalid base64 body: {e}")))?,
        Some(b) => b.into_bytes(),
        None => Vec::new(),
    };
    let content_type = headers.get("content-type").map(String::as_str);
    let body = parse_body(content_type, &raw).map_err(Reply::ValidationError)?;

    Ok(NormalizedRequest {
        headers,
        params: params.unwrap_or_default().into_iter().collect(),
        body,
    })
}
