use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use users::GatewayEvent;
use users::test_support::{AppHarness, FailingUserRepo};

fn event(method: &str, path: &str) -> GatewayEvent {
    GatewayEvent {
        http_method: method.to_owned(),
        path: path.to_owned(),
        ..GatewayEvent::default()
    }
}

fn json_headers() -> Option<HashMap<String, String>> {
    Some(HashMap::from([(
        "Content-Type".to_owned(),
        "application/json".to_owned(),
    )]))
}

#[tokio::test]
async fn hello_over_gateway() {
    let h = AppHarness::builder()
        .with_store(Arc::new(FailingUserRepo::new("down")))
        .build();

    let resp = h.gateway(event("GET", "/")).await;
    assert_eq!(resp.status_code, 200);
    assert_eq!(resp.body, "hello!");
    assert_eq!(resp.headers["content-type"], "text/plain; charset=utf-8");
}

#[tokio::test]
async fn post_over_gateway_then_get_over_http() {
    let h = AppHarness::builder().build();

    let created = h
        .gateway(GatewayEvent {
            headers: json_headers(),
            body: Some(STANDARD.encode(br#"{"first":"Ada","last":"Lovelace"}"#)),
            is_base64_encoded: true,
            ..event("POST", "/users")
        })
        .await;
    assert_eq!(created.status_code, 200);
    let id = serde_json::from_str::<serde_json::Value>(&created.body).unwrap()["id"]
        .as_str()
        .unwrap()
        .to_owned();

    // Both binders share one store.
    let fetched = h.api().get_user(&id).expect_status(200).await.json();
    assert_eq!(fetched["last"], "Lovelace");

    let via_gateway = h
        .gateway(GatewayEvent {
            query_string_parameters: Some(HashMap::from([("id".to_owned(), id.clone())])),
            ..event("GET", "/users")
        })
        .await;
    assert_eq!(via_gateway.status_code, 200);
    assert_eq!(via_gateway.headers["content-type"], "application/json");
}

#[tokio::test]
async fn gateway_status_mapping() {
    let h = AppHarness::builder().build();

    assert_eq!(h.gateway(event("GET", "/users")).await.status_code, 400);
    assert_eq!(
        h.gateway(GatewayEvent {
            query_string_parameters: Some(HashMap::from([(
                "id".to_owned(),
                "000000000000000000000000".to_owned()
            )])),
            ..event("GET", "/users")
        })
        .await
        .status_code,
        404
    );
    assert_eq!(h.gateway(event("GET", "/missing")).await.status_code, 404);
    assert_eq!(h.gateway(event("PUT", "/users")).await.status_code, 405);
}

#[tokio::test]
async fn gateway_store_error_echoes_body() {
    let h = AppHarness::builder()
        .with_store(Arc::new(FailingUserRepo::new("timeout")))
        .build();

    let resp = h
        .gateway(GatewayEvent {
            headers: json_headers(),
            body: Some(r#"{"first":"Ada"}"#.to_owned()),
            ..event("POST", "/users")
        })
        .await;
    assert_eq!(resp.status_code, 500);
    let body: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(body["body"], json!({"first": "Ada"}));
}

#[tokio::test]
async fn gateway_post_without_body_creates_empty_record() {
    let h = AppHarness::builder().build();

    let created = h.gateway(event("POST", "/users")).await;
    assert_eq!(created.status_code, 200);
    let id = serde_json::from_str::<serde_json::Value>(&created.body).unwrap()["id"]
        .as_str()
        .unwrap()
        .to_owned();

    let fetched = h.api().get_user(&id).expect_status(200).await.json();
    assert_eq!(fetched, json!({ "id": id }));
}
