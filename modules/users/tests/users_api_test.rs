use std::sync::Arc;
use std::time::Duration;

use http::Method;
use serde_json::json;
use users::test_support::{AppHarness, FailingUserRepo, Form, SlowUserRepo};

// GET / answers without touching the store.
#[tokio::test]
async fn hello_is_always_ok() {
    let h = AppHarness::builder().build();

    let resp = h.api().hello().expect_status(200).await;
    resp.assert_content_type("text/plain");
    assert_eq!(resp.text(), "hello!");
}

#[tokio::test]
async fn hello_is_ok_even_with_a_broken_store() {
    let h = AppHarness::builder()
        .with_store(Arc::new(FailingUserRepo::new("connection refused")))
        .build();

    let resp = h.api().hello().expect_status(200).await;
    assert_eq!(resp.text(), "hello!");
}

// POST then GET returns the same fields plus the id.
#[tokio::test]
async fn create_then_fetch_round_trip() {
    let h = AppHarness::builder().build();

    let created = h
        .api()
        .post_user()
        .with_body(json!({"first": "Ada", "last": "Lovelace"}))
        .expect_status(200)
        .await;
    created.assert_content_type("application/json");
    let id = created.id();

    let fetched = h.api().get_user(&id).expect_status(200).await.json();
    assert_eq!(fetched, json!({"id": id, "first": "Ada", "last": "Lovelace"}));
}

#[tokio::test]
async fn extra_fields_pass_through() {
    let h = AppHarness::builder().build();

    let id = h
        .api()
        .post_user()
        .with_body(json!({"first": "Ada", "tags": ["math"]}))
        .expect_created()
        .await;

    let fetched = h.api().get_user(&id).expect_status(200).await.json();
    assert_eq!(fetched["tags"], json!(["math"]));
    assert!(fetched.get("last").is_none());
}

#[tokio::test]
async fn form_body_is_accepted() {
    let h = AppHarness::builder().build();

    let id = h
        .api()
        .post_user()
        .with_body(Form(&[("first", "Grace"), ("last", "Hopper")]))
        .expect_created()
        .await;

    let fetched = h.api().get_user(&id).expect_status(200).await.json();
    assert_eq!(fetched["last"], "Hopper");
}

// Like an unparsed body in the original service, no body means no fields.
#[tokio::test]
async fn empty_body_creates_an_empty_record() {
    let h = AppHarness::builder().build();

    let id = h.api().post_user().expect_created().await;

    let fetched = h.api().get_user(&id).expect_status(200).await.json();
    assert_eq!(fetched, json!({ "id": id }));
}

#[tokio::test]
async fn undecoded_text_body_creates_an_empty_record() {
    let h = AppHarness::builder().build();

    let id = h
        .api()
        .post_user()
        .with_body("first=Ada")
        .expect_created()
        .await;

    let fetched = h.api().get_user(&id).expect_status(200).await.json();
    assert!(fetched.get("first").is_none());
}

#[tokio::test]
async fn client_store_id_does_not_replace_assigned_id() {
    let h = AppHarness::builder().build();

    let id = h
        .api()
        .post_user()
        .with_body(json!({"_id": "mine", "id": "also-mine", "first": "Ada"}))
        .expect_created()
        .await;

    let fetched = h.api().get_user(&id).expect_status(200).await.json();
    assert_eq!(fetched, json!({"id": id, "first": "Ada"}));
}

#[tokio::test(start_paused = true)]
async fn zero_store_timeout_means_no_deadline() {
    let h = AppHarness::builder()
        .with_store(Arc::new(SlowUserRepo::new(Duration::from_secs(3600))))
        .with_store_timeout_secs(0)
        .build();

    h.api()
        .get_user("000000000000000000000000")
        .expect_status(404)
        .await;
}

#[tokio::test]
async fn missing_id_is_bad_request() {
    let h = AppHarness::builder().build();

    let resp = h.api().get_users().expect_status(400).await;
    assert_eq!(resp.error(), "id must be set");

    h.api().get_user("").expect_status(400).await;
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let h = AppHarness::builder().build();

    let resp = h
        .api()
        .get_user("000000000000000000000000")
        .expect_status(404)
        .await;
    assert_eq!(resp.text(), "not found");
}

#[tokio::test]
async fn malformed_id_is_a_store_fault() {
    let h = AppHarness::builder().build();

    let resp = h.api().get_user("not-an-object-id").expect_status(500).await;
    assert!(resp.error().contains("not-an-object-id"));
    assert_eq!(resp.echo(), None);
}

#[tokio::test]
async fn non_object_body_echoes_request() {
    let h = AppHarness::builder().build();

    let resp = h
        .api()
        .post_user()
        .with_body(json!(["first", "last"]))
        .expect_status(500)
        .await;
    assert_eq!(resp.echo(), Some(json!(["first", "last"])));
}

#[tokio::test]
async fn store_failure_on_insert_echoes_request() {
    let h = AppHarness::builder()
        .with_store(Arc::new(FailingUserRepo::new("disk full")))
        .build();

    let resp = h
        .api()
        .post_user()
        .with_body(json!({"first": "Ada"}))
        .expect_status(500)
        .await;
    assert!(resp.error().contains("disk full"));
    assert_eq!(resp.echo(), Some(json!({"first": "Ada"})));
}

#[tokio::test(start_paused = true)]
async fn slow_store_times_out_with_500() {
    let h = AppHarness::builder()
        .with_store(Arc::new(SlowUserRepo::new(Duration::from_secs(60))))
        .with_store_timeout_secs(1)
        .build();

    let resp = h
        .api()
        .get_user("000000000000000000000000")
        .expect_status(500)
        .await;
    resp.assert_body_contains("did not complete");

    let resp = h
        .api()
        .post_user()
        .with_body(json!({"first": "Ada"}))
        .expect_status(500)
        .await;
    assert_eq!(resp.echo(), Some(json!({"first": "Ada"})));
}

#[tokio::test]
async fn unknown_path_and_method() {
    let h = AppHarness::builder().build();

    h.api()
        .request(Method::GET, "/nowhere")
        .expect_status(404)
        .await;
    h.api()
        .request(Method::DELETE, "/users")
        .expect_status(405)
        .await;
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let h = AppHarness::builder().build();

    h.api()
        .post_user()
        .with_body("{not json")
        .as_json()
        .expect_status(400)
        .await;
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let h = AppHarness::builder().with_max_body_size(64).build();

    let big = "x".repeat(1024);
    h.api()
        .post_user()
        .with_body(json!({ "first": big }))
        .expect_status(413)
        .await;
}
