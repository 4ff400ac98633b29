//! End-to-end scenarios against the live `axum::Router`, with the hosted
//! and worker upstreams replaced by a [`wiremock`] mock server. These are
//! the numbered scenarios from spec.md §8, driven through the real HTTP
//! surface rather than unit-testing the dispatch core in isolation.

use std::io::Write;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use gateway_config::GatewayConfig;
use gateway_http::{app, build_state};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn base_config() -> GatewayConfig {
    GatewayConfig::default()
}

async fn router_for(config: &GatewayConfig, hosted_endpoint: Option<&str>) -> Router {
    let state = build_state(config, hosted_endpoint).await.expect("build state");
    app::router(state)
}

async fn post(router: &Router, uri: &str, body: Value, cookie: Option<&str>) -> axum::response::Response {
    let mut builder = Request::builder().method("POST").uri(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = builder.body(Body::from(serde_json::to_vec(&body).unwrap())).unwrap();
    router.clone().oneshot(request).await.unwrap()
}

async fn get(router: &Router, uri: &str) -> axum::response::Response {
    let request = Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap();
    router.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Pulls the `data` field of a `/api/question` envelope back out of its
/// JSON-encoded string, per spec.md §6's "data: JSON-string of {...}".
fn envelope_data(envelope: &Value) -> Value {
    serde_json::from_str(envelope["data"].as_str().unwrap()).unwrap()
}

fn session_cookie(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|raw| raw.split(';').next().unwrap().to_string())
}

#[tokio::test]
async fn happy_path_hosted_answers_and_persists_the_turn() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "hi"}}]
        })))
        .mount(&mock_server)
        .await;

    let config = GatewayConfig {
        openai_key: vec!["sk-A".to_string()],
        ..base_config()
    };
    let state = build_state(&config, Some(&mock_server.uri())).await.unwrap();
    let store = state.store.clone();
    let router = app::router(state);

    let response = post(&router, "/api/question", json!({"message": "hello"}), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = body_json(response).await;
    let data = envelope_data(&envelope);
    assert_eq!(data["text"], "hi");
    assert_eq!(data["model"], "gpt");

    let conversation_id = data["conversationId"].as_str().unwrap().to_string();
    let turns = store.recent(&conversation_id, 0).await.unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].prompt, "hello");
    assert_eq!(turns[0].reply, "hi");
    assert_eq!(turns[0].model, "gpt");
}

#[tokio::test]
async fn worker_selection_routes_to_the_registered_model() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "a", "errcode": 0, "ret": 0
        })))
        .mount(&mock_server)
        .await;

    let mut bs_model = std::collections::HashMap::new();
    bs_model.insert("m1".to_string(), vec![mock_server.uri()]);
    let config = GatewayConfig { bs_model, ..base_config() };
    let state = build_state(&config, None).await.unwrap();

    // The health monitor probes immediately on spawn; give it a moment to
    // promote the freshly registered worker from Down to Available.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let router = app::router(state);
    let response = post(&router, "/api/question", json!({"message": "q", "model": "m1"}), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = body_json(response).await;
    let data = envelope_data(&envelope);
    assert_eq!(data["text"], "a");
    assert_eq!(data["model"], "m1");
}

#[tokio::test]
async fn unknown_model_is_rejected_before_dispatch() {
    let config = base_config();
    let router = router_for(&config, None).await;

    let response = post(&router, "/api/question", json!({"message": "q", "model": "nope"}), None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let envelope = body_json(response).await;
    assert_eq!(envelope["msg"], "model nope not supported");
}

#[tokio::test]
async fn sensitive_message_short_circuits_with_the_canned_refusal() {
    let mut word_list = tempfile::NamedTempFile::new().unwrap();
    writeln!(word_list, "badword").unwrap();
    word_list.flush().unwrap();

    let config = GatewayConfig {
        sensitive: word_list.path().display().to_string(),
        ..base_config()
    };
    let router = router_for(&config, None).await;

    let response = post(&router, "/api/question", json!({"message": "this has badword inside"}), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = body_json(response).await;
    let data = envelope_data(&envelope);
    assert_eq!(data["text"], gateway_types::SENSITIVE_REPLY);
    assert_eq!(data["conversationId"], "");
}

#[tokio::test]
async fn clear_sentinel_resets_session_continuity() {
    let config = base_config();
    let router = router_for(&config, None).await;

    let response = post(&router, "/api/question", json!({"message": "clear"}), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = body_json(response).await;
    let data = envelope_data(&envelope);
    assert_eq!(data["text"], "Cleared");
}

#[tokio::test]
async fn duplicate_registration_is_rejected_and_registry_unchanged() {
    let mut bs_model = std::collections::HashMap::new();
    bs_model.insert("m1".to_string(), Vec::new());
    let config = GatewayConfig { bs_model, ..base_config() };
    let router = router_for(&config, None).await;

    let body = json!({"model": "m1", "url": "http://127.0.0.1:1"});
    let first = post(&router, "/api/register", body.clone(), None).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = post(&router, "/api/register", body, None).await;
    assert_eq!(second.status(), StatusCode::FORBIDDEN);
    let envelope = body_json(second).await;
    assert_eq!(envelope["msg"], "already registered");
}

#[tokio::test(start_paused = true)]
async fn no_in_flight_capacity_times_out_to_an_empty_reply() {
    let config = GatewayConfig { max_pending: 0, ..base_config() };
    let router = router_for(&config, None).await;

    let response = post(&router, "/api/question", json!({"message": "hi"}), None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let envelope = body_json(response).await;
    let data = envelope_data(&envelope);
    assert_eq!(data["text"], "");
}

#[tokio::test]
async fn a_fresh_session_cookie_is_issued_on_first_contact() {
    let config = base_config();
    let router = router_for(&config, None).await;

    let response = get(&router, "/api/refresh").await;
    assert!(session_cookie(&response).is_some());
}
