use super::*;
use axum::{
    extract::Query,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use std::collections::HashMap;
use tokio::net::TcpListener;

async fn spawn_server() -> String {
    let app = Router::new()
        .route(
            "/api/echo",
            get(
                |headers: HeaderMap, Query(query): Query<HashMap<String, String>>| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    Json(serde_json::json!({ "auth": auth, "page": query.get("page") }))
                },
            ),
        )
        .route(
            "/api/reports",
            post(|Json(body): Json<serde_json::Value>| async move {
                if body["title"].as_str().unwrap_or_default().is_empty() {
                    (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        r#"{"code":"TITLE_EMPTY"}"#.to_string(),
                    )
                } else {
                    (StatusCode::CREATED, r#"{"ok":true}"#.to_string())
                }
            }),
        )
        .route("/api/empty", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}/api")
}

#[tokio::test]
async fn get_sends_query_and_bearer_token() {
    let base = spawn_server().await;
    let transport = HttpTransport::new(&base, Duration::from_secs(5)).expect("transport");

    let response = transport
        .perform(
            ApiRequest::get("/echo")
                .query("page", 3)
                .bearer(Some("token-1".into())),
        )
        .await
        .expect("response");

    assert_eq!(response.status, 200);
    let body: serde_json::Value = response.json().expect("json");
    assert_eq!(body["auth"], "Bearer token-1");
    assert_eq!(body["page"], "3");
}

#[tokio::test]
async fn error_status_carries_the_body() {
    let base = spawn_server().await;
    let transport = HttpTransport::new(&base, Duration::from_secs(5)).expect("transport");

    let request = ApiRequest::post("reports")
        .json(&serde_json::json!({ "title": "" }))
        .expect("body");
    let err = transport.perform(request).await.expect_err("422");

    match err {
        TransportError::Http(failure) => {
            assert_eq!(failure.status, 422);
            assert_eq!(failure.body.as_deref(), Some(r#"{"code":"TITLE_EMPTY"}"#));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn json_post_succeeds() {
    let base = spawn_server().await;
    let transport = HttpTransport::new(&base, Duration::from_secs(5)).expect("transport");

    let request = ApiRequest::post("reports")
        .json(&serde_json::json!({ "title": "Leak" }))
        .expect("body");
    let response = transport.perform(request).await.expect("created");
    assert_eq!(response.status, 201);
}

#[tokio::test]
async fn empty_error_body_is_none() {
    let base = spawn_server().await;
    let transport = HttpTransport::new(&base, Duration::from_secs(5)).expect("transport");

    let err = transport
        .perform(ApiRequest::get("empty"))
        .await
        .expect_err("503");
    assert!(matches!(
        err,
        TransportError::Http(HttpFailure {
            status: 503,
            body: None
        })
    ));
}

#[tokio::test]
async fn unreachable_server_is_not_an_http_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let transport =
        HttpTransport::new(&format!("http://{addr}"), Duration::from_secs(5)).expect("transport");
    let err = transport
        .perform(ApiRequest::get("reports"))
        .await
        .expect_err("refused");
    assert!(!matches!(err, TransportError::Http(_)));
}

#[test]
fn invalid_server_url_is_rejected() {
    assert!(HttpTransport::new("not a url", Duration::from_secs(1)).is_err());
}

#[test]
fn decode_failure_is_reported() {
    let response = ApiResponse {
        status: 200,
        body: b"not json".to_vec(),
    };
    let result: Result<serde_json::Value, _> = response.json();
    assert!(matches!(result, Err(TransportError::Decode(_))));
}
