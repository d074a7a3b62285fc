//! Shared helpers for dashboard integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use envwatch_core::Thresholds;
use envwatch_dashboard::{create_router, serve, AppState, Broadcaster, DashboardConfig, DashboardState};
use envwatch_persistence::MemoryStore;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

/// Fresh state backed by an in-memory store.
pub fn test_state() -> (DashboardState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = DashboardState::new(store.clone(), Thresholds::default(), Broadcaster::new(64));
    (state, store)
}

pub fn router(state: DashboardState) -> Router {
    create_router(AppState::new(state, DashboardConfig::default()))
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Send one request through the router and decode the JSON response.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

/// Serve the dashboard on an ephemeral port.
pub async fn spawn_server(state: DashboardState, config: DashboardConfig) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        serve(listener, state, config).await.unwrap();
    });
    addr
}
