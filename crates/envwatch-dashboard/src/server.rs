//! HTTP server implementation using axum.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use envwatch_core::{LiveReading, PartialThresholds, Reading, Thresholds};
use envwatch_telemetry::Metrics;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::error::{DashboardError, DashboardResult};
use crate::ingest::ingest;
use crate::state::DashboardState;
use crate::types::{
    DashboardSnapshot, HealthResponse, PollResponse, ReceiveResponse, SensorDataResponse,
};

/// Number of stored readings returned by `GET /leituras`.
pub const RECENT_READINGS_LIMIT: usize = 10;

/// Connection limiter to prevent too many concurrent WebSocket connections.
pub struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    /// Take a slot. The slot is released when the guard drops.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionGuard> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(ConnectionGuard {
                    limiter: Arc::clone(self),
                });
            }
        }
    }

    pub fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

pub struct ConnectionGuard {
    limiter: Arc<ConnectionLimiter>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    dashboard_state: DashboardState,
    connection_limiter: Arc<ConnectionLimiter>,
    config: DashboardConfig,
}

impl AppState {
    pub fn new(dashboard_state: DashboardState, config: DashboardConfig) -> Self {
        Self {
            dashboard_state,
            connection_limiter: Arc::new(ConnectionLimiter::new(config.max_connections)),
            config,
        }
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/api/receive", post(receive_reading))
        .route("/api/sensor-data", post(receive_sensor_data))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/thresholds", get(get_thresholds).put(put_thresholds))
        .route("/api/history", get(get_history))
        .route("/leituras", get(get_recent_readings))
        .route("/atualizar", get(trigger_poll))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the index HTML page.
async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

fn json_body(payload: Result<Json<Value>, JsonRejection>, kind: &str) -> DashboardResult<Value> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        Metrics::validation_rejected(kind);
        DashboardError::Validation(rejection.body_text())
    })
}

/// Device push; responds with the stored record.
async fn receive_reading(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> DashboardResult<Json<ReceiveResponse>> {
    let body = json_body(payload, "reading")?;
    let ingested = ingest(&state.dashboard_state, &body)?;
    Ok(Json(ReceiveResponse {
        success: true,
        leitura: ingested.record,
    }))
}

/// Device push; responds with the normalized live reading.
async fn receive_sensor_data(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> DashboardResult<Json<SensorDataResponse>> {
    let body = json_body(payload, "reading")?;
    let ingested = ingest(&state.dashboard_state, &body)?;
    Ok(Json(SensorDataResponse {
        success: true,
        data: ingested.live,
    }))
}

async fn get_dashboard(State(state): State<AppState>) -> DashboardResult<Json<DashboardSnapshot>> {
    state.dashboard_state.collect_snapshot().map(Json)
}

async fn get_thresholds(State(state): State<AppState>) -> Json<Thresholds> {
    Json(state.dashboard_state.thresholds().get())
}

async fn put_thresholds(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> DashboardResult<Json<Thresholds>> {
    let body = json_body(payload, "thresholds")?;
    let partial = PartialThresholds::from_json(&body).map_err(|e| {
        Metrics::validation_rejected("thresholds");
        DashboardError::from(e)
    })?;

    Ok(Json(state.dashboard_state.update_thresholds(partial)))
}

async fn get_history(State(state): State<AppState>) -> Json<Vec<LiveReading>> {
    Json(state.dashboard_state.recent_history())
}

/// Newest stored readings first.
async fn get_recent_readings(State(state): State<AppState>) -> DashboardResult<Json<Vec<Reading>>> {
    state
        .dashboard_state
        .store()
        .recent(RECENT_READINGS_LIMIT)
        .map(Json)
        .map_err(|e| {
            Metrics::store_error("query");
            DashboardError::StoreQuery(e)
        })
}

/// Run one telemetry poll cycle now.
async fn trigger_poll(State(state): State<AppState>) -> DashboardResult<Json<PollResponse>> {
    let poller = state
        .dashboard_state
        .poller()
        .ok_or(DashboardError::PollerUnavailable)?;

    let inserted = poller.run_cycle().await?;
    info!(inserted, "On-demand telemetry poll complete");
    Ok(Json(PollResponse {
        success: true,
        inserted,
    }))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus text exposition.
async fn metrics() -> Response {
    match Metrics::gather_text() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    // Check connection limit
    let guard = match state.connection_limiter.try_acquire() {
        Some(guard) => guard,
        None => {
            warn!(
                current = state.connection_limiter.current_count(),
                max = state.config.max_connections,
                "WebSocket connection limit reached"
            );
            return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
        }
    };

    info!(
        connections = state.connection_limiter.current_count(),
        "New WebSocket connection"
    );

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, guard))
}

/// Handle a WebSocket connection.
async fn handle_ws_connection(socket: WebSocket, state: AppState, _guard: ConnectionGuard) {
    let (mut sender, mut receiver) = socket.split();

    // Receiver and bootstrap come from one locked step: no gap, no duplicates
    let (mut broadcast_rx, bootstrap) = state.dashboard_state.join_live_channel();
    Metrics::subscriber_connected();

    match serde_json::to_string(&bootstrap) {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                debug!("Failed to send history bootstrap, client disconnected");
                Metrics::subscriber_disconnected();
                return;
            }
        }
        Err(e) => debug!(error = %e, "Failed to serialize history bootstrap"),
    }

    // Clients never send events; only watch for close
    let mut incoming_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("Client sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
                _ => {}
            }
        }
    });

    // Main loop: forward broadcast messages to WebSocket
    loop {
        tokio::select! {
            result = broadcast_rx.recv() => {
                match result {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            debug!("Failed to send message, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "WebSocket client lagged, catching up");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                }
            }
            _ = &mut incoming_task => {
                debug!("Incoming task completed, closing connection");
                break;
            }
        }
    }

    incoming_task.abort();
    Metrics::subscriber_disconnected();
    info!(
        connections = state.connection_limiter.current_count().saturating_sub(1),
        "WebSocket connection closed"
    );
}

/// Serve the dashboard on an already-bound listener.
pub async fn serve(
    listener: TcpListener,
    dashboard_state: DashboardState,
    config: DashboardConfig,
) -> std::io::Result<()> {
    let app = create_router(AppState::new(dashboard_state, config));
    axum::serve(listener, app).await
}

/// Run the dashboard HTTP server.
pub async fn run_server(
    dashboard_state: DashboardState,
    config: DashboardConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = config.bind_addr();
    info!(addr = %addr, "Starting dashboard server");

    let listener = TcpListener::bind(&addr).await?;
    serve(listener, dashboard_state, config).await?;

    Ok(())
}
