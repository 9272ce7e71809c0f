//! HTTP API Gateway
//!
//! A long-lived HTTP listener that fronts the node. Requests are gated
//! by optional HTTP Basic authentication (an absent or empty user table
//! means the gateway is open), then forwarded to a polymorphic
//! [`ApiHandler`]. Every handled request is answered with the JSON
//! envelope `{ result, error: { code, message }, id }`.
//!
//! The accept loop runs on its own task and exits when [`ApiGateway::stop`]
//! fires the shutdown signal. A failed bind is logged and surfaced; the
//! gateway does not retry.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use prometheus::{IntCounter, Registry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Socket address the listener binds to
    pub listen_addr: String,
    /// URL prefix requests must carry, e.g. `/api`
    pub url_prefix: String,
    /// Basic-auth credentials; an empty table disables authentication
    pub authorized_users: HashMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8423".to_string(),
            url_prefix: "/api".to_string(),
            authorized_users: HashMap::new(),
        }
    }
}

/// Application-level error inside the JSON envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonError {
    pub code: i32,
    pub message: String,
}

/// JSON response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub result: Option<Value>,
    pub error: Option<JsonError>,
    pub id: Option<String>,
}

impl JsonResponse {
    pub fn success(result: Value, id: Option<String>) -> Self {
        Self {
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(code: i32, message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            result: None,
            error: Some(JsonError {
                code,
                message: message.into(),
            }),
            id,
        }
    }
}

/// Envelope error codes
pub mod error_codes {
    /// The requested action does not exist
    pub const UNKNOWN_ACTION: i32 = -32601;
    /// The request carried malformed parameters
    pub const INVALID_PARAMS: i32 = -32602;
    /// The handler failed internally
    pub const INTERNAL: i32 = -32603;
}

/// An authorized request, reduced to what handlers care about
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Request path with the configured prefix stripped
    pub path: String,
    /// Decoded query parameters
    pub query: HashMap<String, String>,
}

/// Polymorphic request handler behind the gateway
#[async_trait]
pub trait ApiHandler: Send + Sync + 'static {
    async fn handle(&self, request: ApiRequest) -> JsonResponse;
}

/// Request counters exposed by the gateway
#[derive(Debug)]
pub struct ApiMetrics {
    requests: IntCounter,
    unauthorized: IntCounter,
}

impl ApiMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let requests = IntCounter::new("api_requests_total", "Requests received by the gateway")?;
        let unauthorized =
            IntCounter::new("api_unauthorized_total", "Requests rejected by basic auth")?;
        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(unauthorized.clone()))?;
        Ok(Self {
            requests,
            unauthorized,
        })
    }

    pub fn requests(&self) -> u64 {
        self.requests.get()
    }

    pub fn unauthorized(&self) -> u64 {
        self.unauthorized.get()
    }
}

#[derive(Clone)]
struct GatewayState {
    config: Arc<ApiConfig>,
    handler: Arc<dyn ApiHandler>,
    metrics: Arc<ApiMetrics>,
}

/// HTTP gateway wrapping an [`ApiHandler`]
pub struct ApiGateway {
    state: GatewayState,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ApiGateway {
    pub fn new(config: ApiConfig, handler: Arc<dyn ApiHandler>, metrics: Arc<ApiMetrics>) -> Self {
        Self {
            state: GatewayState {
                config: Arc::new(config),
                handler,
                metrics,
            },
            shutdown: None,
            task: None,
        }
    }

    /// The request-handling router, usable without a socket in tests.
    pub fn router(&self) -> Router {
        let state = self.state.clone();
        Router::new()
            .fallback(dispatch)
            .layer(middleware::from_fn_with_state(state.clone(), basic_auth))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the listener and start serving until [`Self::stop`] is
    /// called. Returns the bound address.
    pub async fn start(&mut self) -> anyhow::Result<SocketAddr> {
        let listener = TcpListener::bind(&self.state.config.listen_addr)
            .await
            .map_err(|e| {
                tracing::error!(
                    addr = %self.state.config.listen_addr,
                    error = %e,
                    "api gateway failed to bind"
                );
                e
            })
            .with_context(|| format!("binding {}", self.state.config.listen_addr))?;
        let addr = listener.local_addr()?;

        let (tx, rx) = oneshot::channel::<()>();
        let app = self.router();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = rx.await;
            });
            if let Err(e) = serve.await {
                tracing::error!(error = %e, "api gateway terminated");
            }
        });

        self.shutdown = Some(tx);
        self.task = Some(task);
        tracing::info!(%addr, "api gateway listening");
        Ok(addr)
    }

    /// Signal the accept loop to exit and wait for it.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        tracing::info!("api gateway stopped");
    }
}

async fn basic_auth(State(state): State<GatewayState>, request: Request, next: Next) -> Response {
    state.metrics.requests.inc();

    if state.config.authorized_users.is_empty() {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| check_credentials(value, &state.config.authorized_users))
        .unwrap_or(false);

    if !authorized {
        state.metrics.unauthorized.inc();
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"aurum\"")],
            "Unauthorized",
        )
            .into_response();
    }

    next.run(request).await
}

/// Match `Basic <base64(user:password)>` credentials exact-byte against
/// the configured table.
fn check_credentials(header_value: &str, users: &HashMap<String, String>) -> bool {
    let Some(encoded) = header_value.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = BASE64.decode(encoded.trim()) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((user, password)) = decoded.split_once(':') else {
        return false;
    };
    users
        .get(user)
        .map(|expected| expected.as_bytes() == password.as_bytes())
        .unwrap_or(false)
}

async fn dispatch(State(state): State<GatewayState>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    let Some(stripped) = path.strip_prefix(state.config.url_prefix.as_str()) else {
        let envelope = JsonResponse::failure(
            error_codes::UNKNOWN_ACTION,
            format!("unknown path {path}"),
            None,
        );
        return (StatusCode::NOT_FOUND, Json(envelope)).into_response();
    };

    let query = request
        .uri()
        .query()
        .map(parse_query)
        .unwrap_or_default();

    let api_request = ApiRequest {
        path: stripped.trim_start_matches('/').to_string(),
        query,
    };
    let envelope = state.handler.handle(api_request).await;
    (StatusCode::OK, Json(envelope)).into_response()
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}
