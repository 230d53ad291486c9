use crate::config::PortalHostConfig;
use crate::traits::{ConnectionRequest, NetworkControl, UiAssetProvider};
use crate::verifier::Verifier;
use crate::{Error, Result};
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

// The shared state for our web server.
// By using `Arc<dyn Trait>`, we can inject any implementation
// that satisfies the trait bounds.
pub type WebServerState = State<Arc<AppState>>;

pub struct AppState {
    pub control: Arc<dyn NetworkControl>,
    pub verifier: Arc<Verifier>,
    pub frontend: Arc<dyn UiAssetProvider>,
    pub redirect: RedirectPolicy,
}

/// Captive-portal redirect rule.
///
/// Phones probe well-known URLs (`connectivitycheck.gstatic.com/generate_204`
/// and friends) right after joining the AP; DNS hands them our address. Any
/// page request whose Host does not start with the portal's label is bounced
/// to the portal, which makes the OS pop up its login sheet.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    host_label: String,
    target: String,
}

impl RedirectPolicy {
    pub fn new(host_label: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            host_label: host_label.into(),
            target: target.into(),
        }
    }

    pub fn from_config(config: &PortalHostConfig) -> Self {
        Self::new(config.host.clone(), config.redirect_url())
    }

    /// Returns where to send a request that named `host`, or `None` to serve it.
    /// Requests without a Host header are served.
    pub fn redirect_for(&self, host: Option<&str>) -> Option<&str> {
        match host {
            Some(h) if !h.is_empty() && !h.starts_with(&self.host_label) => Some(&self.target),
            _ => None,
        }
    }
}

/// Builds the router.
///
/// | route                    | handler          |
/// |--------------------------|------------------|
/// | GET  /api/wifi/scan      | `api_wifi_scan`  |
/// | GET  /api/wifi/status    | `api_wifi_status`|
/// | POST /api/wifi/connect   | `api_wifi_connect`|
/// | anything else            | `unmatched`      |
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/wifi/scan", get(api_wifi_scan).fallback(unmatched))
        .route("/api/wifi/status", get(api_wifi_status).fallback(unmatched))
        .route("/api/wifi/connect", post(api_wifi_connect).fallback(unmatched))
        .fallback(unmatched)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Starts the Axum web server and serves until `shutdown` resolves.
pub async fn run_server<F>(bind_addr: SocketAddr, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("🌐 Captive portal web server listening on {}", bind_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

fn json_response(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

// --- Route Handlers ---

/// GET /api/wifi/scan
async fn api_wifi_scan(State(state): WebServerState) -> Response {
    match state.control.scan().await {
        Ok(networks) => json_response(
            StatusCode::OK,
            json!({ "success": true, "networks": networks }),
        ),
        Err(e) => {
            tracing::warn!("Scan failed: {}", e);
            let message = match e {
                Error::Timeout { .. } => "Scan timeout".to_string(),
                other => other.to_string(),
            };
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": message }),
            )
        }
    }
}

/// GET /api/wifi/status
async fn api_wifi_status(State(state): WebServerState) -> Response {
    match state.control.status().await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => {
            tracing::warn!("Status query failed: {}", e);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "connected": false, "error": e.to_string() }),
            )
        }
    }
}

/// Trims both fields and drops an empty password. The body is read by hand
/// so that bad JSON answers with our own error shape.
fn parse_connection_request(body: &[u8]) -> Result<ConnectionRequest> {
    let raw: ConnectionRequest = serde_json::from_slice(body)?;
    let ssid = raw.ssid.trim().to_string();
    if ssid.is_empty() {
        return Err(Error::InvalidRequest("SSID is required".into()));
    }
    let password = raw
        .password
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    Ok(ConnectionRequest { ssid, password })
}

/// POST /api/wifi/connect
///
/// Answers as soon as the connect command returns. Internet reachability is
/// checked afterwards by a detached verifier; the client has to poll
/// `/api/wifi/status` to see how it went.
async fn api_wifi_connect(State(state): WebServerState, body: Bytes) -> Response {
    let request = match parse_connection_request(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!("Rejected connect request: {}", e);
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": e.to_string() }),
            );
        }
    };

    tracing::info!(ssid = %request.ssid, "Handling /api/wifi/connect");

    match state
        .control
        .connect(&request.ssid, request.password.as_deref())
        .await
    {
        Ok(outcome) if outcome.succeeded => {
            // Only a successful connect supersedes an in-flight verification,
            // so a rejected attempt cannot strand an online device behind the portal.
            let generation = state.verifier.begin_attempt();
            state.verifier.spawn(outcome.ssid.clone(), generation);
            json_response(
                StatusCode::OK,
                json!({
                    "success": true,
                    "message": format!("Successfully connected to {}", outcome.ssid),
                    "note": "Verifying internet connection. If successful, captive portal will be disabled automatically.",
                }),
            )
        }
        Ok(outcome) => json_response(
            StatusCode::BAD_REQUEST,
            json!({
                "success": false,
                "error": outcome.error_message.unwrap_or_else(|| "Connection failed".to_string()),
            }),
        ),
        Err(Error::Timeout { .. }) => json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "success": false, "error": "Connection timeout" }),
        ),
        Err(e) => {
            tracing::error!("Connect to {} failed: {}", request.ssid, e);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": e.to_string() }),
            )
        }
    }
}

/// Everything the API routes do not claim.
async fn unmatched(
    State(state): WebServerState,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    match method {
        Method::GET | Method::HEAD => {
            let host = headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .or_else(|| uri.authority().map(|a| a.as_str()));
            if let Some(target) = state.redirect.redirect_for(host) {
                tracing::debug!("Redirecting {:?}{} to {}", host, uri.path(), target);
                return (StatusCode::FOUND, [(header::LOCATION, target.to_string())]).into_response();
            }
            serve_static_asset(&state, uri.path()).await
        }
        Method::POST => json_response(
            StatusCode::NOT_FOUND,
            json!({ "success": false, "error": "Endpoint not found" }),
        ),
        _ => (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response(),
    }
}

/// 从 `UiAssetProvider` 中服务静态文件，目录路径（包括 "/"）映射到其中的 index.html
async fn serve_static_asset(state: &AppState, path: &str) -> Response {
    let mut path = path.trim_start_matches('/').to_string();
    if path.is_empty() || path.ends_with('/') {
        path.push_str("index.html");
    }

    match state.frontend.get_asset(&path).await {
        Ok((data, mime)) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime)
            .body(Body::from(data))
            .unwrap_or_else(|_| {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to build response").into_response()
            }),
        Err(e) => {
            tracing::warn!("Failed to get asset: {} (Error: {})", path, e);
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
    }
}
