//! HTTP surface: GUI-mode flag, canonical data passthrough, static assets.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use tracing::{error, info};

use crate::error::{VoxError, VoxResult};

pub const DEFAULT_PORT: u16 = 8080;

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// True when no file argument was given; the browser supplies data.
    pub gui_enabled: bool,
    /// Location of the canonical JSON cache (file mode only).
    pub canonical_path: PathBuf,
    /// Directory holding the static front-end assets.
    pub public_dir: PathBuf,
    pub port: u16,
}

#[derive(Clone)]
struct AppState {
    config: Arc<ServerConfig>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the application router. `/data` is only registered in file mode;
/// in GUI mode the canonical file does not exist.
pub fn router(config: ServerConfig) -> Router {
    let gui_enabled = config.gui_enabled;
    let state = AppState {
        config: Arc::new(config),
    };

    let mut router = Router::new().route("/gui", get(gui_mode));
    if !gui_enabled {
        router = router.route("/data", get(serve_data));
    }
    router.fallback(serve_static).with_state(state)
}

/// Bind and serve until the process is killed.
pub async fn serve(config: ServerConfig) -> VoxResult<()> {
    let port = config.port;
    let app = router(config);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Server started at: http://localhost:{port}");
    axum::serve(listener, app)
        .await
        .map_err(|e| VoxError::Server(e.to_string()))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn gui_mode(State(state): State<AppState>) -> Json<bool> {
    Json(state.config.gui_enabled)
}

/// Stream the canonical file's raw bytes. The file is written once before the
/// listener starts and is immutable afterwards, so concurrent reads are safe.
async fn serve_data(State(state): State<AppState>) -> Response {
    match tokio::fs::read(&state.config.canonical_path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "application/json")], bytes).into_response(),
        Err(e) => {
            error!("Failed to read canonical data file: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}

async fn serve_static(State(state): State<AppState>, uri: Uri) -> Response {
    let rel = uri.path().trim_start_matches('/');
    let rel = if rel.is_empty() { "index.html" } else { rel };
    if rel.split('/').any(|segment| segment == "..") {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = state.config.public_dir.join(rel);
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type(&path))], bytes).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}
