//! WebDAV protocol layer.
//!
//! Maps HTTP verbs and headers onto the lock manager and resource store.
//! The extension methods (PROPFIND, MKCOL, LOCK, ...) are not routable
//! through axum's method routers, so a single fallback handler dispatches
//! on the raw method name — the same switch a servlet implementation runs.

mod headers;
mod lock;
mod methods;
mod xml;


use crate::config::Config;
use crate::error::{DavError, Result};
use crate::locks::LockManager;
use crate::storage::ResourceStore;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const XML_CONTENT_TYPE: &str = "text/xml; charset=UTF-8";

/// Upper bound applied to request bodies before buffering.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Shared server state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<LockManager>,
    pub store: Arc<dyn ResourceStore>,
    pub config: Arc<Config>,
}

impl IntoResponse for DavError {
    fn into_response(self) -> Response {
        match self {
            DavError::Conflict(paths) => {
                let body =
                    xml::multistatus(paths.iter().map(|p| (p.as_str(), StatusCode::LOCKED)));
                (
                    StatusCode::CONFLICT,
                    [("Content-Type", XML_CONTENT_TYPE.to_string())],
                    body,
                )
                    .into_response()
            }
            DavError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            other => other.status().into_response(),
        }
    }
}

/// Build the WebDAV router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is terminated.
pub async fn serve(state: AppState) -> Result<()> {
    let bind_addr = state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| DavError::Config(format!("failed to bind '{}': {}", bind_addr, e)))?;

    tracing::info!(addr = %bind_addr, read_only = state.config.read_only, "davlock listening");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| DavError::Config(format!("server error: {}", e)))
}

async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().as_str().to_string();
    let path = crate::path::normalize(request.uri().path());

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::PAYLOAD_TOO_LARGE.into_response(),
    };

    tracing::debug!(%method, %path, body_len = body.len(), "request");

    let result = match method.as_str() {
        "OPTIONS" => Ok(methods::options()),
        "GET" => methods::get(&state, &path, false),
        "HEAD" => methods::get(&state, &path, true),
        "PROPFIND" => methods::propfind(&state, &path, &parts.headers),
        "PUT" => methods::put(&state, &path, &parts.headers, body),
        "DELETE" => methods::delete(&state, &path, &parts.headers),
        "MKCOL" => methods::mkcol(&state, &path, &parts.headers, &body),
        "COPY" => methods::copy(&state, &path, &parts.headers),
        "MOVE" => methods::mov(&state, &path, &parts.headers),
        "PROPPATCH" => methods::proppatch(&state, &path, &parts.headers),
        "LOCK" => lock::lock(&state, &path, &parts.headers, &body),
        "UNLOCK" => lock::unlock(&state, &path, &parts.headers),
        _ => Ok(StatusCode::METHOD_NOT_ALLOWED.into_response()),
    };

    result.unwrap_or_else(|err| err.into_response())
}
