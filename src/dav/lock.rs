//! LOCK and UNLOCK handlers.

use super::headers;
use super::xml;
use super::{AppState, XML_CONTENT_TYPE};
use crate::error::{DavError, Result};
use crate::locks::{LockRequest, LockResult, LockScope};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Utc};

/// LOCK: a request with a lockinfo body creates (or joins) a lock; a
/// bodyless request refreshes the tokens named by its If header.
///
/// Compatibility with existing locks is decided inside the lock manager;
/// incompatible overlaps surface as a 409 multistatus listing every
/// conflicting path.
pub(super) fn lock(
    state: &AppState,
    path: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response> {
    if state.config.read_only {
        return Ok(StatusCode::FORBIDDEN.into_response());
    }

    let now = Utc::now();
    let timeout = headers::lock_timeout(
        headers,
        state.config.default_timeout_secs,
        state.config.max_timeout_secs,
    );
    let expires_at = now + Duration::seconds(timeout as i64);

    let body_text = String::from_utf8_lossy(body);
    match xml::parse_lockinfo(&body_text) {
        Some(parsed) => create(state, path, parsed, headers, now, expires_at),
        None => Ok(refresh(state, path, headers, expires_at)),
    }
}

fn create(
    state: &AppState,
    path: &str,
    parsed: xml::LockBody,
    headers: &HeaderMap,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<Response> {
    let Some(scope) = parsed.scope.as_deref().and_then(LockScope::from_str) else {
        return Err(DavError::BadRequest(
            "lock body has no usable lockscope".to_string(),
        ));
    };
    let Some(lock_type) = parsed.lock_type else {
        return Err(DavError::BadRequest(
            "lock body has no locktype".to_string(),
        ));
    };
    let owner = match parsed.owner {
        // An owner element with nothing in it is malformed
        Some(owner) if owner.is_empty() => {
            return Err(DavError::BadRequest("lock body has an empty owner".to_string()));
        }
        Some(owner) => owner,
        None => default_owner(),
    };

    let depth = headers::lock_depth(headers, state.config.max_depth);
    let lock_null = state.store.resource(path).is_none();
    let request = LockRequest {
        path: path.to_string(),
        lock_type,
        scope,
        depth,
        owner,
        principal: None,
        created_at: now,
        expires_at,
        lock_null,
    };

    match state.manager.create_lock(request) {
        LockResult::Conflict { paths } => Err(DavError::Conflict(paths)),
        LockResult::Granted { entry, token } => {
            let body = xml::lockdiscovery(&entry, state.config.max_depth, now);
            Ok((
                StatusCode::CREATED,
                [
                    ("Lock-Token", format!("<opaquelocktoken:{}>", token)),
                    ("Content-Type", XML_CONTENT_TYPE.to_string()),
                ],
                body,
            )
                .into_response())
        }
    }
}

fn refresh(
    state: &AppState,
    path: &str,
    headers: &HeaderMap,
    expires_at: DateTime<Utc>,
) -> Response {
    let presented = headers::presented_tokens(headers);
    match state.manager.refresh_lock(path, &presented, expires_at) {
        Some(entry) => {
            let now = Utc::now();
            let body = xml::lockdiscovery(&entry, state.config.max_depth, now);
            (
                StatusCode::OK,
                [("Content-Type", XML_CONTENT_TYPE.to_string())],
                body,
            )
                .into_response()
        }
        None => StatusCode::PRECONDITION_FAILED.into_response(),
    }
}

/// UNLOCK: removes the token named by the Lock-Token header from the path's
/// lock and any covering ancestor lock. Idempotent — an unknown token still
/// answers 204.
pub(super) fn unlock(state: &AppState, path: &str, headers: &HeaderMap) -> Result<Response> {
    if state.config.read_only {
        return Ok(StatusCode::FORBIDDEN.into_response());
    }

    let presented = headers::presented_tokens(headers);
    if state.manager.is_locked(path, &presented) {
        return Err(DavError::Locked);
    }

    let token_header = headers::lock_token(headers);
    state.manager.remove_lock(path, &token_header);
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Owner recorded when the client supplies none.
fn default_owner() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
