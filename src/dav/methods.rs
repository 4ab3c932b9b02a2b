//! Standard and WebDAV method handlers.
//!
//! Every mutating verb consults the lock gate before touching the store;
//! a covering lock the caller holds no token for answers 423 and nothing
//! is written.

use super::headers;
use super::xml;
use super::{AppState, XML_CONTENT_TYPE};
use crate::error::{DavError, Result};
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

pub(super) fn options() -> Response {
    (
        StatusCode::OK,
        [
            ("DAV", "1,2"),
            (
                "Allow",
                "OPTIONS, GET, HEAD, PUT, DELETE, PROPFIND, PROPPATCH, MKCOL, COPY, MOVE, LOCK, UNLOCK",
            ),
            ("MS-Author-Via", "DAV"),
        ],
    )
        .into_response()
}

pub(super) fn get(state: &AppState, path: &str, head_only: bool) -> Result<Response> {
    let response = match state.store.resource(path) {
        None => StatusCode::NOT_FOUND.into_response(),
        Some(resource) if resource.is_directory() => {
            StatusCode::METHOD_NOT_ALLOWED.into_response()
        }
        Some(resource) => {
            if head_only {
                (
                    StatusCode::OK,
                    [("Content-Length", resource.len.to_string())],
                )
                    .into_response()
            } else {
                let data = state.store.read(path).unwrap_or_default();
                (StatusCode::OK, data).into_response()
            }
        }
    };
    Ok(response)
}

/// PROPFIND, reduced to the lock-discovery property. A depth of 1 on a
/// collection also reports its members, lock-null ones included.
pub(super) fn propfind(state: &AppState, path: &str, headers: &HeaderMap) -> Result<Response> {
    let now = Utc::now();
    let mut responses: Vec<(String, Vec<crate::locks::LockEntry>)> = Vec::new();

    match state.store.resource(path) {
        Some(resource) => {
            responses.push((path.to_string(), state.manager.discover_locks(path)));
            if resource.is_directory() && headers::propfind_depth(headers) > 0 {
                for name in state.store.list(path) {
                    let child = crate::path::join(path, &name);
                    let locks = state.manager.discover_locks(&child);
                    responses.push((child, locks));
                }
                for entry in state.manager.list_null_locks(path) {
                    let child = entry.path.clone();
                    responses.push((child, vec![entry]));
                }
            }
        }
        None => {
            // A lock-null resource answers PROPFIND even though nothing is
            // stored at its path yet
            let locks = state.manager.discover_locks(path);
            if !locks.iter().any(|entry| entry.lock_null) {
                return Ok(StatusCode::NOT_FOUND.into_response());
            }
            responses.push((path.to_string(), locks));
        }
    }

    let body = xml::propfind_multistatus(&responses, state.config.max_depth, now);
    Ok((
        StatusCode::MULTI_STATUS,
        [("Content-Type", XML_CONTENT_TYPE.to_string())],
        body,
    )
        .into_response())
}

pub(super) fn put(
    state: &AppState,
    path: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response> {
    if state.config.read_only {
        return Ok(StatusCode::FORBIDDEN.into_response());
    }
    let presented = headers::presented_tokens(headers);
    if state.manager.is_locked(path, &presented) {
        return Err(DavError::Locked);
    }
    if state
        .store
        .resource(path)
        .is_some_and(|resource| resource.is_directory())
    {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    }

    let existed = state.store.resource(path).is_some();
    if !state.store.write(path, body.to_vec(), true) {
        // The parent collection is missing or not a collection
        return Ok(StatusCode::CONFLICT.into_response());
    }
    state.manager.remove_null_lock(path);

    if existed {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Ok(StatusCode::CREATED.into_response())
    }
}

pub(super) fn delete(state: &AppState, path: &str, headers: &HeaderMap) -> Result<Response> {
    if state.config.read_only {
        return Ok(StatusCode::FORBIDDEN.into_response());
    }
    let presented = headers::presented_tokens(headers);
    Ok(delete_resource(state, path, &presented))
}

pub(super) fn mkcol(
    state: &AppState,
    path: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response> {
    if state.store.resource(path).is_some() {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    }
    if state.config.read_only {
        return Ok(StatusCode::FORBIDDEN.into_response());
    }
    let presented = headers::presented_tokens(headers);
    if state.manager.is_locked(path, &presented) {
        return Err(DavError::Locked);
    }
    // Request bodies are not defined for MKCOL
    if !body.is_empty() {
        return Ok(StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response());
    }

    if state.store.mkdir(path) {
        state.manager.remove_null_lock(path);
        Ok(StatusCode::CREATED.into_response())
    } else {
        Ok(StatusCode::CONFLICT.into_response())
    }
}

pub(super) fn copy(state: &AppState, path: &str, headers: &HeaderMap) -> Result<Response> {
    if state.config.read_only {
        return Ok(StatusCode::FORBIDDEN.into_response());
    }
    match copy_resource(state, path, headers) {
        Ok(response) | Err(response) => Ok(response),
    }
}

pub(super) fn mov(state: &AppState, path: &str, headers: &HeaderMap) -> Result<Response> {
    if state.config.read_only {
        return Ok(StatusCode::FORBIDDEN.into_response());
    }
    let presented = headers::presented_tokens(headers);
    if state.manager.is_locked(path, &presented) {
        return Err(DavError::Locked);
    }

    match copy_resource(state, path, headers) {
        Ok(success) => {
            let deleted = delete_resource(state, path, &presented);
            if deleted.status() != StatusCode::NO_CONTENT {
                return Ok(deleted);
            }
            Ok(success)
        }
        Err(failure) => Ok(failure),
    }
}

pub(super) fn proppatch(state: &AppState, path: &str, headers: &HeaderMap) -> Result<Response> {
    if state.config.read_only {
        return Ok(StatusCode::FORBIDDEN.into_response());
    }
    let presented = headers::presented_tokens(headers);
    if state.manager.is_locked(path, &presented) {
        return Err(DavError::Locked);
    }

    // Property mutation is out of scope; the lock gate above is the part
    // clients depend on.
    Ok(StatusCode::NOT_IMPLEMENTED.into_response())
}

/// Delete `path`, recursing into collections with a per-child lock gate.
///
/// Child failures are collected and reported as a 207 multistatus; a single
/// failure surfaces as its scalar status instead. Success answers 204.
fn delete_resource(state: &AppState, path: &str, presented: &str) -> Response {
    if state.manager.is_locked(path, presented) {
        return DavError::Locked.into_response();
    }
    let Some(resource) = state.store.resource(path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut failures: Vec<(String, StatusCode)> = Vec::new();
    if resource.is_directory() {
        delete_collection(state, path, presented, &mut failures);
    }
    // A failed child leaves the collection populated, so its own removal
    // only runs on a clean subtree
    if failures.is_empty() && !state.store.remove(path) {
        failures.push((path.to_string(), StatusCode::INTERNAL_SERVER_ERROR));
    }

    if failures.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }
    if failures.len() == 1 {
        return failures[0].1.into_response();
    }
    let body = xml::multistatus(failures.iter().map(|(p, code)| (p.as_str(), *code)));
    (
        StatusCode::MULTI_STATUS,
        [("Content-Type", XML_CONTENT_TYPE.to_string())],
        body,
    )
        .into_response()
}

fn delete_collection(
    state: &AppState,
    path: &str,
    presented: &str,
    failures: &mut Vec<(String, StatusCode)>,
) {
    for name in state.store.list(path) {
        let child = crate::path::join(path, &name);
        if state.manager.is_locked(&child, presented) {
            failures.push((child, StatusCode::LOCKED));
            continue;
        }
        let is_directory = state
            .store
            .resource(&child)
            .is_some_and(|resource| resource.is_directory());
        if is_directory {
            delete_collection(state, &child, presented, failures);
        }
        // A directory that still has children (some descendant failed)
        // stays behind without its own report entry
        if !state.store.remove(&child) && !is_directory {
            failures.push((child, StatusCode::INTERNAL_SERVER_ERROR));
        }
    }
}

/// Copy `path` to the Destination header target.
///
/// `Ok` carries the success response; `Err` carries the failure response,
/// which lets MOVE run its source deletion only on success.
fn copy_resource(
    state: &AppState,
    source: &str,
    headers: &HeaderMap,
) -> std::result::Result<Response, Response> {
    let Some(dest) = headers::destination(headers) else {
        return Err(DavError::BadRequest(
            "COPY and MOVE require a Destination header".to_string(),
        )
        .into_response());
    };
    if dest == source {
        return Err(StatusCode::FORBIDDEN.into_response());
    }

    let presented = headers::presented_tokens(headers);
    if state.manager.is_locked(&dest, &presented) {
        return Err(DavError::Locked.into_response());
    }
    if state.store.resource(source).is_none() {
        return Err(StatusCode::NOT_FOUND.into_response());
    }

    let existed = state.store.resource(&dest).is_some();
    if existed {
        if !headers::overwrite(headers) {
            return Err(StatusCode::PRECONDITION_FAILED.into_response());
        }
        let cleared = delete_resource(state, &dest, &presented);
        if cleared.status() != StatusCode::NO_CONTENT {
            return Err(cleared);
        }
    }

    let mut failures: Vec<(String, StatusCode)> = Vec::new();
    copy_tree(state, source, &dest, &mut failures);
    if !failures.is_empty() {
        if failures.len() == 1 {
            return Err(failures[0].1.into_response());
        }
        let body = xml::multistatus(failures.iter().map(|(p, code)| (p.as_str(), *code)));
        return Err((
            StatusCode::MULTI_STATUS,
            [("Content-Type", XML_CONTENT_TYPE.to_string())],
            body,
        )
            .into_response());
    }

    state.manager.remove_null_lock(&dest);
    if existed {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Ok(StatusCode::CREATED.into_response())
    }
}

fn copy_tree(
    state: &AppState,
    source: &str,
    dest: &str,
    failures: &mut Vec<(String, StatusCode)>,
) {
    match state.store.resource(source) {
        Some(resource) if resource.is_directory() => {
            let dest_is_directory = state
                .store
                .resource(dest)
                .is_some_and(|r| r.is_directory());
            if !state.store.mkdir(dest) && !dest_is_directory {
                failures.push((dest.to_string(), StatusCode::CONFLICT));
                return;
            }
            for name in state.store.list(source) {
                copy_tree(
                    state,
                    &crate::path::join(source, &name),
                    &crate::path::join(dest, &name),
                    failures,
                );
            }
        }
        Some(resource) if resource.is_file() => {
            let data = state.store.read(source).unwrap_or_default();
            if !state.store.write(dest, data, true) {
                failures.push((source.to_string(), StatusCode::CONFLICT));
            }
        }
        _ => failures.push((source.to_string(), StatusCode::INTERNAL_SERVER_ERROR)),
    }
}
