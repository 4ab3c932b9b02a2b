//! Error types for davlock.
//!
//! Uses thiserror for derive macros. Each variant maps to the HTTP status
//! code the protocol layer answers with; the rendering of error bodies
//! lives with the protocol layer.

use axum::http::StatusCode;
use thiserror::Error;

/// Main error type for davlock operations.
#[derive(Error, Debug)]
pub enum DavError {
    /// A lock request overlaps one or more incompatible locks.
    /// Carries the full set of conflicting paths.
    #[error("lock conflict with {} existing lock(s)", .0.len())]
    Conflict(Vec<String>),

    /// The resource is covered by a lock the caller presented no token for.
    #[error("resource is locked")]
    Locked,

    /// Malformed request (bad lock body, missing Destination header, ...).
    #[error("{0}")]
    BadRequest(String),

    /// Configuration file or value problem.
    #[error("{0}")]
    Config(String),
}

impl DavError {
    /// Returns the HTTP status code for this error type.
    pub fn status(&self) -> StatusCode {
        match self {
            DavError::Conflict(_) => StatusCode::CONFLICT,
            DavError::Locked => StatusCode::LOCKED,
            DavError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DavError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type alias for davlock operations.
pub type Result<T> = std::result::Result<T, DavError>;
