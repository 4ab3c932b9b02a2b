//! Lock request and result types.

use super::entry::LockEntry;
use chrono::{DateTime, Utc};

/// Scope of a WebDAV lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockScope {
    /// No other lock may coexist on the covered paths.
    Exclusive,
    /// Multiple shared holders may coexist.
    Shared,
}

impl LockScope {
    /// Get the protocol string for this scope.
    pub fn as_str(&self) -> &'static str {
        match self {
            LockScope::Exclusive => "exclusive",
            LockScope::Shared => "shared",
        }
    }

    /// Parse a scope from its protocol string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "exclusive" => Some(Self::Exclusive),
            "shared" => Some(Self::Shared),
            _ => None,
        }
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, LockScope::Exclusive)
    }
}

/// Descriptor for an incoming lock request (creation or refresh).
#[derive(Debug, Clone)]
pub struct LockRequest {
    /// Canonical absolute path being locked.
    pub path: String,

    /// Lock type; the protocol defines only "write", preserved as parsed.
    pub lock_type: String,

    /// Requested scope.
    pub scope: LockScope,

    /// 0 for the exact path, or the configured maximum for a lock that
    /// covers the whole subtree.
    pub depth: u32,

    /// Owner as supplied by the client; may be a verbatim XML fragment.
    pub owner: String,

    /// Authenticated principal, when the deployment has one.
    pub principal: Option<String>,

    /// When the request was admitted.
    pub created_at: DateTime<Utc>,

    /// Expiry applied to the issued token.
    pub expires_at: DateTime<Utc>,

    /// True when the locked path has no underlying resource yet.
    pub lock_null: bool,
}

/// Outcome of a lock creation attempt.
#[derive(Debug, Clone)]
pub enum LockResult {
    /// Lock granted. `token` is the freshly issued token; `entry` is the
    /// resulting entry snapshot, which may also carry other holders' tokens.
    Granted { entry: LockEntry, token: String },

    /// Incompatible overlap with the listed lock paths.
    Conflict { paths: Vec<String> },
}
