//! Granted lock entries.

use super::types::{LockRequest, LockScope};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A granted lock at one path.
///
/// Several shared holders, or one holder refreshing, accumulate as tokens in
/// the token map. The entry itself stays put until every token is removed or
/// expired.
#[derive(Debug, Clone)]
pub struct LockEntry {
    /// Canonical path the lock is attached to.
    pub path: String,

    /// Lock type string, normally "write".
    pub lock_type: String,

    /// Scope shared by every holder of this entry.
    pub scope: LockScope,

    /// 0 for the exact path, or the configured maximum for subtree cover.
    pub depth: u32,

    /// Owner string from the granting request; may be an XML fragment.
    pub owner: String,

    /// When the entry was first granted.
    pub created_at: DateTime<Utc>,

    /// Token -> expiry of that grant.
    pub tokens: HashMap<String, DateTime<Utc>>,

    /// True while the locked path has no underlying resource.
    pub lock_null: bool,
}

impl LockEntry {
    /// Build an entry from a granted request, holding exactly `token`.
    pub fn new(request: &LockRequest, token: String) -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(token, request.expires_at);
        Self {
            path: request.path.clone(),
            lock_type: request.lock_type.clone(),
            scope: request.scope,
            depth: request.depth,
            owner: request.owner.clone(),
            created_at: request.created_at,
            tokens,
            lock_null: request.lock_null,
        }
    }

    /// True iff every token has expired. An entry with no tokens left is
    /// expired by definition.
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        self.tokens.values().all(|expiry| *expiry <= now)
    }

    /// Latest expiry among live tokens, or `now` when none remain.
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.tokens
            .values()
            .filter(|expiry| **expiry > now)
            .max()
            .copied()
            .unwrap_or(now)
    }

    pub fn is_exclusive(&self) -> bool {
        self.scope.is_exclusive()
    }

    /// True if any of the entry's tokens appears in the presented header
    /// blob. Matching is substring containment, not an `If` grammar parse.
    pub fn token_matches(&self, presented: &str) -> bool {
        self.tokens.keys().any(|token| presented.contains(token.as_str()))
    }
}
