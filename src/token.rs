//! Lock token generation.
//!
//! Tokens prove the right to mutate a locked resource, so they must not be
//! guessable by other clients. The default factory digests the request
//! attributes together with a server-held secret and a per-process counter;
//! tests substitute a deterministic factory.

use crate::locks::LockRequest;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of opaque lock tokens.
pub trait TokenFactory: Send + Sync {
    /// Produce a fresh opaque token for the given request.
    fn issue(&self, request: &LockRequest, now: DateTime<Utc>) -> String;
}

/// SHA-256 based token factory.
///
/// The counter makes two grants with identical attributes in the same
/// instant produce distinct tokens.
pub struct DigestTokenFactory {
    secret: String,
    counter: AtomicU64,
}

impl DigestTokenFactory {
    /// Create a factory with an explicit secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Create a factory with a secret derived from startup entropy.
    ///
    /// Tokens from such a factory cannot be recomputed after a restart,
    /// which matches the lifetime of the in-memory locks they belong to.
    pub fn from_startup_entropy() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Self::new(format!("{}-{}", nanos, std::process::id()))
    }
}

impl TokenFactory for DigestTokenFactory {
    fn issue(&self, request: &LockRequest, now: DateTime<Utc>) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let principal = request.principal.as_deref().unwrap_or("");

        let mut hasher = Sha256::new();
        hasher.update(request.path.as_bytes());
        hasher.update(b"-");
        hasher.update(request.lock_type.as_bytes());
        hasher.update(b"-");
        hasher.update(request.scope.as_str().as_bytes());
        hasher.update(b"-");
        hasher.update(principal.as_bytes());
        hasher.update(b"-");
        hasher.update(request.depth.to_string().as_bytes());
        hasher.update(b"-");
        hasher.update(request.owner.as_bytes());
        hasher.update(b"-");
        hasher.update(request.expires_at.timestamp_millis().to_string().as_bytes());
        hasher.update(b"-");
        hasher.update(now.timestamp_millis().to_string().as_bytes());
        hasher.update(b"-");
        hasher.update(self.secret.as_bytes());
        hasher.update(b"-");
        hasher.update(seq.to_string().as_bytes());

        hex::encode(hasher.finalize())
    }
}

/// Deterministic factory for tests: issues `testtoken-0`, `testtoken-1`, ...
#[cfg(test)]
pub struct SequenceTokenFactory {
    counter: AtomicU64,
}

#[cfg(test)]
impl SequenceTokenFactory {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }
}

#[cfg(test)]
impl TokenFactory for SequenceTokenFactory {
    fn issue(&self, _request: &LockRequest, _now: DateTime<Utc>) -> String {
        format!("testtoken-{}", self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::LockScope;

    fn request(path: &str) -> LockRequest {
        let now = Utc::now();
        LockRequest {
            path: path.to_string(),
            lock_type: "write".to_string(),
            scope: LockScope::Exclusive,
            depth: 0,
            owner: "tester".to_string(),
            principal: None,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(3600),
            lock_null: false,
        }
    }

    #[test]
    fn tokens_are_hex_digests() {
        let factory = DigestTokenFactory::new("secret");
        let token = factory.issue(&request("/a"), Utc::now());

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn identical_requests_get_distinct_tokens() {
        let factory = DigestTokenFactory::new("secret");
        let req = request("/a");
        let now = Utc::now();

        assert_ne!(factory.issue(&req, now), factory.issue(&req, now));
    }

    #[test]
    fn different_secrets_produce_different_tokens() {
        let req = request("/a");
        let now = Utc::now();
        let a = DigestTokenFactory::new("one").issue(&req, now);
        let b = DigestTokenFactory::new("two").issue(&req, now);

        assert_ne!(a, b);
    }
}
