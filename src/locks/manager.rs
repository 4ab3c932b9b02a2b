//! Lock manager facade.
//!
//! Owns the lock tree behind a single mutex: a conflict decision must
//! observe a consistent snapshot spanning an arbitrary ancestor chain and
//! an arbitrary-depth subtree, so every operation takes the manager-wide
//! critical section. No I/O happens while it is held; operation cost is
//! bounded by tree size.
//!
//! The manager is constructed explicitly and injected into the protocol
//! layer, so tests instantiate independent managers per case.

use super::conflict;
use super::entry::LockEntry;
use super::tree::LockTree;
use super::types::{LockRequest, LockResult};
use crate::path;
use crate::token::TokenFactory;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, MutexGuard};

struct ManagerState {
    tree: LockTree,
    last_sweep: DateTime<Utc>,
}

/// Path-hierarchical advisory lock manager.
pub struct LockManager {
    state: Mutex<ManagerState>,
    tokens: Box<dyn TokenFactory>,
    sweep_interval: Duration,
}

impl LockManager {
    /// Create a manager with the given token source and sweep interval.
    pub fn new(tokens: Box<dyn TokenFactory>, sweep_interval: Duration) -> Self {
        Self {
            state: Mutex::new(ManagerState {
                tree: LockTree::new(),
                last_sweep: Utc::now(),
            }),
            tokens,
            sweep_interval,
        }
    }

    /// Try to grant a lock.
    ///
    /// Runs the two-phase conflict scan first; on a clean scan the lock is
    /// committed with the merge rule:
    /// - an existing narrower entry (smaller depth) is replaced by the new
    ///   one, inheriting the old entry's tokens;
    /// - otherwise the new token joins the existing entry's token map,
    ///   leaving its depth/scope/owner untouched;
    /// - an expired entry is treated as absent and replaced outright.
    pub fn create_lock(&self, request: LockRequest) -> LockResult {
        let now = Utc::now();
        let segments = path::split(&request.path);
        let mut state = self.locked_state();
        self.maybe_sweep(&mut state, now);

        let conflicts = conflict::find_conflicts(&state.tree, &request, &segments, now);
        if !conflicts.is_empty() {
            tracing::debug!(path = %request.path, conflicts = conflicts.len(), "lock refused");
            return LockResult::Conflict { paths: conflicts };
        }

        let token = self.tokens.issue(&request, now);
        let idx = state.tree.create(&segments);
        let slot = state.tree.entry_mut(idx);
        let merged = merge_entry(slot.take(), &request, &token, now);
        *slot = Some(merged.clone());
        tracing::debug!(path = %request.path, depth = request.depth, "lock granted");
        LockResult::Granted {
            entry: merged,
            token,
        }
    }

    /// Extend the expiry of every token at `path` that the caller presented.
    ///
    /// Returns the refreshed entry snapshot, or `None` when no live entry
    /// exists or none of its tokens matched.
    pub fn refresh_lock(
        &self,
        path: &str,
        presented: &str,
        expires_at: DateTime<Utc>,
    ) -> Option<LockEntry> {
        let now = Utc::now();
        let segments = path::split(path);
        let mut state = self.locked_state();
        self.maybe_sweep(&mut state, now);

        let idx = state.tree.find(&segments)?;
        let entry = state.tree.entry_mut(idx).as_mut()?;
        if entry.has_expired(now) {
            return None;
        }

        let mut matched = false;
        for (token, expiry) in entry.tokens.iter_mut() {
            if presented.contains(token.as_str()) {
                *expiry = expires_at;
                matched = true;
            }
        }
        matched.then(|| entry.clone())
    }

    /// Check whether a mutation of `path` must be refused.
    ///
    /// Blocked iff the exact-path entry, or any ancestor entry that inherits
    /// downward, is live and none of its tokens appears in `presented`.
    pub fn is_locked(&self, path: &str, presented: &str) -> bool {
        let now = Utc::now();
        let segments = path::split(path);
        let mut state = self.locked_state();
        self.maybe_sweep(&mut state, now);

        let exact = state.tree.find(&segments);
        if let Some(idx) = exact
            && let Some(entry) = state.tree.entry(idx)
            && !entry.has_expired(now)
            && !entry.token_matches(presented)
        {
            return true;
        }

        let mut cur = Some(state.tree.traverse(&segments));
        while let Some(idx) = cur {
            if Some(idx) != exact
                && let Some(entry) = state.tree.entry(idx)
                && entry.depth > 0
                && !entry.has_expired(now)
                && !entry.token_matches(presented)
            {
                return true;
            }
            cur = state.tree.parent(idx);
        }
        false
    }

    /// Remove every token matched by `presented` from the entry at `path`
    /// and from any covering ancestor entry. An entry whose token map
    /// empties is deleted (which also clears its lock-null marker).
    ///
    /// Idempotent: unknown tokens are a no-op and unrelated tokens are
    /// never touched. Returns whether anything was removed.
    pub fn remove_lock(&self, path: &str, presented: &str) -> bool {
        let now = Utc::now();
        let segments = path::split(path);
        let mut state = self.locked_state();

        let exact = state.tree.find(&segments);
        let mut removed = false;
        let mut cur = Some(state.tree.traverse(&segments));
        while let Some(idx) = cur {
            let next = state.tree.parent(idx);
            let covers = Some(idx) == exact
                || state.tree.entry(idx).is_some_and(|entry| entry.depth > 0);
            if covers {
                let slot = state.tree.entry_mut(idx);
                if let Some(entry) = slot.as_mut() {
                    let before = entry.tokens.len();
                    entry.tokens.retain(|token, _| !presented.contains(token.as_str()));
                    removed |= entry.tokens.len() != before;
                    if entry.tokens.is_empty() {
                        *slot = None;
                    }
                }
            }
            cur = next;
        }

        self.maybe_sweep(&mut state, now);
        removed
    }

    /// Live locks covering `path`: the exact-path entry plus every ancestor
    /// entry that inherits downward.
    pub fn discover_locks(&self, path: &str) -> Vec<LockEntry> {
        let now = Utc::now();
        let segments = path::split(path);
        let mut state = self.locked_state();
        self.maybe_sweep(&mut state, now);

        let exact = state.tree.find(&segments);
        let mut found = Vec::new();
        let mut cur = Some(state.tree.traverse(&segments));
        while let Some(idx) = cur {
            if let Some(entry) = state.tree.entry(idx)
                && !entry.has_expired(now)
                && (Some(idx) == exact || entry.depth > 0)
            {
                found.push(entry.clone());
            }
            cur = state.tree.parent(idx);
        }
        found
    }

    /// Clear the lock-null marker at `path` after the resource materialized.
    /// The lock itself stays.
    pub fn remove_null_lock(&self, path: &str) {
        let now = Utc::now();
        let segments = path::split(path);
        let mut state = self.locked_state();

        if let Some(idx) = state.tree.find(&segments)
            && let Some(entry) = state.tree.entry_mut(idx).as_mut()
        {
            entry.lock_null = false;
        }
        self.maybe_sweep(&mut state, now);
    }

    /// Live lock-null entries directly under `parent`.
    pub fn list_null_locks(&self, parent: &str) -> Vec<LockEntry> {
        let now = Utc::now();
        let segments = path::split(parent);
        let mut state = self.locked_state();
        self.maybe_sweep(&mut state, now);

        let Some(idx) = state.tree.find(&segments) else {
            return Vec::new();
        };
        state
            .tree
            .children(idx)
            .filter_map(|child| state.tree.entry(child))
            .filter(|entry| entry.lock_null && !entry.has_expired(now))
            .cloned()
            .collect()
    }

    /// Run the expiration sweep when at least the sweep interval has
    /// elapsed since the previous one. Grant and block decisions check
    /// expiry live, so the sweep only bounds memory, not correctness.
    fn maybe_sweep(&self, state: &mut ManagerState, now: DateTime<Utc>) {
        if now.signed_duration_since(state.last_sweep) < self.sweep_interval {
            return;
        }
        state.last_sweep = now;
        state.tree.cleanup(now);
    }

    /// A poisoned mutex only means another thread panicked mid-operation;
    /// the tree itself is still structurally sound, so recover the guard.
    fn locked_state(&self) -> MutexGuard<'_, ManagerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Apply the merge rule for a grant at a path that may already hold a lock.
fn merge_entry(
    existing: Option<LockEntry>,
    request: &LockRequest,
    token: &str,
    now: DateTime<Utc>,
) -> LockEntry {
    match existing {
        Some(mut current) if !current.has_expired(now) => {
            if current.depth < request.depth {
                // A narrower lock is being widened: the new entry takes
                // over but inherits the old holders' tokens.
                let mut entry = LockEntry::new(request, token.to_string());
                for (old_token, expiry) in current.tokens {
                    entry.tokens.entry(old_token).or_insert(expiry);
                }
                entry
            } else {
                current.tokens.insert(token.to_string(), request.expires_at);
                current
            }
        }
        _ => LockEntry::new(request, token.to_string()),
    }
}
