//! Tests for the locking subsystem.

use super::*;
use crate::token::SequenceTokenFactory;
use chrono::{Duration, Utc};

const MAX_DEPTH: u32 = 3;

/// Manager that sweeps on every call, so pruning behavior is observable.
fn make_manager() -> LockManager {
    LockManager::new(Box::new(SequenceTokenFactory::new()), Duration::zero())
}

fn make_request(path: &str, scope: LockScope, depth: u32) -> LockRequest {
    request_with_timeout(path, scope, depth, 3600)
}

fn request_with_timeout(path: &str, scope: LockScope, depth: u32, secs: i64) -> LockRequest {
    let now = Utc::now();
    LockRequest {
        path: path.to_string(),
        lock_type: "write".to_string(),
        scope,
        depth,
        owner: "tester".to_string(),
        principal: None,
        created_at: now,
        expires_at: now + Duration::seconds(secs),
        lock_null: false,
    }
}

fn grant(manager: &LockManager, request: LockRequest) -> (LockEntry, String) {
    match manager.create_lock(request) {
        LockResult::Granted { entry, token } => (entry, token),
        LockResult::Conflict { paths } => panic!("unexpected conflict with {:?}", paths),
    }
}

fn refuse(manager: &LockManager, request: LockRequest) -> Vec<String> {
    match manager.create_lock(request) {
        LockResult::Conflict { paths } => paths,
        LockResult::Granted { entry, .. } => panic!("unexpectedly granted at {}", entry.path),
    }
}

#[test]
fn two_shared_locks_coexist_in_one_entry() {
    let manager = make_manager();

    let (_, first) = grant(&manager, make_request("/a", LockScope::Shared, 0));
    let (entry, second) = grant(&manager, make_request("/a", LockScope::Shared, 0));

    assert_ne!(first, second);
    assert!(entry.tokens.contains_key(&first));
    assert!(entry.tokens.contains_key(&second));
}

#[test]
fn second_exclusive_lock_at_same_path_is_refused() {
    let manager = make_manager();

    grant(&manager, make_request("/a", LockScope::Exclusive, 0));
    let conflicts = refuse(&manager, make_request("/a", LockScope::Exclusive, 0));

    assert_eq!(conflicts, vec!["/a".to_string()]);
}

#[test]
fn exclusive_request_conflicts_with_shared_holder() {
    let manager = make_manager();

    grant(&manager, make_request("/a", LockScope::Shared, 0));
    let conflicts = refuse(&manager, make_request("/a", LockScope::Exclusive, 0));

    assert_eq!(conflicts, vec!["/a".to_string()]);
}

#[test]
fn inherited_ancestor_lock_blocks_descendant() {
    let manager = make_manager();

    grant(&manager, make_request("/a", LockScope::Exclusive, MAX_DEPTH));
    let conflicts = refuse(&manager, make_request("/a/b", LockScope::Exclusive, 0));

    assert_eq!(conflicts, vec!["/a".to_string()]);
}

#[test]
fn depth_zero_ancestor_does_not_block_descendant() {
    let manager = make_manager();

    grant(&manager, make_request("/a", LockScope::Exclusive, 0));
    grant(&manager, make_request("/a/b", LockScope::Exclusive, 0));
}

#[test]
fn full_depth_request_conflicts_with_locked_descendant() {
    let manager = make_manager();

    grant(&manager, make_request("/a/b/c", LockScope::Exclusive, 0));
    let conflicts = refuse(&manager, make_request("/a", LockScope::Exclusive, MAX_DEPTH));

    assert_eq!(conflicts, vec!["/a/b/c".to_string()]);
}

#[test]
fn conflict_lists_every_incompatible_path() {
    let manager = make_manager();

    grant(&manager, make_request("/a/b", LockScope::Exclusive, 0));
    grant(&manager, make_request("/a/c", LockScope::Exclusive, 0));
    let mut conflicts = refuse(&manager, make_request("/a", LockScope::Shared, MAX_DEPTH));
    conflicts.sort();

    assert_eq!(conflicts, vec!["/a/b".to_string(), "/a/c".to_string()]);
}

#[test]
fn shared_over_shared_subtree_is_granted() {
    let manager = make_manager();

    grant(&manager, make_request("/a", LockScope::Shared, MAX_DEPTH));
    grant(&manager, make_request("/a/b", LockScope::Shared, 0));
}

#[test]
fn widening_merge_replaces_entry_and_unions_tokens() {
    let manager = make_manager();

    let (_, narrow) = grant(&manager, make_request("/a", LockScope::Shared, 0));
    let (entry, wide) = grant(&manager, make_request("/a", LockScope::Shared, MAX_DEPTH));

    assert_eq!(entry.depth, MAX_DEPTH);
    assert!(entry.tokens.contains_key(&narrow));
    assert!(entry.tokens.contains_key(&wide));
}

#[test]
fn join_keeps_existing_depth_and_owner() {
    let manager = make_manager();

    grant(&manager, make_request("/a", LockScope::Shared, MAX_DEPTH));
    let mut second = make_request("/a", LockScope::Shared, 0);
    second.owner = "someone else".to_string();
    let (entry, _) = grant(&manager, second);

    assert_eq!(entry.depth, MAX_DEPTH);
    assert_eq!(entry.owner, "tester");
}

#[test]
fn refresh_extends_matching_token_only() {
    let manager = make_manager();

    let (_, token) = grant(&manager, make_request("/a", LockScope::Shared, 0));
    let (_, other) = grant(&manager, make_request("/a", LockScope::Shared, 0));

    let new_expiry = Utc::now() + Duration::seconds(9000);
    let presented = format!("(<opaquelocktoken:{}>)", token);
    let entry = manager
        .refresh_lock("/a", &presented, new_expiry)
        .expect("refresh should match");

    assert_eq!(entry.tokens[&token], new_expiry);
    assert_ne!(entry.tokens[&other], new_expiry);
}

#[test]
fn refresh_without_matching_token_reports_nothing() {
    let manager = make_manager();

    grant(&manager, make_request("/a", LockScope::Exclusive, 0));

    let refreshed = manager.refresh_lock("/a", "bogus", Utc::now() + Duration::seconds(60));
    assert!(refreshed.is_none());

    let refreshed = manager.refresh_lock("/absent", "bogus", Utc::now() + Duration::seconds(60));
    assert!(refreshed.is_none());
}

#[test]
fn is_locked_blocks_without_token_and_passes_with_it() {
    let manager = make_manager();

    let (_, token) = grant(&manager, make_request("/a", LockScope::Exclusive, 0));

    assert!(manager.is_locked("/a", ""));
    assert!(!manager.is_locked("/a", &format!("(<opaquelocktoken:{}>)", token)));
    assert!(!manager.is_locked("/b", ""));
}

#[test]
fn is_locked_honors_inherited_ancestor_lock() {
    let manager = make_manager();

    let (_, token) = grant(&manager, make_request("/a", LockScope::Exclusive, MAX_DEPTH));

    assert!(manager.is_locked("/a/deep/child", ""));
    assert!(!manager.is_locked("/a/deep/child", &token));
}

#[test]
fn depth_zero_lock_does_not_block_children() {
    let manager = make_manager();

    grant(&manager, make_request("/a", LockScope::Exclusive, 0));

    assert!(!manager.is_locked("/a/b", ""));
}

#[test]
fn remove_lock_with_unknown_token_is_a_noop() {
    let manager = make_manager();

    let (_, token) = grant(&manager, make_request("/a", LockScope::Exclusive, 0));

    assert!(!manager.remove_lock("/a", "unrelated-token"));
    // The real token is untouched
    assert!(!manager.is_locked("/a", &token));
    assert!(manager.is_locked("/a", ""));
}

#[test]
fn remove_last_token_deletes_the_entry() {
    let manager = make_manager();

    let (_, token) = grant(&manager, make_request("/a", LockScope::Exclusive, 0));

    assert!(manager.remove_lock("/a", &token));
    assert!(!manager.is_locked("/a", ""));
    assert!(manager.discover_locks("/a").is_empty());
}

#[test]
fn remove_lock_reaches_covering_ancestor_entries() {
    let manager = make_manager();

    let (_, token) = grant(&manager, make_request("/a", LockScope::Exclusive, MAX_DEPTH));

    assert!(manager.remove_lock("/a/b/c", &token));
    assert!(!manager.is_locked("/a/b", ""));
}

#[test]
fn expired_lock_is_absent_everywhere_before_the_sweep_runs() {
    // Long sweep interval: expiry must be honored without the sweep's help.
    let manager = LockManager::new(
        Box::new(SequenceTokenFactory::new()),
        Duration::seconds(3600),
    );

    grant(
        &manager,
        request_with_timeout("/a", LockScope::Exclusive, MAX_DEPTH, -5),
    );

    assert!(!manager.is_locked("/a", ""));
    assert!(!manager.is_locked("/a/b", ""));
    assert!(manager.discover_locks("/a").is_empty());
    // A fresh exclusive lock can move straight in
    grant(&manager, make_request("/a", LockScope::Exclusive, 0));
}

#[test]
fn entry_with_empty_token_map_counts_as_expired() {
    let request = make_request("/a", LockScope::Exclusive, 0);
    let mut entry = LockEntry::new(&request, "tok".to_string());
    entry.tokens.clear();

    assert!(entry.has_expired(Utc::now()));
}

#[test]
fn expires_at_reports_the_most_generous_live_expiry() {
    let now = Utc::now();
    let request = make_request("/a", LockScope::Shared, 0);
    let mut entry = LockEntry::new(&request, "short".to_string());
    entry.tokens.insert("short".to_string(), now + Duration::seconds(10));
    entry.tokens.insert("long".to_string(), now + Duration::seconds(500));
    entry.tokens.insert("stale".to_string(), now - Duration::seconds(5));

    assert_eq!(entry.expires_at(now), now + Duration::seconds(500));
}

#[test]
fn discover_locks_returns_path_and_covering_ancestors() {
    let manager = make_manager();

    grant(&manager, make_request("/a", LockScope::Shared, MAX_DEPTH));
    grant(&manager, make_request("/a/b", LockScope::Shared, 0));

    let mut paths: Vec<String> = manager
        .discover_locks("/a/b")
        .into_iter()
        .map(|entry| entry.path)
        .collect();
    paths.sort();

    assert_eq!(paths, vec!["/a".to_string(), "/a/b".to_string()]);
    // A depth-zero sibling entry never covers deeper paths
    assert_eq!(manager.discover_locks("/a/b/c").len(), 1);
}

#[test]
fn null_locks_are_listed_until_cleared() {
    let manager = make_manager();

    let mut request = make_request("/docs/draft.txt", LockScope::Exclusive, 0);
    request.lock_null = true;
    grant(&manager, request);

    let nulls = manager.list_null_locks("/docs");
    assert_eq!(nulls.len(), 1);
    assert_eq!(nulls[0].path, "/docs/draft.txt");

    manager.remove_null_lock("/docs/draft.txt");
    assert!(manager.list_null_locks("/docs").is_empty());
    // The lock itself survives the marker removal
    assert!(manager.is_locked("/docs/draft.txt", ""));
}

#[test]
fn unlocking_the_last_token_drops_the_null_entry() {
    let manager = make_manager();

    let mut request = make_request("/docs/draft.txt", LockScope::Exclusive, 0);
    request.lock_null = true;
    let (_, token) = grant(&manager, request);

    manager.remove_lock("/docs/draft.txt", &token);

    assert!(manager.list_null_locks("/docs").is_empty());
}
