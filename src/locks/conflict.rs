//! Two-phase conflict detection for lock creation.
//!
//! Phase one scans the existing ancestor chain for inherited locks; phase
//! two scans the requested subtree. A request conflicts with an entry when
//! either side is exclusive — two shared locks always coexist. Expired
//! entries never conflict, whether or not the sweep has reclaimed them yet.
//!
//! Neither phase creates tree nodes, so a refused request leaves the tree
//! exactly as it was found.

use super::entry::LockEntry;
use super::tree::LockTree;
use super::types::LockRequest;
use chrono::{DateTime, Utc};

/// Collect every path whose lock is incompatible with `request`.
///
/// An ancestor hit makes the subtree scan moot: the inherited lock already
/// covers everything below it.
pub(super) fn find_conflicts(
    tree: &LockTree,
    request: &LockRequest,
    segments: &[String],
    now: DateTime<Utc>,
) -> Vec<String> {
    let conflicts = scan_ancestors(tree, request, segments, now);
    if !conflicts.is_empty() {
        return conflicts;
    }
    scan_subtree(tree, request, segments, now)
}

/// Walk from the deepest existing node up to the root, flagging entries
/// that inherit downward (depth > 0).
fn scan_ancestors(
    tree: &LockTree,
    request: &LockRequest,
    segments: &[String],
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut conflicts = Vec::new();
    let mut cur = Some(tree.traverse(segments));
    while let Some(idx) = cur {
        if let Some(entry) = tree.entry(idx)
            && entry.depth > 0
            && conflicts_with(request, entry, now)
        {
            conflicts.push(entry.path.clone());
        }
        cur = tree.parent(idx);
    }
    conflicts
}

/// Check the requested node and, for a full-depth request, every node
/// below it. Iterative: lock trees are client-shaped, not stack-shaped.
fn scan_subtree(
    tree: &LockTree,
    request: &LockRequest,
    segments: &[String],
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut conflicts = Vec::new();
    let Some(start) = tree.find(segments) else {
        return conflicts;
    };

    if request.depth == 0 {
        if let Some(entry) = tree.entry(start)
            && conflicts_with(request, entry, now)
        {
            conflicts.push(entry.path.clone());
        }
        return conflicts;
    }

    let mut stack = vec![start];
    while let Some(idx) = stack.pop() {
        if let Some(entry) = tree.entry(idx)
            && conflicts_with(request, entry, now)
        {
            conflicts.push(entry.path.clone());
        }
        stack.extend(tree.children(idx));
    }
    conflicts
}

fn conflicts_with(request: &LockRequest, entry: &LockEntry, now: DateTime<Utc>) -> bool {
    !entry.has_expired(now) && (request.scope.is_exclusive() || entry.is_exclusive())
}
