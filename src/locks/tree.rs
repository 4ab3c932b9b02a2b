//! Hierarchical lock index.
//!
//! Nodes live in an arena and are addressed by index: the parent
//! back-reference is a plain `usize`, and pruning a node is an index
//! operation with no shared-ownership bookkeeping. Slot 0 is the root
//! sentinel (no parent, empty name); freed slots are recycled through a
//! free list. A node exists for every path that currently holds, or is an
//! ancestor of, at least one lock.

use super::entry::LockEntry;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Index of the root sentinel node.
pub const ROOT: usize = 0;

#[derive(Debug, Default)]
struct Node {
    parent: Option<usize>,
    name: String,
    children: HashMap<String, usize>,
    entry: Option<LockEntry>,
}

/// Arena-backed tree of lock entries keyed by path segments.
#[derive(Debug)]
pub struct LockTree {
    nodes: Vec<Node>,
    free: Vec<usize>,
}

impl LockTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            free: Vec::new(),
        }
    }

    /// Exact node for the segment list, if present. Never creates.
    /// The empty segment list resolves to the root.
    pub fn find(&self, segments: &[String]) -> Option<usize> {
        let mut cur = ROOT;
        for segment in segments {
            cur = *self.nodes[cur].children.get(segment)?;
        }
        Some(cur)
    }

    /// Deepest existing node along the ancestor chain, stopping at the
    /// first missing segment. Root when nothing matches.
    pub fn traverse(&self, segments: &[String]) -> usize {
        let mut cur = ROOT;
        for segment in segments {
            match self.nodes[cur].children.get(segment) {
                Some(&next) => cur = next,
                None => break,
            }
        }
        cur
    }

    /// Node for the full segment list, creating missing intermediates.
    pub fn create(&mut self, segments: &[String]) -> usize {
        let mut cur = ROOT;
        for segment in segments {
            if let Some(&next) = self.nodes[cur].children.get(segment) {
                cur = next;
                continue;
            }
            let node = Node {
                parent: Some(cur),
                name: segment.clone(),
                ..Node::default()
            };
            let idx = self.alloc(node);
            self.nodes[cur].children.insert(segment.clone(), idx);
            cur = idx;
        }
        cur
    }

    pub fn entry(&self, idx: usize) -> Option<&LockEntry> {
        self.nodes[idx].entry.as_ref()
    }

    pub fn entry_mut(&mut self, idx: usize) -> &mut Option<LockEntry> {
        &mut self.nodes[idx].entry
    }

    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.nodes[idx].parent
    }

    /// Indices of the node's direct children.
    pub fn children(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes[idx].children.values().copied()
    }

    /// Clear expired entries, then prune empty leaf nodes bottom-up.
    pub fn cleanup(&mut self, now: DateTime<Utc>) {
        // Round one: clear expired entries, recording the visit order.
        let mut stack = vec![ROOT];
        let mut order = Vec::new();
        while let Some(idx) = stack.pop() {
            order.push(idx);
            let expired = self.nodes[idx]
                .entry
                .as_ref()
                .is_some_and(|entry| entry.has_expired(now));
            if expired {
                self.nodes[idx].entry = None;
            }
            stack.extend(self.nodes[idx].children.values().copied());
        }
        // Round two: children were recorded after their parents, so popping
        // the visit order reaches every leaf before its parent.
        while let Some(idx) = order.pop() {
            if idx == ROOT {
                continue;
            }
            if self.nodes[idx].entry.is_none() && self.nodes[idx].children.is_empty() {
                self.remove(idx);
            }
        }
    }

    fn alloc(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn remove(&mut self, idx: usize) {
        let name = std::mem::take(&mut self.nodes[idx].name);
        if let Some(parent) = self.nodes[idx].parent {
            self.nodes[parent].children.remove(&name);
        }
        self.nodes[idx] = Node::default();
        self.free.push(idx);
    }
}

impl Default for LockTree {
    fn default() -> Self {
        Self::new()
    }
}
