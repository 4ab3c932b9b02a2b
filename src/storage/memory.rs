//! Ephemeral in-memory resource store.
//!
//! Resources live in one flat ordered map keyed by canonical path; the
//! hierarchy is recovered from the path encoding, so listing a directory is
//! a range scan over its `/`-terminated prefix.

use super::{Resource, ResourceKind, ResourceStore};
use crate::path;
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
enum StoredNode {
    File(Vec<u8>),
    Directory,
}

/// In-memory store; the root directory always exists.
#[derive(Debug)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, StoredNode>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert("/".to_string(), StoredNode::Directory);
        Self {
            entries: RwLock::new(entries),
        }
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, StoredNode>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, StoredNode>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Prefix under which a directory's children sort.
fn child_prefix(path: &str) -> String {
    if path == "/" {
        "/".to_string()
    } else {
        format!("{}/", path)
    }
}

fn parent_is_directory(entries: &BTreeMap<String, StoredNode>, path: &str) -> bool {
    match path::parent(path) {
        Some(parent) => matches!(entries.get(&parent), Some(StoredNode::Directory)),
        None => false,
    }
}

fn has_children(entries: &BTreeMap<String, StoredNode>, path: &str) -> bool {
    let prefix = child_prefix(path);
    entries
        .range(prefix.clone()..)
        .take_while(|(key, _)| key.starts_with(&prefix))
        .next()
        .is_some()
}

impl ResourceStore for MemoryStore {
    fn resource(&self, path: &str) -> Option<Resource> {
        let entries = self.read_entries();
        entries.get(path).map(|node| match node {
            StoredNode::File(data) => Resource {
                kind: ResourceKind::File,
                len: data.len() as u64,
            },
            StoredNode::Directory => Resource {
                kind: ResourceKind::Directory,
                len: 0,
            },
        })
    }

    fn read(&self, path: &str) -> Option<Vec<u8>> {
        let entries = self.read_entries();
        match entries.get(path) {
            Some(StoredNode::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    fn list(&self, path: &str) -> Vec<String> {
        let entries = self.read_entries();
        if !matches!(entries.get(path), Some(StoredNode::Directory)) {
            return Vec::new();
        }
        let prefix = child_prefix(path);
        entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| !key[prefix.len()..].contains('/'))
            .map(|(key, _)| key[prefix.len()..].to_string())
            .collect()
    }

    fn mkdir(&self, path: &str) -> bool {
        if path == "/" {
            return false;
        }
        let mut entries = self.write_entries();
        if entries.contains_key(path) || !parent_is_directory(&entries, path) {
            return false;
        }
        entries.insert(path.to_string(), StoredNode::Directory);
        true
    }

    fn write(&self, path: &str, data: Vec<u8>, overwrite: bool) -> bool {
        if path == "/" {
            return false;
        }
        let mut entries = self.write_entries();
        match entries.get(path) {
            Some(StoredNode::Directory) => return false,
            Some(StoredNode::File(_)) if !overwrite => return false,
            Some(StoredNode::File(_)) => {}
            None => {
                if !parent_is_directory(&entries, path) {
                    return false;
                }
            }
        }
        entries.insert(path.to_string(), StoredNode::File(data));
        true
    }

    fn remove(&self, path: &str) -> bool {
        if path == "/" {
            return false;
        }
        let mut entries = self.write_entries();
        match entries.get(path) {
            None => false,
            Some(StoredNode::Directory) if has_children(&entries, path) => false,
            Some(_) => entries.remove(path).is_some(),
        }
    }
}
