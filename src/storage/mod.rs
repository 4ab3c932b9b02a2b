//! Resource storage abstraction.
//!
//! The protocol layer consumes this trait; backends supply the bytes. Only
//! the ephemeral in-memory backend ships in this crate — disk- or
//! directory-service-backed stores implement the same trait externally.

mod memory;

pub use memory::MemoryStore;

/// Kind of a stored resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    Directory,
}

/// Descriptor for a stored resource.
#[derive(Debug, Clone)]
pub struct Resource {
    pub kind: ResourceKind,
    /// Content length for files; 0 for directories.
    pub len: u64,
}

impl Resource {
    pub fn is_directory(&self) -> bool {
        self.kind == ResourceKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == ResourceKind::File
    }
}

/// Hierarchical resource store keyed by canonical paths.
///
/// Implementations are synchronous; the protocol layer never calls into the
/// store while the lock manager's critical section is held.
pub trait ResourceStore: Send + Sync {
    /// Descriptor for the resource at `path`, if any.
    fn resource(&self, path: &str) -> Option<Resource>;

    /// File contents. `None` for absent paths and directories.
    fn read(&self, path: &str) -> Option<Vec<u8>>;

    /// Sorted child names of a directory. Empty for files and absent paths.
    fn list(&self, path: &str) -> Vec<String>;

    /// Create a directory. False when the path is taken or its parent is
    /// missing or not a directory.
    fn mkdir(&self, path: &str) -> bool;

    /// Write file contents. False when `overwrite` is disallowed and the
    /// path exists, the path is a directory, or the parent is missing or
    /// not a directory.
    fn write(&self, path: &str, data: Vec<u8>, overwrite: bool) -> bool;

    /// Remove a file or an empty directory. False for absent paths,
    /// non-empty directories, and the root.
    fn remove(&self, path: &str) -> bool;
}
