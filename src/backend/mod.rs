pub mod boxfs;
pub mod drive;
pub mod memory;

use crate::error::Result;
use crate::model::{MetadataPatch, Node, NodeKind, Permission, Principal};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One row of a folder listing, normalized to backend-neutral fields.
///
/// Paths are not known at this level; the tree builder assigns them while it
/// walks the hierarchy.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub owner: Option<Principal>,
    pub last_modified_by: Option<Principal>,
    pub modified_time: Option<DateTime<Utc>>,
    pub created_time: Option<DateTime<Utc>>,
    pub permissions: Vec<Permission>,
}

impl RawEntry {
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }
}

/// Result of a metadata write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// The destination already carries migrated metadata for this node and
    /// the backend declines to overwrite it (Box legacy-metadata template).
    AlreadyTagged,
}

/// Capability interface one storage backend must provide.
///
/// The core pipeline (tree builder, matcher, applier) is written once
/// against this trait and stays backend-agnostic; Drive and Box implement
/// it over their vendor SDKs, and [`memory::MemoryBackend`] implements it
/// over fixtures for tests.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short backend name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Identifier of the account's top-level folder.
    fn root_id(&self) -> String;

    /// Verify the session and return the logged-in identity.
    ///
    /// Cheap single call; used by `--status` and before tree builds.
    async fn authenticate(&self) -> Result<Principal>;

    /// List the immediate children of a folder. One network call per folder
    /// (plus vendor-side pagination).
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RawEntry>>;

    /// Read the metadata of a single node by id.
    async fn read_metadata(&self, id: &str) -> Result<RawEntry>;

    /// Write a metadata patch onto a node. Atomic at single-node
    /// granularity only; callers treat each write as independent.
    async fn write_metadata(&self, node: &Node, patch: &MetadataPatch) -> Result<WriteOutcome>;
}
