use super::{Backend, RawEntry, WriteOutcome};
use crate::error::{MetaError, Result};
use crate::model::{MetadataPatch, Node, NodeKind, Principal};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// In-memory backend over fixture data.
///
/// Used by the test suite and handy for offline experiments with the
/// matcher; behaves like the real backends down to per-node write failures.
pub struct MemoryBackend {
    identity: Principal,
    children: HashMap<String, Vec<RawEntry>>,
    failing_writes: HashSet<String>,
    writes: Mutex<Vec<(String, MetadataPatch)>>,
}

impl MemoryBackend {
    pub fn new(identity: Principal) -> Self {
        Self {
            identity,
            children: HashMap::new(),
            failing_writes: HashSet::new(),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn insert(&mut self, parent_id: &str, entry: RawEntry) {
        self.children
            .entry(parent_id.to_string())
            .or_default()
            .push(entry);
    }

    /// Make every write against `id` fail, to exercise per-pair error
    /// accumulation.
    pub fn fail_writes_for(&mut self, id: &str) {
        self.failing_writes.insert(id.to_string());
    }

    /// All writes issued so far, in order.
    pub fn writes(&self) -> Vec<(String, MetadataPatch)> {
        self.writes.lock().expect("writes lock").clone()
    }

    pub fn folder_entry(id: &str, name: &str) -> RawEntry {
        RawEntry {
            id: id.to_string(),
            name: name.to_string(),
            kind: NodeKind::Folder,
            owner: None,
            last_modified_by: None,
            modified_time: None,
            created_time: None,
            permissions: Vec::new(),
        }
    }

    pub fn file_entry(
        id: &str,
        name: &str,
        owner: Option<Principal>,
        modified_time: Option<DateTime<Utc>>,
    ) -> RawEntry {
        RawEntry {
            id: id.to_string(),
            name: name.to_string(),
            kind: NodeKind::File,
            owner,
            last_modified_by: None,
            modified_time,
            created_time: None,
            permissions: Vec::new(),
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn root_id(&self) -> String {
        "root".to_string()
    }

    async fn authenticate(&self) -> Result<Principal> {
        Ok(self.identity.clone())
    }

    async fn list_children(&self, folder_id: &str) -> Result<Vec<RawEntry>> {
        Ok(self.children.get(folder_id).cloned().unwrap_or_default())
    }

    async fn read_metadata(&self, id: &str) -> Result<RawEntry> {
        self.children
            .values()
            .flatten()
            .find(|entry| entry.id == id)
            .cloned()
            .ok_or_else(|| MetaError::Backend {
                backend: "memory",
                message: format!("no such node: {}", id),
            })
    }

    async fn write_metadata(&self, node: &Node, patch: &MetadataPatch) -> Result<WriteOutcome> {
        if self.failing_writes.contains(&node.id) {
            return Err(MetaError::Backend {
                backend: "memory",
                message: format!("write rejected for {}", node.id),
            });
        }
        self.writes
            .lock()
            .expect("writes lock")
            .push((node.id.clone(), patch.clone()));
        Ok(WriteOutcome::Applied)
    }
}
