pub mod matcher;

use crate::backend::{Backend, RawEntry};
use crate::error::{MetaError, Result};
use crate::model::Node;
use crate::path::TreePath;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Snapshot of one account's hierarchy under a configured root.
///
/// Owns its nodes and an index from path to the nodes at that path. Paths
/// are not unique — duplicate names under one parent are a tolerated anomaly
/// that the matcher reports — so the index maps to a list.
#[derive(Debug)]
pub struct Tree {
    root_path: TreePath,
    nodes: Vec<Node>,
    by_path: HashMap<TreePath, Vec<usize>>,
}

impl Tree {
    /// Assemble a tree from already-built nodes. The builder uses this; so
    /// do tests that want a fixed snapshot without a backend.
    pub fn from_nodes(root_path: TreePath, nodes: Vec<Node>) -> Self {
        let mut by_path: HashMap<TreePath, Vec<usize>> = HashMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            by_path.entry(node.path.clone()).or_default().push(idx);
        }
        Self {
            root_path,
            nodes,
            by_path,
        }
    }

    pub fn root_path(&self) -> &TreePath {
        &self.root_path
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes at a path (empty when the path is absent).
    pub fn nodes_at(&self, path: &TreePath) -> Vec<&Node> {
        match self.by_path.get(path) {
            Some(indices) => indices.iter().map(|&i| &self.nodes[i]).collect(),
            None => Vec::new(),
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &TreePath> {
        self.by_path.keys()
    }
}

/// Builds a [`Tree`] by recursively listing a backend, one call per folder.
///
/// Traversal is sequential and depth-unbounded; an unresolvable root aborts
/// the build with no partial result, since a partial tree cannot be safely
/// matched.
pub struct TreeBuilder {
    backend: Arc<dyn Backend>,
}

impl TreeBuilder {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn build(&self, root: &TreePath) -> Result<Tree> {
        info!(
            "building {} tree under {}",
            self.backend.name(),
            root
        );

        let root_id = self.resolve_root(root).await?;

        let mut nodes = Vec::new();
        // Explicit work stack instead of recursion: folders at any depth,
        // each listed exactly once.
        let mut pending = vec![(root_id, TreePath::root())];

        while let Some((folder_id, folder_path)) = pending.pop() {
            let children = self.backend.list_children(&folder_id).await?;
            debug!(
                "listed {} entries under {}",
                children.len(),
                if folder_path.is_root() { "root".to_string() } else { folder_path.to_string() }
            );

            for entry in children {
                let node = finalize(entry, &folder_path);
                if node.is_folder() {
                    pending.push((node.id.clone(), node.path.clone()));
                }
                nodes.push(node);
            }
        }

        info!(
            "{} tree built: {} nodes",
            self.backend.name(),
            nodes.len()
        );
        Ok(Tree::from_nodes(root.clone(), nodes))
    }

    /// Walk the root path's name segments down from the account root.
    async fn resolve_root(&self, root: &TreePath) -> Result<String> {
        let mut current = self.backend.root_id();
        for segment in root.segments() {
            let children = self.backend.list_children(&current).await?;
            let next = children
                .into_iter()
                .find(|entry| entry.is_folder() && entry.name == *segment);
            match next {
                Some(folder) => current = folder.id,
                None => {
                    return Err(MetaError::RootNotFound {
                        path: root.to_string(),
                        backend: self.backend.name(),
                    })
                }
            }
        }
        Ok(current)
    }
}

/// Turn a listing row into a node at its final path, applying the metadata
/// fallbacks the original listings need: a missing last modifier falls back
/// to the owner, a missing modified time to the created time.
fn finalize(entry: RawEntry, parent_path: &TreePath) -> Node {
    let path = parent_path.join(&entry.name);
    let last_modified_by = entry.last_modified_by.or_else(|| entry.owner.clone());
    let modified_time = entry.modified_time.or(entry.created_time);
    Node {
        id: entry.id,
        name: entry.name,
        path,
        kind: entry.kind,
        owner: entry.owner,
        last_modified_by,
        modified_time,
        created_time: entry.created_time,
        permissions: entry.permissions,
    }
}
