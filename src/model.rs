use crate::path::TreePath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An identity referenced by owner, modifier, or permission fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub email: String,
    pub name: Option<String>,
}

impl Principal {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    pub fn named(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.email),
            None => write!(f, "{}", self.email),
        }
    }
}

/// One {principal, role} entry on a node. Roles are kept as the backend's
/// own strings ("writer", "reader", ...); the core never interprets them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub principal: Principal,
    pub role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Folder,
}

/// One file-system entry in a storage tree, annotated with everything the
/// metadata overlay needs. Built fresh from a live listing on every run.
#[derive(Debug, Clone)]
pub struct Node {
    /// Backend-specific identifier, treated as opaque.
    pub id: String,
    pub name: String,
    /// Relative path from the configured tree root; the sole join key.
    pub path: TreePath,
    pub kind: NodeKind,
    pub owner: Option<Principal>,
    pub last_modified_by: Option<Principal>,
    pub modified_time: Option<DateTime<Utc>>,
    pub created_time: Option<DateTime<Utc>>,
    pub permissions: Vec<Permission>,
}

impl Node {
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }
}

/// The metadata written to a destination node for one matched pair.
///
/// `None` fields are left untouched on the destination. Owner and
/// permissions are only populated when the corresponding update flag is set,
/// and are already domain-translated by the time they land here.
#[derive(Debug, Clone, Default)]
pub struct MetadataPatch {
    pub modified_time: Option<DateTime<Utc>>,
    pub created_time: Option<DateTime<Utc>>,
    pub last_modified_by: Option<Principal>,
    pub owner: Option<Principal>,
    pub permissions: Vec<Permission>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.modified_time.is_none()
            && self.created_time.is_none()
            && self.last_modified_by.is_none()
            && self.owner.is_none()
            && self.permissions.is_empty()
    }
}
