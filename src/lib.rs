//! remeta repairs descriptive metadata (owner, last modifier, modified
//! time, permissions) that bulk file-transfer services drop when copying a
//! Google Drive tree to another Drive account or to Box.
//!
//! The pipeline: build a tree snapshot per side, join them on relative
//! path, then write source metadata onto each uniquely matched destination
//! node. Ambiguous paths are reported, never auto-applied.

pub mod apply;
pub mod backend;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod model;
pub mod path;
pub mod report;
pub mod session;
pub mod tree;

pub use error::{MetaError, Result};
