use crate::backend::{Backend, WriteOutcome};
use crate::domain::DomainMapper;
use crate::error::Result;
use crate::model::{MetadataPatch, Node};
use crate::path::TreePath;
use crate::tree::matcher::MatchResult;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{debug, warn};

/// What the applier is allowed to touch.
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Compute patches and report, but issue no write calls.
    pub dry_run: bool,
    /// Transfer ownership to the (translated) source owner.
    pub update_owner: bool,
    /// Re-create non-owner permissions from the (translated) source set.
    pub update_permissions: bool,
    pub quiet: bool,
}

/// A write that failed, kept with the pair it belongs to.
#[derive(Debug)]
pub struct PairError {
    pub path: TreePath,
    pub dest_id: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct ApplyStats {
    /// Matched pairs considered (equals writes attempted unless dry-run).
    pub planned: usize,
    pub written: usize,
    /// Pairs the backend reported as already carrying migrated metadata.
    pub already_tagged: usize,
    pub errors: Vec<PairError>,
}

/// Writes source metadata onto matched destination nodes.
///
/// Pairs are processed in matcher order, each write independent: a failure
/// is recorded against its pair and the rest continue. Nothing here is
/// transactional beyond the backend's single-node write.
pub struct MetadataApplier {
    dest: Arc<dyn Backend>,
    mapper: Option<DomainMapper>,
    options: ApplyOptions,
}

impl MetadataApplier {
    pub fn new(dest: Arc<dyn Backend>, mapper: Option<DomainMapper>, options: ApplyOptions) -> Self {
        Self {
            dest,
            mapper,
            options,
        }
    }

    pub async fn apply(&self, result: &MatchResult) -> Result<ApplyStats> {
        let mut stats = ApplyStats {
            planned: result.matched.len(),
            ..Default::default()
        };

        let pb = if self.options.quiet || self.options.dry_run {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new(result.matched.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .expect("valid progress template")
                    .progress_chars("#>-"),
            );
            pb
        };

        for pair in &result.matched {
            let patch = self.patch_for(&pair.source);
            pb.set_message(format!("Updating {}", pair.source.path));

            if self.options.dry_run {
                debug!("dry-run: would write {:?} to {}", patch, pair.dest.id);
                pb.inc(1);
                continue;
            }

            match self.dest.write_metadata(&pair.dest, &patch).await {
                Ok(WriteOutcome::Applied) => stats.written += 1,
                Ok(WriteOutcome::AlreadyTagged) => {
                    debug!("{} already carries migrated metadata, skipping", pair.source.path);
                    stats.already_tagged += 1;
                }
                Err(e) => {
                    warn!("metadata write failed for {}: {}", pair.source.path, e);
                    stats.errors.push(PairError {
                        path: pair.source.path.clone(),
                        dest_id: pair.dest.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(stats)
    }

    /// Build the destination patch from a source node, translating
    /// principals when a mapper is configured. Owner-role permission
    /// entries are dropped from the permission set; ownership moves only
    /// through the dedicated owner field.
    fn patch_for(&self, source: &Node) -> MetadataPatch {
        let translate = |p: &crate::model::Principal| match &self.mapper {
            Some(mapper) => mapper.translate_principal(p),
            None => p.clone(),
        };

        let owner = if self.options.update_owner {
            source.owner.as_ref().map(translate)
        } else {
            None
        };

        let permissions = if self.options.update_permissions {
            source
                .permissions
                .iter()
                .filter(|perm| perm.role != "owner")
                .map(|perm| crate::model::Permission {
                    principal: translate(&perm.principal),
                    role: perm.role.clone(),
                })
                .collect()
        } else {
            Vec::new()
        };

        MetadataPatch {
            modified_time: source.modified_time,
            created_time: source.created_time,
            last_modified_by: source.last_modified_by.clone(),
            owner,
            permissions,
        }
    }
}
