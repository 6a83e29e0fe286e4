use chrono::{TimeZone, Utc};
use remeta::apply::{ApplyOptions, MetadataApplier};
use remeta::backend::memory::MemoryBackend;
use remeta::backend::RawEntry;
use remeta::domain::DomainMapper;
use remeta::model::Principal;
use remeta::path::TreePath;
use remeta::tree::matcher::match_trees;
use remeta::tree::{Tree, TreeBuilder};
use std::sync::Arc;

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 11, 5, 8, 0, 0).unwrap()
}

fn t1() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 4, 2, 9, 30, 0).unwrap()
}

fn file(id: &str, name: &str, owner: &str, modified: chrono::DateTime<Utc>) -> RawEntry {
    MemoryBackend::file_entry(id, name, Some(Principal::new(owner)), Some(modified))
}

async fn build(backend: MemoryBackend) -> Tree {
    TreeBuilder::new(Arc::new(backend))
        .build(&TreePath::root())
        .await
        .unwrap()
}

/// Source and destination hold the same docs/report.txt with differing
/// metadata; an update run overlays the source values onto the destination.
#[tokio::test]
async fn matched_pair_gets_source_metadata() {
    let mut source = MemoryBackend::new(Principal::new("src@old.example"));
    source.insert("root", MemoryBackend::folder_entry("sd", "docs"));
    source.insert("sd", file("sf", "report.txt", "a@old.example", t1()));

    let mut dest = MemoryBackend::new(Principal::new("dst@new.example"));
    dest.insert("root", MemoryBackend::folder_entry("dd", "docs"));
    dest.insert("dd", file("df", "report.txt", "b@new.example", t0()));
    let dest = Arc::new(dest);

    let source_tree = build(source).await;
    let dest_tree = TreeBuilder::new(dest.clone())
        .build(&TreePath::root())
        .await
        .unwrap();

    let result = match_trees(&source_tree, &dest_tree);
    assert_eq!(result.matched.len(), 2); // docs/ and docs/report.txt
    assert!(result.missing.is_empty());
    assert!(result.duplicates_source.is_empty());
    assert!(result.duplicates_dest.is_empty());

    let applier = MetadataApplier::new(
        dest.clone(),
        Some(DomainMapper::new("new.example")),
        ApplyOptions {
            update_owner: true,
            quiet: true,
            ..Default::default()
        },
    );
    let stats = applier.apply(&result).await.unwrap();
    assert_eq!(stats.written, 2);
    assert!(stats.errors.is_empty());

    let writes = dest.writes();
    let file_write = writes.iter().find(|(id, _)| id == "df").unwrap();
    assert_eq!(file_write.1.modified_time, Some(t1()));
    assert_eq!(file_write.1.owner.as_ref().unwrap().email, "a@new.example");
}

/// A duplicate path in the source leaves the destination untouched for
/// every candidate at that path.
#[tokio::test]
async fn duplicate_source_path_is_never_written() {
    let mut source = MemoryBackend::new(Principal::new("src@old.example"));
    source.insert("root", MemoryBackend::folder_entry("sd", "docs"));
    // Same name under the same parent via two distinct ids
    source.insert("sd", file("sf1", "report.txt", "a@old.example", t1()));
    source.insert("sd", file("sf2", "report.txt", "a@old.example", t1()));

    let mut dest = MemoryBackend::new(Principal::new("dst@new.example"));
    dest.insert("root", MemoryBackend::folder_entry("dd", "docs"));
    dest.insert("dd", file("df", "report.txt", "b@new.example", t0()));
    let dest = Arc::new(dest);

    let source_tree = build(source).await;
    let dest_tree = TreeBuilder::new(dest.clone())
        .build(&TreePath::root())
        .await
        .unwrap();

    let result = match_trees(&source_tree, &dest_tree);
    assert_eq!(result.duplicates_source.len(), 2);
    let report_path = TreePath::parse("docs/report.txt");
    assert!(result.matched.iter().all(|p| p.source.path != report_path));

    let applier = MetadataApplier::new(
        dest.clone(),
        None,
        ApplyOptions {
            quiet: true,
            ..Default::default()
        },
    );
    applier.apply(&result).await.unwrap();
    assert!(dest.writes().iter().all(|(id, _)| id != "df"));
}

/// A source path with no destination counterpart is reported missing and
/// produces zero write calls.
#[tokio::test]
async fn missing_path_is_reported_not_written() {
    let mut source = MemoryBackend::new(Principal::new("src@old.example"));
    source.insert("root", MemoryBackend::folder_entry("sa", "archive"));
    source.insert("sa", file("sf", "old.txt", "a@old.example", t1()));

    let dest = Arc::new(MemoryBackend::new(Principal::new("dst@new.example")));

    let source_tree = build(source).await;
    let dest_tree = TreeBuilder::new(dest.clone())
        .build(&TreePath::root())
        .await
        .unwrap();

    let result = match_trees(&source_tree, &dest_tree);
    assert!(result.matched.is_empty());
    assert_eq!(result.missing.len(), 2); // archive/ and archive/old.txt

    let applier = MetadataApplier::new(
        dest.clone(),
        None,
        ApplyOptions {
            quiet: true,
            ..Default::default()
        },
    );
    let stats = applier.apply(&result).await.unwrap();
    assert_eq!(stats.planned, 0);
    assert!(dest.writes().is_empty());
}

/// A dry run reports the same match set as an update run against the same
/// snapshots, but issues no write calls.
#[tokio::test]
async fn dry_run_matches_update_run_without_writing() {
    let mut source = MemoryBackend::new(Principal::new("src@old.example"));
    source.insert("root", file("sf", "notes.txt", "a@old.example", t1()));
    let mut dest = MemoryBackend::new(Principal::new("dst@new.example"));
    dest.insert("root", file("df", "notes.txt", "b@new.example", t0()));
    let dest = Arc::new(dest);

    let source_tree = build(source).await;
    let dest_tree = TreeBuilder::new(dest.clone())
        .build(&TreePath::root())
        .await
        .unwrap();

    let result_dry = match_trees(&source_tree, &dest_tree);
    let result_wet = match_trees(&source_tree, &dest_tree);
    assert_eq!(result_dry.matched.len(), result_wet.matched.len());

    let dry = MetadataApplier::new(
        dest.clone(),
        None,
        ApplyOptions {
            dry_run: true,
            quiet: true,
            ..Default::default()
        },
    );
    let stats = dry.apply(&result_dry).await.unwrap();
    assert_eq!(stats.planned, 1);
    assert_eq!(stats.written, 0);
    assert!(dest.writes().is_empty());

    let wet = MetadataApplier::new(
        dest.clone(),
        None,
        ApplyOptions {
            quiet: true,
            ..Default::default()
        },
    );
    let stats = wet.apply(&result_wet).await.unwrap();
    assert_eq!(stats.written, 1);
    assert_eq!(dest.writes().len(), 1);
}
