use hashrecon::cache::FingerprintCache;
use hashrecon::reconcile::{ReconcileConfig, ReconcileError, ReconcileReport, Reconciler, TreeSide};
use hashrecon::scanner::{HashingPolicy, ScanError};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

fn txt_policy() -> HashingPolicy {
    HashingPolicy::new([".txt"], Vec::<String>::new(), 100 * 1024 * 1024, 1024 * 1024)
}

fn run(source: &Path, target: &Path, config: ReconcileConfig) -> ReconcileReport {
    Reconciler::new(config)
        .reconcile(
            source,
            target,
            Arc::new(FingerprintCache::new()),
            Arc::new(FingerprintCache::new()),
        )
        .unwrap()
}

/// Missing paths relative to `root`, as a set.
fn missing_names(report: &ReconcileReport, root: &Path) -> BTreeSet<PathBuf> {
    let root = root.canonicalize().unwrap();
    report
        .missing
        .iter()
        .map(|p| p.strip_prefix(&root).unwrap().to_path_buf())
        .collect()
}

#[test]
fn test_identical_content_under_other_names_is_reconciled() {
    let source = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(source.path().join("a.txt"), "0123456789").unwrap();
    fs::write(source.path().join("b.txt"), "0123456789").unwrap();
    fs::write(target.path().join("x.txt"), "0123456789").unwrap();

    let report = run(source.path(), target.path(), ReconcileConfig::new(txt_policy()));

    assert!(report.missing.is_empty());
    assert_eq!(report.source.files_fingerprinted, 2);
    assert_eq!(report.source.distinct_digests, 1);
    assert_eq!(report.target.files_fingerprinted, 1);
}

#[test]
fn test_large_file_absent_from_target_is_missing() {
    let source = tempdir().unwrap();
    let target = tempdir().unwrap();
    let data: Vec<u8> = (0..1_000_000u32).map(|i| (i % 251) as u8).collect();
    fs::write(source.path().join("big.bin"), &data).unwrap();
    fs::write(target.path().join("other.bin"), b"something else").unwrap();

    let policy = HashingPolicy::new([".bin"], Vec::<String>::new(), 100_000, 1_000);
    let report = run(source.path(), target.path(), ReconcileConfig::new(policy));

    assert_eq!(
        missing_names(&report, source.path()),
        BTreeSet::from([PathBuf::from("big.bin")])
    );
}

#[test]
fn test_partial_hash_collision_counts_as_present() {
    let source = tempdir().unwrap();
    let target = tempdir().unwrap();
    let mut original = vec![7u8; 1_000_000];
    let mut altered = original.clone();
    // Differ only in the middle, outside both 1000-byte windows
    altered[500_000] = 8;
    original[0] = 1;
    altered[0] = 1;
    fs::write(source.path().join("video.bin"), &original).unwrap();
    fs::write(target.path().join("video.bin"), &altered).unwrap();

    let policy = HashingPolicy::new([".bin"], Vec::<String>::new(), 100_000, 1_000);
    let report = run(source.path(), target.path(), ReconcileConfig::new(policy));
    assert!(report.missing.is_empty());

    // Below the threshold the whole file is hashed and the difference shows
    let policy = HashingPolicy::new([".bin"], Vec::<String>::new(), 2_000_000, 1_000);
    let report = run(source.path(), target.path(), ReconcileConfig::new(policy));
    assert_eq!(report.missing.len(), 1);
}

#[test]
fn test_tree_reconciled_against_itself_has_nothing_missing() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a/b")).unwrap();
    fs::write(dir.path().join("one.txt"), "1").unwrap();
    fs::write(dir.path().join("a/two.txt"), "2").unwrap();
    fs::write(dir.path().join("a/b/three.txt"), "3").unwrap();
    fs::write(dir.path().join("a/b/copy.txt"), "3").unwrap();

    let report = run(dir.path(), dir.path(), ReconcileConfig::new(txt_policy()));

    assert!(report.missing.is_empty());
    assert!(!report.has_errors());
}

#[test]
fn test_repeated_runs_give_the_same_set() {
    let source = tempdir().unwrap();
    let target = tempdir().unwrap();
    for i in 0..40 {
        fs::write(source.path().join(format!("f{i}.txt")), format!("content {i}")).unwrap();
        if i % 3 == 0 {
            fs::write(target.path().join(format!("g{i}.txt")), format!("content {i}")).unwrap();
        }
    }

    let config = ReconcileConfig::new(txt_policy()).with_workers(8);
    let first = missing_names(&run(source.path(), target.path(), config.clone()), source.path());
    let second = missing_names(&run(source.path(), target.path(), config), source.path());

    assert_eq!(first.len(), 26);
    assert_eq!(first, second);
}

#[test]
fn test_worker_count_does_not_change_result() {
    let source = tempdir().unwrap();
    let target = tempdir().unwrap();
    for i in 0..25 {
        fs::write(source.path().join(format!("{i}.txt")), format!("{i}")).unwrap();
    }
    fs::write(target.path().join("seven.txt"), "7").unwrap();

    let one = run(
        source.path(),
        target.path(),
        ReconcileConfig::new(txt_policy()).with_workers(1),
    );
    let many = run(
        source.path(),
        target.path(),
        ReconcileConfig::new(txt_policy()).with_workers(16),
    );

    assert_eq!(
        missing_names(&one, source.path()),
        missing_names(&many, source.path())
    );
    assert_eq!(one.missing.len(), 24);
}

#[test]
fn test_excluded_and_unlisted_extensions_never_reported() {
    let source = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(source.path().join("keep.txt"), "keep").unwrap();
    fs::write(source.path().join("scratch.tmp"), "tmp").unwrap();
    fs::write(source.path().join("notes.md"), "md").unwrap();
    fs::write(source.path().join("README"), "no extension").unwrap();
    fs::write(source.path().join(".hidden.txt"), "hidden").unwrap();
    fs::write(source.path().join("$lock.txt"), "lock").unwrap();

    // .tmp is both included and excluded: exclusion wins
    let policy = HashingPolicy::new([".txt", ".tmp"], [".tmp"], 1 << 20, 1 << 10);
    let report = run(source.path(), target.path(), ReconcileConfig::new(policy));

    assert_eq!(
        missing_names(&report, source.path()),
        BTreeSet::from([PathBuf::from("keep.txt")])
    );
    assert_eq!(report.source.files_fingerprinted, 1);
}

#[test]
fn test_extension_match_is_case_insensitive() {
    let source = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(source.path().join("PHOTO.JPG"), "pixels").unwrap();
    fs::write(target.path().join("photo.jpg"), "pixels").unwrap();

    let policy = HashingPolicy::new(["jpg"], Vec::<String>::new(), 1 << 20, 1 << 10);
    let report = run(source.path(), target.path(), ReconcileConfig::new(policy));

    assert!(report.missing.is_empty());
    assert_eq!(report.source.files_fingerprinted, 1);
}

#[test]
fn test_empty_trees() {
    let source = tempdir().unwrap();
    let target = tempdir().unwrap();

    let report = run(source.path(), target.path(), ReconcileConfig::new(txt_policy()));

    assert!(report.is_reconciled());
    assert_eq!(report.source.files_walked, 0);
    assert_eq!(report.target.files_walked, 0);
}

#[test]
fn test_empty_source_files_match_empty_target_files() {
    let source = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(source.path().join("empty.txt"), "").unwrap();
    fs::write(target.path().join("also_empty.txt"), "").unwrap();

    let report = run(source.path(), target.path(), ReconcileConfig::new(txt_policy()));

    assert!(report.missing.is_empty());
}

#[test]
fn test_every_copy_of_missing_content_is_listed() {
    let source = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::create_dir(source.path().join("dup")).unwrap();
    fs::write(source.path().join("orig.txt"), "lost").unwrap();
    fs::write(source.path().join("dup/copy.txt"), "lost").unwrap();

    let report = run(source.path(), target.path(), ReconcileConfig::new(txt_policy()));

    assert_eq!(
        missing_names(&report, source.path()),
        BTreeSet::from([PathBuf::from("orig.txt"), PathBuf::from("dup/copy.txt")])
    );
}

#[test]
fn test_missing_source_root_is_fatal_and_names_source() {
    let target = tempdir().unwrap();
    let gone = target.path().join("does-not-exist");

    let err = Reconciler::new(ReconcileConfig::new(txt_policy()))
        .reconcile(
            &gone,
            target.path(),
            Arc::new(FingerprintCache::new()),
            Arc::new(FingerprintCache::new()),
        )
        .unwrap_err();

    match err {
        ReconcileError::Tree {
            side: TreeSide::Source,
            source: ScanError::NotFound(path),
        } => assert_eq!(path, gone),
        other => panic!("Expected source NotFound, got: {:?}", other),
    }
}

#[test]
fn test_missing_target_root_is_fatal_in_parallel_mode() {
    let source = tempdir().unwrap();
    fs::write(source.path().join("a.txt"), "a").unwrap();

    let err = Reconciler::new(ReconcileConfig::new(txt_policy()).with_parallel_trees(true))
        .reconcile(
            source.path(),
            &source.path().join("nope"),
            Arc::new(FingerprintCache::new()),
            Arc::new(FingerprintCache::new()),
        )
        .unwrap_err();

    assert_eq!(err.side(), TreeSide::Target);
}
