use hashrecon::cache::FingerprintCache;
use hashrecon::progress::ProgressCallback;
use hashrecon::reconcile::{ReconcileConfig, Reconciler};
use hashrecon::scanner::{HashError, HashingPolicy, ScanError};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

#[derive(Default)]
struct CountingCallback {
    progress: AtomicUsize,
    errors: Mutex<Vec<String>>,
}

impl ProgressCallback for CountingCallback {
    fn on_phase_start(&self, _phase: &str, _total: usize) {}

    fn on_progress(&self, _phase: &str, _current: usize, _path: &str) {
        self.progress.fetch_add(1, Ordering::SeqCst);
    }

    fn on_phase_end(&self, _phase: &str) {}

    fn on_error(&self, phase: &str, error: &ScanError) {
        self.errors.lock().unwrap().push(format!("{phase}: {error}"));
    }
}

#[test]
fn test_unhashable_file_is_skipped_not_missing() {
    let source = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(source.path().join("ok.bin"), vec![1u8; 10]).unwrap();
    // Over the threshold, but shorter than the partial window
    fs::write(source.path().join("odd.bin"), vec![2u8; 300]).unwrap();

    let callback = Arc::new(CountingCallback::default());
    let policy = HashingPolicy::new([".bin"], Vec::<String>::new(), 200, 500);
    let config = ReconcileConfig::new(policy).with_progress_callback(callback.clone());

    let report = Reconciler::new(config)
        .reconcile(
            source.path(),
            target.path(),
            Arc::new(FingerprintCache::new()),
            Arc::new(FingerprintCache::new()),
        )
        .unwrap();

    assert_eq!(report.missing.len(), 1);
    assert!(report.missing[0].ends_with("ok.bin"));
    assert_eq!(report.source.failed_files, 1);
    assert!(report.has_errors());
    assert!(matches!(
        report.source.errors[0],
        ScanError::HashError(HashError::InvalidPartialRange { size: 300, partial: 500, .. })
    ));

    // Progress still advanced for the failed file
    assert_eq!(callback.progress.load(Ordering::SeqCst), 2);
    let errors = callback.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("source:"));
}

#[test]
#[cfg(unix)]
fn test_unreadable_subtree_is_skipped_and_scan_continues() {
    use std::os::unix::fs::PermissionsExt;

    let source = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(source.path().join("visible.txt"), "visible").unwrap();
    let locked = source.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("secret.txt"), "secret").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        eprintln!(
            "warning: permission bits not enforced (running as root?); \
             unreadable-directory reconcile not exercised"
        );
        return;
    }

    let policy = HashingPolicy::new([".txt"], Vec::<String>::new(), 1 << 20, 1 << 10);
    let result = Reconciler::new(ReconcileConfig::new(policy)).reconcile(
        source.path(),
        target.path(),
        Arc::new(FingerprintCache::new()),
        Arc::new(FingerprintCache::new()),
    );
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let report = result.unwrap();
    assert_eq!(report.missing.len(), 1);
    assert!(report.missing[0].ends_with("visible.txt"));
    assert_eq!(report.source.skipped_dirs, 1);
    assert!(matches!(
        report.source.errors[0],
        ScanError::PermissionDenied(_)
    ));
}
