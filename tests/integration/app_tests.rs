use clap::Parser;
use hashrecon::cli::Cli;
use hashrecon::error::ExitCode;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

struct Fixture {
    source: TempDir,
    target: TempDir,
    work: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            source: tempdir().unwrap(),
            target: tempdir().unwrap(),
            work: tempdir().unwrap(),
        };
        fs::write(fixture.source.path().join("kept.txt"), "kept").unwrap();
        fs::write(fixture.source.path().join("lost.txt"), "lost").unwrap();
        fs::write(fixture.target.path().join("renamed.txt"), "kept").unwrap();
        fixture
    }

    fn report(&self, name: &str) -> std::path::PathBuf {
        self.work.path().join(name)
    }

    fn args(&self, extra: &[&str]) -> Vec<String> {
        let mut args = vec![
            "hashrecon".to_string(),
            path_str(self.source.path()),
            path_str(self.target.path()),
            "-i".to_string(),
            ".txt".to_string(),
            "-q".to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        args
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn run(args: Vec<String>) -> anyhow::Result<ExitCode> {
    hashrecon::run_app(Cli::try_parse_from(args).unwrap())
}

#[test]
fn test_missing_files_written_to_csv() {
    let fx = Fixture::new();
    let report = fx.report("missing.csv");
    let report_arg = path_str(&report);

    let code = run(fx.args(&["--no-cache", "-o", &report_arg])).unwrap();

    assert_eq!(code, ExitCode::MissingFiles);
    let mut reader = csv::Reader::from_path(&report).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, vec!["File Path".to_string()]);
    let rows: Vec<String> = reader
        .records()
        .map(|r| r.unwrap()[0].to_string())
        .collect();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].ends_with("lost.txt"));
}

#[test]
fn test_reconciled_trees_exit_success_with_header_only_report() {
    let fx = Fixture::new();
    fs::write(fx.target.path().join("lost.txt"), "lost").unwrap();
    let report = fx.report("missing.csv");
    let report_arg = path_str(&report);

    let code = run(fx.args(&["--no-cache", "-o", &report_arg])).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(fs::read_to_string(&report).unwrap().trim(), "File Path");
}

#[test]
fn test_json_report() {
    let fx = Fixture::new();
    let report = fx.report("nested/dir/report.json");
    let report_arg = path_str(&report);

    let code = run(fx.args(&["--no-cache", "-f", "json", "-o", &report_arg])).unwrap();

    assert_eq!(code, ExitCode::MissingFiles);
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(value["missing"].as_array().unwrap().len(), 1);
    assert_eq!(value["summary"]["missing_files"], 1);
    assert_eq!(value["summary"]["exit_code"], 2);
    assert_eq!(value["summary"]["source"]["files_fingerprinted"], 2);
    assert_eq!(value["summary"]["target"]["files_fingerprinted"], 1);
    assert!(value["generated_at"].is_string());
}

#[test]
fn test_caches_written_and_reused() {
    let fx = Fixture::new();
    let cache_dir = fx.work.path().join("cache");
    let cache_arg = path_str(&cache_dir);
    let report_arg = path_str(&fx.report("missing.csv"));

    run(fx.args(&["--cache-dir", &cache_arg, "-o", &report_arg])).unwrap();

    let source_cache: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(cache_dir.join("source_cache.json")).unwrap(),
    )
    .unwrap();
    let target_cache: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(cache_dir.join("target_cache.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(source_cache.as_object().unwrap().len(), 2);
    assert_eq!(target_cache.as_object().unwrap().len(), 1);

    // Second run reads the caches and reaches the same verdict
    let code = run(fx.args(&["--cache-dir", &cache_arg, "-o", &report_arg])).unwrap();
    assert_eq!(code, ExitCode::MissingFiles);
}

#[test]
fn test_no_cache_writes_nothing() {
    let fx = Fixture::new();
    let report_arg = path_str(&fx.report("missing.csv"));

    run(fx.args(&["--no-cache", "-o", &report_arg])).unwrap();

    let entries: Vec<_> = fs::read_dir(fx.work.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("missing.csv")]);
}

#[test]
fn test_missing_source_root_is_an_error() {
    let fx = Fixture::new();
    let gone = path_str(&fx.work.path().join("gone"));
    let report = fx.report("missing.csv");
    let args = vec![
        "hashrecon".to_string(),
        gone,
        path_str(fx.target.path()),
        "-i".to_string(),
        ".txt".to_string(),
        "-q".to_string(),
        "--no-cache".to_string(),
        "-o".to_string(),
        path_str(&report),
    ];

    let err = run(args).unwrap_err();

    assert!(format!("{err:#}").contains("source tree"));
    assert!(!report.exists());
}

#[test]
fn test_no_extensions_is_a_configuration_error() {
    let fx = Fixture::new();
    let args = vec![
        "hashrecon".to_string(),
        path_str(fx.source.path()),
        path_str(fx.target.path()),
        "-q".to_string(),
        "--no-cache".to_string(),
    ];

    let err = run(args).unwrap_err();

    assert!(err.to_string().contains("No file extensions"));
}

#[test]
fn test_config_file_supplies_directories() {
    let fx = Fixture::new();
    let report = fx.report("from_config.csv");
    let config = fx.work.path().join("config.toml");
    let content = format!(
        "[directories]\nsource_dir = {:?}\ntarget_dir = {:?}\n\n[file_types]\nincluded_extensions = [\".txt\"]\n\n[cache]\nenabled = false\n\n[output]\npath = {:?}\n",
        path_str(fx.source.path()),
        path_str(fx.target.path()),
        path_str(&report),
    );
    fs::write(&config, content).unwrap();

    let code = run(vec![
        "hashrecon".to_string(),
        "-q".to_string(),
        "-c".to_string(),
        path_str(&config),
    ])
    .unwrap();

    assert_eq!(code, ExitCode::MissingFiles);
    assert!(report.exists());
}

#[test]
fn test_nonexistent_config_file_is_an_error() {
    let fx = Fixture::new();
    let config = path_str(&fx.work.path().join("absent.toml"));

    let err = run(fx.args(&["--no-cache", "-c", &config])).unwrap_err();

    assert!(err.to_string().contains("Configuration file not found"));
}

#[test]
fn test_print_config_does_not_scan() {
    let fx = Fixture::new();
    let report = fx.report("never.csv");
    let report_arg = path_str(&report);

    let code = run(fx.args(&["--no-cache", "--print-config", "-o", &report_arg])).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(!report.exists());
}
