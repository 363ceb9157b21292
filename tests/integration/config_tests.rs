use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use hashrecon::config::{ReportFormat, Settings, SettingsError};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::tempdir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all HASHRECON_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("HASHRECON_") {
            std::env::remove_var(key);
        }
    }
}

const SAMPLE: &str = r#"
[directories]
source_dir = "/data/photos"
target_dir = "/mnt/backup/photos"

[file_types]
included_extensions = [".jpg", "PNG"]
excluded_extensions = [".tmp"]

[hashing]
large_file_threshold = 5000000
partial_hash_size = 4096
workers = 8

[cache]
enabled = false

[output]
path = "report.json"
format = "json"
"#;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Settings::default()));
    let settings: Settings = figment.extract().unwrap();

    assert_eq!(settings, Settings::default());
    assert_eq!(settings.hashing.workers, 4);
    assert!(settings.directories.source_dir.is_none());
}

#[test]
fn test_config_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, SAMPLE).unwrap();

    let settings = Settings::load(Some(&config_path)).unwrap();

    assert_eq!(
        settings.directories.source_dir,
        Some(PathBuf::from("/data/photos"))
    );
    assert_eq!(settings.hashing.large_file_threshold, 5_000_000);
    assert_eq!(settings.hashing.partial_hash_size, 4096);
    assert_eq!(settings.hashing.workers, 8);
    assert!(!settings.cache.enabled);
    assert_eq!(settings.output.format, ReportFormat::Json);
    // Keys absent from the file keep their defaults
    assert!(settings.hashing.precount);

    let policy = settings.hashing_policy();
    assert!(policy.included_extensions.contains(".png"));
    assert!(policy.excluded_extensions.contains(".tmp"));
    assert!(settings.validate().is_ok());
}

#[test]
fn test_env_overrides_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, SAMPLE).unwrap();

    // Use double underscore for nesting
    std::env::set_var("HASHRECON_HASHING__WORKERS", "2");
    std::env::set_var("HASHRECON_DIRECTORIES__TARGET_DIR", "/elsewhere");

    let settings = Settings::load(Some(&config_path));
    clear_env();
    let settings = settings.unwrap();

    assert_eq!(settings.hashing.workers, 2);
    assert_eq!(
        settings.directories.target_dir,
        Some(PathBuf::from("/elsewhere"))
    );
    assert_eq!(settings.hashing.partial_hash_size, 4096);
}

#[test]
fn test_env_only() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    std::env::set_var("HASHRECON_HASHING__PARALLEL_TREES", "true");

    let figment = Figment::from(Serialized::defaults(Settings::default()))
        .merge(Env::prefixed("HASHRECON_").split("__"));
    let settings: Result<Settings, _> = figment.extract();
    clear_env();

    assert!(settings.unwrap().hashing.parallel_trees);
}

#[test]
fn test_config_invalid_type_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[hashing]\nworkers = \"eight\"\n").unwrap();

    let result = Settings::load(Some(&config_path));

    assert!(matches!(result, Err(SettingsError::Figment(_))));
}

#[test]
fn test_config_invalid_toml_is_an_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "invalid = toml").unwrap();

    let figment =
        Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(&config_path));

    let result: Result<Settings, _> = figment.extract();
    assert!(result.is_err());
}

#[test]
fn test_config_unknown_key_is_ignored() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    // 'folow_symlinks' is a typo for 'follow_symlinks'
    fs::write(&config_path, "[hashing]\nfolow_symlinks = true\n").unwrap();

    // Loads fine; the typo only produces a warning
    let settings = Settings::load(Some(&config_path)).unwrap();
    assert!(!settings.hashing.follow_symlinks);
}

#[test]
fn test_printed_config_loads_back() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, SAMPLE).unwrap();
    let settings = Settings::load(Some(&config_path)).unwrap();

    let printed = temp_dir.path().join("printed.toml");
    fs::write(&printed, settings.to_toml().unwrap()).unwrap();

    assert_eq!(Settings::load(Some(&printed)).unwrap(), settings);
}
