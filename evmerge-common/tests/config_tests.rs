//! Configuration loading and root folder resolution tests
//!
//! Tests that manipulate EVMERGE_TEST_ROOT_FOLDER are marked #[serial] so
//! they never observe each other's environment.

use evmerge_common::config::{
    default_root_folder, load_config_file, resolve_root_folder, TomlConfig,
};
use evmerge_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

const ENV_VAR: &str = "EVMERGE_TEST_ROOT_FOLDER";

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(ENV_VAR, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(Some(Path::new("/from/cli")), ENV_VAR, &toml);
    assert_eq!(resolved, PathBuf::from("/from/cli"));

    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ENV_VAR, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    assert_eq!(resolve_root_folder(None, ENV_VAR, &toml), PathBuf::from("/from/env"));

    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_toml_then_default() {
    env::remove_var(ENV_VAR);

    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };
    assert_eq!(resolve_root_folder(None, ENV_VAR, &toml), PathBuf::from("/from/toml"));

    let resolved = resolve_root_folder(None, ENV_VAR, &TomlConfig::default());
    assert_eq!(resolved, default_root_folder());
    assert!(!resolved.as_os_str().is_empty());
}

#[test]
fn test_explicit_config_file_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "root_folder = \"/srv/evmerge\"\nhost = \"0.0.0.0\"\nport = 8081\ndocument_source = \"a.json\"\n",
    )
    .unwrap();

    let config = load_config_file(Some(&path)).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/evmerge")));
    assert_eq!(config.host.as_deref(), Some("0.0.0.0"));
    assert_eq!(config.port, Some(8081));
    assert_eq!(config.document_source, Some(PathBuf::from("a.json")));
    assert!(config.database.is_none());
}

#[test]
fn test_explicit_config_file_missing_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_config_file(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_malformed_config_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = [not toml").unwrap();

    assert!(matches!(load_config_file(Some(&path)), Err(Error::Config(_))));
}
