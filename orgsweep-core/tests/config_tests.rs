// Tests for config.json loading and normalization

use orgsweep_core::config::{DEFAULT_SKIPLIST_FILE, Settings};
use orgsweep_core::error::Error;
use orgsweep_github::GITHUB_API_BASE;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_full_config() {
    let text = r#"{
        "folder": "/data/cache",
        "overwrite": true,
        "organizations": ["acme", "acme-labs"],
        "username": "octocat",
        "PAT": "ghp_secret",
        "words": ["TODO", "FIXME", "todo", ""],
        "filetypes": ["GO", ".rs", " .Py "]
    }"#;

    let settings = Settings::from_json(text, Path::new("config.json")).unwrap();
    assert_eq!(settings.folder, PathBuf::from("/data/cache"));
    assert!(settings.overwrite);
    assert_eq!(settings.organizations, vec!["acme", "acme-labs"]);
    assert_eq!(settings.words, vec!["TODO", "FIXME"]);
    assert_eq!(settings.filetypes, vec![".go", ".rs", ".py"]);

    let creds = settings.credentials().unwrap();
    assert_eq!(creds.username, "octocat");
    assert_eq!(creds.token, "ghp_secret");
}

#[test]
fn test_defaults() {
    let settings = Settings::from_json(r#"{"folder": "/cache"}"#, Path::new("c.json")).unwrap();
    assert!(!settings.overwrite);
    assert!(!settings.verbose);
    assert!(settings.organizations.is_empty());
    assert!(settings.credentials().is_none());
    assert_eq!(settings.skiplist, PathBuf::from(DEFAULT_SKIPLIST_FILE));
    assert_eq!(settings.api_base, GITHUB_API_BASE);
    assert_eq!(settings.logfile(), PathBuf::from("/cache/logfile.csv"));
    assert_eq!(settings.org_folder("acme"), PathBuf::from("/cache/acme"));
}

#[test]
fn test_tilde_is_expanded() {
    let settings = Settings::from_json(r#"{"folder": "~/gh"}"#, Path::new("c.json")).unwrap();
    assert!(!settings.folder.to_string_lossy().starts_with('~'));
    assert!(settings.folder.ends_with("gh"));
}

#[test]
fn test_missing_folder_is_config_error() {
    let result = Settings::from_json(r#"{"words": ["x"]}"#, Path::new("bad.json"));
    match result {
        Err(Error::Config { path, .. }) => assert_eq!(path, PathBuf::from("bad.json")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_empty_folder_is_config_error() {
    let result = Settings::from_json(r#"{"folder": ""}"#, Path::new("c.json"));
    assert!(matches!(result, Err(Error::Config { .. })));
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"folder": "/cache", "verbose": true}"#).unwrap();

    let settings = Settings::load(&path).unwrap();
    assert!(settings.verbose);
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = Settings::load(&dir.path().join("config.json"));
    assert!(matches!(result, Err(Error::Config { .. })));
}
