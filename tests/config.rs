use std::time::Duration;

use assert_matches::assert_matches;

use bibfetch::config::{Config, ConfigLoader};
use bibfetch::domain::LibraryMode;
use bibfetch::error::BibError;

#[test]
fn load_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("bibfetch.json");
    std::fs::write(
        &path,
        r#"{
            "default_provider": "ISBN",
            "key_pattern": "[authors2][year]",
            "mode": "biblatex",
            "library": "refs/library.json",
            "timeout_secs": 5,
            "mailto": "lab@example.org"
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.default_provider, "ISBN");
    assert_eq!(resolved.key_pattern.as_str(), "[authors2][year]");
    assert_eq!(resolved.mode, LibraryMode::Biblatex);
    assert_eq!(resolved.library_path, "refs/library.json");
    assert_eq!(resolved.review_path, "review.json");
    assert_eq!(resolved.timeout, Duration::from_secs(5));
    assert_eq!(resolved.mailto.as_deref(), Some("lab@example.org"));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, BibError::ConfigRead(_));
}

#[test]
fn invalid_json_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("bibfetch.json");
    std::fs::write(&path, r#"{"mode": "ris"}"#).unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, BibError::ConfigParse(_));
}

#[test]
fn preferences_path_is_optional() {
    let resolved = ConfigLoader::resolve_config(Config {
        preferences: Some("prefs.json".to_string()),
        ..Config::default()
    });
    assert_eq!(resolved.preferences_path.as_deref().map(|p| p.as_str()), Some("prefs.json"));
    assert!(ConfigLoader::resolve_config(Config::default()).preferences_path.is_none());
}
