use multivarka::ConfigError;
use multivarka::config::{ClientConfig, DEFAULT_URI, LogConfig};
use std::path::PathBuf;

#[test]
fn file_values_fill_gaps_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("multivarka.toml");
    std::fs::write(
        &path,
        "uri = \"file:///srv/data\"\ncollection = \"users\"\n\n[log]\nlevel = \"debug\"\nretention = 3\n",
    )
    .unwrap();

    let from_file = ClientConfig::from_file(&path).unwrap();
    assert_eq!(from_file.uri(), "file:///srv/data");
    assert_eq!(from_file.log.retention, Some(3));

    let overrides = ClientConfig { collection: Some("orders".into()), ..ClientConfig::default() };
    let cfg = ClientConfig::load(overrides, Some(&path)).unwrap();
    assert_eq!(cfg.collection.as_deref(), Some("orders"));
    assert_eq!(cfg.log.retention, Some(3));
}

#[test]
fn merge_missing_respects_existing_values() {
    let mut cfg = ClientConfig {
        uri: Some("memory://a".into()),
        log: LogConfig { level: Some("info".into()), ..LogConfig::default() },
        ..ClientConfig::default()
    };
    cfg.merge_missing(ClientConfig {
        uri: Some("memory://b".into()),
        collection: Some("c".into()),
        log: LogConfig { level: Some("trace".into()), dir: Some(PathBuf::from("logs")), retention: None },
    });
    assert_eq!(cfg.uri(), "memory://a");
    assert_eq!(cfg.collection.as_deref(), Some("c"));
    assert_eq!(cfg.log.level.as_deref(), Some("info"));
    assert_eq!(cfg.log.dir, Some(PathBuf::from("logs")));
}

#[test]
fn defaults_and_errors() {
    assert_eq!(ClientConfig::default().uri(), DEFAULT_URI);

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    let err = ClientConfig::load(ClientConfig::default(), Some(&missing)).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "{err}");

    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "uri = [").unwrap();
    assert!(matches!(ClientConfig::from_file(&bad), Err(ConfigError::Toml(_))));
}
