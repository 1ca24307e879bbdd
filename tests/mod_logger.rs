use log::LevelFilter;
use multivarka::logger::{build_config, configure_logging, parse_level};

#[test]
fn levels_parse_case_insensitively() {
    assert_eq!(parse_level(Some("DEBUG")), LevelFilter::Debug);
    assert_eq!(parse_level(Some("off")), LevelFilter::Off);
    assert_eq!(parse_level(Some("bogus")), LevelFilter::Info);
    assert_eq!(parse_level(None), LevelFilter::Info);
}

#[test]
fn file_appenders_are_added_for_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("logs");
    let config = build_config(Some(&logs), LevelFilter::Debug, Some(2)).unwrap();
    assert!(logs.is_dir());
    assert_eq!(config.appenders().len(), 3);
    assert!(config.loggers().iter().any(|l| l.name() == "multivarka::trace"));

    let console_only = build_config(None, LevelFilter::Warn, None).unwrap();
    assert_eq!(console_only.appenders().len(), 1);
    assert_eq!(console_only.root().level(), LevelFilter::Warn);
}

#[test]
fn second_install_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    configure_logging(Some(dir.path()), Some("trace"), None).unwrap();
    log::debug!(target: "multivarka::trace", "probe");
    assert!(configure_logging(None, None, None).is_err());
}
