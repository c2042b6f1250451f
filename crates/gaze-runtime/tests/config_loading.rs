#![forbid(unsafe_code)]

//! Loading `EngineConfig` from TOML and JSON.
//!
//! Run:
//!   cargo test -p gaze-runtime --features config-file --test config_loading

use std::io::Write;

use gaze_core::filter::FilterKind;
use gaze_runtime::config::{ConfigError, EngineConfig};
use web_time::Duration;

#[test]
fn partial_toml_overrides_only_named_fields() {
    let config = EngineConfig::from_toml_str(
        r#"
        [smoothing]
        alpha = 0.3

        [dwell]
        standard_ms = 1200
        "#,
    )
    .unwrap();

    assert_eq!(config.smoothing.alpha, 0.3);
    assert_eq!(config.dwell.standard(), Duration::from_millis(1200));
    assert_eq!(config.dwell.coarse(), Duration::from_millis(3000));
    assert_eq!(config.targeting, EngineConfig::default().targeting);
}

#[test]
fn empty_documents_give_defaults() {
    assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
}

#[test]
fn filter_kind_is_tagged() {
    let config = EngineConfig::from_toml_str(
        r#"
        [smoothing.filter]
        kind = "window_mean"
        window_ms = 300
        "#,
    )
    .unwrap();
    assert_eq!(config.smoothing.filter, FilterKind::WindowMean { window_ms: 300 });

    let config = EngineConfig::from_json_str(
        r#"{"smoothing":{"filter":{"kind":"kalman","process_var":10.0,"measurement_var":0.5}}}"#,
    )
    .unwrap();
    assert_eq!(
        config.smoothing.filter,
        FilterKind::Kalman {
            process_var: 10.0,
            measurement_var: 0.5
        }
    );
}

#[test]
fn toml_file_round_trip() {
    let mut config = EngineConfig::default();
    config.targeting.exit_delay_ms = 250;
    config.magnet.enabled = false;
    config.autopilot.wait_timeout_ms = 2000;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(config.to_toml_string().unwrap().as_bytes())
        .unwrap();

    let loaded = EngineConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn json_file_loads() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"blink":{{"prolonged_ms":800,"click_on_prolonged":false}}}}"#).unwrap();

    let loaded = EngineConfig::from_json_file(file.path()).unwrap();
    assert_eq!(loaded.blink.prolonged(), Duration::from_millis(800));
    assert!(!loaded.blink.click_on_prolonged);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = EngineConfig::from_toml_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)), "{err}");
}

#[test]
fn malformed_input_reports_parser_errors() {
    assert!(matches!(
        EngineConfig::from_toml_str("[dwell\nstandard_ms = 1"),
        Err(ConfigError::Toml(_))
    ));
    assert!(matches!(
        EngineConfig::from_json_str(r#"{"dwell": {"standard_ms": "slow"}}"#),
        Err(ConfigError::Json(_))
    ));
}

#[test]
fn loaded_values_still_need_validation() {
    let config = EngineConfig::from_toml_str("[smoothing]\nalpha = 1.5\n").unwrap();
    let err = config.validated().unwrap_err();
    match err {
        ConfigError::Validation(errors) => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("smoothing.alpha"));
        }
        other => panic!("expected validation error, got {other}"),
    }
}
