//! Integration-level unit tests for the SettingsEngine public API.
//!
//! These tests exercise the SettingsEngine through its public trait interface,
//! validating default loading, persistence, scenarios and capture tuning.

use pagesnap::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use pagesnap::types::errors::SettingsError;
use pagesnap::types::scenario::{HttpConfig, HttpMethod};
use pagesnap::types::settings::AppSettings;
use pagesnap::types::stitch::StitchConfig;
use tempfile::TempDir;

/// Helper: create a SettingsEngine backed by a temp directory that lives for the
/// duration of the test (the caller holds the `TempDir` handle).
fn engine_in_temp(dir: &TempDir) -> SettingsEngine {
    let path = dir
        .path()
        .join("settings.json")
        .to_string_lossy()
        .to_string();
    SettingsEngine::new(Some(path))
}

fn endpoint(url: &str) -> HttpConfig {
    HttpConfig::new(HttpMethod::Post, url)
}

#[test]
fn test_load_defaults_when_no_config_file_exists() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let settings = engine.load().unwrap();
    assert_eq!(settings, AppSettings::default());
    assert_eq!(settings.capture.overlap_px, 150.0);
    assert!(settings.upload.active_config().is_none());
}

#[test]
fn test_set_value_persists_changes() {
    let dir = TempDir::new().unwrap();
    {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();
        engine
            .set_value("capture.slice_settle_ms", serde_json::json!(800))
            .unwrap();
    }

    let mut engine = engine_in_temp(&dir);
    let settings = engine.load().unwrap();
    assert_eq!(settings.capture.slice_settle_ms, 800);
}

#[test]
fn test_set_value_unknown_key_rejected() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    let result = engine.set_value("capture.warp_factor", serde_json::json!(9));
    assert!(matches!(result, Err(SettingsError::InvalidKey(_))));
    assert!(matches!(engine.set_value("", serde_json::json!(1)), Err(SettingsError::InvalidKey(_))));
}

#[test]
fn test_malformed_file_is_serialization_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();
    let mut engine = engine_in_temp(&dir);
    assert!(matches!(engine.load(), Err(SettingsError::SerializationError(_))));
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("settings.json"),
        r#"{"capture":{"overlap_px":90}}"#,
    )
    .unwrap();
    let mut engine = engine_in_temp(&dir);

    let settings = engine.load().unwrap();
    assert_eq!(settings.capture.overlap_px, 90.0);
    assert_eq!(settings.capture.min_advance_px, 100.0);
    assert!(settings.upload.scenarios.is_empty());
}

#[test]
fn test_reset_restores_defaults() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();
    engine.set_http_config(Some(endpoint("https://example.com/hook"))).unwrap();

    engine.reset().unwrap();
    assert_eq!(*engine.get_settings(), AppSettings::default());
}

#[test]
fn test_http_config_is_validated() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    let result = engine.set_http_config(Some(endpoint("ftp://example.com")));
    assert!(matches!(result, Err(SettingsError::InvalidValue(msg)) if msg.contains("ftp")));

    engine.set_http_config(Some(endpoint("https://example.com/hook"))).unwrap();
    assert_eq!(
        engine.get_settings().upload.active_config().unwrap().url,
        "https://example.com/hook"
    );
    engine.set_http_config(None).unwrap();
    assert!(engine.get_settings().upload.http_config.is_none());
}

#[test]
fn test_scenario_lifecycle() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();
    engine.set_http_config(Some(endpoint("https://default.example.com"))).unwrap();

    let staging = engine
        .save_scenario(None, "Staging", endpoint("https://staging.example.com"))
        .unwrap();
    let prod = engine
        .save_scenario(None, "Prod", endpoint("https://prod.example.com"))
        .unwrap();
    assert_ne!(staging.id, prod.id);

    engine.select_scenario(Some(&prod.id)).unwrap();
    let upload = &engine.get_settings().upload;
    assert_eq!(upload.current_scenario().unwrap().name, "Prod");
    assert_eq!(upload.active_config().unwrap().url, "https://prod.example.com");

    let renamed = engine
        .save_scenario(Some(&prod.id), "Production", endpoint("https://prod2.example.com"))
        .unwrap();
    assert_eq!(renamed.id, prod.id);
    assert_eq!(engine.get_settings().upload.scenarios.len(), 2);

    // Deleting the current scenario falls back to the plain config.
    engine.delete_scenario(&prod.id).unwrap();
    let upload = &engine.get_settings().upload;
    assert!(upload.current_scenario_id.is_none());
    assert_eq!(upload.active_config().unwrap().url, "https://default.example.com");
}

#[test]
fn test_scenarios_persist_across_engines() {
    let dir = TempDir::new().unwrap();
    let id = {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();
        let s = engine
            .save_scenario(None, "Hook", endpoint("https://hook.example.com"))
            .unwrap();
        engine.select_scenario(Some(&s.id)).unwrap();
        s.id
    };

    let mut engine = engine_in_temp(&dir);
    let settings = engine.load().unwrap();
    assert_eq!(settings.upload.current_scenario_id.as_deref(), Some(id.as_str()));
    assert_eq!(settings.upload.scenarios[0].name, "Hook");
}

#[test]
fn test_unknown_scenario_ids_rejected() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    assert!(matches!(engine.select_scenario(Some("nope")), Err(SettingsError::ScenarioNotFound(_))));
    assert!(matches!(engine.delete_scenario("nope"), Err(SettingsError::ScenarioNotFound(_))));
    assert!(matches!(
        engine.save_scenario(Some("nope"), "X", endpoint("https://x.example.com")),
        Err(SettingsError::ScenarioNotFound(_))
    ));
    assert!(matches!(
        engine.save_scenario(None, "   ", endpoint("https://x.example.com")),
        Err(SettingsError::InvalidValue(_))
    ));
}

#[test]
fn test_capture_config_validation() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    let bad = StitchConfig { min_advance_px: 0.0, ..StitchConfig::default() };
    assert!(matches!(engine.set_capture_config(bad), Err(SettingsError::InvalidValue(_))));

    let good = StitchConfig { overlap_px: 80.0, ..StitchConfig::default() };
    engine.set_capture_config(good.clone()).unwrap();
    assert_eq!(engine.get_settings().capture, good);
}
