// pagesnap Settings Engine
// Manages upload endpoints, saved scenarios and capture tuning.
// Settings are stored as a JSON file at the platform-specific config path;
// every mutation is written through to disk.

use std::fs;
use std::path::Path;

use tracing::info;
use uuid::Uuid;

use crate::platform;
use crate::services::curl_parser;
use crate::types::errors::SettingsError;
use crate::types::scenario::{HttpConfig, Scenario};
use crate::types::settings::AppSettings;
use crate::types::stitch::StitchConfig;

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<AppSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &AppSettings;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;

    fn set_http_config(&mut self, config: Option<HttpConfig>) -> Result<(), SettingsError>;
    fn save_scenario(
        &mut self,
        id: Option<&str>,
        name: &str,
        config: HttpConfig,
    ) -> Result<Scenario, SettingsError>;
    fn delete_scenario(&mut self, id: &str) -> Result<(), SettingsError>;
    fn select_scenario(&mut self, id: Option<&str>) -> Result<(), SettingsError>;
    fn set_capture_config(&mut self, config: StitchConfig) -> Result<(), SettingsError>;
}

/// Settings engine implementation that persists settings as JSON on disk.
pub struct SettingsEngine {
    config_path: String,
    settings: AppSettings,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses the platform-specific config directory with `settings.json`.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => platform::get_config_dir()
                .join("settings.json")
                .to_string_lossy()
                .to_string(),
        };

        Self {
            config_path,
            settings: AppSettings::default(),
        }
    }

    fn check_config(config: &HttpConfig) -> Result<(), SettingsError> {
        curl_parser::validate_config(config).map_err(SettingsError::InvalidValue)
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the JSON config file.
    ///
    /// If the file does not exist, returns default settings.
    /// If the file exists but is malformed, returns a serialization error.
    fn load(&mut self) -> Result<AppSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            self.settings = AppSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        let settings: AppSettings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;

        self.settings = settings;
        Ok(self.settings.clone())
    }

    /// Saves the current settings to the JSON config file.
    ///
    /// Creates parent directories if they don't exist.
    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Updates an individual setting by dot-notation key path.
    ///
    /// Converts the current settings to a `serde_json::Value`, replaces the
    /// value at the key path, then deserializes back into `AppSettings`.
    /// Saves to disk after a successful update.
    ///
    /// # Examples
    /// - `"capture.overlap_px"` → updates `settings.capture.overlap_px`
    /// - `"upload.current_scenario_id"` → updates the selected scenario
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }
        let parts: Vec<&str> = key.split('.').collect();

        let mut json_value = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        {
            let mut current = &mut json_value;
            for (i, part) in parts.iter().enumerate() {
                if i == parts.len() - 1 {
                    match current {
                        serde_json::Value::Object(map) => {
                            if !map.contains_key(*part) {
                                return Err(SettingsError::InvalidKey(format!(
                                    "Key '{}' not found in settings",
                                    key
                                )));
                            }
                            map.insert(part.to_string(), value.clone());
                        }
                        _ => {
                            return Err(SettingsError::InvalidKey(format!(
                                "Cannot navigate to key '{}': intermediate value is not an object",
                                key
                            )));
                        }
                    }
                } else {
                    current = match current.get_mut(*part) {
                        Some(v) => v,
                        None => {
                            return Err(SettingsError::InvalidKey(format!(
                                "Key '{}' not found in settings",
                                key
                            )));
                        }
                    };
                }
            }
        }

        let new_settings: AppSettings = serde_json::from_value(json_value).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;

        self.settings = new_settings;
        self.save()
    }

    /// Resets all settings to factory defaults and saves to disk.
    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = AppSettings::default();
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }

    /// Replaces the plain endpoint used when no scenario is selected.
    fn set_http_config(&mut self, config: Option<HttpConfig>) -> Result<(), SettingsError> {
        if let Some(config) = &config {
            Self::check_config(config)?;
        }
        self.settings.upload.http_config = config;
        self.save()
    }

    /// Creates a scenario, or updates the one with `id`.
    fn save_scenario(
        &mut self,
        id: Option<&str>,
        name: &str,
        config: HttpConfig,
    ) -> Result<Scenario, SettingsError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SettingsError::InvalidValue(
                "Scenario name cannot be empty".to_string(),
            ));
        }
        Self::check_config(&config)?;

        let scenarios = &mut self.settings.upload.scenarios;
        let scenario = match id {
            Some(id) => {
                let existing = scenarios
                    .iter_mut()
                    .find(|s| s.id == id)
                    .ok_or_else(|| SettingsError::ScenarioNotFound(id.to_string()))?;
                existing.name = name.to_string();
                existing.config = config;
                existing.clone()
            }
            None => {
                let scenario = Scenario {
                    id: Uuid::new_v4().to_string(),
                    name: name.to_string(),
                    config,
                };
                scenarios.push(scenario.clone());
                scenario
            }
        };

        info!(id = %scenario.id, name = %scenario.name, "scenario saved");
        self.save()?;
        Ok(scenario)
    }

    /// Deletes a scenario; deselects it if it was current.
    fn delete_scenario(&mut self, id: &str) -> Result<(), SettingsError> {
        let upload = &mut self.settings.upload;
        let before = upload.scenarios.len();
        upload.scenarios.retain(|s| s.id != id);
        if upload.scenarios.len() == before {
            return Err(SettingsError::ScenarioNotFound(id.to_string()));
        }
        if upload.current_scenario_id.as_deref() == Some(id) {
            upload.current_scenario_id = None;
        }
        self.save()
    }

    /// Selects the scenario used for uploads; `None` falls back to the plain config.
    fn select_scenario(&mut self, id: Option<&str>) -> Result<(), SettingsError> {
        let upload = &mut self.settings.upload;
        if let Some(id) = id {
            if !upload.scenarios.iter().any(|s| s.id == id) {
                return Err(SettingsError::ScenarioNotFound(id.to_string()));
            }
        }
        upload.current_scenario_id = id.map(str::to_string);
        self.save()
    }

    fn set_capture_config(&mut self, config: StitchConfig) -> Result<(), SettingsError> {
        if !(config.overlap_px >= 0.0 && config.min_advance_px > 0.0) {
            return Err(SettingsError::InvalidValue(
                "overlap must be non-negative and minimum advance positive".to_string(),
            ));
        }
        self.settings.capture = config;
        self.save()
    }
}
