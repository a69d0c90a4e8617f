use serde::{Deserialize, Serialize};

use super::scenario::{HttpConfig, Scenario};
use super::stitch::StitchConfig;

/// Top-level persisted settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppSettings {
    pub upload: UploadSettings,
    pub capture: StitchConfig,
}

/// Upload endpoint configuration and saved scenarios.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct UploadSettings {
    /// Request used when no scenario is selected.
    pub http_config: Option<HttpConfig>,
    pub scenarios: Vec<Scenario>,
    pub current_scenario_id: Option<String>,
}

impl UploadSettings {
    pub fn current_scenario(&self) -> Option<&Scenario> {
        let id = self.current_scenario_id.as_deref()?;
        self.scenarios.iter().find(|s| s.id == id)
    }

    /// The request to send: the selected scenario's, else the plain config.
    pub fn active_config(&self) -> Option<&HttpConfig> {
        self.current_scenario()
            .map(|s| &s.config)
            .or(self.http_config.as_ref())
    }
}
