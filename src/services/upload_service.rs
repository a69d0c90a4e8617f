// pagesnap Upload Service
// Sends screenshots to the configured HTTP endpoint. Request headers and body
// are templates; placeholder tokens are replaced per upload.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::services::image_codec;
use crate::types::errors::UploadError;
use crate::types::scenario::{BodyTemplate, HttpConfig, HttpMethod};

/// Values substituted into request templates.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholders {
    /// `{{image}}`: the data URL.
    pub image: String,
    /// `{{imageBase64}}`: the payload without the data URL header.
    pub image_base64: String,
    /// `{{imageName}}`
    pub image_name: String,
    /// `{{timestamp}}`: milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// `{{scenario}}`: name of the selected scenario, empty when none.
    pub scenario: String,
}

impl Placeholders {
    pub fn single(data_url: &str, timestamp: i64, scenario: &str) -> Self {
        Self {
            image: data_url.to_string(),
            image_base64: image_codec::strip_data_url(data_url).to_string(),
            image_name: format!("screenshot-{}.png", timestamp),
            timestamp,
            scenario: scenario.to_string(),
        }
    }

    /// Replaces every placeholder token in `template`.
    pub fn apply(&self, template: &str) -> String {
        template
            .replace("{{image}}", &self.image)
            .replace("{{imageBase64}}", &self.image_base64)
            .replace("{{imageName}}", &self.image_name)
            .replace("{{timestamp}}", &self.timestamp.to_string())
            .replace("{{scenario}}", &self.scenario)
    }

    /// Applies [`Placeholders::apply`] to every string inside `value`.
    pub fn apply_json(&self, value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.apply(&s)),
            Value::Array(items) => Value::Array(items.into_iter().map(|v| self.apply_json(v)).collect()),
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, self.apply_json(v)))
                    .collect(),
            ),
            other => other,
        }
    }
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// A rendered request body.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBody {
    pub content_type: String,
    pub content: String,
}

/// Renders the body of `config`. `None` for GET requests and empty templates.
///
/// A JSON template that does not parse is sent as `{}`.
pub fn render_body(config: &HttpConfig, placeholders: &Placeholders) -> Option<RenderedBody> {
    if config.method == HttpMethod::Get {
        return None;
    }
    match &config.body {
        BodyTemplate::None => None,
        BodyTemplate::Json { template } => {
            let parsed = serde_json::from_str::<Value>(template).unwrap_or_else(|e| {
                warn!(error = %e, "body template is not valid JSON, sending {{}}");
                Value::Object(Default::default())
            });
            Some(RenderedBody {
                content_type: "application/json".to_string(),
                content: placeholders.apply_json(parsed).to_string(),
            })
        }
        BodyTemplate::FormUrlEncoded { fields } => {
            let content = fields
                .iter()
                .filter(|f| !f.key.is_empty())
                .map(|f| {
                    format!(
                        "{}={}",
                        urlencoding::encode(&f.key),
                        urlencoding::encode(&placeholders.apply(&f.value))
                    )
                })
                .collect::<Vec<_>>()
                .join("&");
            Some(RenderedBody {
                content_type: "application/x-www-form-urlencoded".to_string(),
                content,
            })
        }
        BodyTemplate::Raw {
            content_type,
            template,
        } => Some(RenderedBody {
            content_type: content_type.clone(),
            content: placeholders.apply(template),
        }),
    }
}

/// What the endpoint answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResponse {
    pub status: u16,
    pub status_text: String,
    /// Parsed JSON when the body is JSON, else the text.
    pub data: Value,
}

/// Outcome of uploading every pending screenshot, one request each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct UploadService {
    client: Client,
}

impl UploadService {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Sends one request built from `config` with `placeholders` substituted.
    pub async fn upload(
        &self,
        config: &HttpConfig,
        placeholders: &Placeholders,
    ) -> Result<UploadResponse, UploadError> {
        let url = url::Url::parse(config.url.trim())
            .map_err(|e| UploadError::InvalidConfig(format!("Invalid URL: {}", e)))?;
        let method = reqwest::Method::from_bytes(config.method.as_str().as_bytes())
            .map_err(|e| UploadError::InvalidConfig(e.to_string()))?;

        let body = render_body(config, placeholders);
        let mut request = self
            .client
            .request(method, url)
            .timeout(Duration::from_secs(config.timeout_secs));

        for header in config.headers.iter().filter(|h| !h.key.is_empty()) {
            if body.is_some() && header.key.eq_ignore_ascii_case("content-type") {
                continue;
            }
            request = request.header(header.key.as_str(), placeholders.apply(&header.value));
        }
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, body.content_type)
                .body(body.content);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                UploadError::Timeout(config.timeout_secs)
            } else if e.is_builder() {
                UploadError::InvalidConfig(e.to_string())
            } else {
                UploadError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        if !status.is_success() {
            return Err(UploadError::HttpStatus {
                status: status.as_u16(),
                reason: status_text,
            });
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                UploadError::Timeout(config.timeout_secs)
            } else {
                UploadError::NetworkError(format!("Failed to read body: {}", e))
            }
        })?;
        let data = serde_json::from_str(&text).unwrap_or(Value::String(text));

        info!(status = status.as_u16(), url = %config.url, "upload finished");
        Ok(UploadResponse {
            status: status.as_u16(),
            status_text,
            data,
        })
    }
}

impl Default for UploadService {
    fn default() -> Self {
        Self::new()
    }
}
