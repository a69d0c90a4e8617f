use serde::{Deserialize, Serialize};

/// A captured screenshot waiting to be uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredScreenshot {
    pub id: String,
    /// PNG data URL.
    pub data: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Approximate decoded size in bytes.
    pub size: i64,
}

impl StoredScreenshot {
    /// Approximate byte size of the payload behind a base64 string.
    pub fn estimated_size(data: &str) -> i64 {
        ((data.len() as f64) * 3.0 / 4.0).round() as i64
    }
}
