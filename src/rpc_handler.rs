//! RPC method handler for the pagesnap JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested independently.
//! `handle_method` dispatches a method call to the capture pipeline, the
//! screenshot store, the settings or the uploader held by [`App`].

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::app::App;
use crate::managers::screenshot_manager::ScreenshotManagerTrait;
use crate::services::curl_parser;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::scenario::HttpConfig;
use crate::types::tab::{CropArea, TabId};

fn tab_param(params: &Value) -> Result<TabId, String> {
    params
        .get("tab")
        .and_then(|v| v.as_i64())
        .map(TabId)
        .ok_or_else(|| "missing tab".to_string())
}

fn str_param<'a>(params: &'a Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", key))
}

fn offset_param(params: &Value) -> Option<f64> {
    params.get("offset").and_then(|v| v.as_f64())
}

fn typed_param<T: DeserializeOwned>(params: &Value, key: &str) -> Result<T, String> {
    let value = params.get(key).cloned().ok_or_else(|| format!("missing {}", key))?;
    serde_json::from_value(value).map_err(|e| format!("invalid {}: {}", key, e))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(app: &App, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true, "version": env!("CARGO_PKG_VERSION")})),

        // ─── Single-shot capture ───
        "capture.visible" => {
            let tab = tab_param(params)?;
            let image = app.capture_visible(tab).await.map_err(|e| e.to_string())?;
            Ok(json!({"image": image}))
        }
        "capture.region" => {
            let tab = tab_param(params)?;
            let area: CropArea = typed_param(params, "area")?;
            let image = app.capture_region(tab, area).await.map_err(|e| e.to_string())?;
            Ok(json!({"image": image}))
        }
        "capture.full" => {
            let tab = tab_param(params)?;
            let outcome = app.capture_full(tab).await.map_err(|e| e.to_string())?;
            let stored = if params.get("store").and_then(|v| v.as_bool()).unwrap_or(false) {
                Some(app.add_screenshot(&outcome.image).map_err(|e| e.to_string())?.id)
            } else {
                None
            };
            Ok(json!({
                "image": outcome.image,
                "width": outcome.width,
                "height": outcome.height,
                "tiles": outcome.tiles,
                "id": stored,
            }))
        }

        // ─── Scroll capture ───
        "capture.scroll.start" => {
            let tab = tab_param(params)?;
            let phase = app.full_page.start(tab).await.map_err(|e| e.to_string())?;
            Ok(json!({"phase": phase}))
        }
        "capture.scroll.markStart" => {
            let tab = tab_param(params)?;
            let start = app
                .full_page
                .mark_start(tab, offset_param(params))
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({"start": start}))
        }
        "capture.scroll.finish" => {
            let tab = tab_param(params)?;
            let outcome = app
                .full_page
                .finish(tab, offset_param(params))
                .await
                .map_err(|e| e.to_string())?;
            let stored = if params.get("store").and_then(|v| v.as_bool()).unwrap_or(false) {
                Some(app.add_screenshot(&outcome.image).map_err(|e| e.to_string())?.id)
            } else {
                None
            };
            Ok(json!({
                "image": outcome.image,
                "width": outcome.width,
                "height": outcome.height,
                "slices": outcome.slices,
                "termination": outcome.termination,
                "id": stored,
            }))
        }
        "capture.scroll.cancel" => {
            let tab = tab_param(params)?;
            let phase = app.full_page.cancel(tab).await.map_err(|e| e.to_string())?;
            Ok(json!({"phase": phase}))
        }
        "capture.scroll.status" => {
            let tab = tab_param(params)?;
            to_json(&app.full_page.status(tab))
        }

        // ─── Pending screenshots ───
        "screenshot.add" => {
            let data = str_param(params, "data")?;
            if !data.starts_with("data:image/") {
                return Err("invalid data: expected an image data URL".to_string());
            }
            let shot = app.add_screenshot(data).map_err(|e| e.to_string())?;
            Ok(json!({"id": shot.id, "timestamp": shot.timestamp, "size": shot.size}))
        }
        "screenshot.list" => {
            let shots = app.with_screenshots(|m| m.list()).map_err(|e| e.to_string())?;
            to_json(&shots)
        }
        "screenshot.delete" => {
            let id = str_param(params, "id")?;
            app.with_screenshots(|m| m.delete(id))
                .map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "screenshot.clear" => {
            let cleared = app.with_screenshots(|m| m.clear()).map_err(|e| e.to_string())?;
            Ok(json!({"cleared": cleared}))
        }

        // ─── Upload ───
        "upload.image" => {
            let data = str_param(params, "data")?;
            let response = app.upload_image(data).await.map_err(|e| e.to_string())?;
            to_json(&response)
        }
        "upload.all" => {
            let summary = app.upload_all().await.map_err(|e| e.to_string())?;
            to_json(&summary)
        }

        // ─── Settings ───
        "config.get" => to_json(&app.settings()),
        "config.set" => {
            let key = str_param(params, "key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            app.update_settings(|s| s.set_value(key, value))
                .map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "config.setHttp" => {
            let config: Option<HttpConfig> = typed_param(params, "config")?;
            app.update_settings(|s| s.set_http_config(config))
                .map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "scenario.list" => {
            let upload = app.settings().upload;
            Ok(json!({
                "scenarios": upload.scenarios,
                "current": upload.current_scenario_id,
            }))
        }
        "scenario.save" => {
            let name = str_param(params, "name")?;
            let id = params.get("id").and_then(|v| v.as_str());
            let config: HttpConfig = typed_param(params, "config")?;
            let scenario = app
                .update_settings(|s| s.save_scenario(id, name, config))
                .map_err(|e| e.to_string())?;
            to_json(&scenario)
        }
        "scenario.delete" => {
            let id = str_param(params, "id")?;
            app.update_settings(|s| s.delete_scenario(id))
                .map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "scenario.select" => {
            let id = params.get("id").and_then(|v| v.as_str());
            app.update_settings(|s| s.select_scenario(id))
                .map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── cURL import ───
        "curl.parse" => {
            let command = str_param(params, "command")?;
            let config = curl_parser::parse(command).map_err(|e| e.to_string())?;
            to_json(&config)
        }
        "curl.render" => {
            let config: HttpConfig = typed_param(params, "config")?;
            curl_parser::validate_config(&config)?;
            Ok(json!({"command": curl_parser::render(&config)}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
