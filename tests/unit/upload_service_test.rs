//! Unit tests for request rendering and uploads against a mock HTTP server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pagesnap::app::{App, UPLOAD_PACING};
use pagesnap::database::Database;
use pagesnap::host::simulated::SimulatedHost;
use pagesnap::managers::screenshot_manager::ScreenshotManagerTrait;
use pagesnap::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use pagesnap::services::upload_service::{render_body, Placeholders, UploadService, UploadSummary};
use pagesnap::types::errors::UploadError;
use pagesnap::types::scenario::{BodyTemplate, HttpConfig, HttpMethod, KeyValue};

const IMAGE: &str = "data:image/png;base64,iVBORw0KGgo=";
const TS: i64 = 1_700_000_000_000;

fn placeholders() -> Placeholders {
    Placeholders::single(IMAGE, TS, "Staging")
}

fn config(method: HttpMethod, url: String, body: BodyTemplate) -> HttpConfig {
    HttpConfig {
        method,
        url,
        headers: Vec::new(),
        body,
        timeout_secs: 30,
    }
}

// ─── Rendering ───

#[test]
fn test_single_placeholders() {
    let p = placeholders();
    assert_eq!(p.image, IMAGE);
    assert_eq!(p.image_base64, "iVBORw0KGgo=");
    assert_eq!(p.image_name, "screenshot-1700000000000.png");
    assert_eq!(
        p.apply("{{scenario}}/{{imageName}}@{{timestamp}}"),
        "Staging/screenshot-1700000000000.png@1700000000000"
    );
}

#[test]
fn test_json_body_substitutes_nested_strings() {
    let template = r#"{"file":{"name":"{{imageName}}","data":["{{imageBase64}}"]},"n":1,"ok":true}"#;
    let cfg = config(
        HttpMethod::Post,
        "https://example.com".to_string(),
        BodyTemplate::Json { template: template.to_string() },
    );
    let body = render_body(&cfg, &placeholders()).unwrap();

    assert_eq!(body.content_type, "application/json");
    let value: Value = serde_json::from_str(&body.content).unwrap();
    assert_eq!(
        value,
        json!({"file":{"name":"screenshot-1700000000000.png","data":["iVBORw0KGgo="]},"n":1,"ok":true})
    );
}

#[test]
fn test_invalid_json_template_sends_empty_object() {
    let cfg = config(
        HttpMethod::Put,
        "https://example.com".to_string(),
        BodyTemplate::Json { template: "{broken".to_string() },
    );
    assert_eq!(render_body(&cfg, &placeholders()).unwrap().content, "{}");
}

#[test]
fn test_form_body_is_urlencoded() {
    let cfg = config(
        HttpMethod::Post,
        "https://example.com".to_string(),
        BodyTemplate::FormUrlEncoded {
            fields: vec![
                KeyValue::new("image", "{{imageBase64}}"),
                KeyValue::new("", "dropped"),
                KeyValue::new("label", "a b"),
            ],
        },
    );
    let body = render_body(&cfg, &placeholders()).unwrap();
    assert_eq!(body.content_type, "application/x-www-form-urlencoded");
    assert_eq!(body.content, "image=iVBORw0KGgo%3D&label=a%20b");
}

#[test]
fn test_get_and_empty_bodies_render_nothing() {
    let get = config(HttpMethod::Get, "https://example.com".to_string(), BodyTemplate::default());
    assert!(render_body(&get, &placeholders()).is_none());

    let none = config(HttpMethod::Post, "https://example.com".to_string(), BodyTemplate::None);
    assert!(render_body(&none, &placeholders()).is_none());
}

#[test]
fn test_raw_body_keeps_content_type() {
    let cfg = config(
        HttpMethod::Post,
        "https://example.com".to_string(),
        BodyTemplate::Raw {
            content_type: "text/plain".to_string(),
            template: "shot {{timestamp}}".to_string(),
        },
    );
    let body = render_body(&cfg, &placeholders()).unwrap();
    assert_eq!(body.content_type, "text/plain");
    assert_eq!(body.content, "shot 1700000000000");
}

// ─── Sending ───

#[tokio::test]
async fn test_upload_posts_rendered_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("content-type", "application/json"))
        .and(header("x-image-name", "screenshot-1700000000000.png"))
        .and(body_json(json!({"image": IMAGE, "scenario": "Staging"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut cfg = config(
        HttpMethod::Post,
        format!("{}/upload", server.uri()),
        BodyTemplate::Json {
            template: r#"{"image":"{{image}}","scenario":"{{scenario}}"}"#.to_string(),
        },
    );
    cfg.headers = vec![
        KeyValue::new("X-Image-Name", "{{imageName}}"),
        // Overridden by the body's own content type.
        KeyValue::new("Content-Type", "text/plain"),
    ];

    let response = UploadService::new().upload(&cfg, &placeholders()).await.unwrap();
    assert_eq!(response.status, 201);
    assert_eq!(response.status_text, "Created");
    assert_eq!(response.data, json!({"id": "abc"}));
}

#[tokio::test]
async fn test_get_sends_no_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .mount(&server)
        .await;

    let cfg = config(HttpMethod::Get, format!("{}/ping", server.uri()), BodyTemplate::default());
    let response = UploadService::new().upload(&cfg, &placeholders()).await.unwrap();
    assert_eq!(response.data, Value::String("pong".to_string()));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_non_success_status_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cfg = config(HttpMethod::Post, server.uri(), BodyTemplate::default());
    let err = UploadService::new().upload(&cfg, &placeholders()).await.unwrap_err();
    assert!(matches!(
        err,
        UploadError::HttpStatus { status: 500, ref reason } if reason == "Internal Server Error"
    ));
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let mut cfg = config(HttpMethod::Post, server.uri(), BodyTemplate::default());
    cfg.timeout_secs = 1;
    let err = UploadService::new().upload(&cfg, &placeholders()).await.unwrap_err();
    assert!(matches!(err, UploadError::Timeout(1)));
}

#[tokio::test]
async fn test_unparseable_url_is_invalid_config() {
    let cfg = config(HttpMethod::Post, "not a url".to_string(), BodyTemplate::default());
    let err = UploadService::new().upload(&cfg, &placeholders()).await.unwrap_err();
    assert!(matches!(err, UploadError::InvalidConfig(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    let cfg = config(HttpMethod::Post, "http://127.0.0.1:1/".to_string(), BodyTemplate::default());
    let err = UploadService::new().upload(&cfg, &placeholders()).await.unwrap_err();
    assert!(matches!(err, UploadError::NetworkError(_)));
}

// ─── App-level uploads ───

fn app_in(dir: &TempDir) -> App {
    let settings = dir.path().join("settings.json").to_string_lossy().to_string();
    App::new(
        Arc::new(SimulatedHost::new()),
        Database::open_in_memory().unwrap(),
        SettingsEngine::new(Some(settings)),
    )
}

#[tokio::test]
async fn test_upload_without_endpoint_is_not_configured() {
    let dir = TempDir::new().unwrap();
    let app = app_in(&dir);
    assert!(matches!(app.upload_image(IMAGE).await, Err(UploadError::NotConfigured)));
}

fn select_json_scenario(app: &App, url: String) {
    let cfg = config(
        HttpMethod::Post,
        url,
        BodyTemplate::Json {
            template: r#"{"image":"{{imageBase64}}","scenario":"{{scenario}}"}"#.to_string(),
        },
    );
    app.update_settings(|s| {
        let scenario = s.save_scenario(None, "Bulk", cfg)?;
        s.select_scenario(Some(&scenario.id))
    })
    .unwrap();
}

#[tokio::test]
async fn test_upload_all_sends_one_request_per_screenshot() {
    let server = MockServer::start().await;
    for payload in ["AAAA", "BBBB", "CCCC"] {
        Mock::given(method("POST"))
            .and(body_json(json!({"image": payload, "scenario": "Bulk"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let app = app_in(&dir);
    select_json_scenario(&app, server.uri());
    for payload in ["AAAA", "BBBB", "CCCC"] {
        app.add_screenshot(&format!("data:image/png;base64,{}", payload)).unwrap();
        std::thread::sleep(Duration::from_millis(2));
    }

    let started = Instant::now();
    let summary = app.upload_all().await.unwrap();
    assert_eq!(summary, UploadSummary { succeeded: 3, failed: 0 });
    // Two pauses between three requests, none after the last.
    assert!(started.elapsed() >= UPLOAD_PACING * 2);
    assert_eq!(app.with_screenshots(|m| m.count()).unwrap(), 0);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_partial_failure_keeps_screenshots() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("AAAA"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("BBBB"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let app = app_in(&dir);
    select_json_scenario(&app, server.uri());
    app.add_screenshot("data:image/png;base64,AAAA").unwrap();
    std::thread::sleep(Duration::from_millis(2));
    app.add_screenshot("data:image/png;base64,BBBB").unwrap();

    let summary = app.upload_all().await.unwrap();
    assert_eq!(summary, UploadSummary { succeeded: 1, failed: 1 });
    assert_eq!(app.with_screenshots(|m| m.count()).unwrap(), 2);
}

#[tokio::test]
async fn test_all_failed_keeps_screenshots() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let app = app_in(&dir);
    app.update_settings(|s| {
        s.set_http_config(Some(config(HttpMethod::Post, server.uri(), BodyTemplate::default())))
    })
    .unwrap();
    app.add_screenshot(IMAGE).unwrap();

    let summary = app.upload_all().await.unwrap();
    assert_eq!(summary, UploadSummary { succeeded: 0, failed: 1 });
    assert_eq!(app.with_screenshots(|m| m.count()).unwrap(), 1);
}

#[tokio::test]
async fn test_upload_all_with_empty_list() {
    let dir = TempDir::new().unwrap();
    let app = app_in(&dir);
    assert!(matches!(app.upload_all().await, Err(UploadError::NothingToUpload)));
}
