//! pagesnap console demo.
//!
//! Runs the capture pipeline end to end against the simulated host: scroll
//! detection, a window-scrolled capture, an app-shell capture behind a fixed
//! header, the pending screenshot store and cURL import. Set `RUST_LOG=debug`
//! to see every slice.

use std::error::Error;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use pagesnap::app::App;
use pagesnap::database::connection::Database;
use pagesnap::host::simulated::{content_row, SimulatedHost, SimulatedPage};
use pagesnap::host::{run_in_page, TabHost};
use pagesnap::managers::screenshot_manager::ScreenshotManagerTrait;
use pagesnap::services::image_codec;
use pagesnap::services::scroll_controller::{describe_target, detect_scroll_target};
use pagesnap::services::settings_engine::SettingsEngine;
use pagesnap::services::{curl_parser, stitching_engine};
use pagesnap::types::stitch::{StitchConfig, StitchRequest};
use pagesnap::types::tab::TabId;

const WINDOW_TAB: TabId = TabId(1);
const SHELL_TAB: TabId = TabId(2);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!();
    println!("pagesnap v{} demo", env!("CARGO_PKG_VERSION"));
    println!();

    let host = Arc::new(SimulatedHost::new());
    host.insert_page(WINDOW_TAB, SimulatedPage::new(1024.0, 800.0, 3000.0, 1.0));
    host.insert_page(
        SHELL_TAB,
        SimulatedPage::with_scroll_container(1024.0, 700.0, 2400.0, 2.0).with_fixed_header(60.0),
    );

    let settings_path = std::env::temp_dir().join("pagesnap-demo-settings.json");
    let app = App::new(
        host.clone(),
        Database::open_in_memory()?,
        SettingsEngine::new(Some(settings_path.to_string_lossy().to_string())),
    );

    demo_detection(host.as_ref()).await?;
    demo_plan();
    demo_window_capture(&app, host.as_ref()).await?;
    demo_shell_capture(&app, host.as_ref()).await?;
    demo_document_capture(&app, host.as_ref()).await?;
    demo_store(&app)?;
    demo_curl()?;

    let _ = std::fs::remove_file(&settings_path);
    println!("All components demonstrated.");
    Ok(())
}

fn section(name: &str) {
    println!("---------------------------------------------------------------");
    println!("  {}", name);
    println!("---------------------------------------------------------------");
}

async fn demo_detection(host: &dyn TabHost) -> Result<(), Box<dyn Error>> {
    section("Scroll target detection");
    for tab in [WINDOW_TAB, SHELL_TAB] {
        let label: String = run_in_page(host, tab, |page| {
            let target = detect_scroll_target(page);
            describe_target(page, target)
        })
        .await?;
        println!("  tab {}: scrolls {}", tab, label);
    }
    println!();
    Ok(())
}

fn demo_plan() {
    section("Stitch plan");
    let request = StitchRequest {
        start_offset: 0.0,
        end_offset: 2200.0,
        viewport_height: 800.0,
        device_pixel_ratio: 1.0,
        document_width: 1024.0,
    };
    match stitching_engine::plan(&request, &StitchConfig::default()) {
        Ok(plan) => println!(
            "  0..2200 in an 800px viewport: {}px tall, {} slices max, canvas {}x{}",
            plan.capture_height, plan.estimated_slice_count, plan.canvas_width, plan.canvas_height
        ),
        Err(e) => println!("  plan failed: {}", e),
    }
    println!();
}

async fn demo_window_capture(app: &App, host: &SimulatedHost) -> Result<(), Box<dyn Error>> {
    section("Full-page capture (window scroll)");
    let phase = app.full_page.start(WINDOW_TAB).await?;
    println!("  start -> {}", phase);

    let start = app.full_page.mark_start(WINDOW_TAB, None).await?;
    println!("  start marked at {}px", start);

    host.with_page(WINDOW_TAB, |page| page.scroll_content_to(2200.0));
    let outcome = app.full_page.finish(WINDOW_TAB, None).await?;
    println!(
        "  {}x{} from {} slices, ended {:?}",
        outcome.width, outcome.height, outcome.slices, outcome.termination
    );

    let bitmap = image_codec::decode(&outcome.image)?;
    let last = bitmap.height() - 1;
    println!(
        "  first row shows document row {:?}, last row {:?}",
        content_row(bitmap.get_pixel(0, 0)),
        content_row(bitmap.get_pixel(0, last))
    );
    let id = app.add_screenshot(&outcome.image)?.id;
    println!("  stored as {}", id);
    println!();
    Ok(())
}

async fn demo_document_capture(app: &App, host: &SimulatedHost) -> Result<(), Box<dyn Error>> {
    section("Whole-document capture (tile grid)");
    host.with_page(WINDOW_TAB, |page| page.scroll_content_to(640.0));
    let outcome = app.capture_full(WINDOW_TAB).await?;
    let bitmap = image_codec::decode(&outcome.image)?;
    println!(
        "  {}x{} from {} tiles, last row shows document row {:?}",
        outcome.width,
        outcome.height,
        outcome.tiles,
        content_row(bitmap.get_pixel(0, bitmap.height() - 1))
    );
    println!(
        "  scroll offset back at {:?}px",
        host.with_page(WINDOW_TAB, |page| page.content_offset())
    );
    println!();
    Ok(())
}

async fn demo_shell_capture(app: &App, host: &SimulatedHost) -> Result<(), Box<dyn Error>> {
    section("Full-page capture (inner scroller, fixed header, dpr 2)");
    app.full_page.start(SHELL_TAB).await?;
    host.with_page(SHELL_TAB, |page| page.scroll_content_to(200.0));
    app.full_page.mark_start(SHELL_TAB, None).await?;

    // Too short a range is reported and the session keeps recording.
    if let Err(e) = app.full_page.finish(SHELL_TAB, Some(205.0)).await {
        println!("  finish at 205px rejected: {}", e);
    }

    let outcome = app.full_page.finish(SHELL_TAB, Some(1500.0)).await?;
    println!(
        "  {}x{} from {} slices, ended {:?}",
        outcome.width, outcome.height, outcome.slices, outcome.termination
    );
    let restored = host.with_page(SHELL_TAB, |page| page.content_offset());
    println!("  scroll restored to {:?}", restored);
    app.add_screenshot(&outcome.image)?;
    println!();
    Ok(())
}

fn demo_store(app: &App) -> Result<(), Box<dyn Error>> {
    section("Pending screenshots");
    let shots = app.with_screenshots(|m| m.list())?;
    for shot in &shots {
        println!("  {} ({} bytes)", shot.id, shot.size);
    }
    let cleared = app.with_screenshots(|m| m.clear())?;
    println!("  cleared {}", cleared);
    println!();
    Ok(())
}

fn demo_curl() -> Result<(), Box<dyn Error>> {
    section("cURL import");
    let command = r#"curl -X POST https://api.example.com/upload \
  -H 'Authorization: Bearer token123' \
  -H 'Content-Type: application/json' \
  -d '{"image":"{{image}}","name":"{{imageName}}"}'"#;
    let config = curl_parser::parse(command)?;
    println!("  {} {} with {} header(s)", config.method, config.url, config.headers.len());
    println!("  rendered back:");
    for line in curl_parser::render(&config).lines() {
        println!("    {}", line);
    }
    println!();
    Ok(())
}
