//! Unit tests for the paced viewport capture primitive and single-shot captures.
//!
//! Timing-dependent tests run on a paused tokio clock.

use std::sync::Arc;
use std::time::Duration;

use pagesnap::host::simulated::{content_row, SimulatedHost, SimulatedPage};
use pagesnap::services::image_codec;
use pagesnap::services::viewport_capture::{ViewportCapture, DEFAULT_MIN_CAPTURE_INTERVAL};
use pagesnap::types::errors::{CaptureError, CodecError, HostError};
use pagesnap::types::tab::{CropArea, TabId};
use tokio::time::Instant;

const TAB: TabId = TabId(1);

fn host_with_page(page: SimulatedPage) -> Arc<SimulatedHost> {
    let host = Arc::new(SimulatedHost::new());
    host.insert_page(TAB, page);
    host
}

#[tokio::test(start_paused = true)]
async fn test_back_to_back_captures_are_spaced() {
    let host = host_with_page(SimulatedPage::new(40.0, 30.0, 300.0, 1.0));
    let capture = ViewportCapture::new(host.clone());

    let started = Instant::now();
    capture.capture(TAB).await.unwrap();
    capture.capture(TAB).await.unwrap();
    capture.capture(TAB).await.unwrap();

    assert_eq!(host.capture_count(), 3);
    assert!(started.elapsed() >= DEFAULT_MIN_CAPTURE_INTERVAL * 2);
}

#[tokio::test(start_paused = true)]
async fn test_unpaced_captures_hit_the_host_rate_limit() {
    let host = host_with_page(SimulatedPage::new(40.0, 30.0, 300.0, 1.0));
    let capture = ViewportCapture::with_min_interval(host.clone(), Duration::ZERO);

    capture.capture(TAB).await.unwrap();
    let second = capture.capture(TAB).await;
    assert!(matches!(second, Err(HostError::RateLimited(_))));
}

#[tokio::test(start_paused = true)]
async fn test_capture_after_interval_does_not_wait() {
    let host = host_with_page(SimulatedPage::new(40.0, 30.0, 300.0, 1.0));
    let capture = ViewportCapture::new(host);

    capture.capture(TAB).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let before = Instant::now();
    capture.capture(TAB).await.unwrap();
    assert_eq!(before.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn test_system_pages_are_not_capturable() {
    let host = host_with_page(SimulatedPage::new(40.0, 30.0, 300.0, 1.0).with_url("chrome://settings"));
    let capture = ViewportCapture::new(host);

    let result = capture.capture(TAB).await;
    assert_eq!(result, Err(HostError::TabNotCapturable("chrome://settings".to_string())));
}

#[tokio::test]
async fn test_missing_tab_is_reported() {
    let host = Arc::new(SimulatedHost::new());
    let capture = ViewportCapture::new(host);
    assert_eq!(capture.capture(TabId(7)).await, Err(HostError::TabNotFound(TabId(7))));
}

#[tokio::test]
async fn test_capture_bitmap_is_in_device_pixels() {
    let host = host_with_page(SimulatedPage::new(40.0, 30.0, 300.0, 2.0));
    let capture = ViewportCapture::new(host);

    let bitmap = capture.capture_bitmap(TAB).await.unwrap();
    assert_eq!(bitmap.dimensions(), (80, 60));
}

#[tokio::test]
async fn test_capture_region_scales_css_area() {
    let host = host_with_page(SimulatedPage::new(200.0, 100.0, 1000.0, 2.0));
    host.with_page(TAB, |p| p.scroll_content_to(300.0));
    let capture = ViewportCapture::new(host);

    let area = CropArea { x: 10.0, y: 20.0, width: 30.0, height: 40.0 };
    let encoded = capture.capture_region(TAB, area).await.unwrap();
    let region = image_codec::decode(&encoded).unwrap();

    assert_eq!(region.dimensions(), (60, 80));
    assert_eq!(content_row(region.get_pixel(0, 0)), Some(320));
    assert_eq!(content_row(region.get_pixel(0, 79)), Some(359));
}

#[tokio::test]
async fn test_capture_region_outside_viewport_fails() {
    let host = host_with_page(SimulatedPage::new(200.0, 100.0, 1000.0, 1.0));
    let capture = ViewportCapture::new(host);

    let area = CropArea { x: 500.0, y: 0.0, width: 10.0, height: 10.0 };
    let result = capture.capture_region(TAB, area).await;
    assert_eq!(result, Err(CaptureError::Codec(CodecError::EmptyRegion)));
}
