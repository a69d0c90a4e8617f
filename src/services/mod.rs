// pagesnap services
// Services provide core functionality: capture, scrolling, stitching, whole-document tiling, the marker overlay, settings, uploads and cURL import.

pub mod curl_parser;
pub mod document_capture;
pub mod full_page_capture;
pub mod image_codec;
pub mod marker_overlay;
pub mod scroll_controller;
pub mod settings_engine;
pub mod stitching_engine;
pub mod upload_service;
pub mod viewport_capture;
