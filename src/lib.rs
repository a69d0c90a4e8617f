//! pagesnap: viewport, region, scroll-stitched and whole-document page
//! screenshots forwarded to configurable HTTP endpoints.
//!
//! This library crate exposes all modules for use by the binaries and integration tests.

pub mod app;
pub mod database;
pub mod host;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
