// pagesnap shared type definitions
// Each submodule defines types used across the application.

pub mod errors;
pub mod page;
pub mod scenario;
pub mod screenshot;
pub mod session;
pub mod settings;
pub mod stitch;
pub mod tab;
