// pagesnap state managers
// Managers handle stateful operations: capture sessions and pending screenshots.

pub mod capture_session_manager;
pub mod screenshot_manager;
