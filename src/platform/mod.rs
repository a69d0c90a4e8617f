// pagesnap platform paths
// Config holds settings.json, data holds the screenshot database.
//
// Uses `cfg(target_os)` to pick the platform convention at compile time.

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "pagesnap";
const APP_DIR_TITLE: &str = "PageSnap";

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Returns the platform-specific configuration directory.
///
/// - **Linux**: `$XDG_CONFIG_HOME/pagesnap` or `~/.config/pagesnap`
/// - **macOS**: `~/Library/Application Support/PageSnap`
/// - **Windows**: `%APPDATA%/PageSnap`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA")
            .unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming"));
        PathBuf::from(appdata).join(APP_DIR_TITLE)
    }
    #[cfg(target_os = "macos")]
    {
        home_dir()
            .join("Library")
            .join("Application Support")
            .join(APP_DIR_TITLE)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        match env::var("XDG_CONFIG_HOME") {
            Ok(xdg) => PathBuf::from(xdg).join(APP_DIR),
            Err(_) => home_dir().join(".config").join(APP_DIR),
        }
    }
}

/// Returns the platform-specific data directory.
///
/// - **Linux**: `$XDG_DATA_HOME/pagesnap` or `~/.local/share/pagesnap`
/// - **macOS**: `~/Library/Application Support/PageSnap`
/// - **Windows**: `%APPDATA%/PageSnap`
pub fn get_data_dir() -> PathBuf {
    #[cfg(any(target_os = "windows", target_os = "macos"))]
    {
        get_config_dir()
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        match env::var("XDG_DATA_HOME") {
            Ok(xdg) => PathBuf::from(xdg).join(APP_DIR),
            Err(_) => home_dir().join(".local").join("share").join(APP_DIR),
        }
    }
}
