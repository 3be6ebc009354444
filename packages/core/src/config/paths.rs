//! XDG-compliant path resolution for termrun
//!
//! - Linux/macOS: ~/.config/termrun/
//! - Windows: %APPDATA%\termrun\

use std::path::PathBuf;

/// Get the configuration directory path
///
/// Returns the directory where config.json should be stored:
/// - Linux: `~/.config/termrun/`
/// - macOS: `~/.config/termrun/` (XDG-style, not ~/Library)
/// - Windows: `%APPDATA%\termrun\`
pub fn get_config_dir() -> Option<PathBuf> {
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    {
        directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".config").join("termrun"))
    }
    #[cfg(target_os = "windows")]
    {
        directories::BaseDirs::new()
            .and_then(|dirs| dirs.config_dir().map(|d| d.to_path_buf()))
            .map(|d| d.join("termrun"))
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        None
    }
}

/// Get the full path to the config file
///
/// Returns: `{config_dir}/config.json`
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join("config.json"))
}
