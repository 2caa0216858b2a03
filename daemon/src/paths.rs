/// Canonical file locations.
///
/// The config file is searched for in the home directory:
///   - ~/.krueger.toml
///   - ~/.config/.krueger.toml
///
/// The status file lives in the platform data directory
/// (e.g. ~/.local/share/krueger/status.toml on Linux).
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "krueger";
pub const CONFIG_FILE_NAME: &str = ".krueger.toml";
pub const STATUS_FILE_NAME: &str = "status.toml";

/// Config file candidates in search order, relative to `home`.
pub fn config_candidates_in(home: &Path) -> Vec<PathBuf> {
    vec![
        home.join(CONFIG_FILE_NAME),
        home.join(".config").join(CONFIG_FILE_NAME),
    ]
}

/// Config file candidates for the current user.  Empty when the home
/// directory cannot be determined.
pub fn config_candidates() -> Vec<PathBuf> {
    dirs::home_dir()
        .map(|home| config_candidates_in(&home))
        .unwrap_or_default()
}

/// Returns the status file path, or `None` when the platform has no data directory.
pub fn status_file_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join(APP_DIR_NAME).join(STATUS_FILE_NAME))
}
