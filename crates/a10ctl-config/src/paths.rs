//! Home-directory aware path helpers.

use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::error::{ConfigError, ConfigResult};
use crate::file::DEFAULT_CONFIG_FILE;

/// Expand a leading `~` component against the current user's home directory.
///
/// Paths without a leading `~` are returned unchanged; `~user` forms are not
/// expanded.
///
/// # Errors
///
/// Returns `ConfigError::HomeUnavailable` when the path needs expansion and no
/// home directory can be determined.
pub fn expand_home(path: &Path) -> ConfigResult<PathBuf> {
    if path.strip_prefix("~").is_err() {
        return Ok(path.to_path_buf());
    }
    let home = home_dir().ok_or(ConfigError::HomeUnavailable)?;
    Ok(expand_home_with(path, &home))
}

/// Location of the default configuration file, `~/.a10ctl.toml`.
///
/// # Errors
///
/// Returns `ConfigError::HomeUnavailable` when no home directory exists.
pub fn default_config_path() -> ConfigResult<PathBuf> {
    home_dir()
        .map(|home| home.join(DEFAULT_CONFIG_FILE))
        .ok_or(ConfigError::HomeUnavailable)
}

fn home_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

fn expand_home_with(path: &Path, home: &Path) -> PathBuf {
    path.strip_prefix("~")
        .map_or_else(|_| path.to_path_buf(), |rest| home.join(rest))
}
