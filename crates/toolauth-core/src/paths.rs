//! Default on-disk locations.
//!
//! Everything toolauth writes lives under a `toolauth` directory inside the
//! platform config or data directory. When the platform directory cannot be
//! determined the current directory is used instead.

use std::path::PathBuf;

/// Name of the per-application directory.
pub const APP_DIR: &str = "toolauth";

/// Returns the configuration directory, e.g. `~/.config/toolauth`.
///
/// Holds `config.toml` and the operator's client secret file.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Returns the data directory, e.g. `~/.local/share/toolauth`.
///
/// Holds the per-service credential files.
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dirs_end_with_app_name() {
        assert!(config_dir().ends_with(APP_DIR));
        assert!(data_dir().ends_with(APP_DIR));
    }
}
