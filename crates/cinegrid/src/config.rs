//! Application configuration.
//!
//! Configuration is a small TOML document. Every key is optional:
//!
//! ```toml
//! app_name = "Black DVD Archiver"
//! max_file_name_len = 255
//! confirm_renames = true
//! flush_typing_on_focus_out = true
//! pad_grid_rows = true
//! ```

use std::path::Path;

use cinegrid_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Options shared by every window of an [`AppContext`](crate::AppContext).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuiConfig {
    /// Application name, used as the title of the main window and popups.
    pub app_name: String,
    /// Longest file name the file helpers accept.
    pub max_file_name_len: usize,
    /// Ask before renaming files in the file renamer.
    pub confirm_renames: bool,
    /// Flush a grid's typing buffer when the grid loses focus, not only on
    /// Enter or Tab.
    pub flush_typing_on_focus_out: bool,
    /// Pad the rows of grid and form containers with spacers so every row
    /// has as many columns as the widest.
    pub pad_grid_rows: bool,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            app_name: "cinegrid".to_string(),
            max_file_name_len: 255,
            confirm_renames: true,
            flush_typing_on_focus_out: true,
            pad_grid_rows: true,
        }
    }
}

impl GuiConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_keys_take_defaults() {
        let config = GuiConfig::from_toml_str("app_name = \"Archiver\"\n").unwrap();
        assert_eq!(config.app_name, "Archiver");
        assert_eq!(config.max_file_name_len, 255);
        assert!(config.confirm_renames);
        assert!(config.pad_grid_rows);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = GuiConfig::from_toml_str("max_file_name_len = \"long\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "confirm_renames = false").unwrap();
        let config = GuiConfig::load(file.path()).unwrap();
        assert!(!config.confirm_renames);

        let reparsed = GuiConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GuiConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
