//! Configuration for git-dirdiff.
//!
//! Read from `$XDG_CONFIG_HOME/git-dirdiff/config.yaml` (or
//! `~/.config/git-dirdiff/config.yaml`), overridable with the
//! `GIT_DIRDIFF_CONFIG` environment variable. A missing file falls back to
//! defaults; unknown fields are ignored for forward compatibility.
//! Command-line flags take precedence over every config value.

use crate::error::{DirdiffError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration for a comparison run.
///
/// This struct represents the contents of `config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Command template for the comparison tool. `{left}` and `{right}`
    /// expand to the two staging directories.
    pub tool: String,

    /// Whether to include untracked files when a working-copy side is in
    /// play.
    #[serde(default = "default_true")]
    pub untracked: bool,

    /// Keep the staging directories after the tool exits instead of
    /// deleting them.
    pub keep_staging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tool: String::new(),
            untracked: default_true(),
            keep_staging: false,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from the default location, falling back to
    /// defaults when no file exists.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DirdiffError::ConfigError(format!("failed to read '{}': {}", path.display(), e))
        })?;
        serde_yaml::from_str(&text).map_err(|e| {
            DirdiffError::ConfigError(format!("failed to parse '{}': {}", path.display(), e))
        })
    }
}

/// Resolve the config file path: `GIT_DIRDIFF_CONFIG` wins, then the
/// XDG config directory, then `~/.config`.
fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os("GIT_DIRDIFF_CONFIG") {
        return Some(PathBuf::from(explicit));
    }
    let base = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("git-dirdiff").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert!(config.tool.is_empty());
        assert!(config.untracked);
        assert!(!config.keep_staging);
    }

    #[test]
    fn loads_full_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "tool: \"meld {left} {right}\"\nuntracked: false\nkeep_staging: true\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.tool, "meld {left} {right}");
        assert!(!config.untracked);
        assert!(config.keep_staging);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "tool: \"bcompare {left} {right}\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.tool, "bcompare {left} {right}");
        assert!(config.untracked);
        assert!(!config.keep_staging);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "tool: \"meld {left} {right}\"\nfuture_option: 7\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.tool, "meld {left} {right}");
    }

    #[test]
    fn invalid_yaml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "tool: [unclosed\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, DirdiffError::ConfigError(_)));
    }

    #[test]
    #[serial]
    fn env_override_selects_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "tool: \"kdiff3 {left} {right}\"\n").unwrap();

        // SAFETY: guarded by #[serial]; no other thread reads the
        // environment concurrently in this test binary.
        unsafe { env::set_var("GIT_DIRDIFF_CONFIG", &path) };
        let loaded = Config::load();
        unsafe { env::remove_var("GIT_DIRDIFF_CONFIG") };

        assert_eq!(loaded.unwrap().tool, "kdiff3 {left} {right}");
    }

    #[test]
    #[serial]
    fn missing_config_file_falls_back_to_defaults() {
        // SAFETY: guarded by #[serial].
        unsafe { env::set_var("GIT_DIRDIFF_CONFIG", "/nonexistent/config.yaml") };
        let loaded = Config::load();
        unsafe { env::remove_var("GIT_DIRDIFF_CONFIG") };

        let config = loaded.unwrap();
        assert!(config.tool.is_empty());
    }
}
