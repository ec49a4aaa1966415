//! Shared key configuration.
//!
//! Both keys are loaded once at process start from a small JSON file and
//! passed by reference to every component that needs them. There is no lazy
//! global; a missing or malformed file fails the run before any work starts.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Encryption keys shared by every build in a run.
///
/// `wiiu_common_key` encrypts the final bundle; `launcher_title_key` decrypts
/// the launcher title's base files during provisioning.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyConfig {
    /// Shared platform encryption key (hex string).
    pub wiiu_common_key: String,

    /// Download key for the launcher title's base files (hex string).
    pub launcher_title_key: String,
}

impl KeyConfig {
    /// Load the key configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid JSON, or leaves either
    /// key empty.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: KeyConfig = serde_json::from_str(&raw).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        if config.wiiu_common_key.is_empty() {
            return Err(ConfigError::EmptyKey("wiiu_common_key"));
        }
        if config.launcher_title_key.is_empty() {
            return Err(ConfigError::EmptyKey("launcher_title_key"));
        }

        Ok(config)
    }
}

/// Errors that can occur while loading the key configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    ReadFailed { path: PathBuf, source: io::Error },

    /// The configuration file is not valid JSON or misses a required key.
    ParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A key is present but empty.
    EmptyKey(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::ParseFailed { path, source } => {
                write!(f, "failed to parse config {}: {}", path.display(), source)
            }
            ConfigError::EmptyKey(key) => write!(f, "config key {} must not be empty", key),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed { source, .. } => Some(source),
            ConfigError::ParseFailed { source, .. } => Some(source),
            ConfigError::EmptyKey(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.json");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_valid_config() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"wiiu_common_key": "aa55", "launcher_title_key": "bb66"}"#,
        );

        let config = KeyConfig::load(&path).unwrap();
        assert_eq!(config.wiiu_common_key, "aa55");
        assert_eq!(config.launcher_title_key, "bb66");
    }

    #[test]
    fn test_load_missing_file() {
        let result = KeyConfig::load(Path::new("/nonexistent/config.json"));
        assert!(matches!(result, Err(ConfigError::ReadFailed { .. })));
    }

    #[test]
    fn test_load_missing_key_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"wiiu_common_key": "aa55"}"#);

        let result = KeyConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::ParseFailed { .. })));
    }

    #[test]
    fn test_load_empty_key_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"wiiu_common_key": "", "launcher_title_key": "bb66"}"#,
        );

        let result = KeyConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::EmptyKey("wiiu_common_key"))));
    }
}
