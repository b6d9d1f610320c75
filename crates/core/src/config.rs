//! Account manager configuration
//!
//! Loaded from TOML once at startup and handed to the session explicitly:
//!
//! ```toml
//! dev_path = "accounts.db"
//! test_path = "accounts_test.db"
//! max_login_attempts = 3
//! max_prompt_retries = 5
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Error, Result};

/// Default number of interactive login attempts
pub const DEFAULT_LOGIN_ATTEMPTS: u32 = 3;

/// Default number of retries for registration and password update prompts
pub const DEFAULT_PROMPT_RETRIES: u32 = 5;

/// Which database the session should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Test,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Database file used for normal runs
    pub dev_path: PathBuf,
    /// Database file used by the test harness
    pub test_path: PathBuf,
    #[serde(default = "default_login_attempts")]
    pub max_login_attempts: u32,
    #[serde(default = "default_prompt_retries")]
    pub max_prompt_retries: u32,
}

fn default_login_attempts() -> u32 {
    DEFAULT_LOGIN_ATTEMPTS
}

fn default_prompt_retries() -> u32 {
    DEFAULT_PROMPT_RETRIES
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = Self::project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            dev_path: data_dir.join("accounts.db"),
            test_path: data_dir.join("accounts_test.db"),
            max_login_attempts: DEFAULT_LOGIN_ATTEMPTS,
            max_prompt_retries: DEFAULT_PROMPT_RETRIES,
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        Ok(config)
    }

    /// Load configuration from a file
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&text)?;
        debug!(dev_path = %config.dev_path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Platform config file location (`accounts.toml` in the user config dir)
    pub fn default_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;

        Ok(dirs.config_dir().join("accounts.toml"))
    }

    /// Database path for the given environment
    pub fn database_path(&self, env: Environment) -> &Path {
        match env {
            Environment::Development => &self.dev_path,
            Environment::Test => &self.test_path,
        }
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("dev", "onyx", "accounts")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let config = Config::from_toml(
            r#"
            dev_path = "dev.db"
            test_path = "test.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path(Environment::Development), Path::new("dev.db"));
        assert_eq!(config.database_path(Environment::Test), Path::new("test.db"));
        assert_eq!(config.max_login_attempts, DEFAULT_LOGIN_ATTEMPTS);
        assert_eq!(config.max_prompt_retries, DEFAULT_PROMPT_RETRIES);
    }

    #[test]
    fn test_parse_overrides() {
        let config = Config::from_toml(
            r#"
            dev_path = "dev.db"
            test_path = "test.db"
            max_login_attempts = 5
            max_prompt_retries = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.max_login_attempts, 5);
        assert_eq!(config.max_prompt_retries, 1);
    }

    #[test]
    fn test_missing_path_is_error() {
        let err = Config::from_toml(r#"dev_path = "dev.db""#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.toml");
        std::fs::write(&path, "dev_path = \"a.db\"\ntest_path = \"b.db\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.dev_path, PathBuf::from("a.db"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_default_uses_distinct_paths() {
        let config = Config::default();
        assert_ne!(config.dev_path, config.test_path);
    }
}
