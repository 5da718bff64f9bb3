//! Client configuration.
//!
//! A [`ClientConfig`] can be built in code, read from the environment, or
//! loaded from a YAML file.  Command-line overrides live in
//! [`crate::shell::ShellArgs`].

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Base URL used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for an [`crate::Aura`] client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server root; API paths are appended as `{api_base_url}/api/...`.
    pub api_base_url: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Directory for cross-session preferences (avatar, accent color).
    ///
    /// `None` keeps preferences in memory for the lifetime of the process.
    pub storage_dir: Option<PathBuf>,

    /// Directory for persisted access and refresh tokens.
    ///
    /// `None` keeps tokens in memory for the lifetime of the process, the
    /// way a browser tab's session storage would.  Setting it lets a
    /// sign-in survive restarts.
    pub token_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            storage_dir: None,
            token_dir: None,
        }
    }

    /// Reads `AURA_API_BASE_URL`, `AURA_TIMEOUT_SECS`, `AURA_STORAGE_DIR` and
    /// `AURA_TOKEN_DIR` on top of the defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();
        if let Ok(url) = env::var("AURA_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Ok(secs) = env::var("AURA_TIMEOUT_SECS") {
            config.timeout_secs = secs.parse().map_err(|_| {
                Error::validation(
                    format!("AURA_TIMEOUT_SECS is not a number: {secs}"),
                    Some("AURA_TIMEOUT_SECS".to_string()),
                )
            })?;
        }
        if let Ok(dir) = env::var("AURA_STORAGE_DIR") {
            config.storage_dir = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = env::var("AURA_TOKEN_DIR") {
            config.token_dir = Some(PathBuf::from(dir));
        }
        config.validate()?;
        Ok(config)
    }

    /// Loads a YAML configuration file.  Missing keys take default values.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("cannot read {}: {e}", path.display()), e))?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            Error::serialization(
                format!("invalid configuration in {}: {e}", path.display()),
                Some(Box::new(e)),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the API base URL.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    /// Sets the preferences directory.
    pub fn with_storage_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.storage_dir = dir;
        self
    }

    /// Sets the token directory.
    pub fn with_token_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.token_dir = dir;
        self
    }

    /// The request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The base URL with trailing slashes removed.
    pub fn normalized_base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    /// Checks that the base URL parses and the timeout is non-zero.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(self.normalized_base_url())?;
        if self.timeout_secs == 0 {
            return Err(Error::validation(
                "timeout must be at least one second",
                Some("timeout_secs".to_string()),
            ));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::new();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(config.storage_dir.is_none());
        assert!(config.token_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = ClientConfig::new()
            .with_api_base_url("https://aura.example.com//")
            .with_timeout(Duration::from_secs(5))
            .with_storage_dir(Some(PathBuf::from("/tmp/aura")))
            .with_token_dir(Some(PathBuf::from("/tmp/aura/tokens")));
        assert_eq!(config.normalized_base_url(), "https://aura.example.com");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/aura")));
        assert_eq!(config.token_dir, Some(PathBuf::from("/tmp/aura/tokens")));
    }

    #[test]
    fn yaml_with_missing_keys() {
        let config: ClientConfig =
            serde_yaml::from_str("api_base_url: https://aura.example.com\n").unwrap();
        assert_eq!(config.api_base_url, "https://aura.example.com");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn from_file_roundtrip() {
        let dir = std::env::temp_dir().join(format!("aura-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("aura.yaml");
        std::fs::write(&path, "api_base_url: http://127.0.0.1:9000\ntimeout_secs: 3\n").unwrap();
        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.api_base_url, "http://127.0.0.1:9000");
        assert_eq!(config.timeout_secs, 3);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ClientConfig::new().with_api_base_url("not a url").validate().is_err());
        let config = ClientConfig {
            timeout_secs: 0,
            ..ClientConfig::new()
        };
        assert!(config.validate().unwrap_err().is_validation());
    }
}
