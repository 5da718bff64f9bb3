//! Command-line configuration for the shell.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::config::ClientConfig;
use crate::error::Result;

/// Command-line arguments for the aura-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ShellArgs {
    /// YAML configuration file.
    #[arrrg(optional, "Read configuration from a YAML file", "FILE")]
    pub config: Option<String>,

    /// Server root.
    #[arrrg(optional, "API base URL (default: http://localhost:8080)", "URL")]
    pub api_base_url: Option<String>,

    /// Request timeout.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout: Option<u64>,

    /// Where preferences are kept.
    #[arrrg(optional, "Persist preferences under this directory", "DIR")]
    pub storage_dir: Option<String>,

    /// Where tokens are kept, if anywhere.
    #[arrrg(optional, "Keep the sign-in across runs under this directory", "DIR")]
    pub token_dir: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

impl ShellArgs {
    /// Resolves the client configuration: the file if one was given,
    /// otherwise the environment, then command-line overrides.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::from_env()?,
        };
        if let Some(url) = &self.api_base_url {
            config = config.with_api_base_url(url.clone());
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(dir) = &self.storage_dir {
            config = config.with_storage_dir(Some(PathBuf::from(dir)));
        }
        if let Some(dir) = &self.token_dir {
            config = config.with_token_dir(Some(PathBuf::from(dir)));
        }
        config.validate()?;
        Ok(config)
    }

    /// Whether output should be styled.
    pub fn use_color(&self) -> bool {
        !self.no_color
    }
}
