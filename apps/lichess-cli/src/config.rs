use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use lichess_http::{DEFAULT_BASE_URL, ExecutorBuilder};
use lichess_sdk::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Token bucket section of the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitSection {
    pub interval_ms: u64,
    pub burst: u32,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            burst: 20,
        }
    }
}

/// Effective CLI configuration.
///
/// Layers, last wins: defaults, YAML file, `LICHESS__*` environment, flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
    pub rate_limit: RateLimitSection,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            token: None,
            timeout_secs: 10,
            rate_limit: RateLimitSection::default(),
        }
    }
}

/// Flag values that override every other layer
#[derive(Debug, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

impl CliConfig {
    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed("LICHESS__").split("__"))
    }

    /// # Errors
    ///
    /// Fails when `path` does not exist or a layer does not match the schema.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = path
            && !path.is_file()
        {
            anyhow::bail!("config file does not exist: {}", path.display());
        }
        Self::figment(path)
            .extract()
            .context("invalid configuration")
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(base_url) = overrides.base_url {
            self.base_url = base_url;
        }
        if let Some(token) = overrides.token {
            self.token = Some(token);
        }
    }

    /// # Errors
    ///
    /// Propagates executor build failures such as an invalid base URL.
    pub fn client(&self) -> anyhow::Result<Client> {
        let mut builder = ExecutorBuilder::new()
            .base_url(self.base_url.clone())
            .timeout(Duration::from_secs(self.timeout_secs))
            .rate_limit(
                Duration::from_millis(self.rate_limit.interval_ms),
                self.rate_limit.burst,
            );
        if let Some(token) = &self.token {
            builder = builder.api_token(token.clone());
        }
        let executor = builder.build().context("failed to build lichess client")?;
        Ok(Client::from_executor(executor))
    }
}
