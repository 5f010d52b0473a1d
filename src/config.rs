use crate::reclamation::ServiceOptions;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/default";
pub const ENV_PREFIX: &str = "RECLAMATION";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub api: ApiConfig,
    pub list: ListConfig,
    pub cache: CacheConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ListConfig {
    pub page_size: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CacheConfig {
    /// Unset means cached entries never age; only mutations make them stale.
    pub stale_time_secs: Option<u64>,
    pub query_retries: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Log file used while the TUI owns the terminal.
    pub file: String,
    pub filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8080/api".to_string(),
                timeout_secs: 10,
            },
            list: ListConfig { page_size: 20 },
            cache: CacheConfig {
                stale_time_secs: Some(30),
                query_retries: 3,
            },
            ui: UiConfig { tick_rate_ms: 250 },
            logging: LoggingConfig {
                file: "reclamation-admin.log".to_string(),
                filter: "reclamation_admin=info".to_string(),
            },
        }
    }
}

impl Config {
    /// Defaults, then the TOML file (required only when a path is given),
    /// then `RECLAMATION__SECTION__KEY` environment variables.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(
                config::File::with_name(path.unwrap_or(DEFAULT_CONFIG_PATH)).required(path.is_some()),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration")?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api.base_url.trim().is_empty() {
            bail!("api.base_url must not be empty");
        }
        if self.list.page_size == 0 {
            bail!("list.page_size must be at least 1");
        }
        Ok(())
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.ui.tick_rate_ms)
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            stale_time: self.cache.stale_time_secs.map(Duration::from_secs),
            query_retries: self.cache.query_retries,
            ..ServiceOptions::default()
        }
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
