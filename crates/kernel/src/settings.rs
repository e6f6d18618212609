use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "SHELF_ENV";
const CONFIG_DIR_ENV: &str = "SHELF_CONFIG_DIR";
const ENV_PREFIX: &str = "SHELF";
/// Conventional variable name most weather-provider setups already export.
const WEATHER_KEY_ENV: &str = "WEATHER_API_KEY";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    /// Parse the value of `SHELF_ENV`.
    pub fn parse(name: &str) -> anyhow::Result<Self> {
        match name {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub external: ExternalSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay
    /// and `SHELF_*` variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            // Default to repo root `config` directory.
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        let mut settings = Self::from_sources(&config_dir, &environment)?;

        if settings.external.weather_api_key.is_none() {
            settings.external.weather_api_key = std::env::var(WEATHER_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty());
        }

        Ok(settings)
    }

    /// Build settings from `{config_dir}/base.toml`, `{config_dir}/{environment}.toml`
    /// and the process environment.
    pub fn from_sources(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment = Environment::parse(environment)?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let cfg = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // The selected environment wins over anything written in the files.
        settings.environment = parsed_environment;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_request_timeout_ms() -> u64 {
        30000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path. `:memory:` opens a private in-memory database.
    #[serde(default = "DatabaseSettings::default_path")]
    pub path: String,
    /// Upper bound for a single store operation.
    #[serde(default = "DatabaseSettings::default_op_timeout_ms")]
    pub op_timeout_ms: u64,
    #[serde(default = "DatabaseSettings::default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl DatabaseSettings {
    fn default_path() -> String {
        "data/shelf.db".to_string()
    }

    fn default_op_timeout_ms() -> u64 {
        5000
    }

    fn default_busy_timeout_ms() -> u64 {
        2000
    }

    /// Settings for a throwaway in-memory database.
    pub fn in_memory() -> Self {
        Self {
            path: ":memory:".to_string(),
            ..Self::default()
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
            op_timeout_ms: Self::default_op_timeout_ms(),
            busy_timeout_ms: Self::default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub default_filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info,shelf_app=debug,shelf_http=debug".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            default_filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Third-party endpoints used by the catalog and weather passthroughs.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalSettings {
    #[serde(default = "ExternalSettings::default_catalog_base_url")]
    pub catalog_base_url: String,
    #[serde(default = "ExternalSettings::default_weather_base_url")]
    pub weather_base_url: String,
    #[serde(default)]
    pub weather_api_key: Option<String>,
    /// Location queried when the caller sends no coordinates.
    #[serde(default = "ExternalSettings::default_location")]
    pub default_location: String,
    #[serde(default = "ExternalSettings::default_search_timeout_ms")]
    pub search_timeout_ms: u64,
    #[serde(default = "ExternalSettings::default_weather_timeout_ms")]
    pub weather_timeout_ms: u64,
}

impl ExternalSettings {
    fn default_catalog_base_url() -> String {
        "https://openlibrary.org".to_string()
    }

    fn default_weather_base_url() -> String {
        "https://api.openweathermap.org".to_string()
    }

    fn default_location() -> String {
        "College Park".to_string()
    }

    fn default_search_timeout_ms() -> u64 {
        20000
    }

    fn default_weather_timeout_ms() -> u64 {
        5000
    }
}

impl Default for ExternalSettings {
    fn default() -> Self {
        Self {
            catalog_base_url: Self::default_catalog_base_url(),
            weather_base_url: Self::default_weather_base_url(),
            weather_api_key: None,
            default_location: Self::default_location(),
            search_timeout_ms: Self::default_search_timeout_ms(),
            weather_timeout_ms: Self::default_weather_timeout_ms(),
        }
    }
}
