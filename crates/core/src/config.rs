use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::settings::{InventorySettings, RecommendationDefaults};

pub const CONFIG_FILE_NAME: &str = "tireslingers.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub recommendations: RecommendationDefaults,
    pub batch: BatchConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Debug)]
pub struct BatchConfig {
    pub max_parallel: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub batch_max_parallel: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://tireslingers.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            recommendations: RecommendationDefaults::default(),
            batch: BatchConfig { max_parallel: 4 },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(recommendations) = patch.recommendations {
            recommendations.apply_to(&mut self.recommendations);
        }

        if let Some(batch) = patch.batch {
            if let Some(max_parallel) = batch.max_parallel {
                self.batch.max_parallel = max_parallel;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TIRESLINGERS_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("TIRESLINGERS_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_env("TIRESLINGERS_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("TIRESLINGERS_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("TIRESLINGERS_DATABASE_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("TIRESLINGERS_LOGGING_LEVEL").or_else(|| read_env("TIRESLINGERS_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("TIRESLINGERS_LOGGING_FORMAT")
            .or_else(|| read_env("TIRESLINGERS_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("TIRESLINGERS_DEFAULT_CAPACITY_TOTAL_TIRES") {
            self.recommendations.capacity_total_tires =
                parse_env("TIRESLINGERS_DEFAULT_CAPACITY_TOTAL_TIRES", &value)?;
        }
        if let Some(value) = read_env("TIRESLINGERS_BATCH_MAX_PARALLEL") {
            self.batch.max_parallel = parse_env("TIRESLINGERS_BATCH_MAX_PARALLEL", &value)?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(max_parallel) = overrides.batch_max_parallel {
            self.batch.max_parallel = max_parallel;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_logging(&self.logging)?;
        validate_recommendations(&self.recommendations)?;
        validate_batch(&self.batch)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(CONFIG_FILE_NAME), PathBuf::from("config").join(CONFIG_FILE_NAME)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_recommendations(defaults: &RecommendationDefaults) -> Result<(), ConfigError> {
    let settings = &defaults.settings;
    if settings.sales_window_days == 0 || settings.search_window_days == 0 {
        return Err(ConfigError::Validation(
            "recommendations.sales_window_days and search_window_days must be greater than zero"
                .to_string(),
        ));
    }

    if !(settings.safety_multiplier.is_finite() && settings.safety_multiplier > 0.0) {
        return Err(ConfigError::Validation(
            "recommendations.safety_multiplier must be a positive number".to_string(),
        ));
    }

    if !(settings.overstock_percent.is_finite() && settings.overstock_percent >= 0.0) {
        return Err(ConfigError::Validation(
            "recommendations.overstock_percent must be zero or greater".to_string(),
        ));
    }

    if settings.packaging_set_size == 0 {
        return Err(ConfigError::Validation(
            "recommendations.packaging_set_size must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_batch(batch: &BatchConfig) -> Result<(), ConfigError> {
    if batch.max_parallel == 0 || batch.max_parallel > 64 {
        return Err(ConfigError::Validation(
            "batch.max_parallel must be in range 1..=64".to_string(),
        ));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    logging: Option<LoggingPatch>,
    recommendations: Option<RecommendationsPatch>,
    batch: Option<BatchPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchPatch {
    max_parallel: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationsPatch {
    default_capacity_total_tires: Option<u32>,
    sales_window_days: Option<u32>,
    search_window_days: Option<u32>,
    min_search_threshold: Option<u32>,
    stale_age_days: Option<u32>,
    overstock_percent: Option<f64>,
    safety_multiplier: Option<f64>,
    packaging_set_size: Option<u32>,
    enable_search_demand: Option<bool>,
    enable_request_demand: Option<bool>,
}

impl RecommendationsPatch {
    fn apply_to(self, defaults: &mut RecommendationDefaults) {
        if let Some(capacity) = self.default_capacity_total_tires {
            defaults.capacity_total_tires = capacity;
        }

        let settings: &mut InventorySettings = &mut defaults.settings;
        if let Some(value) = self.sales_window_days {
            settings.sales_window_days = value;
        }
        if let Some(value) = self.search_window_days {
            settings.search_window_days = value;
        }
        if let Some(value) = self.min_search_threshold {
            settings.min_search_threshold = value;
        }
        if let Some(value) = self.stale_age_days {
            settings.stale_age_days = value;
        }
        if let Some(value) = self.overstock_percent {
            settings.overstock_percent = value;
        }
        if let Some(value) = self.safety_multiplier {
            settings.safety_multiplier = value;
        }
        if let Some(value) = self.packaging_set_size {
            settings.packaging_set_size = value;
        }
        if let Some(value) = self.enable_search_demand {
            settings.enable_search_demand = value;
        }
        if let Some(value) = self.enable_request_demand {
            settings.enable_request_demand = value;
        }
    }
}
