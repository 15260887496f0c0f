use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tireslingers_core::config::{AppConfig, LoadOptions, CONFIG_FILE_NAME};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ConfigLine {
    pub key: &'static str,
    pub value: String,
    pub source: String,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let lines = describe(&config, config_file_doc.as_ref(), config_file_path.as_deref());

    CommandResult::success_with_data(
        "config",
        "effective config (source precedence: env > file > default)",
        lines,
    )
}

fn describe(
    config: &AppConfig,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> Vec<ConfigLine> {
    let settings = &config.recommendations.settings;
    let fields = [
        field("database.url", config.database.url.clone(), &["TIRESLINGERS_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["TIRESLINGERS_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["TIRESLINGERS_DATABASE_TIMEOUT_SECS"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["TIRESLINGERS_LOGGING_LEVEL", "TIRESLINGERS_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["TIRESLINGERS_LOGGING_FORMAT", "TIRESLINGERS_LOG_FORMAT"],
        ),
        field(
            "recommendations.default_capacity_total_tires",
            config.recommendations.capacity_total_tires.to_string(),
            &["TIRESLINGERS_DEFAULT_CAPACITY_TOTAL_TIRES"],
        ),
        field("recommendations.sales_window_days", settings.sales_window_days.to_string(), &[]),
        field("recommendations.search_window_days", settings.search_window_days.to_string(), &[]),
        field("recommendations.min_search_threshold", settings.min_search_threshold.to_string(), &[]),
        field("recommendations.stale_age_days", settings.stale_age_days.to_string(), &[]),
        field("recommendations.overstock_percent", settings.overstock_percent.to_string(), &[]),
        field("recommendations.safety_multiplier", settings.safety_multiplier.to_string(), &[]),
        field("recommendations.packaging_set_size", settings.packaging_set_size.to_string(), &[]),
        field("recommendations.enable_search_demand", settings.enable_search_demand.to_string(), &[]),
        field("recommendations.enable_request_demand", settings.enable_request_demand.to_string(), &[]),
        field(
            "batch.max_parallel",
            config.batch.max_parallel.to_string(),
            &["TIRESLINGERS_BATCH_MAX_PARALLEL"],
        ),
    ];

    fields
        .into_iter()
        .map(|(key, value, env_keys)| ConfigLine {
            key,
            value,
            source: field_source(key, env_keys, config_file_doc, config_file_path),
        })
        .collect()
}

fn field(
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
) -> (&'static str, String, &'static [&'static str]) {
    (key, value, env_keys)
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(CONFIG_FILE_NAME), PathBuf::from("config").join(CONFIG_FILE_NAME)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let env_hit = env_keys
        .iter()
        .find(|key| env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false));
    if let Some(env_key) = env_hit {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
