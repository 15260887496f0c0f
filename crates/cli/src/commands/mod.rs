pub mod config;
pub mod migrate;
pub mod recommend;
pub mod recommend_all;
pub mod recommendations;
pub mod seed;

use serde::Serialize;
use serde_json::Value;
use tireslingers_core::config::{AppConfig, LoadOptions};
use tireslingers_db::{connect_with_config, migrations, DbPool};
use tokio::runtime::Runtime;

/// `(error_class, message, exit_code)` as carried through a command body.
pub(crate) type CommandError = (&'static str, String, u8);

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_DB_CONNECTIVITY: u8 = 4;
pub const EXIT_MIGRATION: u8 = 5;
pub const EXIT_SEED: u8 = 6;
pub const EXIT_UNKNOWN_ORGANIZATION: u8 = 7;
pub const EXIT_RECOMMENDATION: u8 = 8;
pub const EXIT_BATCH_PARTIAL: u8 = 9;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::ok(command, message.into(), None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: impl Serialize,
    ) -> Self {
        Self::ok(command, message.into(), to_value(data))
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::error(command, error_class, message.into(), exit_code, None)
    }

    pub fn failure_with_data(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        data: impl Serialize,
    ) -> Self {
        Self::error(command, error_class, message.into(), exit_code, to_value(data))
    }

    fn ok(command: &str, message: String, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message,
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    fn error(
        command: &str,
        error_class: &str,
        message: String,
        exit_code: u8,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message,
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn to_value(data: impl Serialize) -> Option<Value> {
    serde_json::to_value(data).ok()
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Loads config and builds the single-threaded runtime every command runs on.
pub(crate) fn prepare(command: &str) -> Result<(AppConfig, Runtime), CommandResult> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            )
        })?;

    Ok((config, runtime))
}

/// Connects and applies pending migrations.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, CommandError> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;
    Ok(pool)
}

/// Closes `pool` whichever way the command body finished.
pub(crate) async fn close_after<T>(
    pool: &DbPool,
    result: Result<T, CommandError>,
) -> Result<T, CommandError> {
    pool.close().await;
    result
}
