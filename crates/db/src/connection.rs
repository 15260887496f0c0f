use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tireslingers_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 30).await
}

pub async fn connect_with_config(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&config.url, config.max_connections, config.timeout_secs).await
}

/// Opens a pool with foreign keys enforced on every connection. Passing
/// `mode=rwc` lets a file database be created on first use.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let url = with_create_mode(database_url);
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&url)
        .await
}

fn with_create_mode(database_url: &str) -> String {
    let is_file = database_url.starts_with("sqlite://") && !database_url.contains(":memory:");
    if is_file && !database_url.contains("mode=") {
        let separator = if database_url.contains('?') { '&' } else { '?' };
        return format!("{database_url}{separator}mode=rwc");
    }
    database_url.to_string()
}

#[cfg(test)]
mod tests {
    use super::with_create_mode;

    #[test]
    fn file_urls_gain_create_mode() {
        assert_eq!(with_create_mode("sqlite://yard.db"), "sqlite://yard.db?mode=rwc");
        assert_eq!(with_create_mode("sqlite://yard.db?cache=shared"), "sqlite://yard.db?cache=shared&mode=rwc");
        assert_eq!(with_create_mode("sqlite://yard.db?mode=ro"), "sqlite://yard.db?mode=ro");
        assert_eq!(with_create_mode("sqlite::memory:"), "sqlite::memory:");
    }
}
