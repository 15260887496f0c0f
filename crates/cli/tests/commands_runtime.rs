use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use tireslingers_cli::commands::{
    config, migrate, recommend, recommend_all, recommendations, seed,
};

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("TIRESLINGERS_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("TIRESLINGERS_DATABASE_URL", "postgres://localhost/yard")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_then_recommend_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = file_url(dir.path());

    with_env(&[("TIRESLINGERS_DATABASE_URL", url.as_str())], || {
        let seeded = seed::run();
        assert_eq!(seeded.exit_code, 0, "seed failed: {}", seeded.output);
        let payload = parse_payload(&seeded.output);
        assert_eq!(payload["data"]["organizations"].as_array().map(Vec::len), Some(3));
        assert!(payload["message"]
            .as_str()
            .unwrap_or_default()
            .contains("  - yard-harbor: Harbor Road Tires"));

        let run = recommend::run("yard-northside");
        assert_eq!(run.exit_code, 0, "recommend failed: {}", run.output);
        let payload = parse_payload(&run.output);
        assert_eq!(payload["command"], "recommend");
        assert_eq!(payload["data"]["organization_id"], "yard-northside");
        assert_eq!(payload["data"]["capacity_total"], 60);
        let computed = payload["data"]["recommendations"].as_array().cloned().unwrap_or_default();
        assert!(!computed.is_empty());

        let listed = recommendations::run("yard-northside");
        assert_eq!(listed.exit_code, 0, "listing failed: {}", listed.output);
        let payload = parse_payload(&listed.output);
        let stored = payload["data"].as_array().cloned().unwrap_or_default();
        assert_eq!(stored.len(), computed.len());
        assert_eq!(stored[0]["recommendation"]["size_key"], computed[0]["size_key"]);
    });
}

#[test]
fn recommend_all_stale_only_skips_fresh_organizations() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = file_url(dir.path());

    with_env(&[("TIRESLINGERS_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0);

        let first = recommend_all::run(true);
        assert_eq!(first.exit_code, 0, "batch failed: {}", first.output);
        let payload = parse_payload(&first.output);
        assert_eq!(payload["data"]["succeeded"].as_array().map(Vec::len), Some(3));

        let second = recommend_all::run(true);
        let payload = parse_payload(&second.output);
        assert_eq!(payload["data"]["succeeded"].as_array().map(Vec::len), Some(0));

        let everything = recommend_all::run(false);
        let payload = parse_payload(&everything.output);
        assert_eq!(payload["data"]["succeeded"].as_array().map(Vec::len), Some(3));
    });
}

#[test]
fn recommend_rejects_unknown_organization() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = file_url(dir.path());

    with_env(&[("TIRESLINGERS_DATABASE_URL", url.as_str())], || {
        let result = recommend::run("yard-nowhere");
        assert_eq!(result.exit_code, 7);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "unknown_organization");
    });
}

#[test]
fn config_attributes_env_sources() {
    with_env(
        &[
            ("TIRESLINGERS_DATABASE_URL", "sqlite::memory:"),
            ("TIRESLINGERS_DEFAULT_CAPACITY_TOTAL_TIRES", "320"),
        ],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0);

            let payload = parse_payload(&result.output);
            let lines = payload["data"].as_array().cloned().unwrap_or_default();
            let capacity = lines
                .iter()
                .find(|line| line["key"] == "recommendations.default_capacity_total_tires")
                .expect("capacity line");
            assert_eq!(capacity["value"], "320");
            assert_eq!(capacity["source"], "env (TIRESLINGERS_DEFAULT_CAPACITY_TOTAL_TIRES)");

            let threshold = lines
                .iter()
                .find(|line| line["key"] == "recommendations.min_search_threshold")
                .expect("threshold line");
            assert_eq!(threshold["source"], "default");
        },
    );
}

fn file_url(dir: &Path) -> String {
    format!("sqlite://{}", dir.join("yard.db").display())
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TIRESLINGERS_DATABASE_URL",
        "TIRESLINGERS_DATABASE_MAX_CONNECTIONS",
        "TIRESLINGERS_DATABASE_TIMEOUT_SECS",
        "TIRESLINGERS_LOGGING_LEVEL",
        "TIRESLINGERS_LOGGING_FORMAT",
        "TIRESLINGERS_LOG_LEVEL",
        "TIRESLINGERS_LOG_FORMAT",
        "TIRESLINGERS_DEFAULT_CAPACITY_TOTAL_TIRES",
        "TIRESLINGERS_BATCH_MAX_PARALLEL",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}
