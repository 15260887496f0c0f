use std::sync::Arc;

use chrono::Utc;
use tireslingers_core::recommendations::{run_batch, RecommendationEngine, RecommendationStore};
use tireslingers_db::SqlRecommendationStore;

use crate::commands::{
    close_after, open_database, prepare, CommandResult, EXIT_BATCH_PARTIAL, EXIT_RECOMMENDATION,
};

pub fn run(stale_only: bool) -> CommandResult {
    let (config, runtime) = match prepare("recommend-all") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let store = SqlRecommendationStore::new(pool.clone());

        let listed = if stale_only {
            store.list_stale_organizations().await
        } else {
            store.list_organizations().await
        };
        let outcome = match listed {
            Ok(organizations) => {
                let engine =
                    Arc::new(RecommendationEngine::new(store, config.recommendations.clone()));
                Ok(run_batch(engine, organizations, Utc::now(), config.batch.max_parallel).await)
            }
            Err(error) => Err((error.class(), error.to_string(), EXIT_RECOMMENDATION)),
        };
        close_after(&pool, outcome).await
    });

    match result {
        Ok(outcome) => {
            let message = format!(
                "recommendation batch finished: {} succeeded, {} failed, {} aborted",
                outcome.succeeded.len(),
                outcome.failed.len(),
                outcome.aborted
            );
            if outcome.is_clean() {
                CommandResult::success_with_data("recommend-all", message, outcome)
            } else {
                CommandResult::failure_with_data(
                    "recommend-all",
                    "batch_partial_failure",
                    message,
                    EXIT_BATCH_PARTIAL,
                    outcome,
                )
            }
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("recommend-all", error_class, message, exit_code)
        }
    }
}
