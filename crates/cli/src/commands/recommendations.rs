use tireslingers_core::domain::organization::OrganizationId;
use tireslingers_core::recommendations::RecommendationStore;
use tireslingers_db::SqlRecommendationStore;

use crate::commands::recommend::ensure_known;
use crate::commands::{close_after, open_database, prepare, CommandResult, EXIT_RECOMMENDATION};

pub fn run(organization: &str) -> CommandResult {
    let (config, runtime) = match prepare("recommendations") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };
    let organization_id = OrganizationId::new(organization.trim());

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let store = SqlRecommendationStore::new(pool.clone());

        let stored = match ensure_known(&store, &organization_id).await {
            Ok(()) => store
                .list_recommendations(&organization_id)
                .await
                .map_err(|error| (error.class(), error.to_string(), EXIT_RECOMMENDATION)),
            Err(error) => Err(error),
        };
        close_after(&pool, stored).await
    });

    match result {
        Ok(stored) => {
            let message = match stored.first() {
                Some(first) => format!(
                    "{} stored recommendations for {} computed at {}",
                    stored.len(),
                    organization_id,
                    first.computed_at.to_rfc3339()
                ),
                None => format!("no stored recommendations for {organization_id}"),
            };
            CommandResult::success_with_data("recommendations", message, stored)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("recommendations", error_class, message, exit_code)
        }
    }
}
