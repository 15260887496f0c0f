use chrono::Utc;
use tireslingers_core::domain::organization::OrganizationId;
use tireslingers_core::domain::recommendation::RecommendationAction;
use tireslingers_core::recommendations::{RecommendationEngine, RecommendationStore};
use tireslingers_db::SqlRecommendationStore;

use crate::commands::{
    close_after, open_database, prepare, CommandError, CommandResult, EXIT_RECOMMENDATION,
    EXIT_UNKNOWN_ORGANIZATION,
};

pub fn run(organization: &str) -> CommandResult {
    let (config, runtime) = match prepare("recommend") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };
    let organization_id = OrganizationId::new(organization.trim());

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let store = SqlRecommendationStore::new(pool.clone());

        let run = match ensure_known(&store, &organization_id).await {
            Ok(()) => RecommendationEngine::new(store, config.recommendations.clone())
                .run(&organization_id, Utc::now())
                .await
                .map_err(|error| (error.class(), error.to_string(), EXIT_RECOMMENDATION)),
            Err(error) => Err(error),
        };
        close_after(&pool, run).await
    });

    match result {
        Ok(run) => {
            let message = format!(
                "computed {} recommendations for {} ({} stock, {} purge, {} hold); capacity {}/{}",
                run.recommendations.len(),
                run.organization_id,
                run.count_by_action(RecommendationAction::Stock),
                run.count_by_action(RecommendationAction::Purge),
                run.count_by_action(RecommendationAction::Hold),
                run.capacity_used,
                run.capacity_total,
            );
            CommandResult::success_with_data("recommend", message, run)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("recommend", error_class, message, exit_code)
        }
    }
}

/// Rejects ids that have no organization row.
pub(crate) async fn ensure_known(
    store: &SqlRecommendationStore,
    organization_id: &OrganizationId,
) -> Result<(), CommandError> {
    let known = store
        .list_organizations()
        .await
        .map_err(|error| (error.class(), error.to_string(), EXIT_RECOMMENDATION))?;

    if organization_id.as_str().is_empty() || !known.contains(organization_id) {
        return Err((
            "unknown_organization",
            format!("organization `{organization_id}` does not exist"),
            EXIT_UNKNOWN_ORGANIZATION,
        ));
    }
    Ok(())
}
