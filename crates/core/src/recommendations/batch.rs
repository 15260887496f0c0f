//! Runs the engine for many organizations in parallel worker tasks.
//!
//! Organizations share no mutable state, so each run is independent. A
//! failing organization is recorded and the rest continue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::engine::RecommendationEngine;
use super::store::RecommendationStore;
use crate::domain::organization::OrganizationId;
use crate::domain::recommendation::RecommendationAction;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchRunSummary {
    pub organization_id: OrganizationId,
    pub recommendation_count: usize,
    pub stock_count: usize,
    pub purge_count: usize,
    pub total_current_stock: u64,
    pub capacity_used: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub organization_id: OrganizationId,
    pub error_class: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub succeeded: Vec<BatchRunSummary>,
    pub failed: Vec<BatchFailure>,
    /// Worker tasks that panicked or were cancelled.
    pub aborted: usize,
}

impl BatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.aborted == 0
    }
}

pub async fn run_batch<S>(
    engine: Arc<RecommendationEngine<S>>,
    organizations: Vec<OrganizationId>,
    now: DateTime<Utc>,
    max_parallel: usize,
) -> BatchOutcome
where
    S: RecommendationStore + 'static,
{
    let permits = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut tasks = JoinSet::new();
    let requested = organizations.len();

    for organization_id in organizations {
        let engine = Arc::clone(&engine);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let result = engine.run(&organization_id, now).await;
            (organization_id, result)
        });
    }

    let mut outcome = BatchOutcome::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((organization_id, Ok(run))) => outcome.succeeded.push(BatchRunSummary {
                recommendation_count: run.recommendations.len(),
                stock_count: run.count_by_action(RecommendationAction::Stock),
                purge_count: run.count_by_action(RecommendationAction::Purge),
                total_current_stock: run.total_current_stock,
                capacity_used: run.capacity_used,
                organization_id,
            }),
            Ok((organization_id, Err(err))) => {
                warn!(
                    event_name = "recommendations.batch.org_failed",
                    organization_id = %organization_id,
                    error_class = err.class(),
                    error = %err,
                    "recommendation run failed for organization"
                );
                outcome.failed.push(BatchFailure {
                    organization_id,
                    error_class: err.class().to_string(),
                    message: err.to_string(),
                });
            }
            Err(join_error) => {
                error!(
                    event_name = "recommendations.batch.task_aborted",
                    error = %join_error,
                    "recommendation worker task aborted"
                );
                outcome.aborted += 1;
            }
        }
    }

    outcome.succeeded.sort_by(|a, b| a.organization_id.cmp(&b.organization_id));
    outcome.failed.sort_by(|a, b| a.organization_id.cmp(&b.organization_id));

    info!(
        event_name = "recommendations.batch.completed",
        requested,
        succeeded = outcome.succeeded.len(),
        failed = outcome.failed.len(),
        aborted = outcome.aborted,
        "recommendation batch completed"
    );
    outcome
}
