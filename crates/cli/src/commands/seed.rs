use chrono::Utc;
use serde::Serialize;
use tireslingers_db::{DbPool, DemoYardDataset, SeedResult};

use crate::commands::{close_after, open_database, prepare, CommandError, CommandResult, EXIT_SEED};

#[derive(Debug, Serialize)]
struct SeedSummary {
    organizations: Vec<&'static str>,
    tires: usize,
    sales_events: usize,
    search_events: usize,
    customer_requests: usize,
}

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let seeded = load_and_verify(&pool).await;
        close_after(&pool, seeded).await
    });

    match result {
        Ok(seeded) => {
            let yard_lines: Vec<String> = seeded
                .yards_seeded
                .iter()
                .map(|yard| format!("  - {}: {} ({})", yard.org_id, yard.name, yard.description))
                .collect();
            let message =
                format!("demo yard dataset loaded:\n{}", yard_lines.join("\n"));
            let summary = SeedSummary {
                organizations: seeded.yards_seeded.iter().map(|yard| yard.org_id).collect(),
                tires: seeded.tires,
                sales_events: seeded.sales_events,
                search_events: seeded.search_events,
                customer_requests: seeded.customer_requests,
            };
            CommandResult::success_with_data("seed", message, summary)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

async fn load_and_verify(pool: &DbPool) -> Result<SeedResult, CommandError> {
    let seeded = DemoYardDataset::load(pool, Utc::now())
        .await
        .map_err(|error| ("seed_execution", error.to_string(), EXIT_SEED))?;
    let verification = DemoYardDataset::verify(pool)
        .await
        .map_err(|error| ("seed_verification", error.to_string(), EXIT_SEED))?;

    if !verification.all_present {
        return Err(("seed_verification", verification_failure_message(&verification.checks), EXIT_SEED));
    }
    Ok(seeded)
}

fn verification_failure_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "some seed data failed to load".to_string()
    } else {
        format!("seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
