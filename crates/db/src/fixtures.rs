use chrono::{DateTime, Duration, Utc};

use crate::connection::DbPool;
use crate::repositories::recommendation::timestamp;
use crate::repositories::RepositoryError;

/// Deterministic demo yards covering restock, stale, overstock and
/// capacity-limited situations. Event times are relative to the load time
/// so the data stays inside the default demand windows.
const SEED_YARDS: &[SeedYardContract] = &[
    SeedYardContract {
        org_id: "yard-northside",
        name: "Northside Used Tires",
        capacity_total_tires: Some(60),
        stale_age_days: None,
        min_search_threshold: None,
        expected_active_units: 27,
        description: "Busy yard with a stale size and an overstocked size",
    },
    SeedYardContract {
        org_id: "yard-eastgate",
        name: "Eastgate Tire Exchange",
        capacity_total_tires: None,
        stale_age_days: Some(1200),
        min_search_threshold: Some(2),
        expected_active_units: 6,
        description: "Yard with custom settings running on default capacity",
    },
    SeedYardContract {
        org_id: "yard-harbor",
        name: "Harbor Road Tires",
        capacity_total_tires: Some(12),
        stale_age_days: None,
        min_search_threshold: None,
        expected_active_units: 10,
        description: "Small lot that runs out of capacity while restocking",
    },
];

const SEED_TIRES: &[SeedTire] = &[
    SeedTire::new("yard-northside", "205-55-16", 2, Some((22, 2023)), 40, "active"),
    SeedTire::new("yard-northside", "235-75-15", 4, Some((11, 2017)), 300, "active"),
    SeedTire::new("yard-northside", "195-65-15", 14, Some((5, 24)), 60, "active"),
    SeedTire::new("yard-northside", "215-60-16", 7, None, 15, "active"),
    SeedTire::new("yard-northside", "225-45-17", 3, None, 10, "sold"),
    SeedTire::new("yard-eastgate", "265-70-17", 4, Some((40, 2021)), 90, "active"),
    SeedTire::new("yard-eastgate", "205-55-16", 2, None, 5, "active"),
    SeedTire::new("yard-eastgate", "185-60-14", 0, None, 5, "active"),
    SeedTire::new("yard-harbor", "225-65-17", 10, Some((30, 2024)), 20, "active"),
];

const SEED_SALES: &[SeedEvent] = &[
    SeedEvent::new("yard-northside", "205-55-16", Some(4), 5, "sale"),
    SeedEvent::new("yard-northside", "205-55-16", Some(2), 33, "sale"),
    SeedEvent::new("yard-northside", "205-55-16", Some(4), 61, "sale"),
    SeedEvent::new("yard-northside", "215-60-16", Some(2), 20, "sale"),
    SeedEvent::new("yard-northside", "215-60-16", Some(4), 120, "sale"),
    SeedEvent::new("yard-eastgate", "205-55-16", Some(6), 12, "sale"),
    SeedEvent::new("yard-harbor", "205-55-16", Some(8), 14, "sale"),
    SeedEvent::new("yard-harbor", "195-65-15", Some(4), 30, "sale"),
];

const SEED_SEARCHES: &[SeedEvent] = &[
    SeedEvent::new("yard-northside", "225-45-17", None, 2, "zero_results"),
    SeedEvent::new("yard-northside", "225-45-17", Some(2), 9, "zero_results"),
    SeedEvent::new("yard-northside", "225-45-17", Some(4), 25, "zero_results"),
    SeedEvent::new("yard-northside", "245-40-18", None, 8, "zero_results"),
    SeedEvent::new("yard-northside", "205-55-16", Some(4), 3, "found"),
    SeedEvent::new("yard-eastgate", "245-40-18", Some(2), 4, "zero_results"),
    SeedEvent::new("yard-eastgate", "245-40-18", Some(2), 40, "zero_results"),
];

const SEED_REQUESTS: &[SeedEvent] = &[
    SeedEvent::new("yard-northside", "225/45R17", Some(4), 6, "new"),
    SeedEvent::new("yard-northside", "P235/75R15", Some(2), 11, "closed"),
    SeedEvent::new("yard-eastgate", "265/70ZR17", None, 3, "in_progress"),
    SeedEvent::new("yard-harbor", "LT245-75-16", Some(4), 2, "new"),
];

pub struct DemoYardDataset;

impl DemoYardDataset {
    pub fn organization_ids() -> Vec<&'static str> {
        SEED_YARDS.iter().map(|yard| yard.org_id).collect()
    }

    /// Replaces any previously seeded demo yards. Idempotent.
    pub async fn load(pool: &DbPool, now: DateTime<Utc>) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        for yard in SEED_YARDS {
            sqlx::query("DELETE FROM organizations WHERE id = ?")
                .bind(yard.org_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                "INSERT INTO organizations (id, name, capacity_total_tires, recommendations_stale, created_at)
                 VALUES (?, ?, ?, 1, ?)",
            )
            .bind(yard.org_id)
            .bind(yard.name)
            .bind(yard.capacity_total_tires)
            .bind(timestamp(now))
            .execute(&mut *tx)
            .await?;

            if yard.stale_age_days.is_some() || yard.min_search_threshold.is_some() {
                sqlx::query(
                    "INSERT INTO inventory_settings (org_id, stale_age_days, min_search_threshold)
                     VALUES (?, COALESCE(?, 1800), COALESCE(?, 3))",
                )
                .bind(yard.org_id)
                .bind(yard.stale_age_days)
                .bind(yard.min_search_threshold)
                .execute(&mut *tx)
                .await?;
            }
        }

        for tire in SEED_TIRES {
            let (dot_week, dot_year) = tire.dot.map_or((None, None), |(w, y)| (Some(w), Some(y)));
            sqlx::query(
                "INSERT INTO tires (org_id, size_key, quantity, status, dot_week, dot_year, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(tire.org_id)
            .bind(tire.size_key)
            .bind(tire.quantity)
            .bind(tire.status)
            .bind(dot_week)
            .bind(dot_year)
            .bind(timestamp(now - Duration::days(tire.days_ago)))
            .execute(&mut *tx)
            .await?;
        }

        for sale in SEED_SALES {
            sqlx::query(
                "INSERT INTO sales_events (org_id, size_key, quantity, sold_at) VALUES (?, ?, ?, ?)",
            )
            .bind(sale.org_id)
            .bind(sale.size)
            .bind(sale.quantity.unwrap_or(1))
            .bind(timestamp(now - Duration::days(sale.days_ago)))
            .execute(&mut *tx)
            .await?;
        }

        for search in SEED_SEARCHES {
            sqlx::query(
                "INSERT INTO search_events (org_id, requested_size_key, requested_quantity, zero_results, searched_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(search.org_id)
            .bind(search.size)
            .bind(search.quantity)
            .bind(search.kind == "zero_results")
            .bind(timestamp(now - Duration::days(search.days_ago)))
            .execute(&mut *tx)
            .await?;
        }

        for request in SEED_REQUESTS {
            sqlx::query(
                "INSERT INTO customer_requests (org_id, size, quantity, status, created_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(request.org_id)
            .bind(request.size)
            .bind(request.quantity)
            .bind(request.kind)
            .bind(timestamp(now - Duration::days(request.days_ago)))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let yards_seeded = SEED_YARDS
            .iter()
            .map(|yard| YardSeedInfo {
                org_id: yard.org_id,
                name: yard.name,
                description: yard.description,
            })
            .collect();

        Ok(SeedResult {
            yards_seeded,
            tires: SEED_TIRES.len(),
            sales_events: SEED_SALES.len(),
            search_events: SEED_SEARCHES.len(),
            customer_requests: SEED_REQUESTS.len(),
        })
    }

    /// Checks that every demo yard exists with its expected active stock.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for yard in SEED_YARDS {
            let exists: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM organizations WHERE id = ?1)")
                    .bind(yard.org_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((yard.org_id, exists == 1));

            let units: i64 = sqlx::query_scalar(
                "SELECT COALESCE(SUM(quantity), 0) FROM tires WHERE org_id = ?1 AND status = 'active'",
            )
            .bind(yard.org_id)
            .fetch_one(pool)
            .await?;
            checks.push((yard.stock_label(), units == yard.expected_active_units));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the demo yards; dependent rows go with them.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for yard in SEED_YARDS {
            sqlx::query("DELETE FROM organizations WHERE id = ?")
                .bind(yard.org_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedYardContract {
    org_id: &'static str,
    name: &'static str,
    capacity_total_tires: Option<i64>,
    stale_age_days: Option<i64>,
    min_search_threshold: Option<i64>,
    expected_active_units: i64,
    description: &'static str,
}

impl SeedYardContract {
    fn stock_label(&self) -> &'static str {
        match self.org_id {
            "yard-northside" => "northside-active-units",
            "yard-eastgate" => "eastgate-active-units",
            _ => "harbor-active-units",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedTire {
    org_id: &'static str,
    size_key: &'static str,
    quantity: i64,
    /// (week, year) as printed on the sidewall.
    dot: Option<(i64, i64)>,
    days_ago: i64,
    status: &'static str,
}

impl SeedTire {
    const fn new(
        org_id: &'static str,
        size_key: &'static str,
        quantity: i64,
        dot: Option<(i64, i64)>,
        days_ago: i64,
        status: &'static str,
    ) -> Self {
        Self { org_id, size_key, quantity, dot, days_ago, status }
    }
}

/// Sale, search or request row. `kind` is the request status or the
/// search outcome.
#[derive(Debug, Clone, Copy)]
struct SeedEvent {
    org_id: &'static str,
    size: &'static str,
    quantity: Option<i64>,
    days_ago: i64,
    kind: &'static str,
}

impl SeedEvent {
    const fn new(
        org_id: &'static str,
        size: &'static str,
        quantity: Option<i64>,
        days_ago: i64,
        kind: &'static str,
    ) -> Self {
        Self { org_id, size, quantity, days_ago, kind }
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub yards_seeded: Vec<YardSeedInfo>,
    pub tires: usize,
    pub sales_events: usize,
    pub search_events: usize,
    pub customer_requests: usize,
}

#[derive(Debug)]
pub struct YardSeedInfo {
    pub org_id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use tireslingers_core::domain::organization::OrganizationId;
    use tireslingers_core::domain::recommendation::{
        RecommendationAction, RecommendationFlag, RecommendationPriority,
    };
    use tireslingers_core::domain::settings::RecommendationDefaults;
    use tireslingers_core::recommendations::RecommendationEngine;

    use super::*;
    use crate::repositories::SqlRecommendationStore;
    use crate::{connect_with_settings, migrations};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).single().expect("valid ts")
    }

    async fn seeded_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");
        migrations::run_pending(&pool).await.expect("run migrations");
        DemoYardDataset::load(&pool, now()).await.expect("load seed fixtures");
        pool
    }

    #[test]
    fn seed_rows_reference_seeded_yards() {
        let ids = DemoYardDataset::organization_ids();
        assert!(SEED_TIRES.iter().all(|tire| ids.contains(&tire.org_id)));
        assert!(SEED_SALES.iter().all(|sale| ids.contains(&sale.org_id)));
        assert!(SEED_SEARCHES.iter().all(|search| ids.contains(&search.org_id)));
        assert!(SEED_REQUESTS.iter().all(|request| ids.contains(&request.org_id)));
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = seeded_pool().await;

        let first = DemoYardDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(first.all_present, "{:?}", first.checks);

        let reloaded = DemoYardDataset::load(&pool, now()).await.expect("reload seed fixtures");
        assert_eq!(reloaded.yards_seeded.len(), 3);
        let second = DemoYardDataset::verify(&pool).await.expect("re-verify seed fixtures");
        assert_eq!(first.checks, second.checks);

        let tire_rows: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM tires").fetch_one(&pool).await.expect("count");
        assert_eq!(tire_rows, SEED_TIRES.len() as i64);
    }

    #[tokio::test]
    async fn clean_removes_dependent_rows() {
        let pool = seeded_pool().await;

        DemoYardDataset::clean(&pool).await.expect("clean fixtures");

        let verification = DemoYardDataset::verify(&pool).await.expect("verify");
        assert!(!verification.all_present);
        let sales_rows: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM sales_events")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(sales_rows, 0);
    }

    #[tokio::test]
    async fn northside_yard_produces_expected_mix() {
        let pool = seeded_pool().await;
        let engine = RecommendationEngine::new(
            SqlRecommendationStore::new(pool),
            RecommendationDefaults::default(),
        );

        let run = engine.run(&OrganizationId::new("yard-northside"), now()).await.expect("run");
        let find = |key: &str| {
            run.recommendations
                .iter()
                .find(|rec| rec.size_key == key)
                .unwrap_or_else(|| panic!("missing {key}"))
        };

        let stale = find("235-75-15");
        assert_eq!(stale.flag, Some(RecommendationFlag::Stale));
        assert_eq!(stale.action, RecommendationAction::Purge);
        assert_eq!(stale.need_units, -4);

        let overstocked = find("195-65-15");
        assert_eq!(overstocked.flag, Some(RecommendationFlag::Overstock));
        assert_eq!(overstocked.need_units, -14);

        let searched = find("225-45-17");
        assert_eq!(searched.action, RecommendationAction::Stock);
        assert_eq!(searched.searches_90d, 7);
        assert_eq!(searched.requests_90d, 4);
        assert_eq!(searched.priority, RecommendationPriority::High);

        assert_eq!(run.capacity_total, 60);
        assert_eq!(run.total_current_stock, 27);
    }
}
