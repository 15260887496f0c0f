use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use tracing::debug;
use uuid::Uuid;

use tireslingers_core::domain::inventory::{DemandEvent, InventoryRow};
use tireslingers_core::domain::organization::OrganizationId;
use tireslingers_core::domain::recommendation::{
    RecommendationFlag, StockRecommendation, StoredRecommendation,
};
use tireslingers_core::domain::settings::InventorySettings;
use tireslingers_core::errors::ApplicationError;
use tireslingers_core::recommendations::RecommendationStore;

use super::RepositoryError;
use crate::DbPool;

/// SQLite-backed reads and writes for the recommendation engine.
pub struct SqlRecommendationStore {
    pool: DbPool,
}

impl SqlRecommendationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn fetch_inventory(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<InventoryRow>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT size_key, quantity, dot_week, dot_year, created_at
             FROM tires
             WHERE org_id = ? AND status = 'active' AND quantity > 0",
        )
        .bind(organization_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(inventory_row_from_row).collect()
    }

    async fn fetch_settings(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<InventorySettings>, RepositoryError> {
        let row = sqlx::query(
            "SELECT sales_window_days, search_window_days, min_search_threshold, stale_age_days,
                    overstock_percent, safety_multiplier, packaging_set_size,
                    enable_search_demand, enable_request_demand
             FROM inventory_settings
             WHERE org_id = ?",
        )
        .bind(organization_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(settings_from_row).transpose()
    }

    async fn fetch_capacity(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<u32>, RepositoryError> {
        let row = sqlx::query("SELECT capacity_total_tires FROM organizations WHERE id = ?")
            .bind(organization_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let capacity: Option<i64> = row.try_get("capacity_total_tires")?;
        capacity.map(|value| to_u32(value, "capacity_total_tires")).transpose()
    }

    async fn fetch_events(
        &self,
        sql: &str,
        organization_id: &OrganizationId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DemandEvent>, RepositoryError> {
        let rows = sqlx::query(sql)
            .bind(organization_id.as_str())
            .bind(timestamp(since))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(demand_event_from_row).collect()
    }

    async fn write_recommendations(
        &self,
        organization_id: &OrganizationId,
        recommendations: &[StockRecommendation],
        computed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM stock_recommendations WHERE org_id = ?")
            .bind(organization_id.as_str())
            .execute(&self.pool)
            .await?;

        let computed_at = timestamp(computed_at);
        for (position, rec) in recommendations.iter().enumerate() {
            let reasons = serde_json::to_string(&rec.reasons)
                .map_err(|error| RepositoryError::Decode(error.to_string()))?;
            sqlx::query(
                "INSERT INTO stock_recommendations
                    (id, org_id, size_key, size_display, current_stock, target_stock, need_units,
                     action, priority, flag, sales_90d, searches_90d, requests_90d,
                     sales_per_month, searches_per_month, requests_per_month,
                     avg_age_days, oldest_age_days, reasons, rank_position, computed_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(organization_id.as_str())
            .bind(&rec.size_key)
            .bind(&rec.size_display)
            .bind(i64::from(rec.current_stock))
            .bind(i64::from(rec.target_stock))
            .bind(rec.need_units)
            .bind(rec.action.as_str())
            .bind(rec.priority.as_str())
            .bind(rec.flag.map(|flag| flag.as_str()))
            .bind(i64::from(rec.sales_90d))
            .bind(i64::from(rec.searches_90d))
            .bind(i64::from(rec.requests_90d))
            .bind(rec.sales_per_month)
            .bind(rec.searches_per_month)
            .bind(rec.requests_per_month)
            .bind(rec.avg_age_days)
            .bind(rec.oldest_age_days)
            .bind(reasons)
            .bind(position as i64)
            .bind(&computed_at)
            .execute(&self.pool)
            .await?;
        }

        sqlx::query("UPDATE organizations SET recommendations_stale = 0 WHERE id = ?")
            .bind(organization_id.as_str())
            .execute(&self.pool)
            .await?;

        debug!(
            event_name = "recommendations.store.replaced",
            organization_id = %organization_id,
            rows = recommendations.len(),
            "stored recommendation set replaced"
        );
        Ok(())
    }

    async fn fetch_recommendations(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<StoredRecommendation>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, org_id, size_key, size_display, current_stock, target_stock, need_units,
                    action, priority, flag, sales_90d, searches_90d, requests_90d,
                    sales_per_month, searches_per_month, requests_per_month,
                    avg_age_days, oldest_age_days, reasons, computed_at
             FROM stock_recommendations
             WHERE org_id = ?
             ORDER BY rank_position ASC",
        )
        .bind(organization_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(stored_recommendation_from_row).collect()
    }

    async fn fetch_organization_ids(
        &self,
        stale_only: bool,
    ) -> Result<Vec<OrganizationId>, RepositoryError> {
        let sql = if stale_only {
            "SELECT id FROM organizations WHERE recommendations_stale = 1 ORDER BY id"
        } else {
            "SELECT id FROM organizations ORDER BY id"
        };
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<OrganizationId, RepositoryError> {
                Ok(OrganizationId(row.try_get("id")?))
            })
            .collect()
    }
}

#[async_trait]
impl RecommendationStore for SqlRecommendationStore {
    async fn load_inventory(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<InventoryRow>, ApplicationError> {
        Ok(self.fetch_inventory(organization_id).await?)
    }

    async fn load_settings(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<InventorySettings>, ApplicationError> {
        Ok(self.fetch_settings(organization_id).await?)
    }

    async fn load_capacity(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<u32>, ApplicationError> {
        Ok(self.fetch_capacity(organization_id).await?)
    }

    async fn load_sales(
        &self,
        organization_id: &OrganizationId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DemandEvent>, ApplicationError> {
        let sql = "SELECT size_key AS size, quantity
                   FROM sales_events
                   WHERE org_id = ? AND sold_at >= ?";
        Ok(self.fetch_events(sql, organization_id, since).await?)
    }

    async fn load_failed_searches(
        &self,
        organization_id: &OrganizationId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DemandEvent>, ApplicationError> {
        let sql = "SELECT requested_size_key AS size, requested_quantity AS quantity
                   FROM search_events
                   WHERE org_id = ? AND searched_at >= ?
                     AND zero_results = 1 AND requested_size_key IS NOT NULL";
        Ok(self.fetch_events(sql, organization_id, since).await?)
    }

    async fn load_open_requests(
        &self,
        organization_id: &OrganizationId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DemandEvent>, ApplicationError> {
        let sql = "SELECT size, quantity
                   FROM customer_requests
                   WHERE org_id = ? AND created_at >= ? AND status IN ('new', 'in_progress')";
        Ok(self.fetch_events(sql, organization_id, since).await?)
    }

    async fn replace_recommendations(
        &self,
        organization_id: &OrganizationId,
        recommendations: &[StockRecommendation],
        computed_at: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        Ok(self.write_recommendations(organization_id, recommendations, computed_at).await?)
    }

    async fn list_recommendations(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<StoredRecommendation>, ApplicationError> {
        Ok(self.fetch_recommendations(organization_id).await?)
    }

    async fn list_organizations(&self) -> Result<Vec<OrganizationId>, ApplicationError> {
        Ok(self.fetch_organization_ids(false).await?)
    }

    async fn list_stale_organizations(&self) -> Result<Vec<OrganizationId>, ApplicationError> {
        Ok(self.fetch_organization_ids(true).await?)
    }
}

/// Canonical text form for stored timestamps; lexical order matches time order.
pub fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column} `{raw}`: {error}")))
}

fn to_u32(value: i64, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("{column} `{value}` is out of range")))
}

fn optional_u32(value: Option<i64>, column: &str) -> Result<Option<u32>, RepositoryError> {
    value.map(|value| to_u32(value, column)).transpose()
}

fn inventory_row_from_row(row: &SqliteRow) -> Result<InventoryRow, RepositoryError> {
    let created_at: String = row.try_get("created_at")?;
    Ok(InventoryRow {
        size_key: row.try_get("size_key")?,
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        dot_week: optional_u32(row.try_get("dot_week")?, "dot_week")?,
        dot_year: optional_u32(row.try_get("dot_year")?, "dot_year")?,
        created_at: parse_timestamp(&created_at, "created_at")?,
    })
}

fn demand_event_from_row(row: &SqliteRow) -> Result<DemandEvent, RepositoryError> {
    Ok(DemandEvent {
        size: row.try_get("size")?,
        quantity: optional_u32(row.try_get("quantity")?, "quantity")?,
    })
}

fn settings_from_row(row: &SqliteRow) -> Result<InventorySettings, RepositoryError> {
    Ok(InventorySettings {
        sales_window_days: to_u32(row.try_get("sales_window_days")?, "sales_window_days")?,
        search_window_days: to_u32(row.try_get("search_window_days")?, "search_window_days")?,
        min_search_threshold: to_u32(
            row.try_get("min_search_threshold")?,
            "min_search_threshold",
        )?,
        stale_age_days: to_u32(row.try_get("stale_age_days")?, "stale_age_days")?,
        overstock_percent: row.try_get("overstock_percent")?,
        safety_multiplier: row.try_get("safety_multiplier")?,
        packaging_set_size: to_u32(row.try_get("packaging_set_size")?, "packaging_set_size")?,
        enable_search_demand: row.try_get("enable_search_demand")?,
        enable_request_demand: row.try_get("enable_request_demand")?,
    })
}

fn stored_recommendation_from_row(row: &SqliteRow) -> Result<StoredRecommendation, RepositoryError> {
    let decode = |error: tireslingers_core::DomainError| RepositoryError::Decode(error.to_string());

    let action: String = row.try_get("action")?;
    let priority: String = row.try_get("priority")?;
    let flag: Option<String> = row.try_get("flag")?;
    let reasons: String = row.try_get("reasons")?;
    let computed_at: String = row.try_get("computed_at")?;

    let recommendation = StockRecommendation {
        size_key: row.try_get("size_key")?,
        size_display: row.try_get("size_display")?,
        current_stock: to_u32(row.try_get("current_stock")?, "current_stock")?,
        target_stock: to_u32(row.try_get("target_stock")?, "target_stock")?,
        need_units: row.try_get("need_units")?,
        action: action.parse().map_err(decode)?,
        priority: priority.parse().map_err(decode)?,
        flag: flag.map(|flag| flag.parse::<RecommendationFlag>()).transpose().map_err(decode)?,
        sales_90d: to_u32(row.try_get("sales_90d")?, "sales_90d")?,
        searches_90d: to_u32(row.try_get("searches_90d")?, "searches_90d")?,
        requests_90d: to_u32(row.try_get("requests_90d")?, "requests_90d")?,
        sales_per_month: row.try_get("sales_per_month")?,
        searches_per_month: row.try_get("searches_per_month")?,
        requests_per_month: row.try_get("requests_per_month")?,
        avg_age_days: row.try_get("avg_age_days")?,
        oldest_age_days: row.try_get("oldest_age_days")?,
        reasons: serde_json::from_str(&reasons)
            .map_err(|error| RepositoryError::Decode(format!("reasons: {error}")))?,
    };

    Ok(StoredRecommendation {
        id: row.try_get("id")?,
        organization_id: OrganizationId(row.try_get("org_id")?),
        computed_at: parse_timestamp(&computed_at, "computed_at")?,
        recommendation,
    })
}
