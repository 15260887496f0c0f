use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::inventory::{DemandEvent, InventoryRow};
use crate::domain::organization::OrganizationId;
use crate::domain::recommendation::{StockRecommendation, StoredRecommendation};
use crate::domain::settings::InventorySettings;
use crate::errors::ApplicationError;

/// Data access the engine needs. Every call is scoped to one organization.
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Active rows with quantity above zero.
    async fn load_inventory(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<InventoryRow>, ApplicationError>;

    async fn load_settings(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<InventorySettings>, ApplicationError>;

    async fn load_capacity(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<u32>, ApplicationError>;

    async fn load_sales(
        &self,
        organization_id: &OrganizationId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DemandEvent>, ApplicationError>;

    /// Zero-result searches that named a size.
    async fn load_failed_searches(
        &self,
        organization_id: &OrganizationId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DemandEvent>, ApplicationError>;

    /// Customer requests in `new` or `in_progress` status.
    async fn load_open_requests(
        &self,
        organization_id: &OrganizationId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DemandEvent>, ApplicationError>;

    /// Deletes the organization's stored set, inserts `recommendations`, then
    /// clears its stale flag. The steps are not atomic.
    async fn replace_recommendations(
        &self,
        organization_id: &OrganizationId,
        recommendations: &[StockRecommendation],
        computed_at: DateTime<Utc>,
    ) -> Result<(), ApplicationError>;

    async fn list_recommendations(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<StoredRecommendation>, ApplicationError>;

    async fn list_organizations(&self) -> Result<Vec<OrganizationId>, ApplicationError>;

    async fn list_stale_organizations(&self) -> Result<Vec<OrganizationId>, ApplicationError>;
}
