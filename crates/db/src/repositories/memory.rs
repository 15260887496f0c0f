use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use tireslingers_core::domain::inventory::{DemandEvent, InventoryRow};
use tireslingers_core::domain::organization::OrganizationId;
use tireslingers_core::domain::recommendation::{StockRecommendation, StoredRecommendation};
use tireslingers_core::domain::settings::InventorySettings;
use tireslingers_core::errors::ApplicationError;
use tireslingers_core::recommendations::RecommendationStore;

struct OrganizationState {
    inventory: Vec<InventoryRow>,
    settings: Option<InventorySettings>,
    capacity: Option<u32>,
    sales: Vec<(DateTime<Utc>, DemandEvent)>,
    failed_searches: Vec<(DateTime<Utc>, DemandEvent)>,
    open_requests: Vec<(DateTime<Utc>, DemandEvent)>,
    recommendations: Vec<StoredRecommendation>,
    stale: bool,
}

impl OrganizationState {
    fn new() -> Self {
        Self {
            inventory: Vec::new(),
            settings: None,
            capacity: None,
            sales: Vec::new(),
            failed_searches: Vec::new(),
            open_requests: Vec::new(),
            recommendations: Vec::new(),
            stale: true,
        }
    }
}

fn within(events: &[(DateTime<Utc>, DemandEvent)], since: DateTime<Utc>) -> Vec<DemandEvent> {
    events.iter().filter(|(at, _)| *at >= since).map(|(_, event)| event.clone()).collect()
}

/// Process-local store. Organizations are created on first write and start
/// out stale, like freshly inserted rows. Only `mark_stale` sets the flag
/// afterwards.
#[derive(Default)]
pub struct InMemoryRecommendationStore {
    organizations: RwLock<BTreeMap<OrganizationId, OrganizationState>>,
}

impl InMemoryRecommendationStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn with_org<F>(&self, organization_id: &OrganizationId, apply: F)
    where
        F: FnOnce(&mut OrganizationState),
    {
        let mut organizations = self.organizations.write().await;
        let state =
            organizations.entry(organization_id.clone()).or_insert_with(OrganizationState::new);
        apply(state);
    }

    pub async fn add_organization(&self, organization_id: &OrganizationId) {
        self.with_org(organization_id, |_| {}).await;
    }

    pub async fn set_settings(&self, organization_id: &OrganizationId, settings: InventorySettings) {
        self.with_org(organization_id, |state| state.settings = Some(settings)).await;
    }

    pub async fn set_capacity(&self, organization_id: &OrganizationId, capacity: u32) {
        self.with_org(organization_id, |state| state.capacity = Some(capacity)).await;
    }

    pub async fn add_inventory(&self, organization_id: &OrganizationId, row: InventoryRow) {
        self.with_org(organization_id, |state| state.inventory.push(row)).await;
    }

    pub async fn record_sale(
        &self,
        organization_id: &OrganizationId,
        at: DateTime<Utc>,
        event: DemandEvent,
    ) {
        self.with_org(organization_id, |state| state.sales.push((at, event))).await;
    }

    pub async fn record_failed_search(
        &self,
        organization_id: &OrganizationId,
        at: DateTime<Utc>,
        event: DemandEvent,
    ) {
        self.with_org(organization_id, |state| state.failed_searches.push((at, event))).await;
    }

    pub async fn record_open_request(
        &self,
        organization_id: &OrganizationId,
        at: DateTime<Utc>,
        event: DemandEvent,
    ) {
        self.with_org(organization_id, |state| state.open_requests.push((at, event))).await;
    }

    pub async fn mark_stale(&self, organization_id: &OrganizationId) {
        self.with_org(organization_id, |state| state.stale = true).await;
    }
}

#[async_trait]
impl RecommendationStore for InMemoryRecommendationStore {
    async fn load_inventory(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<InventoryRow>, ApplicationError> {
        let organizations = self.organizations.read().await;
        Ok(organizations
            .get(organization_id)
            .map(|state| state.inventory.iter().filter(|row| row.quantity > 0).cloned().collect())
            .unwrap_or_default())
    }

    async fn load_settings(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<InventorySettings>, ApplicationError> {
        let organizations = self.organizations.read().await;
        Ok(organizations.get(organization_id).and_then(|state| state.settings.clone()))
    }

    async fn load_capacity(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<u32>, ApplicationError> {
        let organizations = self.organizations.read().await;
        Ok(organizations.get(organization_id).and_then(|state| state.capacity))
    }

    async fn load_sales(
        &self,
        organization_id: &OrganizationId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DemandEvent>, ApplicationError> {
        let organizations = self.organizations.read().await;
        Ok(organizations
            .get(organization_id)
            .map(|state| within(&state.sales, since))
            .unwrap_or_default())
    }

    async fn load_failed_searches(
        &self,
        organization_id: &OrganizationId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DemandEvent>, ApplicationError> {
        let organizations = self.organizations.read().await;
        Ok(organizations
            .get(organization_id)
            .map(|state| within(&state.failed_searches, since))
            .unwrap_or_default())
    }

    async fn load_open_requests(
        &self,
        organization_id: &OrganizationId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DemandEvent>, ApplicationError> {
        let organizations = self.organizations.read().await;
        Ok(organizations
            .get(organization_id)
            .map(|state| within(&state.open_requests, since))
            .unwrap_or_default())
    }

    async fn replace_recommendations(
        &self,
        organization_id: &OrganizationId,
        recommendations: &[StockRecommendation],
        computed_at: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        let stored: Vec<StoredRecommendation> = recommendations
            .iter()
            .map(|recommendation| StoredRecommendation {
                id: Uuid::new_v4().to_string(),
                organization_id: organization_id.clone(),
                computed_at,
                recommendation: recommendation.clone(),
            })
            .collect();

        self.with_org(organization_id, |state| {
            state.recommendations = stored;
            state.stale = false;
        })
        .await;
        Ok(())
    }

    async fn list_recommendations(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<StoredRecommendation>, ApplicationError> {
        let organizations = self.organizations.read().await;
        Ok(organizations
            .get(organization_id)
            .map(|state| state.recommendations.clone())
            .unwrap_or_default())
    }

    async fn list_organizations(&self) -> Result<Vec<OrganizationId>, ApplicationError> {
        let organizations = self.organizations.read().await;
        Ok(organizations.keys().cloned().collect())
    }

    async fn list_stale_organizations(&self) -> Result<Vec<OrganizationId>, ApplicationError> {
        let organizations = self.organizations.read().await;
        Ok(organizations
            .iter()
            .filter(|(_, state)| state.stale)
            .map(|(organization_id, _)| organization_id.clone())
            .collect())
    }
}
