//! Recommendation engine orchestration.
//!
//! One run handles one organization end to end:
//! aggregate → metrics → classify → allocate capacity → persist.

use std::cmp::Reverse;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::aggregate::DemandInputs;
use super::capacity::{allocate_capacity, CapacitySummary};
use super::classifier::RecommendationClassifier;
use super::metrics::build_metrics;
use super::store::RecommendationStore;
use crate::domain::organization::OrganizationId;
use crate::domain::recommendation::{RecommendationRun, StockRecommendation};
use crate::domain::settings::{InventorySettings, RecommendationDefaults};
use crate::errors::ApplicationError;

/// Everything fetched for one organization before scoring.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineInputs {
    pub demand: DemandInputs,
    pub settings: InventorySettings,
    pub capacity_total: u32,
}

/// Output of the pure scoring pass.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputedRecommendations {
    pub recommendations: Vec<StockRecommendation>,
    pub summary: CapacitySummary,
}

/// Scores every size and rations restocking against `capacity_total`.
/// The result is ranked for display.
pub fn compute_recommendations(
    demand: &DemandInputs,
    settings: &InventorySettings,
    capacity_total: u32,
) -> ComputedRecommendations {
    let classifier = RecommendationClassifier::new(settings.clone());
    let mut recommendations: Vec<StockRecommendation> =
        build_metrics(demand).iter().map(|metrics| classifier.classify(metrics)).collect();

    let summary = allocate_capacity(&mut recommendations, capacity_total);
    rank(&mut recommendations);

    ComputedRecommendations { recommendations, summary }
}

fn rank(recommendations: &mut [StockRecommendation]) {
    recommendations.sort_by(|a, b| {
        (a.priority.rank(), a.action.rank(), Reverse(a.need_units.unsigned_abs()), &a.size_key)
            .cmp(&(
                b.priority.rank(),
                b.action.rank(),
                Reverse(b.need_units.unsigned_abs()),
                &b.size_key,
            ))
    });
}

pub struct RecommendationEngine<S> {
    store: S,
    defaults: RecommendationDefaults,
}

impl<S> RecommendationEngine<S> {
    pub fn new(store: S, defaults: RecommendationDefaults) -> Self {
        Self { store, defaults }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn defaults(&self) -> &RecommendationDefaults {
        &self.defaults
    }
}

impl<S> RecommendationEngine<S>
where
    S: RecommendationStore,
{
    /// Reads every input for `organization_id`. Nothing is written.
    pub async fn gather(
        &self,
        organization_id: &OrganizationId,
        now: DateTime<Utc>,
    ) -> Result<EngineInputs, ApplicationError> {
        let settings = match self.store.load_settings(organization_id).await? {
            Some(settings) => {
                settings.validate().map_err(|error| {
                    ApplicationError::Configuration(format!(
                        "inventory settings for {organization_id}: {error}"
                    ))
                })?;
                settings
            }
            None => self.defaults.settings.clone(),
        };
        let capacity_total = self
            .store
            .load_capacity(organization_id)
            .await?
            .unwrap_or(self.defaults.capacity_total_tires);

        let sales_since = now - Duration::days(i64::from(settings.sales_window_days));
        let search_since = now - Duration::days(i64::from(settings.search_window_days));

        let inventory = self.store.load_inventory(organization_id).await?;
        let sales = self.store.load_sales(organization_id, sales_since).await?;
        let searches = self.store.load_failed_searches(organization_id, search_since).await?;
        let requests = self.store.load_open_requests(organization_id, search_since).await?;

        debug!(
            event_name = "recommendations.inputs.loaded",
            organization_id = %organization_id,
            inventory_rows = inventory.len(),
            sales_events = sales.len(),
            search_events = searches.len(),
            request_events = requests.len(),
            "recommendation inputs loaded"
        );

        let demand =
            DemandInputs::from_rows(&inventory, &sales, &searches, &requests, now.date_naive());
        Ok(EngineInputs { demand, settings, capacity_total })
    }

    /// Recomputes and replaces the stored recommendation set.
    pub async fn run(
        &self,
        organization_id: &OrganizationId,
        now: DateTime<Utc>,
    ) -> Result<RecommendationRun, ApplicationError> {
        info!(
            event_name = "recommendations.run.started",
            organization_id = %organization_id,
            "recommendation run started"
        );

        let inputs = self.gather(organization_id, now).await?;
        let computed =
            compute_recommendations(&inputs.demand, &inputs.settings, inputs.capacity_total);

        self.store.replace_recommendations(organization_id, &computed.recommendations, now).await?;
        info!(
            event_name = "recommendations.run.persisted",
            organization_id = %organization_id,
            recommendation_count = computed.recommendations.len(),
            "recommendations replaced and stale flag cleared"
        );

        let run = RecommendationRun {
            organization_id: organization_id.clone(),
            computed_at: now,
            recommendations: computed.recommendations,
            total_current_stock: computed.summary.total_current_stock,
            capacity_used: computed.summary.capacity_used,
            capacity_total: inputs.capacity_total,
        };

        info!(
            event_name = "recommendations.run.completed",
            organization_id = %organization_id,
            total_current_stock = run.total_current_stock,
            capacity_used = run.capacity_used,
            capacity_total = run.capacity_total,
            "recommendation run completed"
        );
        Ok(run)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{compute_recommendations, RecommendationEngine};
    use crate::domain::inventory::{DemandEvent, InventoryRow};
    use crate::domain::organization::OrganizationId;
    use crate::domain::recommendation::{
        RecommendationAction, RecommendationPriority, StockRecommendation, StoredRecommendation,
    };
    use crate::domain::settings::{InventorySettings, RecommendationDefaults};
    use crate::errors::ApplicationError;
    use crate::recommendations::aggregate::{DemandInputs, StockSnapshot};
    use crate::recommendations::store::RecommendationStore;

    pub(crate) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).single().expect("valid ts")
    }

    /// Demand events carry a timestamp so window filtering is exercised.
    #[derive(Default)]
    pub(crate) struct FakeStore {
        pub inventory: Vec<InventoryRow>,
        pub sales: Vec<(DateTime<Utc>, DemandEvent)>,
        pub searches: Vec<(DateTime<Utc>, DemandEvent)>,
        pub requests: Vec<(DateTime<Utc>, DemandEvent)>,
        pub settings: Option<InventorySettings>,
        pub capacity: Option<u32>,
        pub fail_inventory: bool,
        pub fail_write: bool,
        pub written: Mutex<HashMap<String, Vec<StockRecommendation>>>,
        pub stale_cleared: Mutex<Vec<String>>,
    }

    fn within(events: &[(DateTime<Utc>, DemandEvent)], since: DateTime<Utc>) -> Vec<DemandEvent> {
        events.iter().filter(|(at, _)| *at >= since).map(|(_, event)| event.clone()).collect()
    }

    #[async_trait]
    impl RecommendationStore for FakeStore {
        async fn load_inventory(
            &self,
            _organization_id: &OrganizationId,
        ) -> Result<Vec<InventoryRow>, ApplicationError> {
            if self.fail_inventory {
                return Err(ApplicationError::Persistence("inventory unavailable".to_string()));
            }
            Ok(self.inventory.clone())
        }

        async fn load_settings(
            &self,
            _organization_id: &OrganizationId,
        ) -> Result<Option<InventorySettings>, ApplicationError> {
            Ok(self.settings.clone())
        }

        async fn load_capacity(
            &self,
            _organization_id: &OrganizationId,
        ) -> Result<Option<u32>, ApplicationError> {
            Ok(self.capacity)
        }

        async fn load_sales(
            &self,
            _organization_id: &OrganizationId,
            since: DateTime<Utc>,
        ) -> Result<Vec<DemandEvent>, ApplicationError> {
            Ok(within(&self.sales, since))
        }

        async fn load_failed_searches(
            &self,
            _organization_id: &OrganizationId,
            since: DateTime<Utc>,
        ) -> Result<Vec<DemandEvent>, ApplicationError> {
            Ok(within(&self.searches, since))
        }

        async fn load_open_requests(
            &self,
            _organization_id: &OrganizationId,
            since: DateTime<Utc>,
        ) -> Result<Vec<DemandEvent>, ApplicationError> {
            Ok(within(&self.requests, since))
        }

        async fn replace_recommendations(
            &self,
            organization_id: &OrganizationId,
            recommendations: &[StockRecommendation],
            _computed_at: DateTime<Utc>,
        ) -> Result<(), ApplicationError> {
            if self.fail_write {
                return Err(ApplicationError::Persistence("disk I/O error".to_string()));
            }
            let mut written = self.written.lock().expect("written lock");
            written.insert(organization_id.0.clone(), recommendations.to_vec());
            self.stale_cleared.lock().expect("stale lock").push(organization_id.0.clone());
            Ok(())
        }

        async fn list_recommendations(
            &self,
            _organization_id: &OrganizationId,
        ) -> Result<Vec<StoredRecommendation>, ApplicationError> {
            Ok(Vec::new())
        }

        async fn list_organizations(&self) -> Result<Vec<OrganizationId>, ApplicationError> {
            Ok(Vec::new())
        }

        async fn list_stale_organizations(
            &self,
        ) -> Result<Vec<OrganizationId>, ApplicationError> {
            Ok(Vec::new())
        }
    }

    fn sale(days_ago: i64, quantity: u32) -> (DateTime<Utc>, DemandEvent) {
        (now() - Duration::days(days_ago), DemandEvent::new("205-55-16", Some(quantity)))
    }

    #[tokio::test]
    async fn first_time_size_with_sales_is_stocked() {
        let store = FakeStore {
            sales: vec![sale(10, 2), sale(40, 3), sale(80, 1), sale(120, 50)],
            capacity: Some(200),
            ..FakeStore::default()
        };
        let engine = RecommendationEngine::new(store, RecommendationDefaults::default());
        let org = OrganizationId::new("yard-1");

        let run = engine.run(&org, now()).await.expect("run succeeds");

        assert_eq!(run.recommendations.len(), 1);
        let rec = &run.recommendations[0];
        assert_eq!(rec.size_key, "205-55-16");
        assert_eq!(rec.size_display, "205/55R16");
        assert_eq!(rec.sales_90d, 6);
        assert_eq!(rec.sales_per_month, 2.0);
        assert_eq!(rec.target_stock, 4);
        assert_eq!(rec.need_units, 4);
        assert_eq!(rec.action, RecommendationAction::Stock);
        assert_eq!(rec.priority, RecommendationPriority::High);
        assert_eq!(run.total_current_stock, 0);
        assert_eq!(run.capacity_used, 4);
        assert_eq!(run.capacity_total, 200);

        let written = engine.store().written.lock().expect("written lock");
        assert_eq!(written.get("yard-1").map(Vec::len), Some(1));
        assert_eq!(*engine.store().stale_cleared.lock().expect("stale lock"), vec!["yard-1"]);
    }

    #[tokio::test]
    async fn missing_settings_and_capacity_use_supplied_defaults() {
        let store = FakeStore {
            inventory: vec![InventoryRow {
                size_key: "225-45-17".to_string(),
                quantity: 30,
                dot_week: None,
                dot_year: None,
                created_at: now() - Duration::days(5),
            }],
            ..FakeStore::default()
        };
        let defaults = RecommendationDefaults {
            settings: InventorySettings { overstock_percent: 10.0, ..InventorySettings::default() },
            capacity_total_tires: 25,
        };
        let engine = RecommendationEngine::new(store, defaults);

        let inputs = engine.gather(&OrganizationId::new("yard-2"), now()).await.expect("gather");
        assert_eq!(inputs.capacity_total, 25);
        assert_eq!(inputs.settings.overstock_percent, 10.0);
        assert_eq!(inputs.demand.inventory.get("225-45-17").map(|s| s.units), Some(30));
    }

    #[tokio::test]
    async fn read_failure_aborts_without_writing() {
        let store = FakeStore { fail_inventory: true, ..FakeStore::default() };
        let engine = RecommendationEngine::new(store, RecommendationDefaults::default());

        let error = engine.run(&OrganizationId::new("yard-3"), now()).await.expect_err("fails");

        assert!(matches!(error, ApplicationError::Persistence(_)));
        assert!(engine.store().written.lock().expect("written lock").is_empty());
        assert!(engine.store().stale_cleared.lock().expect("stale lock").is_empty());
    }

    #[tokio::test]
    async fn searches_and_requests_use_the_search_window() {
        let at = |days: i64| now() - Duration::days(days);
        let store = FakeStore {
            sales: vec![(at(45), DemandEvent::new("205-55-16", Some(2)))],
            searches: vec![
                (at(10), DemandEvent::new("205-55-16", Some(1))),
                (at(45), DemandEvent::new("205-55-16", Some(5))),
            ],
            requests: vec![
                (at(10), DemandEvent::new("205-55-16", Some(4))),
                (at(45), DemandEvent::new("205-55-16", Some(8))),
            ],
            settings: Some(InventorySettings {
                sales_window_days: 90,
                search_window_days: 30,
                ..InventorySettings::default()
            }),
            ..FakeStore::default()
        };
        let engine = RecommendationEngine::new(store, RecommendationDefaults::default());

        let inputs = engine.gather(&OrganizationId::new("yard-1"), now()).await.expect("gather");

        assert_eq!(inputs.demand.sales.get("205-55-16"), Some(&2));
        assert_eq!(inputs.demand.searches.get("205-55-16"), Some(&1));
        assert_eq!(inputs.demand.requests.get("205-55-16"), Some(&4));
    }

    #[tokio::test]
    async fn write_failure_is_returned_to_the_caller() {
        let store = FakeStore { sales: vec![sale(5, 6)], fail_write: true, ..FakeStore::default() };
        let engine = RecommendationEngine::new(store, RecommendationDefaults::default());

        let error = engine.run(&OrganizationId::new("yard-4"), now()).await.expect_err("fails");

        assert!(matches!(error, ApplicationError::Persistence(_)));
        assert!(engine.store().stale_cleared.lock().expect("stale lock").is_empty());
    }

    #[tokio::test]
    async fn invalid_stored_settings_are_a_configuration_failure() {
        let store = FakeStore {
            settings: Some(InventorySettings { safety_multiplier: 0.0, ..InventorySettings::default() }),
            ..FakeStore::default()
        };
        let engine = RecommendationEngine::new(store, RecommendationDefaults::default());

        let error = engine.run(&OrganizationId::new("yard-5"), now()).await.expect_err("fails");

        assert!(matches!(error, ApplicationError::Configuration(_)));
        assert_eq!(error.class(), "configuration");
        assert!(engine.store().written.lock().expect("written lock").is_empty());
    }

    #[test]
    fn output_is_ranked_by_priority_then_action() {
        let mut demand = DemandInputs::default();
        demand.sales.insert("195-65-15".to_string(), 3);
        demand.sales.insert("205-55-16".to_string(), 6);
        demand
            .inventory
            .insert("225-45-17".to_string(), StockSnapshot { units: 9, ages_days: vec![1; 9] });

        let computed = compute_recommendations(&demand, &InventorySettings::default(), 200);
        let order: Vec<(&str, RecommendationAction, RecommendationPriority)> = computed
            .recommendations
            .iter()
            .map(|rec| (rec.size_key.as_str(), rec.action, rec.priority))
            .collect();

        assert_eq!(
            order,
            vec![
                ("205-55-16", RecommendationAction::Stock, RecommendationPriority::High),
                ("225-45-17", RecommendationAction::Purge, RecommendationPriority::High),
                ("195-65-15", RecommendationAction::Stock, RecommendationPriority::Medium),
            ]
        );
        assert_eq!(computed.summary.total_current_stock, 9);
        assert_eq!(computed.summary.capacity_used, 9 + 4 + 2);
    }
}
