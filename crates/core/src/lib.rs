pub mod config;
pub mod domain;
pub mod errors;
pub mod recommendations;

pub use domain::inventory::{DemandEvent, InventoryRow};
pub use domain::organization::OrganizationId;
pub use domain::recommendation::{
    RecommendationAction, RecommendationFlag, RecommendationPriority, RecommendationRun,
    StockRecommendation, StoredRecommendation,
};
pub use domain::settings::{InventorySettings, RecommendationDefaults, DEFAULT_CAPACITY_TOTAL_TIRES};
pub use errors::{ApplicationError, DomainError};
pub use recommendations::{RecommendationEngine, RecommendationStore};
