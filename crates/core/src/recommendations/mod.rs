//! Stock recommendation engine.
//!
//! Turns an organization's inventory and demand signals (sales, zero-result
//! searches, open customer requests) into per-size stock / purge / hold
//! recommendations, rationed against facility capacity.

pub mod age;
pub mod aggregate;
pub mod batch;
pub mod capacity;
pub mod classifier;
pub mod engine;
pub mod metrics;
pub mod size;
pub mod store;

pub use aggregate::{DemandInputs, StockSnapshot};
pub use batch::{run_batch, BatchFailure, BatchOutcome, BatchRunSummary};
pub use capacity::{allocate_capacity, CapacitySummary};
pub use classifier::{DemandRates, RecommendationClassifier};
pub use engine::{compute_recommendations, ComputedRecommendations, EngineInputs, RecommendationEngine};
pub use metrics::{build_metrics, SizeMetrics};
pub use size::{normalize_size, parse_size, parse_size_key, to_size_display, SizeKey, SizeParse};
pub use store::RecommendationStore;
