use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Facility capacity used when an organization has none recorded.
pub const DEFAULT_CAPACITY_TOTAL_TIRES: u32 = 200;

/// Per-organization tuning for the recommendation engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventorySettings {
    pub sales_window_days: u32,
    pub search_window_days: u32,
    pub min_search_threshold: u32,
    pub stale_age_days: u32,
    pub overstock_percent: f64,
    pub safety_multiplier: f64,
    pub packaging_set_size: u32,
    pub enable_search_demand: bool,
    pub enable_request_demand: bool,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            sales_window_days: 90,
            search_window_days: 90,
            min_search_threshold: 3,
            stale_age_days: 1800,
            overstock_percent: 50.0,
            safety_multiplier: 2.0,
            packaging_set_size: 4,
            enable_search_demand: true,
            enable_request_demand: true,
        }
    }
}

impl InventorySettings {
    /// Rejects records the classifier cannot score. Zero-length windows are
    /// allowed and yield no demand.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(self.safety_multiplier.is_finite() && self.safety_multiplier > 0.0) {
            return Err(DomainError::InvariantViolation(format!(
                "safety_multiplier must be positive, got {}",
                self.safety_multiplier
            )));
        }
        if !(self.overstock_percent.is_finite() && self.overstock_percent >= 0.0) {
            return Err(DomainError::InvariantViolation(format!(
                "overstock_percent must be zero or greater, got {}",
                self.overstock_percent
            )));
        }
        if self.packaging_set_size == 0 {
            return Err(DomainError::InvariantViolation(
                "packaging_set_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Immutable fallback record handed to the engine for organizations that
/// have no stored settings or capacity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationDefaults {
    pub settings: InventorySettings,
    pub capacity_total_tires: u32,
}

impl Default for RecommendationDefaults {
    fn default() -> Self {
        Self {
            settings: InventorySettings::default(),
            capacity_total_tires: DEFAULT_CAPACITY_TOTAL_TIRES,
        }
    }
}
