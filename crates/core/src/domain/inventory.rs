use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An active, in-stock inventory row as read for one organization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub size_key: String,
    pub quantity: u32,
    /// DOT manufacture week (1..=53).
    pub dot_week: Option<u32>,
    /// DOT manufacture year, two or four digits.
    pub dot_year: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// One demand event (sale, zero-result search, or open customer request).
///
/// `size` is a size key for sales and searches; customer requests carry
/// whatever the customer typed and are normalized during aggregation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandEvent {
    pub size: String,
    pub quantity: Option<u32>,
}

impl DemandEvent {
    pub fn new(size: impl Into<String>, quantity: Option<u32>) -> Self {
        Self { size: size.into(), quantity }
    }

    /// Missing quantities count as a single unit.
    pub fn units(&self) -> u32 {
        self.quantity.unwrap_or(1)
    }
}
