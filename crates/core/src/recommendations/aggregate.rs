//! Groups raw rows by size key.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::age::row_age_days;
use super::size::normalize_size;
use crate::domain::inventory::{DemandEvent, InventoryRow};

/// Units on hand for one size, with one age sample per unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StockSnapshot {
    pub units: u32,
    pub ages_days: Vec<i64>,
}

/// Everything the metric calculator needs for one organization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DemandInputs {
    pub inventory: BTreeMap<String, StockSnapshot>,
    pub sales: BTreeMap<String, u32>,
    pub searches: BTreeMap<String, u32>,
    pub requests: BTreeMap<String, u32>,
}

impl DemandInputs {
    pub fn from_rows(
        inventory: &[InventoryRow],
        sales: &[DemandEvent],
        searches: &[DemandEvent],
        requests: &[DemandEvent],
        today: NaiveDate,
    ) -> Self {
        Self {
            inventory: aggregate_inventory(inventory, today),
            sales: sum_by_key(sales),
            searches: sum_by_key(searches),
            requests: sum_requests(requests),
        }
    }
}

pub fn aggregate_inventory(
    rows: &[InventoryRow],
    today: NaiveDate,
) -> BTreeMap<String, StockSnapshot> {
    let mut snapshots: BTreeMap<String, StockSnapshot> = BTreeMap::new();
    for row in rows.iter().filter(|row| row.quantity > 0) {
        let age = row_age_days(row, today);
        let snapshot = snapshots.entry(row.size_key.clone()).or_default();
        snapshot.units = snapshot.units.saturating_add(row.quantity);
        snapshot.ages_days.extend(std::iter::repeat(age).take(row.quantity as usize));
    }
    snapshots
}

pub fn sum_by_key(events: &[DemandEvent]) -> BTreeMap<String, u32> {
    let mut totals: BTreeMap<String, u32> = BTreeMap::new();
    for event in events {
        let total = totals.entry(event.size.clone()).or_insert(0);
        *total = total.saturating_add(event.units());
    }
    totals
}

/// Customer requests carry free-form sizes; they are normalized before summing.
pub fn sum_requests(events: &[DemandEvent]) -> BTreeMap<String, u32> {
    let mut totals: BTreeMap<String, u32> = BTreeMap::new();
    for event in events {
        let total = totals.entry(normalize_size(&event.size)).or_insert(0);
        *total = total.saturating_add(event.units());
    }
    totals
}
