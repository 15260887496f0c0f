use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::aggregate::DemandInputs;
use super::size::to_size_display;

/// Raw per-size figures ahead of classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeMetrics {
    pub size_key: String,
    pub size_display: String,
    pub current_stock: u32,
    pub sales_count: u32,
    pub search_count: u32,
    pub request_count: u32,
    pub avg_age_days: Option<f64>,
    pub oldest_age_days: Option<i64>,
}

/// One record per size seen in any input, ordered by size key.
pub fn build_metrics(inputs: &DemandInputs) -> Vec<SizeMetrics> {
    let keys: BTreeSet<&String> = inputs
        .inventory
        .keys()
        .chain(inputs.sales.keys())
        .chain(inputs.searches.keys())
        .chain(inputs.requests.keys())
        .collect();

    keys.into_iter()
        .map(|key| {
            let stock = inputs.inventory.get(key);
            let current_stock = stock.map(|snapshot| snapshot.units).unwrap_or(0);
            let ages = stock.map(|snapshot| snapshot.ages_days.as_slice()).unwrap_or(&[]);

            let (avg_age_days, oldest_age_days) = if current_stock == 0 || ages.is_empty() {
                (None, None)
            } else {
                let total: i64 = ages.iter().sum();
                (Some(total as f64 / ages.len() as f64), ages.iter().copied().max())
            };

            SizeMetrics {
                size_key: key.clone(),
                size_display: to_size_display(key),
                current_stock,
                sales_count: inputs.sales.get(key).copied().unwrap_or(0),
                search_count: inputs.searches.get(key).copied().unwrap_or(0),
                request_count: inputs.requests.get(key).copied().unwrap_or(0),
                avg_age_days,
                oldest_age_days,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::build_metrics;
    use crate::recommendations::aggregate::{DemandInputs, StockSnapshot};

    fn inputs() -> DemandInputs {
        let mut inputs = DemandInputs::default();
        inputs
            .inventory
            .insert("205-55-16".to_string(), StockSnapshot { units: 3, ages_days: vec![10, 20, 60] });
        inputs.sales.insert("225-45-17".to_string(), 6);
        inputs.searches.insert("195-65-15".to_string(), 4);
        inputs.requests.insert("205-55-16".to_string(), 2);
        inputs.requests.insert("265-70-17".to_string(), 1);
        inputs
    }

    #[test]
    fn key_set_is_union_of_all_inputs() {
        let inputs = inputs();
        let metrics = build_metrics(&inputs);

        let keys: BTreeSet<String> = metrics.iter().map(|m| m.size_key.clone()).collect();
        let expected: BTreeSet<String> = inputs
            .inventory
            .keys()
            .chain(inputs.sales.keys())
            .chain(inputs.searches.keys())
            .chain(inputs.requests.keys())
            .cloned()
            .collect();
        assert_eq!(keys, expected);
        assert_eq!(metrics.len(), 4);
    }

    #[test]
    fn ages_only_cover_units_in_stock() {
        let metrics = build_metrics(&inputs());

        let stocked = metrics.iter().find(|m| m.size_key == "205-55-16").expect("stocked size");
        assert_eq!(stocked.current_stock, 3);
        assert_eq!(stocked.avg_age_days, Some(30.0));
        assert_eq!(stocked.oldest_age_days, Some(60));
        assert_eq!(stocked.request_count, 2);
        assert_eq!(stocked.size_display, "205/55R16");

        let searched = metrics.iter().find(|m| m.size_key == "195-65-15").expect("searched size");
        assert_eq!(searched.current_stock, 0);
        assert_eq!(searched.avg_age_days, None);
        assert_eq!(searched.oldest_age_days, None);
        assert_eq!(searched.search_count, 4);
    }
}
