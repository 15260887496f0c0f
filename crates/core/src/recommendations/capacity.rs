//! Greedy rationing of "stock" recommendations against facility capacity.
//!
//! Purge and hold entries are never touched. Stock entries are served in
//! priority order, busiest sizes first on ties; the walk is greedy and
//! order-dependent.

use serde::{Deserialize, Serialize};

use crate::domain::recommendation::{RecommendationAction, StockRecommendation};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitySummary {
    pub total_current_stock: u64,
    pub capacity_used: u64,
}

pub fn allocate_capacity(
    recommendations: &mut [StockRecommendation],
    capacity_total: u32,
) -> CapacitySummary {
    let total_current_stock: u64 =
        recommendations.iter().map(|rec| u64::from(rec.current_stock)).sum();
    let capacity = i64::from(capacity_total);
    let mut projected_stock = i64::try_from(total_current_stock).unwrap_or(i64::MAX);

    let mut stock_order: Vec<usize> = recommendations
        .iter()
        .enumerate()
        .filter(|(_, rec)| rec.action == RecommendationAction::Stock)
        .map(|(index, _)| index)
        .collect();
    // Vec::sort_by_key is stable, so equal keys keep input order, which is
    // size-key order coming out of the metrics pass.
    stock_order.sort_by_key(|index| {
        let rec = &recommendations[*index];
        let demand = u64::from(rec.sales_90d) + u64::from(rec.searches_90d);
        (rec.priority.rank(), std::cmp::Reverse(demand))
    });

    for index in stock_order {
        let rec = &mut recommendations[index];
        let available = capacity - projected_stock;

        if available <= 0 {
            rec.need_units = 0;
            rec.action = RecommendationAction::Hold;
            rec.reasons.push("At capacity limit, nothing more can be stocked".to_string());
        } else if rec.need_units > available {
            rec.reasons.push(format!(
                "Limited by capacity (reduced from {} to {available})",
                rec.need_units
            ));
            rec.need_units = available;
        }

        projected_stock += rec.need_units;
    }

    CapacitySummary {
        total_current_stock,
        capacity_used: u64::try_from(projected_stock).unwrap_or(0),
    }
}
