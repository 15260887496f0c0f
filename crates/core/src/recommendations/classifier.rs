//! Per-size classification: target stock, signed need, action, priority
//! and the reasons behind them.

use super::metrics::SizeMetrics;
use crate::domain::recommendation::{
    RecommendationAction, RecommendationFlag, RecommendationPriority, StockRecommendation,
};
use crate::domain::settings::InventorySettings;

const DAYS_PER_MONTH: f64 = 30.0;
const DAYS_PER_YEAR: f64 = 365.0;

/// Monthly-normalized demand rates for one size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DemandRates {
    pub sales_per_month: f64,
    pub searches_per_month: f64,
    pub requests_per_month: f64,
}

impl DemandRates {
    pub fn max_demand(&self) -> f64 {
        self.sales_per_month.max(self.searches_per_month).max(self.requests_per_month)
    }
}

#[derive(Debug, Clone)]
pub struct RecommendationClassifier {
    settings: InventorySettings,
}

impl RecommendationClassifier {
    pub fn new(settings: InventorySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &InventorySettings {
        &self.settings
    }

    fn search_signal_counts(&self, search_count: u32) -> bool {
        self.settings.enable_search_demand && search_count >= self.settings.min_search_threshold
    }

    pub fn demand_rates(&self, metrics: &SizeMetrics) -> DemandRates {
        let sales_per_month = monthly_rate(metrics.sales_count, self.settings.sales_window_days);
        let searches_per_month = if self.search_signal_counts(metrics.search_count) {
            monthly_rate(metrics.search_count, self.settings.search_window_days)
        } else {
            0.0
        };
        let requests_per_month = if self.settings.enable_request_demand {
            monthly_rate(metrics.request_count, self.settings.search_window_days)
        } else {
            0.0
        };

        DemandRates { sales_per_month, searches_per_month, requests_per_month }
    }

    pub fn classify(&self, metrics: &SizeMetrics) -> StockRecommendation {
        let rates = self.demand_rates(metrics);
        let max_demand = rates.max_demand();
        let target_stock = target_for(max_demand, self.settings.safety_multiplier);
        let current_stock = i64::from(metrics.current_stock);

        let mut need_units = i64::from(target_stock) - current_stock;
        let mut action = RecommendationAction::Hold;
        let mut flag = RecommendationFlag::Normal;
        let mut reasons = Vec::new();

        let stale = metrics
            .oldest_age_days
            .filter(|oldest| *oldest > i64::from(self.settings.stale_age_days));
        let overstock_ceiling =
            f64::from(target_stock) * (1.0 + self.settings.overstock_percent / 100.0);

        if let Some(oldest) = stale {
            flag = RecommendationFlag::Stale;
            reasons.push(format!(
                "Stale inventory: oldest unit is {:.1} years old",
                oldest as f64 / DAYS_PER_YEAR
            ));
            if current_stock > 0 {
                action = RecommendationAction::Purge;
                need_units = -current_stock;
            }
        } else if current_stock as f64 > overstock_ceiling {
            let excess = current_stock - i64::from(target_stock);
            flag = RecommendationFlag::Overstock;
            action = RecommendationAction::Purge;
            need_units = -excess;
            reasons.push(format!("Overstocked by {excess} units over target of {target_stock}"));
        } else if need_units > 0 {
            action = RecommendationAction::Stock;
        }

        if metrics.sales_count > 0 {
            reasons.push(format!(
                "{} sold in last {} days",
                metrics.sales_count, self.settings.sales_window_days
            ));
        }
        if metrics.search_count > 0 && self.search_signal_counts(metrics.search_count) {
            reasons.push(format!(
                "{} searches with no results in last {} days",
                metrics.search_count, self.settings.search_window_days
            ));
        }
        if metrics.request_count > 0 && self.settings.enable_request_demand {
            reasons.push(format!("{} open customer requests", metrics.request_count));
        }
        if current_stock == 0 && max_demand > 0.0 {
            reasons.push("Out of stock with active demand".to_string());
        }
        if reasons.is_empty() && current_stock > 0 {
            reasons.push("No recent demand signals".to_string());
        }

        let priority = priority_for(action, flag, need_units, current_stock, max_demand);

        StockRecommendation {
            size_key: metrics.size_key.clone(),
            size_display: metrics.size_display.clone(),
            current_stock: metrics.current_stock,
            target_stock,
            need_units,
            action,
            priority,
            flag: Some(flag),
            sales_90d: metrics.sales_count,
            searches_90d: metrics.search_count,
            requests_90d: metrics.request_count,
            sales_per_month: rates.sales_per_month,
            searches_per_month: rates.searches_per_month,
            requests_per_month: rates.requests_per_month,
            avg_age_days: metrics.avg_age_days,
            oldest_age_days: metrics.oldest_age_days,
            reasons,
        }
    }
}

impl Default for RecommendationClassifier {
    fn default() -> Self {
        Self::new(InventorySettings::default())
    }
}

/// `count / window * 30`, evaluated as `count * 30 / window` so whole-month
/// ratios stay exact. A zero-length window yields no demand.
pub fn monthly_rate(count: u32, window_days: u32) -> f64 {
    if window_days == 0 {
        return 0.0;
    }
    f64::from(count) * DAYS_PER_MONTH / f64::from(window_days)
}

fn target_for(max_demand: f64, safety_multiplier: f64) -> u32 {
    let target = (max_demand * safety_multiplier).ceil();
    if target.is_finite() && target > 0.0 {
        target.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

fn priority_for(
    action: RecommendationAction,
    flag: RecommendationFlag,
    need_units: i64,
    current_stock: i64,
    max_demand: f64,
) -> RecommendationPriority {
    match action {
        RecommendationAction::Stock => {
            if (current_stock == 0 && max_demand >= 2.0) || need_units >= 4 {
                RecommendationPriority::High
            } else if need_units >= 2 {
                RecommendationPriority::Medium
            } else {
                RecommendationPriority::Low
            }
        }
        RecommendationAction::Purge => {
            let magnitude = need_units.abs();
            if flag == RecommendationFlag::Stale || magnitude >= 6 {
                RecommendationPriority::High
            } else if magnitude >= 3 {
                RecommendationPriority::Medium
            } else {
                RecommendationPriority::Low
            }
        }
        RecommendationAction::Hold => RecommendationPriority::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::{monthly_rate, RecommendationClassifier};
    use crate::domain::recommendation::{
        RecommendationAction, RecommendationFlag, RecommendationPriority,
    };
    use crate::domain::settings::InventorySettings;
    use crate::recommendations::metrics::SizeMetrics;

    fn metrics(current_stock: u32) -> SizeMetrics {
        SizeMetrics {
            size_key: "205-55-16".to_string(),
            size_display: "205/55R16".to_string(),
            current_stock,
            sales_count: 0,
            search_count: 0,
            request_count: 0,
            avg_age_days: if current_stock > 0 { Some(30.0) } else { None },
            oldest_age_days: if current_stock > 0 { Some(30) } else { None },
        }
    }

    #[test]
    fn out_of_stock_size_with_sales_is_high_priority_stock() {
        let classifier = RecommendationClassifier::default();
        let rec = classifier.classify(&SizeMetrics { sales_count: 6, ..metrics(0) });

        assert_eq!(rec.sales_per_month, 2.0);
        assert_eq!(rec.target_stock, 4);
        assert_eq!(rec.need_units, 4);
        assert_eq!(rec.action, RecommendationAction::Stock);
        assert_eq!(rec.priority, RecommendationPriority::High);
        assert_eq!(rec.flag, Some(RecommendationFlag::Normal));
        assert_eq!(
            rec.reasons,
            vec!["6 sold in last 90 days".to_string(), "Out of stock with active demand".to_string()]
        );
    }

    #[test]
    fn stale_stock_is_purged_entirely_regardless_of_demand() {
        let classifier = RecommendationClassifier::default();
        let rec = classifier.classify(&SizeMetrics {
            sales_count: 30,
            oldest_age_days: Some(2000),
            avg_age_days: Some(1500.0),
            ..metrics(5)
        });

        assert_eq!(rec.target_stock, 20);
        assert_eq!(rec.action, RecommendationAction::Purge);
        assert_eq!(rec.flag, Some(RecommendationFlag::Stale));
        assert_eq!(rec.need_units, -5);
        assert_eq!(rec.priority, RecommendationPriority::High);
        assert_eq!(rec.reasons[0], "Stale inventory: oldest unit is 5.5 years old");
        assert!(!rec.reasons.iter().any(|reason| reason == "No recent demand signals"));
    }

    #[test]
    fn stale_flag_without_stock_reports_only() {
        let classifier = RecommendationClassifier::default();
        let rec = classifier.classify(&SizeMetrics {
            sales_count: 6,
            oldest_age_days: Some(2000),
            ..metrics(0)
        });

        assert_eq!(rec.flag, Some(RecommendationFlag::Stale));
        assert_eq!(rec.action, RecommendationAction::Hold);
        assert_eq!(rec.need_units, 4);
        assert_eq!(rec.priority, RecommendationPriority::Low);
    }

    #[test]
    fn stale_age_at_threshold_is_not_stale() {
        let classifier = RecommendationClassifier::default();
        let rec = classifier.classify(&SizeMetrics { oldest_age_days: Some(1800), ..metrics(2) });
        assert_ne!(rec.flag, Some(RecommendationFlag::Stale));
    }

    #[test]
    fn overstock_threshold_boundary() {
        // 15 sales over 90 days -> 5/month -> target 10.
        let classifier = RecommendationClassifier::default();

        let at_ceiling = classifier.classify(&SizeMetrics { sales_count: 15, ..metrics(14) });
        assert_eq!(at_ceiling.target_stock, 10);
        assert_eq!(at_ceiling.flag, Some(RecommendationFlag::Normal));
        assert_eq!(at_ceiling.action, RecommendationAction::Hold);
        assert_eq!(at_ceiling.need_units, -4);

        let over = classifier.classify(&SizeMetrics { sales_count: 15, ..metrics(16) });
        assert_eq!(over.flag, Some(RecommendationFlag::Overstock));
        assert_eq!(over.action, RecommendationAction::Purge);
        assert_eq!(over.need_units, -6);
        assert_eq!(over.priority, RecommendationPriority::High);
        assert_eq!(over.reasons[0], "Overstocked by 6 units over target of 10");
    }

    #[test]
    fn searches_below_threshold_are_ignored() {
        let classifier = RecommendationClassifier::default();
        let rec = classifier.classify(&SizeMetrics { search_count: 2, ..metrics(0) });

        assert_eq!(rec.searches_per_month, 0.0);
        assert_eq!(rec.searches_90d, 2);
        assert_eq!(rec.action, RecommendationAction::Hold);
        assert!(rec.reasons.iter().all(|reason| !reason.contains("searches")));
        assert!(rec.reasons.is_empty());
    }

    #[test]
    fn disabled_signals_do_not_drive_demand_or_reasons() {
        let classifier = RecommendationClassifier::new(InventorySettings {
            enable_search_demand: false,
            enable_request_demand: false,
            ..InventorySettings::default()
        });
        let rec = classifier.classify(&SizeMetrics {
            search_count: 12,
            request_count: 9,
            ..metrics(0)
        });

        assert_eq!(rec.target_stock, 0);
        assert_eq!(rec.action, RecommendationAction::Hold);
        assert!(rec.reasons.is_empty());
        assert_eq!(rec.requests_90d, 9);
    }

    #[test]
    fn requests_have_no_minimum_threshold() {
        let classifier = RecommendationClassifier::default();
        let rec = classifier.classify(&SizeMetrics { request_count: 3, ..metrics(0) });

        assert_eq!(rec.requests_per_month, 1.0);
        assert_eq!(rec.target_stock, 2);
        assert_eq!(rec.action, RecommendationAction::Stock);
        assert_eq!(rec.priority, RecommendationPriority::Medium);
        assert_eq!(
            rec.reasons,
            vec!["3 open customer requests".to_string(), "Out of stock with active demand".to_string()]
        );
    }

    #[test]
    fn idle_stock_without_demand_is_overstock_against_zero_target() {
        let classifier = RecommendationClassifier::default();

        let stocked = classifier.classify(&metrics(2));
        assert_eq!(stocked.target_stock, 0);
        assert_eq!(stocked.flag, Some(RecommendationFlag::Overstock));
        assert_eq!(stocked.need_units, -2);
        assert_eq!(stocked.reasons, vec!["Overstocked by 2 units over target of 0".to_string()]);

        let minimal = classifier.classify(&SizeMetrics { sales_count: 3, ..metrics(2) });
        assert_eq!(minimal.action, RecommendationAction::Hold);
        assert_eq!(minimal.reasons, vec!["3 sold in last 90 days".to_string()]);

        let empty = classifier.classify(&metrics(0));
        assert!(empty.reasons.is_empty());
        assert_eq!(empty.priority, RecommendationPriority::Low);
    }

    #[test]
    fn purge_priority_scales_with_excess() {
        let classifier = RecommendationClassifier::default();
        // target 2 (3 sales -> 1/month), ceiling 3.
        let small = classifier.classify(&SizeMetrics { sales_count: 3, ..metrics(4) });
        assert_eq!(small.need_units, -2);
        assert_eq!(small.priority, RecommendationPriority::Low);

        let medium = classifier.classify(&SizeMetrics { sales_count: 3, ..metrics(5) });
        assert_eq!(medium.need_units, -3);
        assert_eq!(medium.priority, RecommendationPriority::Medium);
    }

    #[test]
    fn monthly_rate_guards_zero_window() {
        assert_eq!(monthly_rate(10, 0), 0.0);
        assert_eq!(monthly_rate(6, 90), 2.0);
    }

    #[test]
    fn whole_month_rates_do_not_round_up_the_target() {
        let classifier = RecommendationClassifier::new(InventorySettings {
            sales_window_days: 30,
            ..InventorySettings::default()
        });
        let rec = classifier.classify(&SizeMetrics { sales_count: 31, ..metrics(0) });

        assert_eq!(monthly_rate(31, 30), 31.0);
        assert_eq!(rec.sales_per_month, 31.0);
        assert_eq!(rec.target_stock, 62);
        assert_eq!(rec.need_units, 62);
    }
}
