use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::organization::OrganizationId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationAction {
    Stock,
    Purge,
    Hold,
}

impl RecommendationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Purge => "purge",
            Self::Hold => "hold",
        }
    }

    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::Stock => 0,
            Self::Purge => 1,
            Self::Hold => 2,
        }
    }
}

impl FromStr for RecommendationAction {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "stock" => Ok(Self::Stock),
            "purge" => Ok(Self::Purge),
            "hold" => Ok(Self::Hold),
            other => Err(DomainError::UnknownValue { kind: "action", value: other.to_owned() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    High,
    Medium,
    Low,
}

impl RecommendationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Sort rank, lowest first.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

impl FromStr for RecommendationPriority {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(DomainError::UnknownValue { kind: "priority", value: other.to_owned() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationFlag {
    Normal,
    Overstock,
    Stale,
}

impl RecommendationFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Overstock => "overstock",
            Self::Stale => "stale",
        }
    }
}

impl FromStr for RecommendationFlag {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "normal" => Ok(Self::Normal),
            "overstock" => Ok(Self::Overstock),
            "stale" => Ok(Self::Stale),
            other => Err(DomainError::UnknownValue { kind: "flag", value: other.to_owned() }),
        }
    }
}

/// The engine's verdict for one size in one organization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockRecommendation {
    pub size_key: String,
    pub size_display: String,
    pub current_stock: u32,
    pub target_stock: u32,
    /// Positive means stock more, negative means reduce.
    pub need_units: i64,
    pub action: RecommendationAction,
    pub priority: RecommendationPriority,
    pub flag: Option<RecommendationFlag>,
    pub sales_90d: u32,
    pub searches_90d: u32,
    pub requests_90d: u32,
    pub sales_per_month: f64,
    pub searches_per_month: f64,
    pub requests_per_month: f64,
    pub avg_age_days: Option<f64>,
    pub oldest_age_days: Option<i64>,
    pub reasons: Vec<String>,
}

/// A recommendation as it sits in storage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredRecommendation {
    pub id: String,
    pub organization_id: OrganizationId,
    pub computed_at: DateTime<Utc>,
    pub recommendation: StockRecommendation,
}

/// Result of one engine invocation for one organization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRun {
    pub organization_id: OrganizationId,
    pub computed_at: DateTime<Utc>,
    pub recommendations: Vec<StockRecommendation>,
    pub total_current_stock: u64,
    pub capacity_used: u64,
    pub capacity_total: u32,
}

impl RecommendationRun {
    pub fn count_by_action(&self, action: RecommendationAction) -> usize {
        self.recommendations.iter().filter(|rec| rec.action == action).count()
    }
}
