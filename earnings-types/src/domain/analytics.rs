//! Time-bucketed analytics data model.
//!
//! These are plain output types; the single-pass aggregation that produces
//! them lives in the application layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::charge::PaymentMethod;
use super::money::Money;

/// Width of an analytics bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Hour,
}

/// One fixed-width aggregation unit of the time series.
///
/// Day buckets cover one calendar day (UTC); hour buckets cover one
/// hour-of-day (0-23) irrespective of date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsBucket {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub granularity: Granularity,
    /// Sum of settled amounts for paid charges in this bucket.
    pub revenue: Money,
    pub paid_count: u64,
    pub pending_count: u64,
    pub failed_count: u64,
}

impl AnalyticsBucket {
    pub fn zero(
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        granularity: Granularity,
    ) -> Self {
        Self {
            period_start,
            period_end,
            granularity,
            revenue: Money::ZERO,
            paid_count: 0,
            pending_count: 0,
            failed_count: 0,
        }
    }
}

/// Paid-charge grouping by payment method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MethodBreakdown {
    pub method: PaymentMethod,
    pub value: Money,
    pub count: u64,
    /// Share of total paid value, display-only. Independent per-bucket
    /// rounding means the percentages need not sum to exactly 100.
    pub percent: f64,
}

/// Conversion funnel figures. Every division is guarded; empty inputs
/// yield zeros, never a panic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FunnelMetrics {
    pub total_orders: u64,
    pub paid_orders: u64,
    /// `paid / total * 100`, 0 when there are no orders.
    pub conversion_rate: f64,
    pub total_paid_value: Money,
    /// Average settled value per paid order, in cents.
    pub average_ticket: Money,
    pub unique_customers: u64,
    /// Settled value per distinct customer, in cents.
    pub revenue_per_customer: Money,
}

/// All four analytics views, produced together from one pass so the
/// revenue totals agree across them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub daily: Vec<AnalyticsBucket>,
    /// Exactly 24 hour-of-day buckets.
    pub hourly: Vec<AnalyticsBucket>,
    pub methods: Vec<MethodBreakdown>,
    pub funnel: FunnelMetrics,
    pub total_revenue: Money,
}

impl AnalyticsReport {
    /// Hour of day (0-23) with the highest revenue, if any revenue exists.
    pub fn peak_hour(&self) -> Option<usize> {
        self.hourly
            .iter()
            .enumerate()
            .filter(|(_, b)| b.revenue.is_positive())
            .max_by_key(|(_, b)| b.revenue)
            .map(|(hour, _)| hour)
    }
}
