//! Single-pass analytics aggregation.
//!
//! One iteration over the charge snapshot produces all four views (daily
//! series, hourly series, method breakdown, funnel), so their revenue
//! totals always agree. Buckets are pre-built zero-filled for the whole
//! window; days without traffic still appear in the output.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};

use earnings_types::{
    AnalyticsBucket, AnalyticsReport, ChargeRecord, ChargeStatus, DomainError, FunnelMetrics,
    Granularity, MethodBreakdown, Money, PaymentMethod,
};

fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Zero-filled day buckets covering every calendar day touched by
/// `[start, end)`, oldest first.
fn daily_buckets(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<AnalyticsBucket> {
    let mut buckets = Vec::new();
    if end <= start {
        return buckets;
    }
    let last = (end - Duration::nanoseconds(1)).date_naive();
    let mut day = start.date_naive();
    while day <= last {
        let bucket_start = day_start(day);
        buckets.push(AnalyticsBucket::zero(
            bucket_start,
            bucket_start + Duration::days(1),
            Granularity::Day,
        ));
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    buckets
}

/// Exactly 24 hour-of-day buckets. Dates are collapsed: 09:00 on any day
/// lands in bucket 9, so the bucket bounds use the epoch day as a
/// placeholder date.
fn hourly_buckets() -> Vec<AnalyticsBucket> {
    (0..24)
        .map(|h| {
            let bucket_start = DateTime::UNIX_EPOCH + Duration::hours(h);
            AnalyticsBucket::zero(
                bucket_start,
                bucket_start + Duration::hours(1),
                Granularity::Hour,
            )
        })
        .collect()
}

/// Aggregates a charge snapshot over `[start, end)` in one pass.
///
/// Revenue counts only `paid` charges; refunded and canceled charges
/// participate in the order totals but contribute no revenue. Every
/// division in the funnel is guarded, so an empty window yields zeros.
pub fn aggregate(
    charges: &[ChargeRecord],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<AnalyticsReport, DomainError> {
    let mut daily = daily_buckets(start, end);
    let day_index: HashMap<NaiveDate, usize> = daily
        .iter()
        .enumerate()
        .map(|(i, b)| (b.period_start.date_naive(), i))
        .collect();
    let mut hourly = hourly_buckets();

    let mut by_method: HashMap<PaymentMethod, (Money, u64)> = HashMap::new();
    let mut customers: HashSet<&str> = HashSet::new();
    let mut total_orders: u64 = 0;
    let mut paid_orders: u64 = 0;
    let mut total_paid = Money::ZERO;

    for charge in charges {
        if charge.created_at < start || charge.created_at >= end {
            continue;
        }
        total_orders += 1;
        customers.insert(charge.customer_id.as_str());

        let day_slot = day_index.get(&charge.created_at.date_naive()).copied();
        let hour = charge.created_at.hour() as usize;

        match charge.status {
            ChargeStatus::Paid => {
                paid_orders += 1;
                total_paid = total_paid.checked_add(charge.paid_amount)?;

                if let Some(i) = day_slot {
                    daily[i].revenue = daily[i].revenue.checked_add(charge.paid_amount)?;
                    daily[i].paid_count += 1;
                }
                hourly[hour].revenue = hourly[hour].revenue.checked_add(charge.paid_amount)?;
                hourly[hour].paid_count += 1;

                let slot = by_method
                    .entry(charge.payment_method)
                    .or_insert((Money::ZERO, 0));
                slot.0 = slot.0.checked_add(charge.paid_amount)?;
                slot.1 += 1;
            }
            ChargeStatus::Pending => {
                if let Some(i) = day_slot {
                    daily[i].pending_count += 1;
                }
                hourly[hour].pending_count += 1;
            }
            ChargeStatus::Failed => {
                if let Some(i) = day_slot {
                    daily[i].failed_count += 1;
                }
                hourly[hour].failed_count += 1;
            }
            ChargeStatus::Canceled | ChargeStatus::Refunded => {}
        }
    }

    let mut methods: Vec<MethodBreakdown> = by_method
        .into_iter()
        .map(|(method, (value, count))| MethodBreakdown {
            method,
            value,
            count,
            percent: if total_paid.is_positive() {
                value.cents() as f64 / total_paid.cents() as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect();
    methods.sort_by(|a, b| b.value.cmp(&a.value));

    let unique_customers = customers.len() as u64;
    let funnel = FunnelMetrics {
        total_orders,
        paid_orders,
        conversion_rate: if total_orders > 0 {
            paid_orders as f64 / total_orders as f64 * 100.0
        } else {
            0.0
        },
        total_paid_value: total_paid,
        average_ticket: if paid_orders > 0 {
            Money::from_cents(total_paid.cents() / paid_orders as i64)
        } else {
            Money::ZERO
        },
        unique_customers,
        revenue_per_customer: if unique_customers > 0 {
            Money::from_cents(total_paid.cents() / unique_customers as i64)
        } else {
            Money::ZERO
        },
    };

    Ok(AnalyticsReport {
        start,
        end,
        daily,
        hourly,
        methods,
        funnel,
        total_revenue: total_paid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use earnings_types::{ChargeId, CustomerId, ProviderId};

    fn charge(
        id: &str,
        customer: &str,
        status: ChargeStatus,
        method: PaymentMethod,
        cents: i64,
        created_at: DateTime<Utc>,
    ) -> ChargeRecord {
        ChargeRecord {
            id: ChargeId::new(id),
            provider_id: ProviderId::new(),
            customer_id: CustomerId::new(customer),
            requested_amount: Money::from_cents(cents),
            paid_amount: if status == ChargeStatus::Paid {
                Money::from_cents(cents)
            } else {
                Money::ZERO
            },
            status,
            payment_method: method,
            created_at,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_window_yields_zeros() {
        let start = at(1, 0);
        let report = aggregate(&[], start, start + Duration::days(7)).unwrap();
        assert_eq!(report.daily.len(), 7);
        assert!(report.daily.iter().all(|b| b.revenue == Money::ZERO));
        assert_eq!(report.hourly.len(), 24);
        assert_eq!(report.funnel.total_orders, 0);
        assert_eq!(report.funnel.conversion_rate, 0.0);
        assert_eq!(report.funnel.average_ticket, Money::ZERO);
        assert_eq!(report.peak_hour(), None);
    }

    #[test]
    fn test_thirty_day_window_is_zero_filled() {
        let start = at(1, 0);
        let report = aggregate(&[], start, start + Duration::days(30)).unwrap();
        assert_eq!(report.daily.len(), 30);
        assert_eq!(report.daily[0].period_start, start);
        assert_eq!(
            report.daily[29].period_end,
            start + Duration::days(30)
        );
    }

    #[test]
    fn test_single_charge_in_long_window_lands_in_its_day() {
        let start = at(1, 0);
        let charges = vec![charge(
            "a",
            "c1",
            ChargeStatus::Paid,
            PaymentMethod::Pix,
            4200,
            at(5, 11),
        )];
        let report = aggregate(&charges, start, start + Duration::days(30)).unwrap();

        assert_eq!(report.daily.len(), 30);
        assert_eq!(report.daily[4].revenue.cents(), 4200);
        assert_eq!(report.daily[4].paid_count, 1);
        assert!(
            report
                .daily
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != 4)
                .all(|(_, b)| b.revenue == Money::ZERO && b.paid_count == 0)
        );
        assert_eq!(report.funnel.conversion_rate, 100.0);
        assert_eq!(report.total_revenue.cents(), 4200);
    }

    #[test]
    fn test_range_is_half_open() {
        let start = at(1, 0);
        let end = at(2, 0);
        let charges = vec![
            charge("a", "c1", ChargeStatus::Paid, PaymentMethod::Pix, 100, start),
            charge("b", "c2", ChargeStatus::Paid, PaymentMethod::Pix, 100, end),
        ];
        let report = aggregate(&charges, start, end).unwrap();
        assert_eq!(report.funnel.total_orders, 1);
        assert_eq!(report.total_revenue.cents(), 100);
    }

    #[test]
    fn test_funnel_and_breakdown_agree_with_totals() {
        let charges = vec![
            charge("a", "c1", ChargeStatus::Paid, PaymentMethod::Pix, 10000, at(1, 9)),
            charge("b", "c1", ChargeStatus::Paid, PaymentMethod::CreditCard, 30000, at(1, 9)),
            charge("c", "c2", ChargeStatus::Paid, PaymentMethod::Pix, 10000, at(2, 14)),
            charge("d", "c3", ChargeStatus::Pending, PaymentMethod::Boleto, 5000, at(2, 14)),
            charge("e", "c4", ChargeStatus::Failed, PaymentMethod::Pix, 7000, at(3, 20)),
        ];
        let report = aggregate(&charges, at(1, 0), at(4, 0)).unwrap();

        assert_eq!(report.funnel.total_orders, 5);
        assert_eq!(report.funnel.paid_orders, 3);
        assert_eq!(report.funnel.conversion_rate, 60.0);
        assert_eq!(report.funnel.total_paid_value.cents(), 50000);
        assert_eq!(report.funnel.unique_customers, 4);
        assert_eq!(report.funnel.average_ticket.cents(), 16666);
        assert_eq!(report.funnel.revenue_per_customer.cents(), 12500);
        assert_eq!(report.total_revenue.cents(), 50000);

        // Daily series sums to the same total.
        let daily_sum: i64 = report.daily.iter().map(|b| b.revenue.cents()).sum();
        assert_eq!(daily_sum, 50000);
        let hourly_sum: i64 = report.hourly.iter().map(|b| b.revenue.cents()).sum();
        assert_eq!(hourly_sum, 50000);

        // Method breakdown, largest first.
        assert_eq!(report.methods[0].method, PaymentMethod::CreditCard);
        assert_eq!(report.methods[0].value.cents(), 30000);
        assert_eq!(report.methods[0].percent, 60.0);
        assert_eq!(report.methods[1].method, PaymentMethod::Pix);
        assert_eq!(report.methods[1].count, 2);
        assert_eq!(report.methods[1].percent, 40.0);
    }

    #[test]
    fn test_peak_hour_picks_highest_revenue() {
        let charges = vec![
            charge("a", "c1", ChargeStatus::Paid, PaymentMethod::Pix, 100, at(1, 9)),
            charge("b", "c2", ChargeStatus::Paid, PaymentMethod::Pix, 900, at(2, 14)),
            charge("c", "c3", ChargeStatus::Paid, PaymentMethod::Pix, 200, at(3, 14)),
        ];
        let report = aggregate(&charges, at(1, 0), at(4, 0)).unwrap();
        assert_eq!(report.peak_hour(), Some(14));
        assert_eq!(report.hourly[14].paid_count, 2);
    }

    #[test]
    fn test_refunded_counts_as_order_but_not_revenue() {
        let mut refunded = charge("a", "c1", ChargeStatus::Refunded, PaymentMethod::Pix, 100, at(1, 9));
        refunded.paid_amount = Money::from_cents(100);
        let charges = vec![
            refunded,
            charge("b", "c2", ChargeStatus::Paid, PaymentMethod::Pix, 300, at(1, 10)),
        ];
        let report = aggregate(&charges, at(1, 0), at(2, 0)).unwrap();
        assert_eq!(report.funnel.total_orders, 2);
        assert_eq!(report.funnel.paid_orders, 1);
        assert_eq!(report.total_revenue.cents(), 300);
    }
}
