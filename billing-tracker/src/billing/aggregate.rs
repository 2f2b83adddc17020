//! Period aggregation over billing records.
//!
//! Bucket keys are zero-padded and big-endian (`YYYY-MM-DD`, `YYYY-MM`), so the
//! lexicographic order of a `BTreeMap` is also chronological order.

use crate::models::{BillingRecord, EntryType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Bucket size for period aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    #[default]
    Monthly,
}

impl Granularity {
    /// Interpret a `range` query parameter. Anything but `daily` is monthly.
    pub fn from_range(range: Option<&str>) -> Self {
        match range.map(str::trim) {
            Some(r) if r.eq_ignore_ascii_case("daily") => Granularity::Daily,
            _ => Granularity::Monthly,
        }
    }

    /// strftime pattern shared with the store-level `$dateToString` stage.
    pub fn date_format(&self) -> &'static str {
        match self {
            Granularity::Daily => "%Y-%m-%d",
            Granularity::Monthly => "%Y-%m",
        }
    }

    /// Truncate a stored date to its bucket key. Uses the stored UTC value as-is.
    pub fn period_key(&self, date: &DateTime<Utc>) -> String {
        date.format(self.date_format()).to_string()
    }
}

impl From<EntryType> for Granularity {
    fn from(entry_type: EntryType) -> Self {
        match entry_type {
            EntryType::Daily => Granularity::Daily,
            EntryType::Monthly => Granularity::Monthly,
        }
    }
}

/// Summed usage and cost for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub period: String,
    pub usage: f64,
    pub price: f64,
    pub discounted_price: f64,
}

impl PeriodSummary {
    fn empty(period: String) -> Self {
        Self {
            period,
            usage: 0.0,
            price: 0.0,
            discounted_price: 0.0,
        }
    }

    fn add(&mut self, record: &BillingRecord) {
        self.usage += record.usage;
        self.price += record.price;
        self.discounted_price += record.discounted_price;
    }
}

/// Group records into `granularity` buckets, ascending by period.
pub fn aggregate(records: &[BillingRecord], granularity: Granularity) -> Vec<PeriodSummary> {
    aggregate_with(records, |record| granularity.period_key(&record.date))
}

/// Group records using each record's own entry type as its bucket size.
///
/// Daily records land in day buckets and monthly records in month buckets,
/// which is what the spreadsheet cost trend plots.
pub fn aggregate_by_entry_type(records: &[BillingRecord]) -> Vec<PeriodSummary> {
    aggregate_with(records, |record| {
        Granularity::from(record.entry_type).period_key(&record.date)
    })
}

fn aggregate_with<F>(records: &[BillingRecord], key: F) -> Vec<PeriodSummary>
where
    F: Fn(&BillingRecord) -> String,
{
    let mut buckets: BTreeMap<String, PeriodSummary> = BTreeMap::new();

    for record in records {
        let period = key(record);
        buckets
            .entry(period.clone())
            .or_insert_with(|| PeriodSummary::empty(period))
            .add(record);
    }

    buckets.into_values().collect()
}

/// One pivot row: discounted cost per resource type for a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub period: String,
    #[serde(flatten)]
    pub totals: BTreeMap<String, f64>,
}

/// Wide-form aggregation keyed by period and resource type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceBreakdown {
    /// Every resource type seen, sorted alphabetically. Each row has one entry per type.
    pub resource_types: Vec<String>,
    pub periods: Vec<BreakdownRow>,
}

/// Pivot discounted cost by period and resource type.
pub fn aggregate_by_resource_type(
    records: &[BillingRecord],
    granularity: Granularity,
) -> ResourceBreakdown {
    let resource_types: BTreeSet<&str> = records
        .iter()
        .map(|record| record.resource_type.as_str())
        .collect();

    let mut rows: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for record in records {
        let row = rows
            .entry(granularity.period_key(&record.date))
            .or_insert_with(|| {
                resource_types
                    .iter()
                    .map(|resource_type| (resource_type.to_string(), 0.0))
                    .collect()
            });
        *row.entry(record.resource_type.clone()).or_insert(0.0) += record.discounted_price;
    }

    ResourceBreakdown {
        resource_types: resource_types.into_iter().map(str::to_string).collect(),
        periods: rows
            .into_iter()
            .map(|(period, totals)| BreakdownRow { period, totals })
            .collect(),
    }
}

/// Price after applying `discount_percent`. Never negative, never above `price`.
pub fn discounted_price(price: f64, discount_percent: f64) -> f64 {
    let discounted = price - price * discount_percent / 100.0;
    if price >= 0.0 {
        discounted.clamp(0.0, price)
    } else {
        discounted
    }
}

/// Percentage difference between `price` and `discounted_price`; 0 when price is not positive.
pub fn discount_percent(price: f64, discounted_price: f64) -> f64 {
    if price > 0.0 {
        (price - discounted_price) / price * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn record(date: &str, resource_type: &str, usage: f64, price: f64, discounted: f64) -> BillingRecord {
        let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        BillingRecord {
            id: format!("{}-{}", date, resource_type),
            service: "aws".to_string(),
            resource_type: resource_type.to_string(),
            sku: "sku".to_string(),
            usage,
            usage_unit: "unit".to_string(),
            price,
            discounted_price: discounted,
            date: crate::billing::dates::start_of_day(day),
            entry_type: EntryType::Daily,
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(aggregate(&[], Granularity::Daily).is_empty());
        assert!(aggregate(&[], Granularity::Monthly).is_empty());
        let breakdown = aggregate_by_resource_type(&[], Granularity::Monthly);
        assert!(breakdown.resource_types.is_empty());
        assert!(breakdown.periods.is_empty());
    }

    #[test]
    fn daily_and_monthly_buckets() {
        let records = vec![
            record("2024-03-06", "compute", 2.0, 50.0, 50.0),
            record("2024-03-05", "compute", 10.0, 100.0, 90.0),
        ];

        let daily = aggregate(&records, Granularity::Daily);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].period, "2024-03-05");
        assert_eq!(daily[0].price, 100.0);
        assert_eq!(daily[1].period, "2024-03-06");
        assert_eq!(daily[1].price, 50.0);

        let monthly = aggregate(&records, Granularity::Monthly);
        assert_eq!(
            monthly,
            vec![PeriodSummary {
                period: "2024-03".to_string(),
                usage: 12.0,
                price: 150.0,
                discounted_price: 140.0,
            }]
        );
    }

    #[test]
    fn periods_sort_chronologically_across_years() {
        let records = vec![
            record("2024-01-15", "compute", 1.0, 1.0, 1.0),
            record("2023-12-31", "compute", 1.0, 1.0, 1.0),
            record("2023-02-01", "compute", 1.0, 1.0, 1.0),
        ];
        let periods: Vec<_> = aggregate(&records, Granularity::Monthly)
            .into_iter()
            .map(|p| p.period)
            .collect();
        assert_eq!(periods, vec!["2023-02", "2023-12", "2024-01"]);
    }

    #[test]
    fn entry_type_buckets_follow_each_record() {
        let mut monthly = record("2024-03-01", "storage", 1.0, 30.0, 30.0);
        monthly.entry_type = EntryType::Monthly;
        let records = vec![record("2024-03-05", "compute", 1.0, 10.0, 10.0), monthly];

        let periods: Vec<_> = aggregate_by_entry_type(&records)
            .into_iter()
            .map(|p| p.period)
            .collect();
        assert_eq!(periods, vec!["2024-03", "2024-03-05"]);
    }

    #[test]
    fn resource_breakdown_fills_every_column() {
        let records = vec![
            record("2024-03-05", "storage", 1.0, 20.0, 15.0),
            record("2024-03-05", "compute", 1.0, 100.0, 90.0),
            record("2024-04-02", "compute", 1.0, 10.0, 10.0),
        ];

        let breakdown = aggregate_by_resource_type(&records, Granularity::Monthly);
        assert_eq!(breakdown.resource_types, vec!["compute", "storage"]);
        assert_eq!(breakdown.periods.len(), 2);
        assert_eq!(breakdown.periods[0].period, "2024-03");
        assert_eq!(breakdown.periods[0].totals["compute"], 90.0);
        assert_eq!(breakdown.periods[0].totals["storage"], 15.0);
        assert_eq!(breakdown.periods[1].totals["compute"], 10.0);
        assert_eq!(breakdown.periods[1].totals["storage"], 0.0);
    }

    #[test]
    fn breakdown_serializes_wide() {
        let records = vec![record("2024-03-05", "compute", 1.0, 100.0, 90.0)];
        let json = serde_json::to_value(aggregate_by_resource_type(&records, Granularity::Daily))
            .unwrap();
        assert_eq!(json["resourceTypes"][0], "compute");
        assert_eq!(json["periods"][0]["period"], "2024-03-05");
        assert_eq!(json["periods"][0]["compute"], 90.0);
    }

    #[test]
    fn discount_percent_guards_zero_price() {
        assert_eq!(discount_percent(0.0, 0.0), 0.0);
        assert_eq!(discount_percent(0.0, 5.0), 0.0);
        assert_eq!(discount_percent(100.0, 90.0), 10.0);
    }

    #[test]
    fn range_parameter_defaults_to_monthly() {
        assert_eq!(Granularity::from_range(Some("daily")), Granularity::Daily);
        assert_eq!(Granularity::from_range(Some("monthly")), Granularity::Monthly);
        assert_eq!(Granularity::from_range(Some("weekly")), Granularity::Monthly);
        assert_eq!(Granularity::from_range(None), Granularity::Monthly);
    }

    // Quarter multiples keep every partial sum exact in f64.
    fn quarters() -> impl Strategy<Value = f64> {
        (0u32..40_000).prop_map(|q| q as f64 / 4.0)
    }

    fn arb_record() -> impl Strategy<Value = BillingRecord> {
        (0i64..800, 0usize..3, quarters(), quarters()).prop_map(|(offset, kind, usage, price)| {
            let day = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + chrono::Duration::days(offset);
            let resource_type = ["compute", "network", "storage"][kind];
            record(&day.to_string(), resource_type, usage, price, price / 2.0)
        })
    }

    proptest! {
        #[test]
        fn discounted_price_stays_within_bounds(price in 0.0f64..1.0e9, pct in 0.0f64..=100.0) {
            let discounted = discounted_price(price, pct);
            prop_assert!(discounted >= 0.0);
            prop_assert!(discounted <= price);
            let expected = price - price * pct / 100.0;
            prop_assert!((discounted - expected).abs() <= 1e-6 * price.max(1.0));
        }

        #[test]
        fn discount_percent_is_always_finite(price in -1.0e6f64..1.0e6, discounted in -1.0e6f64..1.0e6) {
            prop_assert!(discount_percent(price, discounted).is_finite());
        }

        #[test]
        fn aggregation_ignores_insertion_order(
            records in proptest::collection::vec(arb_record(), 0..40),
            seed in any::<u64>(),
        ) {
            let mut shuffled = records.clone();
            // Deterministic permutation driven by the seed.
            let len = shuffled.len();
            for i in (1..len).rev() {
                let j = (seed.wrapping_mul(i as u64 + 7) % (i as u64 + 1)) as usize;
                shuffled.swap(i, j);
            }
            shuffled.reverse();

            for granularity in [Granularity::Daily, Granularity::Monthly] {
                prop_assert_eq!(aggregate(&records, granularity), aggregate(&shuffled, granularity));
            }
        }

        #[test]
        fn periods_are_strictly_ascending_and_padded(
            records in proptest::collection::vec(arb_record(), 0..40),
        ) {
            for (granularity, width) in [(Granularity::Daily, 10), (Granularity::Monthly, 7)] {
                let periods = aggregate(&records, granularity);
                for summary in &periods {
                    prop_assert_eq!(summary.period.len(), width);
                }
                for pair in periods.windows(2) {
                    prop_assert!(pair[0].period < pair[1].period);
                }
            }
        }
    }
}
