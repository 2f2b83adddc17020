//! Filter resolution: optional request parameters to a store predicate.

use super::{dates, BillingError};
use crate::models::{BillingRecord, EntryType};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Optional filter parameters accepted by every billing read path.
///
/// Empty strings count as absent, which is what HTML forms send for blank inputs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingFilter {
    /// Partition key; required by every query. Compared lower-cased.
    pub service: Option<String>,
    /// Exact SKU match.
    pub sku: Option<String>,
    /// Exact resource type match.
    pub resource_type: Option<String>,
    /// Exact entry type match. Overridden by `date` (daily) or `month` (monthly).
    pub entry_type: Option<String>,
    /// A single day, `YYYY-MM-DD`: selects `[date, date + 1 day)` daily entries.
    pub date: Option<String>,
    /// A month, `YYYY-MM`: selects `[first of month, first of next month)` monthly entries.
    /// Applied after `date`, so it wins when both are given.
    pub month: Option<String>,
    /// Export-only inclusive lower bound, applied in memory after the store query.
    pub start_date: Option<String>,
    /// Export-only inclusive upper bound covering the whole end day.
    pub end_date: Option<String>,
}

/// Half-open `[start, end)` date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, date: &DateTime<Utc>) -> bool {
        self.start <= *date && *date < self.end
    }
}

/// Store-consumable predicate over billing records.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub service: String,
    pub sku: Option<String>,
    pub resource_type: Option<String>,
    pub entry_type: Option<EntryType>,
    pub period: Option<DateRange>,
}

impl RecordQuery {
    /// Query every record of one service.
    pub fn for_service(service: &str) -> Self {
        Self {
            service: service.trim().to_lowercase(),
            sku: None,
            resource_type: None,
            entry_type: None,
            period: None,
        }
    }

    pub fn matches(&self, record: &BillingRecord) -> bool {
        record.service == self.service
            && self.sku.as_ref().map_or(true, |sku| &record.sku == sku)
            && self
                .resource_type
                .as_ref()
                .map_or(true, |resource_type| &record.resource_type == resource_type)
            && self
                .entry_type
                .map_or(true, |entry_type| record.entry_type == entry_type)
            && self
                .period
                .as_ref()
                .map_or(true, |period| period.contains(&record.date))
    }
}

/// Inclusive date window applied to export result sets after the store query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl ExportWindow {
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: &DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| *date >= start) && self.end.map_or(true, |end| *date <= end)
    }

    /// Drop records outside the window, keeping the store's ordering.
    pub fn apply(&self, mut records: Vec<BillingRecord>) -> Vec<BillingRecord> {
        if !self.is_unbounded() {
            records.retain(|record| self.contains(&record.date));
        }
        records
    }
}

/// Output of filter resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFilter {
    pub query: RecordQuery,
    pub window: ExportWindow,
}

impl BillingFilter {
    /// Filter for a single service with no refinements.
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
            ..Default::default()
        }
    }

    /// Resolve into a store predicate plus the export post-filter.
    ///
    /// Fails fast on a missing service, an unknown entry type or an
    /// unparseable date before anything reaches the store.
    pub fn resolve(&self) -> Result<ResolvedFilter, BillingError> {
        let service = present(&self.service).ok_or(BillingError::MissingField("service"))?;
        let mut query = RecordQuery::for_service(service);

        query.sku = present(&self.sku).map(str::to_string);
        query.resource_type = present(&self.resource_type).map(str::to_string);
        query.entry_type = present(&self.entry_type)
            .map(str::parse::<EntryType>)
            .transpose()?;

        if let Some(date) = present(&self.date) {
            let day = dates::parse_day(date)?;
            query.period = Some(DateRange {
                start: dates::start_of_day(day),
                end: dates::start_of_day(dates::next_day(day)?),
            });
            query.entry_type = Some(EntryType::Daily);
        }

        if let Some(month) = present(&self.month) {
            let first = dates::parse_month(month)?;
            query.period = Some(DateRange {
                start: dates::start_of_day(first),
                end: dates::start_of_day(dates::first_of_next_month(first)?),
            });
            query.entry_type = Some(EntryType::Monthly);
        }

        let window = ExportWindow {
            start: present(&self.start_date)
                .map(dates::parse_day)
                .transpose()?
                .map(dates::start_of_day),
            end: present(&self.end_date)
                .map(dates::parse_day)
                .transpose()?
                .map(dates::end_of_day),
        };

        Ok(ResolvedFilter { query, window })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
