//! Billing record model.

use crate::billing::{dates, discounted_price, BillingError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unit label stored on every record created through the add operation.
pub const DEFAULT_USAGE_UNIT: &str = "unit";

/// How a record's `date` is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// A single day's usage.
    #[default]
    Daily,
    /// A monthly line item; `date` is always the first of the month.
    Monthly,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Daily => "daily",
            EntryType::Monthly => "monthly",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(EntryType::Daily),
            "monthly" => Ok(EntryType::Monthly),
            _ => Err(BillingError::InvalidEntryType(s.to_string())),
        }
    }
}

/// A stored billing line item. Records are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingRecord {
    pub id: String,
    pub service: String,
    pub resource_type: String,
    pub sku: String,
    pub usage: f64,
    pub usage_unit: String,
    pub price: f64,
    pub discounted_price: f64,
    pub date: DateTime<Utc>,
    pub entry_type: EntryType,
}

/// Loosely typed input for the add operation, as posted by clients.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBillingRecord {
    pub service: Option<String>,
    pub resource_type: Option<String>,
    pub sku: Option<String>,
    pub usage: Option<f64>,
    pub price: Option<f64>,
    pub discount_percent: Option<f64>,
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    pub date: Option<String>,
    pub month: Option<String>,
}

impl BillingRecord {
    /// Validate client input and derive the stored record.
    ///
    /// The service is lower-cased, `discountedPrice` is derived from
    /// `discountPercent` (default 0), and monthly entries are pinned to the
    /// first day of their month.
    pub fn from_new(input: NewBillingRecord) -> Result<Self, BillingError> {
        let service = required_text(input.service, "service")?.to_lowercase();
        let resource_type = required_text(input.resource_type, "resourceType")?;
        let sku = required_text(input.sku, "sku")?;
        let usage = finite(input.usage.ok_or(BillingError::MissingField("usage"))?, "usage")?;
        let price = finite(input.price.ok_or(BillingError::MissingField("price"))?, "price")?;

        let discount = finite(input.discount_percent.unwrap_or(0.0), "discountPercent")?;
        if !(0.0..=100.0).contains(&discount) {
            return Err(BillingError::InvalidDiscount(discount));
        }

        let entry_type = match non_empty(input.entry_type) {
            Some(raw) => raw.parse::<EntryType>()?,
            None => EntryType::Daily,
        };

        let day = match entry_type {
            EntryType::Daily => {
                let raw = non_empty(input.date).ok_or(BillingError::MissingField("date"))?;
                dates::parse_day(&raw)?
            }
            EntryType::Monthly => {
                let raw = non_empty(input.month).ok_or(BillingError::MissingField("month"))?;
                dates::parse_month(&raw)?
            }
        };

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            service,
            resource_type,
            sku,
            usage,
            usage_unit: DEFAULT_USAGE_UNIT.to_string(),
            price,
            discounted_price: discounted_price(price, discount),
            date: dates::start_of_day(day),
            entry_type,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, BillingError> {
    non_empty(value).ok_or(BillingError::MissingField(field))
}

fn finite(value: f64, field: &'static str) -> Result<f64, BillingError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(BillingError::NotFinite(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> NewBillingRecord {
        NewBillingRecord {
            service: Some("AWS".to_string()),
            resource_type: Some("compute".to_string()),
            sku: Some("c1".to_string()),
            usage: Some(10.0),
            price: Some(100.0),
            discount_percent: Some(10.0),
            entry_type: Some("daily".to_string()),
            date: Some("2024-03-05".to_string()),
            month: None,
        }
    }

    #[test]
    fn daily_record_derives_discounted_price() {
        let record = BillingRecord::from_new(input()).unwrap();

        assert_eq!(record.service, "aws");
        assert_eq!(record.discounted_price, 90.0);
        assert_eq!(record.usage_unit, DEFAULT_USAGE_UNIT);
        assert_eq!(record.entry_type, EntryType::Daily);
        assert_eq!(record.date.to_rfc3339(), "2024-03-05T00:00:00+00:00");
    }

    #[test]
    fn monthly_record_is_pinned_to_first_of_month() {
        let record = BillingRecord::from_new(NewBillingRecord {
            entry_type: Some("monthly".to_string()),
            date: None,
            month: Some("2024-03".to_string()),
            ..input()
        })
        .unwrap();

        assert_eq!(record.entry_type, EntryType::Monthly);
        assert_eq!(record.date.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn entry_type_defaults_to_daily() {
        let record = BillingRecord::from_new(NewBillingRecord {
            entry_type: None,
            ..input()
        })
        .unwrap();
        assert_eq!(record.entry_type, EntryType::Daily);
    }

    #[test]
    fn missing_discount_means_no_discount() {
        let record = BillingRecord::from_new(NewBillingRecord {
            discount_percent: None,
            ..input()
        })
        .unwrap();
        assert_eq!(record.discounted_price, record.price);
    }

    #[test]
    fn rejects_missing_required_fields() {
        let err = BillingRecord::from_new(NewBillingRecord {
            sku: Some("   ".to_string()),
            ..input()
        })
        .unwrap_err();
        assert!(matches!(err, BillingError::MissingField("sku")));

        let err = BillingRecord::from_new(NewBillingRecord {
            price: None,
            ..input()
        })
        .unwrap_err();
        assert!(matches!(err, BillingError::MissingField("price")));
    }

    #[test]
    fn daily_requires_date_and_monthly_requires_month() {
        let err = BillingRecord::from_new(NewBillingRecord {
            date: None,
            ..input()
        })
        .unwrap_err();
        assert!(matches!(err, BillingError::MissingField("date")));

        let err = BillingRecord::from_new(NewBillingRecord {
            entry_type: Some("monthly".to_string()),
            ..input()
        })
        .unwrap_err();
        assert!(matches!(err, BillingError::MissingField("month")));
    }

    #[test]
    fn rejects_unknown_entry_type_and_bad_dates() {
        let err = BillingRecord::from_new(NewBillingRecord {
            entry_type: Some("weekly".to_string()),
            ..input()
        })
        .unwrap_err();
        assert!(matches!(err, BillingError::InvalidEntryType(_)));

        let err = BillingRecord::from_new(NewBillingRecord {
            date: Some("2024-99-99".to_string()),
            ..input()
        })
        .unwrap_err();
        assert!(matches!(err, BillingError::InvalidDate(_)));
    }

    #[test]
    fn rejects_out_of_range_discount() {
        let err = BillingRecord::from_new(NewBillingRecord {
            discount_percent: Some(120.0),
            ..input()
        })
        .unwrap_err();
        assert!(matches!(err, BillingError::InvalidDiscount(_)));
    }
}
