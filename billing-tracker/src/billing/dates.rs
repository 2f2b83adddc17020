//! Calendar parsing shared by record validation and filter resolution.
//!
//! All stored dates are midnight UTC of the day they describe.

use super::BillingError;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};

/// Parse a calendar day from `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_day(value: &str) -> Result<NaiveDate, BillingError> {
    let trimmed = value.trim();
    let day = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| {
            DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.with_timezone(&Utc).date_naive())
        })
        .map_err(|_| BillingError::InvalidDate(value.to_string()))?;

    four_digit_year(day, value)
}

/// Parse a `YYYY-MM` month into its first day.
pub fn parse_month(value: &str) -> Result<NaiveDate, BillingError> {
    let trimmed = value.trim();
    let first = NaiveDate::parse_from_str(&format!("{}-01", trimmed), "%Y-%m-%d")
        .map_err(|_| BillingError::InvalidDate(value.to_string()))?;

    four_digit_year(first, value)
}

pub fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Last representable millisecond of `day` (23:59:59.999).
pub fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    start_of_day(day) + Duration::days(1) - Duration::milliseconds(1)
}

pub fn next_day(day: NaiveDate) -> Result<NaiveDate, BillingError> {
    day.succ_opt()
        .ok_or_else(|| BillingError::InvalidDate(day.to_string()))
}

pub fn first_of_next_month(first: NaiveDate) -> Result<NaiveDate, BillingError> {
    first
        .checked_add_months(Months::new(1))
        .ok_or_else(|| BillingError::InvalidDate(first.to_string()))
}

// Period keys are compared as strings, so years must stay zero-padded to four digits.
fn four_digit_year(day: NaiveDate, raw: &str) -> Result<NaiveDate, BillingError> {
    if (1..=9999).contains(&day.year()) {
        Ok(day)
    } else {
        Err(BillingError::InvalidDate(raw.to_string()))
    }
}
