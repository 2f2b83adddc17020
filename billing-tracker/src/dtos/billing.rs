use crate::billing::export::display_date;
use crate::billing::{discount_percent, BillingFilter, Granularity};
use crate::models::BillingRecord;
use serde::{Deserialize, Serialize};

/// Filter parameters plus the aggregation range.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryParams {
    #[serde(flatten)]
    pub filter: BillingFilter,
    pub range: Option<String>,
}

impl SummaryParams {
    pub fn granularity(&self) -> Granularity {
        Granularity::from_range(self.range.as_deref())
    }
}

/// A stored record as shown in the table view.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingRecordResponse {
    #[serde(flatten)]
    pub record: BillingRecord,
    pub display_date: String,
    pub discount_percent: f64,
}

impl From<BillingRecord> for BillingRecordResponse {
    fn from(record: BillingRecord) -> Self {
        Self {
            display_date: display_date(&record),
            discount_percent: discount_percent(record.price, record.discounted_price),
            record,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteRecordsResponse {
    pub deleted: u64,
}
