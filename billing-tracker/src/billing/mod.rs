//! Billing core: filter resolution, period aggregation and export formatting.
//!
//! Nothing in here performs I/O. Handlers resolve a [`filter::BillingFilter`]
//! into a [`filter::RecordQuery`], hand it to a record store, and pass the
//! result through [`aggregate`] or [`export`].

pub mod aggregate;
pub mod dates;
pub mod error;
pub mod export;
pub mod filter;

pub use aggregate::{
    aggregate, aggregate_by_entry_type, aggregate_by_resource_type, discount_percent,
    discounted_price, BreakdownRow, Granularity, PeriodSummary, ResourceBreakdown,
};
pub use error::BillingError;
pub use export::{export_filename, export_rows, write_csv, write_workbook, ExportFormat, ExportRow};
pub use filter::{BillingFilter, DateRange, ExportWindow, RecordQuery, ResolvedFilter};
