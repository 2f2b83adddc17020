//! Export formatting shared by CSV, spreadsheet and the table view.
//!
//! Every path renders dates through [`display_date`] and amounts through
//! [`format_amount`], so a record looks the same wherever it is shown.

use super::{aggregate_by_entry_type, discount_percent, BillingError};
use crate::models::{BillingRecord, EntryType};
use chrono::Utc;
use rust_xlsxwriter::{Chart, ChartType, Color, Format, FormatAlign, Workbook, Worksheet};
use std::sync::atomic::{AtomicI64, Ordering};

/// Column headers, in the fixed export order.
pub const EXPORT_HEADERS: [&str; 9] = [
    "Date",
    "Service",
    "Resource Type",
    "SKU",
    "Usage",
    "Price",
    "Discounted Price",
    "Discount %",
    "Entry Type",
];

const COLUMN_WIDTHS: [f64; 9] = [20.0, 15.0, 20.0, 25.0, 15.0, 15.0, 18.0, 15.0, 15.0];

const DATA_SHEET: &str = "Billing Data";
const TREND_SHEET: &str = "Cost Trend";
const HEADER_FILL: u32 = 0x3B82F6;

/// Short calendar date for daily entries, e.g. `3/5/2024`.
pub const SHORT_DATE_FORMAT: &str = "%-m/%-d/%Y";
/// Long month and year for monthly entries, e.g. `March 2024`.
pub const LONG_MONTH_FORMAT: &str = "%B %Y";

/// Render a record's date according to its entry type.
pub fn display_date(record: &BillingRecord) -> String {
    match record.entry_type {
        EntryType::Monthly => record.date.format(LONG_MONTH_FORMAT).to_string(),
        EntryType::Daily => record.date.format(SHORT_DATE_FORMAT).to_string(),
    }
}

/// Two-decimal rendering used for every numeric export field.
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

/// One export line, before text encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub date: String,
    pub service: String,
    pub resource_type: String,
    pub sku: String,
    pub usage: f64,
    pub price: f64,
    pub discounted_price: f64,
    pub discount_percent: f64,
    pub entry_type: EntryType,
}

impl From<&BillingRecord> for ExportRow {
    fn from(record: &BillingRecord) -> Self {
        Self {
            date: display_date(record),
            service: record.service.clone(),
            resource_type: record.resource_type.clone(),
            sku: record.sku.clone(),
            usage: record.usage,
            price: record.price,
            discounted_price: record.discounted_price,
            discount_percent: discount_percent(record.price, record.discounted_price),
            entry_type: record.entry_type,
        }
    }
}

impl ExportRow {
    /// Text fields in header order.
    pub fn to_fields(&self) -> [String; 9] {
        [
            self.date.clone(),
            self.service.clone(),
            self.resource_type.clone(),
            self.sku.clone(),
            format_amount(self.usage),
            format_amount(self.price),
            format_amount(self.discounted_price),
            format_amount(self.discount_percent),
            self.entry_type.to_string(),
        ]
    }

    /// Spreadsheet cells in header order. Amounts stay numeric so the
    /// sheet's `0.00` format applies.
    pub fn to_cells(&self) -> [SheetCell; 9] {
        [
            SheetCell::Text(self.date.clone()),
            SheetCell::Text(self.service.clone()),
            SheetCell::Text(self.resource_type.clone()),
            SheetCell::Text(self.sku.clone()),
            SheetCell::Amount(self.usage),
            SheetCell::Amount(self.price),
            SheetCell::Amount(self.discounted_price),
            SheetCell::Amount(self.discount_percent),
            SheetCell::Text(self.entry_type.as_str().to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SheetCell {
    Text(String),
    Amount(f64),
}

pub fn export_rows(records: &[BillingRecord]) -> Vec<ExportRow> {
    records.iter().map(ExportRow::from).collect()
}

/// Encode records as CSV. Zero records produce the header line alone.
///
/// Fields containing the delimiter, quotes or line breaks are wrapped in
/// double quotes with embedded quotes doubled.
pub fn write_csv(records: &[BillingRecord]) -> Result<Vec<u8>, BillingError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(EXPORT_HEADERS)?;
    for row in export_rows(records) {
        writer.write_record(row.to_fields())?;
    }

    writer
        .into_inner()
        .map_err(|e| BillingError::Csv(e.into_error().into()))
}

/// Build an `.xlsx` workbook: the data sheet plus a cost trend sheet.
///
/// With no records the workbook still opens; it holds the header rows only.
pub fn write_workbook(records: &[BillingRecord], service: &str) -> Result<Vec<u8>, BillingError> {
    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center);
    let amount = Format::new().set_num_format("0.00");

    let mut workbook = Workbook::new();
    workbook.push_worksheet(data_sheet(records, &header, &amount)?);
    workbook.push_worksheet(trend_sheet(records, service, &header, &amount)?);

    Ok(workbook.save_to_buffer()?)
}

fn data_sheet(
    records: &[BillingRecord],
    header: &Format,
    amount: &Format,
) -> Result<Worksheet, BillingError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(DATA_SHEET)?;

    for (col, (title, width)) in EXPORT_HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        sheet.set_column_width(col, width)?;
        sheet.write_string_with_format(0, col, *title, header)?;
    }

    for (index, row) in export_rows(records).iter().enumerate() {
        let r = index as u32 + 1;
        for (col, cell) in row.to_cells().iter().enumerate() {
            let col = col as u16;
            match cell {
                SheetCell::Text(text) => sheet.write_string(r, col, text)?,
                SheetCell::Amount(value) => sheet.write_number_with_format(r, col, *value, amount)?,
            };
        }
    }

    Ok(sheet)
}

fn trend_sheet(
    records: &[BillingRecord],
    service: &str,
    header: &Format,
    amount: &Format,
) -> Result<Worksheet, BillingError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(TREND_SHEET)?;

    for (col, title) in ["Period", "Original Price", "Discounted Price"].iter().enumerate() {
        let col = col as u16;
        sheet.set_column_width(col, 18)?;
        sheet.write_string_with_format(0, col, *title, header)?;
    }

    let trend = aggregate_by_entry_type(records);
    for (index, period) in trend.iter().enumerate() {
        let r = index as u32 + 1;
        sheet.write_string(r, 0, &period.period)?;
        sheet.write_number_with_format(r, 1, period.price, amount)?;
        sheet.write_number_with_format(r, 2, period.discounted_price, amount)?;
    }

    // A chart over an empty range is rejected by the writer.
    if !trend.is_empty() {
        let last = trend.len() as u32;
        let mut chart = Chart::new(ChartType::Line);
        chart
            .add_series()
            .set_name("Original Price")
            .set_categories((TREND_SHEET, 1, 0, last, 0))
            .set_values((TREND_SHEET, 1, 1, last, 1));
        chart
            .add_series()
            .set_name("Discounted Price")
            .set_categories((TREND_SHEET, 1, 0, last, 0))
            .set_values((TREND_SHEET, 1, 2, last, 2));
        let title = format!("{} Cost Trend", service.to_uppercase());
        chart.title().set_name(title.as_str());
        chart.x_axis().set_name("Period");
        chart.y_axis().set_name("Price");

        sheet.insert_chart(1, 4, &chart)?;
    }

    Ok(sheet)
}

/// Downloadable export flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

static LAST_EXPORT_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Milliseconds since epoch, strictly increasing across calls in this process.
pub fn next_export_timestamp() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_EXPORT_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_EXPORT_MILLIS.compare_exchange_weak(
            last,
            next,
            Ordering::SeqCst,
            Ordering::Relaxed,
        ) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

/// `<prefix>-<scope>-<timestamp>.<ext>` with the scope reduced to header-safe characters.
pub fn download_filename(prefix: &str, scope: &str, extension: &str) -> String {
    let scope: String = scope
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}-{}-{}.{}", prefix, scope, next_export_timestamp(), extension)
}

/// `billing-<service>-<timestamp>.<ext>`.
pub fn export_filename(service: &str, format: ExportFormat) -> String {
    download_filename("billing", service, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::dates::start_of_day;
    use chrono::NaiveDate;

    fn record(date: &str, entry_type: EntryType, price: f64, discounted: f64) -> BillingRecord {
        BillingRecord {
            id: "r".to_string(),
            service: "aws".to_string(),
            resource_type: "compute".to_string(),
            sku: "c1".to_string(),
            usage: 10.0,
            usage_unit: "unit".to_string(),
            price,
            discounted_price: discounted,
            date: start_of_day(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()),
            entry_type,
        }
    }

    #[test]
    fn monthly_dates_render_long_and_daily_short() {
        let monthly = record("2024-03-01", EntryType::Monthly, 1.0, 1.0);
        let daily = record("2024-03-01", EntryType::Daily, 1.0, 1.0);

        assert_eq!(display_date(&monthly), "March 2024");
        assert_eq!(display_date(&daily), "3/1/2024");
    }

    #[test]
    fn sheet_cells_render_dates_by_entry_type() {
        let monthly = ExportRow::from(&record("2024-03-01", EntryType::Monthly, 100.0, 90.0));
        let daily = ExportRow::from(&record("2024-03-01", EntryType::Daily, 100.0, 90.0));

        let monthly = monthly.to_cells();
        assert_eq!(monthly[0], SheetCell::Text("March 2024".to_string()));
        assert_eq!(monthly[8], SheetCell::Text("monthly".to_string()));

        let daily = daily.to_cells();
        assert_eq!(daily[0], SheetCell::Text("3/1/2024".to_string()));
        assert_eq!(daily[5], SheetCell::Amount(100.0));
        assert_eq!(daily[6], SheetCell::Amount(90.0));
        assert_eq!(daily[7], SheetCell::Amount(10.0));
        assert_eq!(daily[8], SheetCell::Text("daily".to_string()));
    }

    #[test]
    fn rows_use_fixed_order_and_two_decimals() {
        let row = ExportRow::from(&record("2024-03-05", EntryType::Daily, 100.0, 90.0));
        assert_eq!(
            row.to_fields(),
            [
                "3/5/2024", "aws", "compute", "c1", "10.00", "100.00", "90.00", "10.00", "daily"
            ]
            .map(String::from)
        );
    }

    #[test]
    fn zero_price_reports_zero_discount() {
        let row = ExportRow::from(&record("2024-03-05", EntryType::Daily, 0.0, 0.0));
        assert_eq!(row.discount_percent, 0.0);
        assert_eq!(row.to_fields()[7], "0.00");
    }

    #[test]
    fn empty_csv_is_header_only() {
        let csv = String::from_utf8(write_csv(&[]).unwrap()).unwrap();
        assert_eq!(
            csv,
            "Date,Service,Resource Type,SKU,Usage,Price,Discounted Price,Discount %,Entry Type\n"
        );
    }

    #[test]
    fn csv_quotes_fields_with_delimiters_and_quotes() {
        let mut tricky = record("2024-03-05", EntryType::Daily, 100.0, 90.0);
        tricky.sku = "m5.large, \"spot\"".to_string();
        let csv = String::from_utf8(write_csv(&[tricky]).unwrap()).unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "3/5/2024,aws,compute,\"m5.large, \"\"spot\"\"\",10.00,100.00,90.00,10.00,daily"
        );
    }

    #[test]
    fn csv_has_one_line_per_record() {
        let records = vec![
            record("2024-03-05", EntryType::Daily, 100.0, 90.0),
            record("2024-03-01", EntryType::Monthly, 50.0, 50.0),
        ];
        let csv = String::from_utf8(write_csv(&records).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("March 2024,"));
    }

    #[test]
    fn workbook_is_a_zip_even_when_empty() {
        let empty = write_workbook(&[], "aws").unwrap();
        assert!(empty.starts_with(b"PK"));

        let records = vec![record("2024-03-05", EntryType::Daily, 100.0, 90.0)];
        let full = write_workbook(&records, "aws").unwrap();
        assert!(full.starts_with(b"PK"));
        assert!(full.len() > empty.len());
    }

    #[test]
    fn filenames_are_unique_and_sanitised() {
        let first = export_filename("aws", ExportFormat::Csv);
        let second = export_filename("aws", ExportFormat::Csv);
        assert!(first.starts_with("billing-aws-"));
        assert!(first.ends_with(".csv"));
        assert_ne!(first, second);

        let odd = export_filename("a\"b c", ExportFormat::Xlsx);
        assert!(odd.starts_with("billing-a_b_c-"));
        assert!(odd.ends_with(".xlsx"));
    }

    #[test]
    fn export_timestamps_strictly_increase() {
        let mut last = next_export_timestamp();
        for _ in 0..1000 {
            let next = next_export_timestamp();
            assert!(next > last);
            last = next;
        }
    }
}
