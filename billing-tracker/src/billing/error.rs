use service_core::error::AppError;
use thiserror::Error;

/// Errors raised by the billing core.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid type '{0}'. Must be 'daily' or 'monthly'")]
    InvalidEntryType(String),

    #[error("Discount percent must be between 0 and 100, got {0}")]
    InvalidDiscount(f64),

    #[error("Field {0} must be a finite number")]
    NotFinite(&'static str),

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet encoding failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
}

impl BillingError {
    /// True for errors caused by caller input rather than the encoders.
    pub fn is_validation(&self) -> bool {
        !matches!(self, BillingError::Csv(_) | BillingError::Spreadsheet(_))
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        if err.is_validation() {
            AppError::BadRequest(anyhow::Error::new(err))
        } else {
            AppError::InternalError(anyhow::Error::new(err))
        }
    }
}
