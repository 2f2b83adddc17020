//! service-core: shared infrastructure for the billing-tracker workspace.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod utils;

pub use axum;
pub use tracing;
