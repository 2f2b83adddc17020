pub mod auth;
pub mod metrics;

pub use auth::{JwtKeys, Principal};
pub use metrics::http_metrics_middleware;
