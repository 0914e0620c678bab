//! HTTP middleware.

pub mod logging;
pub mod metrics;
pub mod rate_limit;
pub mod security_headers;
pub mod user_auth;

pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use rate_limit::{rate_limit_middleware, RateLimiterState};
pub use security_headers::security_headers_middleware;
pub use user_auth::require_user_auth;
