//! Presentation Layer - HTTP glue for the host application

pub mod middleware;
pub mod models;

pub use middleware::{CallerIdentity, RateLimitState, extract_client_ip, rate_limit_middleware};
pub use models::ErrorResponse;
