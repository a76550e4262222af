//! Application Layer - Use cases and application services

pub mod monitoring;
pub mod service;

pub use monitoring::AbuseMonitor;
pub use service::RateLimiterService;
