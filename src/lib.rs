//! Rampart - Adaptive request rate limiting and brute-force protection
//!
//! This crate is the protection subsystem a web platform layers in front of
//! its routes: tiered sliding-window rate limits, progressive lockouts for
//! credential endpoints, violation aggregation for abuse monitoring, and a
//! documented fail-open posture when the counter store is unreachable.
//!
//! # Modules
//!
//! - [`config`] — Strongly-typed configuration with TOML and environment variable support
//! - [`domain`] — Tiers, policies, counter keys, decisions and violation classes
//! - [`application`] — The rate limiter service facade and abuse monitoring
//! - [`infrastructure`] — Counter store backends and the mechanisms built on them
//! - [`presentation`] — Axum middleware and response models for the host server
//! - [`logging`] — Structured logging with tracing
//!
//! # Architecture
//!
//! The crate follows Domain-Driven Design principles:
//!
//! ```text
//! rampart/
//! ├── domain/           # Pure business logic
//! │   ├── key           # Tiers, key dimensions, counter keys
//! │   ├── policy        # Per-tier ceilings and the plan ladder
//! │   ├── decision      # Limiter decisions and request context
//! │   └── violation     # Violation classes and alert evaluation
//! ├── application/      # Service facade and abuse monitoring
//! ├── infrastructure/   # Redis / in-memory stores, windows, guard
//! ├── presentation/     # Axum glue for the host application
//! └── config/           # Configuration management
//! ```
//!
//! # Configuration
//!
//! Load configuration from files and environment:
//!
//! ```rust,ignore
//! use rampart::Config;
//!
//! let config = Config::load()?;
//! ```
//!
//! Environment variables use the `RAMPART__` prefix with double underscore separators:
//!
//! ```bash
//! RAMPART__STORE__BACKEND=memory
//! RAMPART__LIMITS__GLOBAL__MAX_REQUESTS=120
//! ```
//!
//! # Usage
//!
//! Wire the service into an axum router:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rampart::{Config, RateLimiterService, RateLimitState, rate_limit_middleware};
//!
//! let config = Config::load()?;
//! let service = Arc::new(RateLimiterService::new(&config.store, config.limits).await?);
//! let state = RateLimitState::new(service);
//!
//! let app = axum::Router::new()
//!     .route("/api/things", axum::routing::get(list_things))
//!     .layer(axum::middleware::from_fn_with_state(state, rate_limit_middleware));
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;
pub mod presentation;

pub use application::{AbuseMonitor, RateLimiterService};
pub use config::Config;
pub use domain::{LimiterDecision, PlanTier, RequestContext, Tier};
pub use logging::init_tracing;
pub use presentation::{CallerIdentity, RateLimitState, rate_limit_middleware};
