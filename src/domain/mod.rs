//! Domain Layer - Tiers, policies, decisions and violation classes
//!
//! Pure types for the rate limiting model: no clocks, no storage access.
//! The only impurity lives in `key::current_time_millis`, shared by the
//! layers that do touch clocks.

pub mod decision;
pub mod key;
pub mod policy;
pub mod violation;

pub use decision::{LimiterDecision, RequestContext};
pub use key::{KeyDimension, RateLimitKey, Tier};
pub use policy::{InvalidPolicy, LimiterPolicy, PlanTier, PolicySet};
pub use violation::{Alert, AlertSeverity, ViolationAggregate, ViolationClass, evaluate_alerts};
