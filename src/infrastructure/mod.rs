//! Infrastructure Layer
//!
//! Storage backends and the store-facing mechanisms built on them: the
//! sliding-window limiter, the brute-force guard, and violation aggregation.

pub mod brute_force;
pub mod sliding_window;
pub mod storage;
pub mod violations;

pub use brute_force::{BruteForceGuard, FailureRecord, GuardStatus, LockState};
pub use sliding_window::{SlidingWindowLimiter, WindowEvaluation};
pub use storage::{
    CounterStore, InMemoryCounterStore, RedisCounterStore, StoreUnavailable, WindowSample,
};
pub use violations::ViolationRecorder;
