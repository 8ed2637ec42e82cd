//! # Resilience Policies
//!
//! Named, testable pacing policies used by the request dispatcher.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`throttle`] | Per-resource cooldown between dispatches, grown on rate limiting |
//! | [`retry`] | Bounded exponential backoff for failed attempts |
//! | [`debounce`] | Trailing-edge coalescing of bursty triggers |
//!
//! ## Throttle
//!
//! ```rust
//! use vespa_knack::resilience::throttle::ThrottleTable;
//! use std::time::Duration;
//!
//! let table = ThrottleTable::new(Duration::from_secs(1), Duration::from_secs(10));
//! let first = table.reserve("object_6");
//! let second = table.reserve("object_6");
//! assert_eq!(second - first, Duration::from_secs(1));
//! assert_eq!(table.on_rate_limited("object_6"), Duration::from_secs(2));
//! ```
//!
//! ## Retry
//!
//! ```rust
//! use vespa_knack::resilience::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3, Duration::from_millis(1000));
//! assert_eq!(policy.backoff(2), Duration::from_millis(4000));
//! ```

pub mod debounce;
pub mod retry;
pub mod throttle;

pub use debounce::Debouncer;
pub use retry::{Decision, RetryPolicy};
pub use throttle::{ResourceThrottleState, ThrottleTable};
