//! Request dispatch: one logical call through the cache, the throttle, the
//! retry policy and the transport, tracked in the session's in-flight table.
//!
//! Lifecycle per call:
//!
//! ```text
//! IDLE -> IN_FLIGHT -> IDLE (cached)
//!         IN_FLIGHT -> WAITING_BACKOFF -> IN_FLIGHT
//!         IN_FLIGHT -> FAILED -> IDLE (cache untouched)
//! ```

mod dispatcher;
mod inflight;

pub use dispatcher::{DispatchOptions, OperationHandle, RequestDispatcher};
pub use inflight::{InflightRegistry, PendingInfo, Registration};
