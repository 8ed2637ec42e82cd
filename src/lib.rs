//! # vespa-knack
//!
//! Throttled, retrying and caching client for the Knack REST API behind the
//! VESPA platform.
//!
//! ## Overview
//!
//! Every platform call goes through one pipeline:
//!
//! ```text
//! caller -> ResponseCache (hit returns) -> RequestDispatcher (cooldown, in-flight table)
//!        -> RetryPolicy (backoff, rate-limit cooldown growth) -> Transport
//! ```
//!
//! All mutable bookkeeping lives in a [`SessionContext`] that callers create
//! and pass around explicitly, so independent sessions (and tests) never
//! share state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vespa_knack::{KnackClient, KnackConfig};
//! use vespa_knack::records::{Filter, RecordQuery};
//!
//! #[tokio::main]
//! async fn main() -> vespa_knack::Result<()> {
//!     let config = KnackConfig::builder("app-id", "api-key").build()?;
//!     let client = KnackClient::new(config)?;
//!
//!     let staff = client
//!         .list_records("object_3", &RecordQuery::new().filter(Filter::and().eq("field_73", "Active")))
//!         .await?;
//!     for record in &staff.records {
//!         println!("{}", record.text("field_70"));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Validated client configuration |
//! | [`client`] | Records API client and builder |
//! | [`dispatch`] | Request dispatcher and in-flight registry |
//! | [`resilience`] | Throttle, retry and debounce policies |
//! | [`cache`] | Response cache with canonical keys |
//! | [`session`] | Session-scoped state container |
//! | [`records`] | Filters, queries and record accessors |
//! | [`proxy`] | Backend proxy endpoints (email, dashboard, AI query) |
//! | [`transport`] | HTTP transport seam |

pub mod cache;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod proxy;
pub mod records;
pub mod resilience;
pub mod session;
pub mod transport;

pub use client::{KnackClient, KnackClientBuilder};
pub use config::{DispatchSettings, KnackConfig};
pub use dispatch::{DispatchOptions, OperationHandle, RequestDispatcher};
pub use session::SessionContext;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
