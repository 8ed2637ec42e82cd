//! Records API client.
//!
//! Keep the public surface small: construction lives in [`builder`], the
//! request methods in [`core`].

pub mod builder;
pub mod core;

pub use self::builder::KnackClientBuilder;
pub use self::core::KnackClient;
