//! Integration tests with mock HTTP server

pub mod mock_server;
pub mod proxy;
pub mod records_api;
