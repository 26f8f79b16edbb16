//! Cookbook library
//!
//! The server lives in the binary; the library exposes the router, the
//! rate limiting layer and the services for integration testing.

pub mod api;
pub mod app_state;
pub mod http;
pub mod init_telemetry;
pub mod services;
pub mod settings;
pub mod stop_flag;

pub use app_state::AppState;
