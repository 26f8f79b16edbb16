pub mod api_server;
pub mod catalog;
pub mod duration;
pub mod rate_limiting;
