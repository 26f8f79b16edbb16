pub mod request_logging;
pub mod security_headers;

pub use request_logging::with_request_logging;
pub use security_headers::with_security_headers;
