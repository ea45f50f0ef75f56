pub mod error;
pub mod http;
pub mod logging;
pub mod string_utils;

pub use error::*;
pub use http::build_http_client;
pub use string_utils::{redact, truncate_safe};
