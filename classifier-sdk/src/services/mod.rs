//! Service-specific client implementations

pub mod openai;
mod common;

pub use common::{build_http_client, UserAgent};
