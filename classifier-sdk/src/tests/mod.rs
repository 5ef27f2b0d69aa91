//! Unit tests for the classifier SDK
//!
//! One file per concern; inline `#[cfg(test)]` modules cover the smaller
//! pieces next to their code.

pub mod error_tests;
pub mod openai_mock_tests;
pub mod resilience_tests;
