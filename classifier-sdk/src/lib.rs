//! # Classifier SDK
//!
//! Client-side building blocks for turning free-text survey comments into
//! structured diagnoses through an OpenAI-compatible language-model API.
//!
//! This crate provides:
//!
//! - The closed classification taxonomy (tiers, categories, root causes)
//! - Feedback rows and classification records
//! - A deterministic prompt builder
//! - A single-attempt classification client trait and its HTTP implementation
//! - A bounded linear retry combinator that never drops a row
//! - Configuration management utilities
//!
//! ## Architecture
//!
//! - `ClassificationClient`: one call to the remote classifier, two failure kinds
//! - `RetryExecutor`: attempt budget plus linear backoff, returns a tagged result
//! - `classify_with_retry`: composes the two and substitutes a sentinel record on exhaustion
//! - `ServiceError` / `ClassifyError`: error taxonomy for the remote service

pub mod core;
pub use core::ClassificationClient;

pub mod model;
pub use model::{ClassificationRecord, FeedbackRow};

pub mod taxonomy;
pub use taxonomy::{Category, ExperienceTier, Recoverable, ERROR_MARKER};

pub mod prompt;
pub use prompt::{build_prompt, SYSTEM_INSTRUCTION};

pub mod services;
pub use services::openai;

pub mod error;
pub use error::{ClassifyError, ErrorContext, Result, ServiceError};

pub mod resilience;
pub use resilience::{classify_with_retry, RetryConfig, RetryExecutor, RetryOutcome, RetryResult};

pub mod config;
pub use config::{ClassifierConfig, ConfigProvider};

pub mod util;

#[cfg(test)]
mod tests;

/// Create a classification client from explicit configuration
pub fn openai_classifier(config: ClassifierConfig) -> Result<services::openai::OpenAIClassifier> {
    services::openai::OpenAIClassifier::new(config)
}
