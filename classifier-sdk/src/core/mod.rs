//! Core abstraction for classification clients
//!
//! A `ClassificationClient` makes exactly one call to the remote classifier
//! per `classify` invocation. It never retries; callers compose retry on top
//! (see `resilience::classify_with_retry`).

use async_trait::async_trait;

use crate::error::ClassifyError;
use crate::model::ClassificationRecord;

/// Single-attempt classifier
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClassificationClient: Send + Sync {
    /// Send one prompt and parse the reply into a validated record
    ///
    /// Fails with `ClassifyError::Service` when the call errors and with
    /// `ClassifyError::MalformedResponse` when the reply is not a valid
    /// classification object.
    async fn classify(&self, prompt: &str) -> Result<ClassificationRecord, ClassifyError>;

    /// Model identifier used for every call
    fn model(&self) -> &str;
}
