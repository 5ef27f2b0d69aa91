//! Resilience patterns for the classification client
//!
//! - `RetryExecutor`: generic bounded retry with linear backoff
//! - `classify_with_retry`: the retry controller, which turns an exhausted
//!   retry budget into a sentinel record so a row is never lost

mod retry;

pub use retry::{LinearBackoff, RetryConfig, RetryExecutor, RetryResult};

use crate::core::ClassificationClient;
use crate::error::ClassifyError;
use crate::model::ClassificationRecord;

/// Result of classifying one row under a retry budget
#[derive(Debug)]
pub enum RetryOutcome {
    /// The client returned a valid record
    Classified {
        record: ClassificationRecord,
        attempts: u32,
    },

    /// Every attempt failed; `sentinel` carries the last error text
    Exhausted {
        sentinel: ClassificationRecord,
        error: ClassifyError,
        attempts: u32,
    },
}

impl RetryOutcome {
    /// The record to emit for the row, classified or sentinel
    pub fn record(&self) -> &ClassificationRecord {
        match self {
            RetryOutcome::Classified { record, .. } => record,
            RetryOutcome::Exhausted { sentinel, .. } => sentinel,
        }
    }

    pub fn into_record(self) -> ClassificationRecord {
        match self {
            RetryOutcome::Classified { record, .. } => record,
            RetryOutcome::Exhausted { sentinel, .. } => sentinel,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Classified { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, RetryOutcome::Exhausted { .. })
    }
}

/// Classify one prompt, retrying every failure with linear backoff
///
/// Never fails: on exhaustion the outcome holds a sentinel record whose
/// category is the error marker and whose root cause is the last error text.
pub async fn classify_with_retry<C>(
    client: &C,
    prompt: &str,
    config: &RetryConfig,
    case_id: &str,
) -> RetryOutcome
where
    C: ClassificationClient + ?Sized,
{
    let executor = RetryExecutor::new(config.clone());
    let label = format!("case {}", case_id);

    let result = executor
        .execute(&label, |attempt| async move {
            log::debug!("[case {}] classify attempt {}", case_id, attempt);
            client.classify(prompt).await.map_err(|err| {
                log::debug!(
                    "[case {}] {} on attempt {} ({})",
                    case_id,
                    err.kind(),
                    attempt,
                    if err.is_transient() { "transient" } else { "persistent" }
                );
                err
            })
        })
        .await;

    match result {
        RetryResult::Success { value, attempts } => RetryOutcome::Classified {
            record: value,
            attempts,
        },
        RetryResult::Exhausted { error, attempts } => RetryOutcome::Exhausted {
            sentinel: ClassificationRecord::sentinel(error.to_string()),
            error,
            attempts,
        },
    }
}
