//! Batch orchestrator
//!
//! Drives the whole table through the classifier one row at a time, in
//! source order. Per-row failures become sentinel records; only table-level
//! problems (a missing column) abort the run, and they do so before any
//! remote call is made.

use std::sync::Arc;

use classifier_sdk::model::OUTPUT_COLUMNS;
use classifier_sdk::{build_prompt, classify_with_retry, ClassificationClient, ClassificationRecord, RetryConfig};
use tokio::sync::watch;

use crate::columns::ColumnMap;
use crate::error::Result;
use crate::prepare::{prepare, SelectedRow};
use crate::table::SurveyTable;

/// Snapshot handed to the progress observer after each row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// 1-based index of the row just finished
    pub done: usize,
    pub total: usize,
    pub case_id: String,
    pub attempts: u32,
    pub sentinel: bool,
}

pub type ProgressObserver = Box<dyn Fn(&Progress) + Send + Sync>;

/// Outcome of a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub headers: Vec<String>,
    /// Selected rows paired with their records, in source order
    pub rows: Vec<(SelectedRow, ClassificationRecord)>,
    pub total_rows: usize,
    pub excluded_count: usize,
    pub sentinel_count: usize,
    /// The run stopped early; `rows` holds only completed rows
    pub cancelled: bool,
}

impl BatchResult {
    pub fn classified_count(&self) -> usize {
        self.rows.len() - self.sentinel_count
    }

    /// The selected rows with the seven output columns appended
    ///
    /// Source columns sharing a name with an output column are replaced.
    pub fn to_table(&self) -> SurveyTable {
        let kept: Vec<usize> = (0..self.headers.len())
            .filter(|&i| !OUTPUT_COLUMNS.contains(&self.headers[i].as_str()))
            .collect();

        let mut headers: Vec<String> = kept.iter().map(|&i| self.headers[i].clone()).collect();
        headers.extend(OUTPUT_COLUMNS.iter().map(|c| c.to_string()));

        let rows = self
            .rows
            .iter()
            .map(|(row, record)| {
                let mut cells: Vec<String> = kept.iter().map(|&i| row.cells[i].clone()).collect();
                cells.extend(record.output_fields());
                cells
            })
            .collect();

        SurveyTable::new(headers, rows)
    }
}

pub struct BatchOrchestrator {
    client: Arc<dyn ClassificationClient>,
    retry: RetryConfig,
    progress: Option<ProgressObserver>,
    cancel: Option<watch::Receiver<bool>>,
}

impl BatchOrchestrator {
    pub fn new(client: Arc<dyn ClassificationClient>, retry: RetryConfig) -> Self {
        Self {
            client,
            retry,
            progress: None,
            cancel: None,
        }
    }

    pub fn with_progress(mut self, observer: ProgressObserver) -> Self {
        self.progress = Some(observer);
        self
    }

    /// Stop at the next row boundary once the channel reads `true`
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancel_requested(&self) -> bool {
        self.cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Classify every row that carries a comment
    pub async fn run(&self, table: &SurveyTable, columns: &ColumnMap) -> Result<BatchResult> {
        let prepared = prepare(table, columns)?;
        let total = prepared.selected.len();

        log::info!(
            "Classifying {} rows with model {} ({})",
            total,
            self.client.model(),
            self.retry
        );

        let mut result = BatchResult {
            headers: prepared.headers,
            rows: Vec::with_capacity(total),
            total_rows: prepared.total,
            excluded_count: prepared.excluded_count,
            sentinel_count: 0,
            cancelled: false,
        };

        for (i, row) in prepared.selected.into_iter().enumerate() {
            if self.cancel_requested() {
                log::warn!("Cancelled before row {}/{}", i + 1, total);
                result.cancelled = true;
                break;
            }

            log::info!("Processing row {}/{} (case {})", i + 1, total, row.case_id());
            let prompt = build_prompt(&row.feedback);

            let classify = classify_with_retry(self.client.as_ref(), &prompt, &self.retry, row.case_id());
            let outcome = match self.cancel.clone() {
                Some(rx) => tokio::select! {
                    outcome = classify => outcome,
                    _ = wait_for_cancel(rx) => {
                        log::warn!("Cancelled during row {}/{}; discarding it", i + 1, total);
                        result.cancelled = true;
                        break;
                    }
                },
                None => classify.await,
            };

            let attempts = outcome.attempts();
            let sentinel = outcome.is_sentinel();
            if sentinel {
                result.sentinel_count += 1;
                log::error!(
                    "[case {}] no valid classification after {} attempts",
                    row.case_id(),
                    attempts
                );
            }

            let record = outcome.into_record().anchored_to(&row.feedback);

            if let Some(observer) = &self.progress {
                observer(&Progress {
                    done: i + 1,
                    total,
                    case_id: row.case_id().to_string(),
                    attempts,
                    sentinel,
                });
            }

            result.rows.push((row, record));
        }

        log::info!(
            "Batch finished: {} classified, {} sentinel, {} without comment{}",
            result.classified_count(),
            result.sentinel_count,
            result.excluded_count,
            if result.cancelled { " (cancelled)" } else { "" }
        );

        Ok(result)
    }
}

/// Resolves once the channel reads `true`; never resolves if the sender is gone
async fn wait_for_cancel(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
