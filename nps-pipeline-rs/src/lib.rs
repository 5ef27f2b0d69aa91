//! # NPS Pipeline
//!
//! Batch classification of customer survey comments and the dashboard
//! metrics computed over the classified table.
//!
//! - `prepare`: schema check, missing-value normalization and comment filter
//! - `BatchOrchestrator`: sequential, order-preserving classification run
//! - `build_report`: KPIs, weekly series and breakdowns of an analysed table

pub mod columns;
pub mod error;
pub mod exit_codes;
pub mod orchestrator;
pub mod prepare;
pub mod report;
pub mod table;

pub use columns::ColumnMap;
pub use error::{PipelineError, Result};
pub use orchestrator::{BatchOrchestrator, BatchResult, Progress};
pub use prepare::{prepare, PreparedRows, SelectedRow};
pub use report::{build_report, DashboardReport, ReportFilter};
pub use table::SurveyTable;

