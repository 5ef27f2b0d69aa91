//! Row filter and validator
//!
//! Validates the schema, normalizes missing values and splits rows into those
//! with a comment (classified) and those without (counted, then dropped).

use classifier_sdk::FeedbackRow;

use crate::columns::ColumnMap;
use crate::error::{PipelineError, Result};
use crate::table::{parse_number, SurveyTable};

/// A row selected for classification
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedRow {
    /// 1-based position in the source table
    pub source_row: usize,
    /// Normalized source cells, aligned with the table headers
    pub cells: Vec<String>,
    pub feedback: FeedbackRow,
}

impl SelectedRow {
    pub fn case_id(&self) -> &str {
        &self.feedback.case_id
    }
}

/// Partition produced by `prepare`
#[derive(Debug, Clone, Default)]
pub struct PreparedRows {
    pub headers: Vec<String>,
    pub selected: Vec<SelectedRow>,
    pub excluded_count: usize,
    pub total: usize,
}

struct FieldIndexes {
    nps: usize,
    resolved: usize,
    resolution_satisfaction: usize,
    deadline_met: usize,
    effort_score: usize,
    interaction_count: usize,
    case_type: usize,
    sub_family: usize,
    declared_cause: usize,
    comment: usize,
    case_id: Option<usize>,
}

impl FieldIndexes {
    fn resolve(table: &SurveyTable, columns: &ColumnMap) -> Result<Self> {
        let missing = columns.missing_from(&table.headers);
        if !missing.is_empty() {
            return Err(PipelineError::schema(missing));
        }

        let index = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| PipelineError::schema(vec![name.to_string()]))
        };

        Ok(Self {
            nps: index(&columns.nps)?,
            resolved: index(&columns.resolved)?,
            resolution_satisfaction: index(&columns.resolution_satisfaction)?,
            deadline_met: index(&columns.deadline_met)?,
            effort_score: index(&columns.effort_score)?,
            interaction_count: index(&columns.interaction_count)?,
            case_type: index(&columns.case_type)?,
            sub_family: index(&columns.sub_family)?,
            declared_cause: index(&columns.declared_cause)?,
            comment: index(&columns.comment)?,
            case_id: table.column_index(&columns.case_id),
        })
    }

    /// Columns filled with `0` when missing, even if empty everywhere
    fn numeric(&self) -> [usize; 4] {
        [
            self.nps,
            self.resolution_satisfaction,
            self.effort_score,
            self.interaction_count,
        ]
    }

    fn feedback(&self, cells: &[String], source_row: usize) -> FeedbackRow {
        let text = |i: usize| cells[i].trim().to_string();
        let number = |i: usize| {
            parse_number(&cells[i]).unwrap_or_else(|| {
                if cells[i].trim() != "0" {
                    log::debug!("row {}: non-numeric value '{}' read as 0", source_row, cells[i]);
                }
                0.0
            })
        };

        let case_id = self
            .case_id
            .map(|i| cells[i].trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("fila-{}", source_row));

        FeedbackRow {
            case_id,
            nps: number(self.nps),
            resolved: text(self.resolved),
            resolution_satisfaction: number(self.resolution_satisfaction),
            deadline_met: text(self.deadline_met),
            effort_score: number(self.effort_score),
            interaction_count: number(self.interaction_count),
            case_type: text(self.case_type),
            sub_family: text(self.sub_family),
            declared_cause: text(self.declared_cause),
            comment: cells[self.comment].clone(),
        }
    }
}

/// Validate, normalize and partition a survey table
///
/// Fails with `PipelineError::Schema` naming every missing required column.
/// Has no side effects; calling it twice yields the same partition.
pub fn prepare(table: &SurveyTable, columns: &ColumnMap) -> Result<PreparedRows> {
    let fields = FieldIndexes::resolve(table, columns)?;
    let normalized = table.normalized(&[fields.comment], &fields.numeric());

    let mut selected = Vec::new();
    let mut excluded_count = 0;

    for (i, cells) in normalized.rows.into_iter().enumerate() {
        let source_row = i + 1;
        if cells[fields.comment].trim().is_empty() {
            excluded_count += 1;
            continue;
        }
        let feedback = fields.feedback(&cells, source_row);
        selected.push(SelectedRow {
            source_row,
            cells,
            feedback,
        });
    }

    let total = table.len();
    log::info!("Total surveys: {}", total);
    log::info!("With comment: {}", selected.len());
    log::info!("Without comment: {}", excluded_count);

    Ok(PreparedRows {
        headers: normalized.headers,
        selected,
        excluded_count,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(map: &ColumnMap) -> Vec<String> {
        let mut headers = vec![map.case_id.clone()];
        headers.extend(map.required_columns().iter().map(|s| s.to_string()));
        headers
    }

    fn row(case_id: &str, nps: &str, comment: &str) -> Vec<String> {
        vec![
            case_id, nps, "Sí", "6", "Sí", "", "2", "Reclamo", "Despacho", "Retraso", comment,
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    }

    #[test]
    fn test_partition_by_comment() {
        let map = ColumnMap::default();
        let table = SurveyTable::new(headers(&map), vec![row("A", "3", ""), row("B", "10", "ok")]);

        let prepared = prepare(&table, &map).unwrap();
        assert_eq!(prepared.total, 2);
        assert_eq!(prepared.excluded_count, 1);
        assert_eq!(prepared.selected.len(), 1);
        assert_eq!(prepared.selected[0].case_id(), "B");
        assert_eq!(prepared.selected[0].source_row, 2);
    }

    #[test]
    fn test_whitespace_comment_is_excluded() {
        let map = ColumnMap::default();
        let table = SurveyTable::new(headers(&map), vec![row("A", "3", "   ")]);
        let prepared = prepare(&table, &map).unwrap();
        assert!(prepared.selected.is_empty());
        assert_eq!(prepared.excluded_count, 1);
    }

    #[test]
    fn test_missing_values_normalized() {
        let map = ColumnMap::default();
        let table = SurveyTable::new(headers(&map), vec![row("A", "", "malo"), row("B", "9", "bien")]);

        let prepared = prepare(&table, &map).unwrap();
        let first = &prepared.selected[0];
        assert_eq!(first.feedback.nps, 0.0);
        assert_eq!(first.feedback.effort_score, 0.0);
        assert_eq!(first.cells[1], "0");
        // effort column is empty everywhere but still numeric
        assert_eq!(first.cells[5], "0");
        assert_eq!(first.feedback.resolved, "Sí");
    }

    #[test]
    fn test_schema_error_names_missing_column() {
        let map = ColumnMap::default();
        let mut hdrs = headers(&map);
        hdrs.retain(|h| h != "Causa");
        let table = SurveyTable::new(hdrs, vec![]);

        match prepare(&table, &map).unwrap_err() {
            PipelineError::Schema { missing } => assert_eq!(missing, vec!["Causa".to_string()]),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_case_id_fallback() {
        let map = ColumnMap {
            case_id: "no_such_column".to_string(),
            ..ColumnMap::default()
        };
        let table = SurveyTable::new(headers(&ColumnMap::default()), vec![row("A", "9", "x")]);
        let prepared = prepare(&table, &map).unwrap();
        assert_eq!(prepared.selected[0].case_id(), "fila-1");
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let map = ColumnMap::default();
        let table = SurveyTable::new(headers(&map), vec![row("A", "", "x"), row("B", "7", "")]);
        let a = prepare(&table, &map).unwrap();
        let b = prepare(&table, &map).unwrap();
        assert_eq!(a.selected, b.selected);
        assert_eq!(a.excluded_count, b.excluded_count);
    }
}
