//! Column mapping
//!
//! Maps the logical survey fields onto the header names of the source table.
//! Defaults are the headers of the survey export; a YAML file can override
//! any subset of them:
//!
//! ```yaml
//! comment: "Comentario cliente"
//! case_id: "ID Caso"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Header names for each logical field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnMap {
    pub nps: String,
    pub resolved: String,
    pub resolution_satisfaction: String,
    pub deadline_met: String,
    pub effort_score: String,
    pub interaction_count: String,
    pub case_type: String,
    pub sub_family: String,
    pub declared_cause: String,
    pub comment: String,

    /// Optional: falls back to the source row number
    pub case_id: String,
    /// Optional: opening timestamp, used by the report
    pub opened_at: String,
    /// Optional: resolving agent, used by the report
    pub agent_id: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            nps: "NPS".to_string(),
            resolved: "¿Tu requerimiento fue resuelto en base a lo acordado?".to_string(),
            resolution_satisfaction: "Satisfacción con resolución".to_string(),
            deadline_met: "Plazo resolución de requerimiento".to_string(),
            effort_score: "Nivel de esfuerzo cliente".to_string(),
            interaction_count: "Número de interacciones para resolver requerimiento".to_string(),
            case_type: "Tipo".to_string(),
            sub_family: "Subfamilia".to_string(),
            declared_cause: "Causa".to_string(),
            comment: "Walmart LTR - Comentario".to_string(),
            case_id: "numero_del_caso".to_string(),
            opened_at: "fecha_hora_de_apertura".to_string(),
            agent_id: "id_ejecutivo_resolutor_de_caso".to_string(),
        }
    }
}

impl ColumnMap {
    /// Load a column map from a YAML file; unspecified fields keep their defaults
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::io(path.display().to_string(), e))?;
        Self::from_yaml_str(&content).map_err(|source| PipelineError::ColumnMap {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml_str(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// The columns every input table must carry, in a stable order
    pub fn required_columns(&self) -> [&str; 10] {
        [
            self.nps.as_str(),
            self.resolved.as_str(),
            self.resolution_satisfaction.as_str(),
            self.deadline_met.as_str(),
            self.effort_score.as_str(),
            self.interaction_count.as_str(),
            self.case_type.as_str(),
            self.sub_family.as_str(),
            self.declared_cause.as_str(),
            self.comment.as_str(),
        ]
    }

    /// Required columns absent from `headers`, in `required_columns` order
    pub fn missing_from(&self, headers: &[String]) -> Vec<String> {
        self.required_columns()
            .iter()
            .filter(|name| !headers.iter().any(|h| h == *name))
            .map(|name| name.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let map = ColumnMap::from_yaml_str("comment: \"Comentario\"\ncase_id: ID\n").unwrap();
        assert_eq!(map.comment, "Comentario");
        assert_eq!(map.case_id, "ID");
        assert_eq!(map.nps, "NPS");
        assert_eq!(ColumnMap::from_yaml_str("").unwrap(), ColumnMap::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(ColumnMap::from_yaml_str("coment: x").is_err());
    }

    #[test]
    fn test_missing_from_reports_exact_columns() {
        let map = ColumnMap::default();
        let mut headers: Vec<String> = map.required_columns().iter().map(|s| s.to_string()).collect();
        assert!(map.missing_from(&headers).is_empty());

        headers.retain(|h| h != "Subfamilia");
        assert_eq!(map.missing_from(&headers), vec!["Subfamilia".to_string()]);
    }
}
