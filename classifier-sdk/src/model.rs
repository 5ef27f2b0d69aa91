//! Feedback rows and classification records
//!
//! `FeedbackRow` is the read-only view of one survey response handed to the
//! prompt builder. `ClassificationRecord` is the structured diagnosis for one
//! row, either parsed from the model's JSON object or synthesized as a
//! sentinel once the retry budget is spent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClassifyError;
use crate::taxonomy::{Category, ExperienceTier, Recoverable, ERROR_MARKER};
use crate::util::truncate_words;

/// Word limit for the justification text
pub const MAX_JUSTIFICATION_WORDS: usize = 35;

/// Word limit for the recommendation text
pub const MAX_RECOMMENDATION_WORDS: usize = 45;

/// Output column names, in the order records are appended to the source row
pub const OUTPUT_COLUMNS: [&str; 7] = [
    "tipo_experiencia",
    "categoria",
    "causa_principal",
    "detalle_analisis",
    "emocion_detectada",
    "es_recuperable",
    "recomendacion",
];

/// One survey response
///
/// Missing text fields are empty strings and missing numeric fields are zero;
/// normalization happens before a row is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRow {
    /// Unique case identifier
    pub case_id: String,
    /// NPS score, 0-10
    pub nps: f64,
    /// Whether the request was resolved as agreed (Sí/No-like)
    pub resolved: String,
    /// Satisfaction with the resolution, 1-7
    pub resolution_satisfaction: f64,
    /// Whether the resolution deadline was met (Sí/No-like)
    pub deadline_met: String,
    /// Customer effort, 1-5 where 1 means a lot of effort
    pub effort_score: f64,
    /// Interactions needed to resolve the request
    pub interaction_count: f64,
    pub case_type: String,
    pub sub_family: String,
    pub declared_cause: String,
    /// Free-text comment
    pub comment: String,
}

impl FeedbackRow {
    /// Tier computed from the score, the only tier used for aggregation
    pub fn tier(&self) -> ExperienceTier {
        ExperienceTier::from_nps(self.nps)
    }

    pub fn has_comment(&self) -> bool {
        !self.comment.trim().is_empty()
    }
}

/// Category and root cause of a record, or the failure that replaced them
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnosis {
    Classified {
        category: Category,
        root_cause: &'static str,
    },
    Failed {
        message: String,
    },
}

/// Structured diagnosis for one classified row
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRecord {
    /// Tier derived from the row's score; set when the record is anchored to its row
    pub experience_tier: Option<ExperienceTier>,
    /// Tier the model judged, informational only
    pub model_tier: Option<ExperienceTier>,
    pub diagnosis: Diagnosis,
    pub justification: String,
    pub emotion: String,
    pub recoverable: Option<Recoverable>,
    pub recommendation: String,
}

/// The object the model is asked to return
#[derive(Debug, Deserialize)]
struct RawClassification {
    tipo_experiencia: String,
    categoria: String,
    causa_principal: String,
    detalle_analisis: String,
    emocion_detectada: String,
    es_recuperable: Value,
    recomendacion: String,
}

impl ClassificationRecord {
    /// Sentinel emitted when every attempt for a row failed
    pub fn sentinel(message: impl Into<String>) -> Self {
        Self {
            experience_tier: None,
            model_tier: None,
            diagnosis: Diagnosis::Failed {
                message: message.into(),
            },
            justification: String::new(),
            emotion: String::new(),
            recoverable: None,
            recommendation: String::new(),
        }
    }

    /// Parse and validate the model's reply
    ///
    /// Leading prose before the first `{` is skipped. Any missing key, unknown
    /// category, cause outside the category or unreadable recoverable flag is
    /// a `MalformedResponse`.
    pub fn from_model_reply(text: &str) -> Result<Self, ClassifyError> {
        let text = text.trim();
        let start = text
            .find('{')
            .ok_or_else(|| ClassifyError::malformed("no JSON object found in model reply"))?;

        let raw: RawClassification = serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<RawClassification>()
            .next()
            .ok_or_else(|| ClassifyError::malformed("empty model reply"))?
            .map_err(|e| ClassifyError::malformed(format!("invalid classification object: {}", e)))?;

        let category = Category::parse(&raw.categoria).ok_or_else(|| {
            ClassifyError::malformed(format!("unknown categoria '{}'", raw.categoria))
        })?;

        let root_cause = category.canonical_cause(&raw.causa_principal).ok_or_else(|| {
            ClassifyError::malformed(format!(
                "causa_principal '{}' is not allowed for {}",
                raw.causa_principal, category
            ))
        })?;

        let recoverable = match &raw.es_recuperable {
            Value::Bool(flag) => Some(if *flag { Recoverable::Yes } else { Recoverable::No }),
            Value::String(s) => Recoverable::parse(s),
            _ => None,
        }
        .ok_or_else(|| {
            ClassifyError::malformed(format!("unreadable es_recuperable: {}", raw.es_recuperable))
        })?;

        Ok(Self {
            experience_tier: None,
            model_tier: ExperienceTier::parse(&raw.tipo_experiencia),
            diagnosis: Diagnosis::Classified {
                category,
                root_cause,
            },
            justification: truncate_words(raw.detalle_analisis.trim(), MAX_JUSTIFICATION_WORDS),
            emotion: raw.emocion_detectada.trim().to_string(),
            recoverable: Some(recoverable),
            recommendation: truncate_words(raw.recomendacion.trim(), MAX_RECOMMENDATION_WORDS),
        })
    }

    /// Return this record with its tier recomputed from the row's score
    ///
    /// A model tier that disagrees with the score is kept and logged.
    pub fn anchored_to(self, row: &FeedbackRow) -> Self {
        let anchored = Self {
            experience_tier: Some(row.tier()),
            ..self
        };
        if let Some((model, score)) = anchored.tier_disagreement() {
            log::debug!(
                "[case {}] model said {}, score {} gives {}",
                row.case_id,
                model.label(),
                row.nps,
                score.label()
            );
        }
        anchored
    }

    /// `(model tier, score tier)` when both are known and differ
    pub fn tier_disagreement(&self) -> Option<(ExperienceTier, ExperienceTier)> {
        match (self.model_tier, self.experience_tier) {
            (Some(model), Some(score)) if model != score => Some((model, score)),
            _ => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self.diagnosis, Diagnosis::Failed { .. })
    }

    pub fn category(&self) -> Option<Category> {
        match self.diagnosis {
            Diagnosis::Classified { category, .. } => Some(category),
            Diagnosis::Failed { .. } => None,
        }
    }

    /// Category label, `Error` for sentinels
    pub fn category_label(&self) -> &str {
        match &self.diagnosis {
            Diagnosis::Classified { category, .. } => category.label(),
            Diagnosis::Failed { .. } => ERROR_MARKER,
        }
    }

    /// Root cause, or the failure message for sentinels
    pub fn root_cause(&self) -> &str {
        match &self.diagnosis {
            Diagnosis::Classified { root_cause, .. } => root_cause,
            Diagnosis::Failed { message } => message,
        }
    }

    /// Cell values in `OUTPUT_COLUMNS` order
    pub fn output_fields(&self) -> [String; 7] {
        let tier = self
            .experience_tier
            .or(self.model_tier)
            .map(|t| t.label().to_string())
            .unwrap_or_default();

        [
            tier,
            self.category_label().to_string(),
            self.root_cause().to_string(),
            self.justification.clone(),
            self.emotion.clone(),
            self.recoverable.map(|r| r.label().to_string()).unwrap_or_default(),
            self.recommendation.clone(),
        ]
    }
}
