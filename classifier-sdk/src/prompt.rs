//! Prompt builder
//!
//! Renders one feedback row into the user message sent to the classifier.
//! The output depends only on the row: the taxonomy section is rendered from
//! `Category::ALL` in a fixed order and row values are interpolated as-is.

use crate::model::{FeedbackRow, MAX_JUSTIFICATION_WORDS, MAX_RECOMMENDATION_WORDS};
use crate::taxonomy::Category;
use crate::util::format_number;

/// System message sent with every request
pub const SYSTEM_INSTRUCTION: &str =
    "Eres un analista de experiencia que solo responde con JSON EXACTO.";

const RULE: &str = "════════";

/// Build the classification prompt for one row
pub fn build_prompt(row: &FeedbackRow) -> String {
    let mut out = String::with_capacity(3072);

    out.push_str(
        "Eres ANALISTA CX SENIOR. Evalúa esta encuesta de NPS y devuelve un diagnóstico \
         accionable **solo en JSON** (sin comentarios ni texto adicional).\n",
    );
    out.push_str("Idioma: español.\n\n");

    out.push_str(&format!("{RULE}════ DATOS ════{RULE}════\n"));
    out.push_str(&data_section(row));
    out.push('\n');

    out.push_str(&format!("{RULE} LISTAS VÁLIDAS {RULE}\n"));
    out.push_str(&taxonomy_section());
    out.push('\n');

    out.push_str(&format!("{RULE} TAREAS {RULE}════\n"));
    out.push_str(&tasks_section());
    out.push('\n');

    out.push_str(&format!("{RULE} FORMATO DE SALIDA {RULE}════\n"));
    out.push_str(OUTPUT_SKELETON);

    out
}

fn data_section(row: &FeedbackRow) -> String {
    [
        format!(
            "NPS: {}      # 0-6 Detractor, 7-8 Neutro, 9-10 Promotor",
            format_number(row.nps)
        ),
        format!("Requerimiento resuelto (Sí/No): {}", row.resolved),
        format!(
            "Satisfacción resolución (1-7): {}",
            format_number(row.resolution_satisfaction)
        ),
        format!("Plazo de resolución cumplido (Sí/No): {}", row.deadline_met),
        format!(
            "Nivel de esfuerzo (1-5, 1 = mucho esfuerzo): {}",
            format_number(row.effort_score)
        ),
        format!("Interacciones requeridas: {}", format_number(row.interaction_count)),
        format!("Tipo de caso: {}", row.case_type),
        format!("Subfamilia: {}", row.sub_family),
        format!("Causa declarada: {}", row.declared_cause),
        format!("Comentario cliente: \"{}\"", row.comment),
    ]
    .iter()
    .map(|line| format!("{}\n", line))
    .collect()
}

fn taxonomy_section() -> String {
    let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();

    let mut out = String::from("Categorias:\n");
    out.push_str(&format!("[{}]\n\n", labels.join(", ")));
    out.push_str("Valores permitidos de causa_principal por categoría:\n");
    for category in Category::ALL {
        out.push_str(&format!(
            "- {} → [{}]\n",
            category.label(),
            category.causes().join(", ")
        ));
    }
    out
}

fn tasks_section() -> String {
    [
        "1. `tipo_experiencia` → Promotor | Neutro | Detractor.".to_string(),
        "2. `categoria` → una de la lista, EXACTA y en mayúsculas.".to_string(),
        "3. `causa_principal` → una de la lista permitida para la categoría.".to_string(),
        format!(
            "4. `detalle_analisis` → máx. {} palabras; justifica causa citando datos.",
            MAX_JUSTIFICATION_WORDS
        ),
        "5. `emocion_detectada` → emoción dominante (frustracion, alivio, alegria, etc.).".to_string(),
        "6. `es_recuperable` → Sí | No (considera NPS, emoción y si se resolvió).".to_string(),
        format!(
            "7. `recomendacion` → máx. {} palabras; acción concreta y directiva.",
            MAX_RECOMMENDATION_WORDS
        ),
    ]
    .iter()
    .map(|line| format!("{}\n", line))
    .collect()
}

const OUTPUT_SKELETON: &str = r#"{
  "tipo_experiencia": "...",
  "categoria": "...",
  "causa_principal": "...",
  "detalle_analisis": "...",
  "emocion_detectada": "...",
  "es_recuperable": "...",
  "recomendacion": "..."
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn row(comment: &str) -> FeedbackRow {
        FeedbackRow {
            case_id: "1001".to_string(),
            nps: 3.0,
            resolved: "No".to_string(),
            resolution_satisfaction: 2.0,
            deadline_met: "No".to_string(),
            effort_score: 1.0,
            interaction_count: 4.0,
            case_type: "Reclamo".to_string(),
            sub_family: "Despacho".to_string(),
            declared_cause: "Retraso".to_string(),
            comment: comment.to_string(),
        }
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let a = build_prompt(&row("nunca llegó mi pedido"));
        let b = build_prompt(&row("nunca llegó mi pedido"));
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_prompt_interpolates_row_values() {
        let prompt = build_prompt(&row("nunca llegó mi pedido"));
        assert!(prompt.contains("NPS: 3      # 0-6 Detractor"));
        assert!(prompt.contains("Interacciones requeridas: 4"));
        assert!(prompt.contains("Subfamilia: Despacho"));
        assert!(prompt.contains("Comentario cliente: \"nunca llegó mi pedido\""));
    }

    #[test]
    fn test_prompt_lists_full_taxonomy() {
        let prompt = build_prompt(&row("x"));
        for category in Category::ALL {
            assert!(prompt.contains(category.label()));
            for cause in category.causes() {
                assert!(prompt.contains(cause), "missing cause {}", cause);
            }
        }
        assert!(prompt.contains("máx. 35 palabras"));
        assert!(prompt.contains("máx. 45 palabras"));
        assert!(prompt.contains("\"recomendacion\": \"...\""));
    }

    #[test]
    fn test_prompt_differs_by_comment() {
        assert_ne!(build_prompt(&row("a")), build_prompt(&row("b")));
    }
}
