//! Closed classification taxonomy
//!
//! The category list, the allowed root causes per category, the three
//! experience tiers and the recoverable flag. Labels are the ones used by the
//! survey export and by the prompt, so they are kept in Spanish.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved category label carried by sentinel records
pub const ERROR_MARKER: &str = "Error";

/// Experience tier derived from the NPS score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExperienceTier {
    Promotor,
    Neutro,
    Detractor,
}

impl ExperienceTier {
    /// All tiers in display order
    pub const ALL: [ExperienceTier; 3] = [
        ExperienceTier::Promotor,
        ExperienceTier::Neutro,
        ExperienceTier::Detractor,
    ];

    /// Score bands: 9-10 Promotor, 7-8 Neutro, 0-6 Detractor
    pub fn from_nps(score: f64) -> Self {
        if score >= 9.0 {
            ExperienceTier::Promotor
        } else if score >= 7.0 {
            ExperienceTier::Neutro
        } else {
            ExperienceTier::Detractor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExperienceTier::Promotor => "Promotor",
            ExperienceTier::Neutro => "Neutro",
            ExperienceTier::Detractor => "Detractor",
        }
    }

    /// Case-insensitive parse; accepts the English spellings as well
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "promotor" | "promoter" => Some(ExperienceTier::Promotor),
            "neutro" | "neutral" | "pasivo" => Some(ExperienceTier::Neutro),
            "detractor" => Some(ExperienceTier::Detractor),
            _ => None,
        }
    }
}

impl fmt::Display for ExperienceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Diagnosis category, one of a fixed set of eleven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Comunicacion,
    TiempoRespuesta,
    CalidadSolucion,
    NivelEsfuerzo,
    CumplimientoPromesa,
    CumplimientoEntrega,
    ProductoCalidad,
    AtencionCliente,
    ProcesoInterno,
    DevolucionReembolso,
    Otro,
}

impl Category {
    /// All categories in prompt order
    pub const ALL: [Category; 11] = [
        Category::Comunicacion,
        Category::TiempoRespuesta,
        Category::CalidadSolucion,
        Category::NivelEsfuerzo,
        Category::CumplimientoPromesa,
        Category::CumplimientoEntrega,
        Category::ProductoCalidad,
        Category::AtencionCliente,
        Category::ProcesoInterno,
        Category::DevolucionReembolso,
        Category::Otro,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Comunicacion => "COMUNICACION",
            Category::TiempoRespuesta => "TIEMPO_RESPUESTA",
            Category::CalidadSolucion => "CALIDAD_SOLUCION",
            Category::NivelEsfuerzo => "NIVEL_ESFUERZO",
            Category::CumplimientoPromesa => "CUMPLIMIENTO_PROMESA",
            Category::CumplimientoEntrega => "CUMPLIMIENTO_ENTREGA",
            Category::ProductoCalidad => "PRODUCTO_CALIDAD",
            Category::AtencionCliente => "ATENCION_CLIENTE",
            Category::ProcesoInterno => "PROCESO_INTERNO",
            Category::DevolucionReembolso => "DEVOLUCION_REEMBOLSO",
            Category::Otro => "OTRO",
        }
    }

    /// Allowed root causes for this category
    pub fn causes(&self) -> &'static [&'static str] {
        match self {
            Category::Comunicacion => &[
                "Falta_comunicacion",
                "Informacion_inconsistente",
                "No_respuesta",
                "Respuesta_tardia",
                "Seguimiento_insuficiente",
            ],
            Category::TiempoRespuesta => &[
                "Demora_resolucion",
                "Demora_inicio_respuesta",
                "Plazo_incumplido",
            ],
            Category::CalidadSolucion => &[
                "Solucion_parcial",
                "Solucion_inadecuada",
                "Problema_no_resuelto",
            ],
            Category::NivelEsfuerzo => &[
                "Muchas_interacciones",
                "Proceso_complejo",
                "Autogestion_insuficiente",
            ],
            Category::CumplimientoPromesa => &[
                "Reembolso_no_realizado",
                "Compensacion_no_entregada",
                "Promesa_incumplida",
            ],
            Category::CumplimientoEntrega => &[
                "Entrega_no_realizada",
                "Entrega_tardia",
                "Entrega_direccion_incorrecta",
                "Entrega_producto_incorrecto",
            ],
            Category::ProductoCalidad => &[
                "Producto_defectuoso",
                "Producto_danado",
                "Producto_faltante",
                "Producto_distinto_descripcion",
            ],
            Category::AtencionCliente => &[
                "Mala_atencion_cliente",
                "Mala_atencion_transportista",
                "Atencion_cordial",
                "Atencion_rapida_efectiva",
            ],
            Category::ProcesoInterno => &[
                "Cancelacion_no_procesada",
                "Cambio_no_gestionado",
                "Factura_incorrecta",
            ],
            Category::DevolucionReembolso => &[
                "Demora_reembolso",
                "Devolucion_incompleta",
                "Retiro_no_gestionado",
                "Proceso_devolucion_complicado",
            ],
            Category::Otro => &["Otro"],
        }
    }

    /// Parse a category label, ignoring case and surrounding whitespace
    pub fn parse(value: &str) -> Option<Self> {
        let wanted = value.trim().to_uppercase();
        Category::ALL.into_iter().find(|c| c.label() == wanted)
    }

    /// Canonical spelling of `cause` if it belongs to this category
    pub fn canonical_cause(&self, cause: &str) -> Option<&'static str> {
        let wanted = cause.trim();
        self.causes()
            .iter()
            .copied()
            .find(|c| c.eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether a dissatisfied customer is judged salvageable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recoverable {
    Yes,
    No,
}

impl Recoverable {
    pub fn label(&self) -> &'static str {
        match self {
            Recoverable::Yes => "Sí",
            Recoverable::No => "No",
        }
    }

    /// Normalize the Yes/No-like spellings found in model output and exports
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "sí" | "si" | "yes" | "true" | "1" | "recuperable" => Some(Recoverable::Yes),
            "no" | "false" | "0" | "no recuperable" => Some(Recoverable::No),
            _ => None,
        }
    }
}

impl fmt::Display for Recoverable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
