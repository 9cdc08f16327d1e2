//! Artefactos de auditoría, append-only y colgados de un StepRun.
//!
//! El motor escribe estos registros en cada paso generation (prompt, llamada
//! de generación, salida parseada) y la vía de atestación escribe la
//! `Attestation` (una por StepRun, con unicidad) y sus artefactos adjuntos.
//! Ninguno se muta después de creado.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Prompt renderizado junto con su contexto de renderizado.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRecord {
    pub id: Uuid,
    pub step_run_id: Uuid,
    pub rendered_prompt: String,
    pub context: Value,
    pub token_estimate: Option<i32>,
}

/// Llamada al backend de generación. Se escribe incondicionalmente, incluso
/// cuando el backend no pudo producir JSON parseable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationCallRecord {
    pub id: Uuid,
    pub step_run_id: Uuid,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub request_json: Option<Value>,
    pub response_json: Value,
    pub latency_ms: Option<i64>,
}

/// Texto crudo + objeto extraído (si lo hubo) + diagnóstico de extracción.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedOutputRecord {
    pub id: Uuid,
    pub step_run_id: Uuid,
    pub output_text: String,
    pub output_json: Option<Value>,
    pub extraction_report: Option<Value>,
}

/// Resultado de una atestación: exactamente SUCCESS o FAIL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttestationOutcome {
    Success,
    Fail,
}

impl AttestationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttestationOutcome::Success => "SUCCESS",
            AttestationOutcome::Fail => "FAIL",
        }
    }
}

/// Veredicto humano que cierra un paso compute. Una por StepRun.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
    pub id: Uuid,
    pub step_run_id: Uuid,
    pub attested_by: String,
    pub attested_at: DateTime<Utc>,
    pub outcome: AttestationOutcome,
    pub notes: Option<String>,
    /// Snapshot congelado del computeContract al momento de atestar.
    pub contract_snapshot: Option<Value>,
}

/// Evidencia adjunta a una atestación.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationArtifact {
    pub id: Uuid,
    pub attestation_id: Uuid,
    pub name: String,
    pub uri: String,
    pub sha256: Option<String>,
    pub bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
}
