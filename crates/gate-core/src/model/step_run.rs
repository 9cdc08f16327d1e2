//! StepRun: un intento de ejecución de un paso dentro de un run.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Estado de un StepRun.
///
/// Pasos generation: `Running` -> `Success` | `Fail`.
/// Pasos compute: `WaitingForAttestation` -> `Success` | `Fail` (vía
/// atestación externa, nunca por el loop del motor).
/// Un paso puede cortocircuitar directo a `Skipped` sin pasar por `Running`
/// si el gating de dependencias falla; `Skipped` es definitivo dentro del
/// run — el gating se evalúa una sola vez, en la posición del paso.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepRunStatus {
    Running,
    Success,
    Fail,
    Skipped,
    WaitingForAttestation,
}

impl StepRunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepRunStatus::Success | StepRunStatus::Fail | StepRunStatus::Skipped)
    }

    /// Invariante del run: a lo sumo un StepRun no-terminal por run.
    pub fn is_non_terminal(&self) -> bool {
        !self.is_terminal()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRun {
    pub id: Uuid,
    pub run_id: Uuid,
    pub manifest_step_id: Uuid,
    pub status: StepRunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Hash canónico del mapa upstream que alimentó al paso.
    pub input_hash: Option<String>,
    /// Consultivo; nunca sustituye al canonical_output.
    pub decision_rationale: Option<Value>,
    /// Registro autoritativo del veredicto; presente en todo sub-estado
    /// terminal y persistido tal cual (no se recalcula).
    pub execution_policy_report: Option<Value>,
    /// No-null si y solo si status = SUCCESS con veredicto PASS.
    pub canonical_output: Option<Value>,
    pub error: Option<String>,
}

impl StepRun {
    pub fn new(run_id: Uuid, manifest_step_id: Uuid, status: StepRunStatus) -> Self {
        Self { id: Uuid::new_v4(),
               run_id,
               manifest_step_id,
               status,
               started_at: None,
               ended_at: None,
               input_hash: None,
               decision_rationale: None,
               execution_policy_report: None,
               canonical_output: None,
               error: None }
    }
}
