//! Contratos de almacenamiento durable del motor.
//!
//! El motor es el único escritor de Run/StepRun (la vía de atestación entra
//! por los mismos métodos condicionales). La tecnología de persistencia es
//! externa al core: aquí sólo viven los traits y las implementaciones en
//! memoria de referencia.

pub mod memory;

pub use memory::{InMemoryAuditStore, InMemoryManifestCatalog, InMemoryRunStateStore};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use gate_domain::{Manifest, Task};

use crate::errors::EngineError;
use crate::model::{Attestation, AttestationArtifact, GenerationCallRecord, ParsedOutputRecord, PromptRecord, Run,
                   StepRun, StepRunStatus};

/// Catálogo de definiciones (sólo lectura para el motor).
pub trait ManifestCatalog {
    fn manifest(&self, manifest_id: Uuid) -> Option<Manifest>;
    fn task(&self, task_id: Uuid) -> Option<Task>;
}

/// Estado durable de runs y step runs.
///
/// Las transiciones condicionadas por estado esperado (`transition_step_run`,
/// `insert_attestation`) son el mecanismo que hace race-safe el invariante
/// "a lo sumo un StepRun no-terminal por run" entre el loop del motor y la
/// vía de atestación.
pub trait RunStateStore {
    fn insert_run(&mut self, run: Run);
    fn run(&self, run_id: Uuid) -> Option<Run>;
    fn update_run(&mut self, run: Run);

    fn insert_step_run(&mut self, step_run: StepRun);
    fn step_run(&self, step_run_id: Uuid) -> Option<StepRun>;
    /// Step runs de un run en orden de creación (el orden de iteración del
    /// manifest, que es el único orden de ejecución).
    fn step_runs_for_run(&self, run_id: Uuid) -> Vec<StepRun>;
    fn update_step_run(&mut self, step_run: StepRun);

    /// Transición condicional estilo compare-and-set: falla con `Conflict`
    /// si el estado actual del StepRun no es `expected`.
    fn transition_step_run(&mut self,
                           step_run_id: Uuid,
                           expected: StepRunStatus,
                           next: StepRunStatus,
                           ended_at: Option<DateTime<Utc>>)
                           -> Result<StepRun, EngineError>;

    fn attestation_for_step_run(&self, step_run_id: Uuid) -> Option<Attestation>;
    /// Inserta una atestación con unicidad por StepRun: el segundo intento
    /// es `Conflict`, nunca una sobre-escritura.
    fn insert_attestation(&mut self,
                          attestation: Attestation,
                          artifacts: Vec<AttestationArtifact>)
                          -> Result<(), EngineError>;
    fn attestation_artifacts(&self, attestation_id: Uuid) -> Vec<AttestationArtifact>;
}

/// Rastro de auditoría append-only (prompts, llamadas, salidas parseadas).
pub trait AuditStore {
    fn record_prompt(&mut self, record: PromptRecord);
    fn record_generation_call(&mut self, record: GenerationCallRecord);
    fn record_parsed_output(&mut self, record: ParsedOutputRecord);

    fn prompts_for(&self, step_run_id: Uuid) -> Vec<PromptRecord>;
    fn generation_calls_for(&self, step_run_id: Uuid) -> Vec<GenerationCallRecord>;
    fn parsed_outputs_for(&self, step_run_id: Uuid) -> Vec<ParsedOutputRecord>;
}
