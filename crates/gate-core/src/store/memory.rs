//! Implementaciones en memoria de los stores (referencia y tests).
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use gate_domain::{Manifest, Task};

use crate::errors::EngineError;
use crate::model::{Attestation, AttestationArtifact, GenerationCallRecord, ParsedOutputRecord, PromptRecord, Run,
                   StepRun, StepRunStatus};

use super::{AuditStore, ManifestCatalog, RunStateStore};

#[derive(Default)]
pub struct InMemoryManifestCatalog {
    manifests: HashMap<Uuid, Manifest>,
    tasks: HashMap<Uuid, Task>,
}

impl InMemoryManifestCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_manifest(&mut self, manifest: Manifest) -> Uuid {
        let id = manifest.id;
        self.manifests.insert(id, manifest);
        id
    }

    pub fn insert_task(&mut self, task: Task) -> Uuid {
        let id = task.id;
        self.tasks.insert(id, task);
        id
    }
}

impl ManifestCatalog for InMemoryManifestCatalog {
    fn manifest(&self, manifest_id: Uuid) -> Option<Manifest> {
        self.manifests.get(&manifest_id).cloned()
    }

    fn task(&self, task_id: Uuid) -> Option<Task> {
        self.tasks.get(&task_id).cloned()
    }
}

/// Store de estado de runs. Los StepRuns se guardan en un Vec para preservar
/// el orden de creación (orden de iteración del manifest).
#[derive(Default)]
pub struct InMemoryRunStateStore {
    runs: HashMap<Uuid, Run>,
    step_runs: Vec<StepRun>,
    attestations: HashMap<Uuid, Attestation>, // por step_run_id
    attestation_artifacts: HashMap<Uuid, Vec<AttestationArtifact>>, // por attestation_id
}

impl InMemoryRunStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunStateStore for InMemoryRunStateStore {
    fn insert_run(&mut self, run: Run) {
        self.runs.insert(run.id, run);
    }

    fn run(&self, run_id: Uuid) -> Option<Run> {
        self.runs.get(&run_id).cloned()
    }

    fn update_run(&mut self, run: Run) {
        self.runs.insert(run.id, run);
    }

    fn insert_step_run(&mut self, step_run: StepRun) {
        self.step_runs.push(step_run);
    }

    fn step_run(&self, step_run_id: Uuid) -> Option<StepRun> {
        self.step_runs.iter().find(|s| s.id == step_run_id).cloned()
    }

    fn step_runs_for_run(&self, run_id: Uuid) -> Vec<StepRun> {
        self.step_runs.iter().filter(|s| s.run_id == run_id).cloned().collect()
    }

    fn update_step_run(&mut self, step_run: StepRun) {
        if let Some(slot) = self.step_runs.iter_mut().find(|s| s.id == step_run.id) {
            *slot = step_run;
        }
    }

    fn transition_step_run(&mut self,
                           step_run_id: Uuid,
                           expected: StepRunStatus,
                           next: StepRunStatus,
                           ended_at: Option<DateTime<Utc>>)
                           -> Result<StepRun, EngineError> {
        let slot = self.step_runs
                       .iter_mut()
                       .find(|s| s.id == step_run_id)
                       .ok_or(EngineError::NotFound("step run"))?;
        if slot.status != expected {
            return Err(EngineError::Conflict(format!("step run status is {:?}, expected {:?}", slot.status, expected)));
        }
        slot.status = next;
        if ended_at.is_some() {
            slot.ended_at = ended_at;
        }
        Ok(slot.clone())
    }

    fn attestation_for_step_run(&self, step_run_id: Uuid) -> Option<Attestation> {
        self.attestations.get(&step_run_id).cloned()
    }

    fn insert_attestation(&mut self,
                          attestation: Attestation,
                          artifacts: Vec<AttestationArtifact>)
                          -> Result<(), EngineError> {
        if self.attestations.contains_key(&attestation.step_run_id) {
            return Err(EngineError::Conflict("attestation already exists for this step run".to_string()));
        }
        self.attestation_artifacts.insert(attestation.id, artifacts);
        self.attestations.insert(attestation.step_run_id, attestation);
        Ok(())
    }

    fn attestation_artifacts(&self, attestation_id: Uuid) -> Vec<AttestationArtifact> {
        self.attestation_artifacts.get(&attestation_id).cloned().unwrap_or_default()
    }
}

#[derive(Default)]
pub struct InMemoryAuditStore {
    prompts: Vec<PromptRecord>,
    generation_calls: Vec<GenerationCallRecord>,
    parsed_outputs: Vec<ParsedOutputRecord>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditStore for InMemoryAuditStore {
    fn record_prompt(&mut self, record: PromptRecord) {
        self.prompts.push(record);
    }

    fn record_generation_call(&mut self, record: GenerationCallRecord) {
        self.generation_calls.push(record);
    }

    fn record_parsed_output(&mut self, record: ParsedOutputRecord) {
        self.parsed_outputs.push(record);
    }

    fn prompts_for(&self, step_run_id: Uuid) -> Vec<PromptRecord> {
        self.prompts.iter().filter(|r| r.step_run_id == step_run_id).cloned().collect()
    }

    fn generation_calls_for(&self, step_run_id: Uuid) -> Vec<GenerationCallRecord> {
        self.generation_calls.iter().filter(|r| r.step_run_id == step_run_id).cloned().collect()
    }

    fn parsed_outputs_for(&self, step_run_id: Uuid) -> Vec<ParsedOutputRecord> {
        self.parsed_outputs.iter().filter(|r| r.step_run_id == step_run_id).cloned().collect()
    }
}
