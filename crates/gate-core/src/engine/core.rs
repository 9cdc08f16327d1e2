//! Core RunEngine implementation

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use gate_domain::{Manifest, ManifestStep, StepKind};
use gate_policies::{evaluate_execution_policy, PolicyVerdict};

use crate::attest::{submit_attestation, AttestationReceipt, AttestationRequest};
use crate::errors::EngineError;
use crate::generation::GenerationClient;
use crate::hashing::hash_value;
use crate::model::{now_utc, GenerationCallRecord, ParsedOutputRecord, PromptRecord, Run, RunStatus, StepRun,
                   StepRunStatus};
use crate::prompt::{build_prompt_payload, render_prompt};
use crate::store::{AuditStore, ManifestCatalog, RunStateStore};

/// Motor de ejecución de manifests.
///
/// Un solo hilo lógico de control por run: los pasos se iteran en el orden
/// declarado, nunca dos a la vez, y toda suspensión es una fila durable
/// WAITING_FOR_ATTESTATION — el motor no retiene llamadas bloqueadas y
/// devuelve el control apenas suspende o termina.
pub struct RunEngine<S, A, C>
    where S: RunStateStore,
          A: AuditStore,
          C: ManifestCatalog
{
    state: S,
    audit: A,
    catalog: C,
    generation: Box<dyn GenerationClient>,
}

/// Estado en memoria reconstruido por replay de StepRuns existentes.
#[derive(Default)]
struct ReplayState {
    status_by_step_key: HashMap<String, StepRunStatus>,
    canonical_by_step_key: HashMap<String, Value>,
    existing_by_step_id: HashMap<Uuid, StepRun>,
    error_found: bool,
}

/// Vista de sólo lectura de un run y sus pasos (observabilidad / respuesta
/// del resume).
#[derive(Debug, Clone)]
pub struct RunSnapshot {
    pub run: Run,
    pub steps: Vec<StepSnapshot>,
}

#[derive(Debug, Clone)]
pub struct StepSnapshot {
    pub step_run_id: Uuid,
    pub manifest_step_id: Uuid,
    pub step_key: Option<String>,
    pub status: StepRunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl<S, A, C> RunEngine<S, A, C>
    where S: RunStateStore,
          A: AuditStore,
          C: ManifestCatalog
{
    /// Crea un motor con stores y cliente de generación inyectados.
    pub fn new(state: S, audit: A, catalog: C, generation: Box<dyn GenerationClient>) -> Self {
        Self { state,
               audit,
               catalog,
               generation }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn audit(&self) -> &A {
        &self.audit
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Ejecuta un manifest desde cero. Devuelve el id del run creado, que
    /// puede quedar `waiting` si un paso compute suspendió la ejecución.
    pub fn start(&mut self, manifest_id: Uuid, initiated_by: Option<&str>) -> Result<Uuid, EngineError> {
        let manifest = self.catalog.manifest(manifest_id).ok_or(EngineError::NotFound("manifest"))?;

        let now = now_utc();
        let run = Run { id: Uuid::new_v4(),
                        manifest_id,
                        status: RunStatus::Running,
                        created_at: now,
                        started_at: Some(now),
                        ended_at: None,
                        initiated_by: initiated_by.map(|s| s.to_string()) };
        let run_id = run.id;
        self.state.insert_run(run);
        log::info!("run {run_id} started for manifest {manifest_id}");

        let mut replay = ReplayState::default();
        self.advance(run_id, &manifest, &mut replay)
    }

    /// Reanuda un run `waiting`. Reconstruye el estado por replay de los
    /// StepRuns existentes y continúa el mismo loop de `start` desde el
    /// primer paso sin resultado.
    pub fn resume(&mut self, run_id: Uuid, initiated_by: Option<&str>) -> Result<Uuid, EngineError> {
        let mut run = self.state.run(run_id).ok_or(EngineError::NotFound("run"))?;
        if run.status != RunStatus::Waiting {
            return Err(EngineError::Conflict(format!("run is not in waiting status (current: {:?})", run.status)));
        }
        let manifest = self.catalog.manifest(run.manifest_id).ok_or(EngineError::NotFound("manifest"))?;

        // Replay: clasifica cada StepRun existente por step_key y verifica
        // consistencia estructural antes de mutar nada.
        let mut replay = ReplayState::default();
        for step_run in self.state.step_runs_for_run(run_id) {
            let step = manifest.step_by_id(step_run.manifest_step_id)
                               .ok_or_else(|| {
                                   EngineError::Conflict("manifest steps changed under an in-flight run".to_string())
                               })?;
            if step_run.status == StepRunStatus::Running {
                // Un paso generation a medio vuelo indica un crash: requiere
                // intervención del operador, no un resume automático.
                return Err(EngineError::Conflict(format!("step run '{}' is still RUNNING and cannot be resumed",
                                                         step.step_key)));
            }
            match step_run.status {
                StepRunStatus::Success => {
                    if let Some(output) = step_run.canonical_output.clone() {
                        replay.canonical_by_step_key.insert(step.step_key.clone(), output);
                    }
                }
                StepRunStatus::Fail => replay.error_found = true,
                _ => {}
            }
            replay.status_by_step_key.insert(step.step_key.clone(), step_run.status);
            replay.existing_by_step_id.insert(step_run.manifest_step_id, step_run);
        }

        run.status = RunStatus::Running;
        if initiated_by.is_some() {
            run.initiated_by = initiated_by.map(|s| s.to_string());
        }
        self.state.update_run(run);
        log::info!("run {run_id} resumed");

        self.advance(run_id, &manifest, &mut replay)
    }

    /// Conveniencia sobre la vía de atestación (que no forma parte del loop
    /// del motor): delega en `submit_attestation` con los stores propios.
    pub fn attest(&mut self,
                  run_id: Uuid,
                  step_run_id: Uuid,
                  request: &AttestationRequest)
                  -> Result<AttestationReceipt, EngineError> {
        submit_attestation(&mut self.state, &self.catalog, run_id, step_run_id, request)
    }

    pub fn run_snapshot(&self, run_id: Uuid) -> Result<RunSnapshot, EngineError> {
        let run = self.state.run(run_id).ok_or(EngineError::NotFound("run"))?;
        let manifest = self.catalog.manifest(run.manifest_id);
        let steps = self.state
                        .step_runs_for_run(run_id)
                        .into_iter()
                        .map(|sr| StepSnapshot { step_run_id: sr.id,
                                                 manifest_step_id: sr.manifest_step_id,
                                                 step_key: manifest.as_ref()
                                                                   .and_then(|m| m.step_by_id(sr.manifest_step_id))
                                                                   .map(|s| s.step_key.clone()),
                                                 status: sr.status,
                                                 started_at: sr.started_at,
                                                 ended_at: sr.ended_at })
                        .collect();
        Ok(RunSnapshot { run, steps })
    }

    /// Loop único de ejecución compartido por `start` y `resume`.
    fn advance(&mut self, run_id: Uuid, manifest: &Manifest, replay: &mut ReplayState) -> Result<Uuid, EngineError> {
        for step in manifest.steps() {
            let existing = replay.existing_by_step_id.get(&step.id).map(|sr| (sr.id, sr.status));
            if let Some((existing_id, existing_status)) = existing {
                match existing_status {
                    // Resultado previo: no se re-ejecuta ni se re-gatea
                    StepRunStatus::Success | StepRunStatus::Fail | StepRunStatus::Skipped => continue,
                    StepRunStatus::Running => {
                        return Err(EngineError::Conflict(format!("step run '{}' is still RUNNING and cannot be resumed",
                                                                 step.step_key)));
                    }
                    StepRunStatus::WaitingForAttestation => {
                        // Releer: pudo haberse atestado entre el replay y este punto
                        let current = self.state
                                          .step_run(existing_id)
                                          .ok_or(EngineError::NotFound("step run"))?;
                        match current.status {
                            StepRunStatus::WaitingForAttestation => {
                                // Sigue esperando: re-suspensión idempotente
                                self.set_run_status(run_id, RunStatus::Waiting, None)?;
                                return Ok(run_id);
                            }
                            StepRunStatus::Fail => {
                                replay.error_found = true;
                                replay.status_by_step_key.insert(step.step_key.clone(), current.status);
                                continue;
                            }
                            _ => {
                                replay.status_by_step_key.insert(step.step_key.clone(), current.status);
                                continue;
                            }
                        }
                    }
                }
            }

            // Gate determinista: toda dependencia debe haber terminado SUCCESS
            let gate_open = step.depends_on
                                .iter()
                                .all(|dep| replay.status_by_step_key.get(dep) == Some(&StepRunStatus::Success));
            if !gate_open {
                log::debug!("step '{}' skipped: dependency not SUCCESS", step.step_key);
                self.record_skipped(run_id, step);
                replay.status_by_step_key.insert(step.step_key.clone(), StepRunStatus::Skipped);
                continue;
            }

            match step.kind {
                StepKind::Compute => {
                    // Suspensión durable: fila WAITING + run waiting, y se
                    // devuelve el control de inmediato
                    let now = now_utc();
                    let mut step_run = StepRun::new(run_id, step.id, StepRunStatus::WaitingForAttestation);
                    step_run.started_at = Some(now);
                    self.state.insert_step_run(step_run);
                    self.set_run_status(run_id, RunStatus::Waiting, None)?;
                    log::info!("run {run_id} waiting for attestation at step '{}'", step.step_key);
                    return Ok(run_id);
                }
                StepKind::Generation => {
                    self.execute_generation_step(run_id, step, replay);
                }
            }
        }

        // El loop terminó sin suspender: cerrar el run
        let final_status = if replay.error_found { RunStatus::Error } else { RunStatus::Success };
        self.set_run_status(run_id, final_status, Some(now_utc()))?;
        log::info!("run {run_id} ended {:?}", final_status);
        Ok(run_id)
    }

    /// Rama generation: prompt -> cliente -> política -> persistencia.
    fn execute_generation_step(&mut self, run_id: Uuid, step: &ManifestStep, replay: &mut ReplayState) {
        // Mapa upstream: salida canónica por dependencia (null si no la hay)
        let mut upstream: Map<String, Value> = Map::new();
        for dep in &step.depends_on {
            upstream.insert(dep.clone(),
                            replay.canonical_by_step_key.get(dep).cloned().unwrap_or(Value::Null));
        }

        let payload = build_prompt_payload(step, &upstream);
        let rendered_prompt = render_prompt(&payload);

        // El StepRun se crea primero para poder colgar los artefactos
        let now = now_utc();
        let mut step_run = StepRun::new(run_id, step.id, StepRunStatus::Running);
        step_run.started_at = Some(now);
        step_run.input_hash = Some(hash_value(&Value::Object(upstream)));
        let step_run_id = step_run.id;
        self.state.insert_step_run(step_run.clone());

        let outcome = self.generation.complete(&rendered_prompt);

        // La llamada de generación se registra incondicionalmente
        let response_json = outcome.response_json
                                   .clone()
                                   .unwrap_or_else(|| json!({"raw_text": outcome.raw_text}));
        self.audit.record_generation_call(GenerationCallRecord { id: Uuid::new_v4(),
                                                                 step_run_id,
                                                                 provider: outcome.provider.clone(),
                                                                 model: outcome.model.clone(),
                                                                 request_json: outcome.request_json.clone(),
                                                                 response_json,
                                                                 latency_ms: outcome.latency_ms });

        // Sin resultado parseable, rationale y output se tratan como ausentes
        let parsed = outcome.parsed_json.clone().unwrap_or(Value::Null);
        let decision_rationale = parsed.get("decision_rationale").filter(|v| !v.is_null()).cloned();
        let output_json = parsed.get("output_json").filter(|v| !v.is_null()).cloned();

        // Gate autoritativo: sólo un PASS habilita el encadenamiento
        let (verdict, report) = evaluate_execution_policy(step, output_json.as_ref(), decision_rationale.as_ref());
        let canonical_output = if verdict == PolicyVerdict::Pass { output_json.clone() } else { None };
        let final_status = if verdict == PolicyVerdict::Pass { StepRunStatus::Success } else { StepRunStatus::Fail };
        if final_status == StepRunStatus::Fail {
            replay.error_found = true;
            log::debug!("step '{}' failed policy: {} violation(s)", step.step_key, report.violations.len());
        }

        self.audit.record_prompt(PromptRecord { id: Uuid::new_v4(),
                                                step_run_id,
                                                rendered_prompt,
                                                context: json!({"prompt_payload": payload}),
                                                token_estimate: None });
        self.audit.record_parsed_output(ParsedOutputRecord { id: Uuid::new_v4(),
                                                             step_run_id,
                                                             output_text: outcome.raw_text.clone(),
                                                             output_json: output_json.clone(),
                                                             extraction_report: outcome.extraction_errors.clone() });

        step_run.status = final_status;
        step_run.ended_at = Some(now_utc());
        step_run.decision_rationale = decision_rationale;
        step_run.execution_policy_report = Some(report.to_value());
        step_run.canonical_output = canonical_output.clone();
        self.state.update_step_run(step_run);

        replay.status_by_step_key.insert(step.step_key.clone(), final_status);
        if final_status == StepRunStatus::Success {
            if let Some(output) = canonical_output {
                replay.canonical_by_step_key.insert(step.step_key.clone(), output);
            }
        }
    }

    /// Cortocircuito a SKIPPED: el paso nunca entra a RUNNING y contribuye
    /// null hacia abajo. El gating no vuelve a evaluarse en este run.
    fn record_skipped(&mut self, run_id: Uuid, step: &ManifestStep) {
        let now = now_utc();
        let mut step_run = StepRun::new(run_id, step.id, StepRunStatus::Skipped);
        step_run.started_at = Some(now);
        step_run.ended_at = Some(now);
        step_run.execution_policy_report = Some(json!({
            "outcome": "SKIPPED",
            "reason": "dependency_not_success",
        }));
        self.state.insert_step_run(step_run);
    }

    fn set_run_status(&mut self,
                      run_id: Uuid,
                      status: RunStatus,
                      ended_at: Option<DateTime<Utc>>)
                      -> Result<(), EngineError> {
        let mut run = self.state.run(run_id).ok_or(EngineError::NotFound("run"))?;
        run.status = status;
        if ended_at.is_some() {
            run.ended_at = ended_at;
        }
        self.state.update_run(run);
        Ok(())
    }
}
