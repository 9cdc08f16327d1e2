//! Vía de atestación de pasos compute.
//!
//! Deliberadamente desacoplada del `resume`: la atestación se reporta apenas
//! está disponible; continuar la ejecución es un acto explícito aparte. Esta
//! vía y el loop del motor mutan las mismas filas Run/StepRun, por lo que
//! toda transición pasa por las operaciones condicionales del store
//! (estado-esperado) para no romper el invariante de un solo StepRun
//! no-terminal por run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::model::{now_utc, Attestation, AttestationArtifact, AttestationOutcome, RunStatus, StepRunStatus};
use crate::store::{ManifestCatalog, RunStateStore};

/// Request externo de atestación.
///
/// `outcome` llega como string y se valida estructuralmente aquí;
/// `artifacts` ausente es inválido (lista vacía sí se permite).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationRequest {
    pub attested_by: String,
    pub outcome: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub artifacts: Option<Vec<AttestationArtifactIn>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationArtifactIn {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub bytes: Option<i64>,
}

/// Resultado de una atestación aceptada.
#[derive(Debug, Clone)]
pub struct AttestationReceipt {
    pub attestation_id: Uuid,
    pub step_run_id: Uuid,
    pub new_status: StepRunStatus,
}

fn parse_outcome(raw: &str) -> Option<AttestationOutcome> {
    match raw {
        "SUCCESS" => Some(AttestationOutcome::Success),
        "FAIL" => Some(AttestationOutcome::Fail),
        _ => None,
    }
}

fn validate_request(request: &AttestationRequest) -> Result<AttestationOutcome, EngineError> {
    let mut errors: Vec<String> = Vec::new();
    if request.attested_by.trim().is_empty() {
        errors.push("'attested_by' must be non-empty".to_string());
    }
    let outcome = parse_outcome(&request.outcome);
    if outcome.is_none() {
        errors.push(format!("'outcome' must be SUCCESS or FAIL, got '{}'", request.outcome));
    }
    if request.artifacts.is_none() {
        errors.push("'artifacts' must be present (empty list is allowed)".to_string());
    }
    match outcome {
        Some(parsed) if errors.is_empty() => Ok(parsed),
        _ => Err(EngineError::ValidationFailed(errors)),
    }
}

/// Registra una atestación sobre un StepRun WAITING_FOR_ATTESTATION.
///
/// Efectos, atómicos respecto del store: inserta la atestación (única por
/// StepRun; el segundo intento es conflicto) con el snapshot congelado del
/// contrato, transiciona el StepRun al outcome atestado con timestamp de
/// cierre, y si el outcome es FAIL fuerza el run a `error` sin esperar un
/// `resume`. Nunca reanuda la ejecución por sí misma.
pub fn submit_attestation<S, C>(state: &mut S,
                                catalog: &C,
                                run_id: Uuid,
                                step_run_id: Uuid,
                                request: &AttestationRequest)
                                -> Result<AttestationReceipt, EngineError>
    where S: RunStateStore,
          C: ManifestCatalog
{
    let outcome = validate_request(request)?;

    let mut run = state.run(run_id).ok_or(EngineError::NotFound("run"))?;
    let step_run = state.step_run(step_run_id).ok_or(EngineError::NotFound("step run"))?;

    if step_run.run_id != run_id {
        return Err(EngineError::Conflict("step run does not belong to run".to_string()));
    }
    if step_run.status != StepRunStatus::WaitingForAttestation {
        return Err(EngineError::Conflict(format!("step run is not WAITING_FOR_ATTESTATION (current: {:?})",
                                                 step_run.status)));
    }
    if state.attestation_for_step_run(step_run_id).is_some() {
        return Err(EngineError::Conflict("attestation already exists for this step run".to_string()));
    }

    // Snapshot del contrato tal como está definido al momento de atestar
    let contract_snapshot = catalog.manifest(run.manifest_id)
                                   .and_then(|m| m.step_by_id(step_run.manifest_step_id).cloned())
                                   .and_then(|step| step.compute_contract.map(|c| c.to_value()));

    let now = now_utc();
    let attestation = Attestation { id: Uuid::new_v4(),
                                    step_run_id,
                                    attested_by: request.attested_by.clone(),
                                    attested_at: now,
                                    outcome,
                                    notes: request.notes.clone(),
                                    contract_snapshot };
    let attestation_id = attestation.id;
    let artifacts: Vec<AttestationArtifact> =
        request.artifacts
               .as_ref()
               .map(|list| {
                   list.iter()
                       .map(|a| AttestationArtifact { id: Uuid::new_v4(),
                                                      attestation_id,
                                                      name: a.name.clone(),
                                                      uri: a.uri.clone(),
                                                      sha256: a.sha256.clone(),
                                                      bytes: a.bytes,
                                                      created_at: now })
                       .collect()
               })
               .unwrap_or_default();

    state.insert_attestation(attestation, artifacts)?;

    let new_status = match outcome {
        AttestationOutcome::Success => StepRunStatus::Success,
        AttestationOutcome::Fail => StepRunStatus::Fail,
    };
    let mut attested = state.transition_step_run(step_run_id,
                                                 StepRunStatus::WaitingForAttestation,
                                                 new_status,
                                                 Some(now))?;
    attested.execution_policy_report = Some(serde_json::json!({
        "outcome": outcome.as_str(),
        "reason": "operator_attest",
    }));
    state.update_step_run(attested);

    if outcome == AttestationOutcome::Fail {
        run.status = RunStatus::Error;
        run.ended_at = Some(now);
        state.update_run(run);
    }

    log::info!("step run {step_run_id} attested {} by {}", outcome.as_str(), request.attested_by);
    Ok(AttestationReceipt { attestation_id,
                            step_run_id,
                            new_status })
}
