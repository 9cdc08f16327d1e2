//! Protocolo de pausa/atestación/resume de pasos compute.
use serde_json::{json, Value};
use uuid::Uuid;

use gate_core::{AttestationArtifactIn, AttestationRequest, AuditStore, EngineError, GenerationClient,
                InMemoryAuditStore, InMemoryManifestCatalog, InMemoryRunStateStore, Run, RunEngine, RunStateStore,
                RunStatus, StepRun, StepRunStatus};
use gate_domain::{ComputeContract, Manifest, ManifestStep};
use gate_providers::StubGenerationClient;

fn compute_contract() -> ComputeContract {
    ComputeContract::new("x", vec!["a".to_string()], vec!["b".to_string()])
}

fn attest_request(outcome: &str) -> AttestationRequest {
    AttestationRequest { attested_by: "operator".to_string(),
                         outcome: outcome.to_string(),
                         notes: Some("checked by hand".to_string()),
                         artifacts: Some(vec![]) }
}

fn engine_with(manifest: Manifest)
               -> (RunEngine<InMemoryRunStateStore, InMemoryAuditStore, InMemoryManifestCatalog>, Uuid) {
    let mut catalog = InMemoryManifestCatalog::new();
    let manifest_id = catalog.insert_manifest(manifest);
    let engine = RunEngine::new(InMemoryRunStateStore::new(),
                                InMemoryAuditStore::new(),
                                catalog,
                                Box::new(StubGenerationClient::new()) as Box<dyn GenerationClient>);
    (engine, manifest_id)
}

fn waiting_step_run(engine: &RunEngine<InMemoryRunStateStore, InMemoryAuditStore, InMemoryManifestCatalog>,
                    run_id: Uuid)
                    -> StepRun {
    engine.state()
          .step_runs_for_run(run_id)
          .into_iter()
          .find(|s| s.status == StepRunStatus::WaitingForAttestation)
          .expect("expected a waiting step run")
}

#[test]
fn scenario_c_compute_waits_then_attested_success_resumes_to_success() {
    let manifest = Manifest::new("single-compute",
                                 None,
                                 vec![ManifestStep::compute("C1", &[], json!({}), compute_contract())]).unwrap();
    let (mut engine, manifest_id) = engine_with(manifest);

    let run_id = engine.start(manifest_id, Some("tester")).unwrap();
    assert_eq!(engine.state().run(run_id).unwrap().status, RunStatus::Waiting);

    let waiting = waiting_step_run(&engine, run_id);
    assert!(waiting.started_at.is_some());
    assert!(waiting.ended_at.is_none());

    let receipt = engine.attest(run_id, waiting.id, &attest_request("SUCCESS")).unwrap();
    assert_eq!(receipt.new_status, StepRunStatus::Success);

    // La atestación no reanuda por sí misma: continuar exige un resume explícito
    assert_eq!(engine.state().run(run_id).unwrap().status, RunStatus::Waiting);

    engine.resume(run_id, Some("resumer")).unwrap();
    let run = engine.state().run(run_id).unwrap();
    assert_eq!(run.status, RunStatus::Success);
    assert!(run.ended_at.is_some());

    let attested = engine.state().step_run(waiting.id).unwrap();
    assert_eq!(attested.status, StepRunStatus::Success);
    assert!(attested.ended_at.is_some());
    // El paso compute no aporta canonical output más allá de la atestación
    assert!(attested.canonical_output.is_none());
    assert_eq!(attested.execution_policy_report,
               Some(json!({"outcome": "SUCCESS", "reason": "operator_attest"})));

    // Snapshot congelado del contrato
    let attestation = engine.state().attestation_for_step_run(waiting.id).unwrap();
    let snapshot: ComputeContract = serde_json::from_value(attestation.contract_snapshot.unwrap()).unwrap();
    assert_eq!(snapshot, compute_contract());
}

#[test]
fn scenario_d_attested_fail_forces_run_error_without_resume() {
    let manifest = Manifest::new("failing-compute",
                                 None,
                                 vec![ManifestStep::compute("C1", &[], json!({}), compute_contract())]).unwrap();
    let (mut engine, manifest_id) = engine_with(manifest);

    let run_id = engine.start(manifest_id, None).unwrap();
    let waiting = waiting_step_run(&engine, run_id);

    engine.attest(run_id, waiting.id, &attest_request("FAIL")).unwrap();

    let run = engine.state().run(run_id).unwrap();
    assert_eq!(run.status, RunStatus::Error, "FAIL attestation must close the run directly");
    assert!(run.ended_at.is_some());
    assert_eq!(engine.state().step_run(waiting.id).unwrap().status, StepRunStatus::Fail);

    // El run ya no está waiting: un resume posterior es conflicto
    let err = engine.resume(run_id, None).unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[test]
fn resume_is_idempotent_while_attestation_is_pending() {
    let manifest = Manifest::new("pending",
                                 None,
                                 vec![ManifestStep::compute("C1", &[], json!({}), compute_contract())]).unwrap();
    let (mut engine, manifest_id) = engine_with(manifest);
    let run_id = engine.start(manifest_id, None).unwrap();

    engine.resume(run_id, None).unwrap();
    assert_eq!(engine.state().run(run_id).unwrap().status, RunStatus::Waiting);
    engine.resume(run_id, None).unwrap();
    assert_eq!(engine.state().run(run_id).unwrap().status, RunStatus::Waiting);

    // Sin StepRuns nuevos: sigue existiendo exactamente uno
    assert_eq!(engine.state().step_runs_for_run(run_id).len(), 1);
}

#[test]
fn attestation_is_exactly_once_per_step_run() {
    let manifest = Manifest::new("once",
                                 None,
                                 vec![ManifestStep::compute("C1", &[], json!({}), compute_contract())]).unwrap();
    let (mut engine, manifest_id) = engine_with(manifest);
    let run_id = engine.start(manifest_id, None).unwrap();
    let waiting = waiting_step_run(&engine, run_id);

    engine.attest(run_id, waiting.id, &attest_request("SUCCESS")).unwrap();
    let err = engine.attest(run_id, waiting.id, &attest_request("SUCCESS")).unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)), "second attestation must conflict, not overwrite");

    assert!(engine.state().attestation_for_step_run(waiting.id).is_some());
}

#[test]
fn attestation_request_is_structurally_validated() {
    let manifest = Manifest::new("validate",
                                 None,
                                 vec![ManifestStep::compute("C1", &[], json!({}), compute_contract())]).unwrap();
    let (mut engine, manifest_id) = engine_with(manifest);
    let run_id = engine.start(manifest_id, None).unwrap();
    let waiting = waiting_step_run(&engine, run_id);

    // outcome fuera de {SUCCESS, FAIL}
    let bad_outcome = AttestationRequest { attested_by: "op".to_string(),
                                           outcome: "MAYBE".to_string(),
                                           notes: None,
                                           artifacts: Some(vec![]) };
    let err = engine.attest(run_id, waiting.id, &bad_outcome).unwrap_err();
    assert!(matches!(err, EngineError::ValidationFailed(_)));

    // artifacts ausente (lista vacía sí es válida)
    let no_artifacts = AttestationRequest { attested_by: "op".to_string(),
                                            outcome: "SUCCESS".to_string(),
                                            notes: None,
                                            artifacts: None };
    let err = engine.attest(run_id, waiting.id, &no_artifacts).unwrap_err();
    match err {
        EngineError::ValidationFailed(errors) => {
            assert!(errors.iter().any(|e| e.contains("artifacts")));
        }
        other => panic!("unexpected error: {other}"),
    }

    // El StepRun sigue esperando: los requests inválidos no transicionan nada
    assert_eq!(engine.state().step_run(waiting.id).unwrap().status,
               StepRunStatus::WaitingForAttestation);
}

#[test]
fn attestation_artifacts_are_persisted_under_the_attestation() {
    let manifest = Manifest::new("evidence",
                                 None,
                                 vec![ManifestStep::compute("C1", &[], json!({}), compute_contract())]).unwrap();
    let (mut engine, manifest_id) = engine_with(manifest);
    let run_id = engine.start(manifest_id, None).unwrap();
    let waiting = waiting_step_run(&engine, run_id);

    let request = AttestationRequest { attested_by: "op".to_string(),
                                       outcome: "SUCCESS".to_string(),
                                       notes: None,
                                       artifacts: Some(vec![AttestationArtifactIn { name: "log".to_string(),
                                                                                    uri: "s3://bucket/log".to_string(),
                                                                                    sha256: Some("abc".to_string()),
                                                                                    bytes: Some(42) }]) };
    let receipt = engine.attest(run_id, waiting.id, &request).unwrap();

    let artifacts = engine.state().attestation_artifacts(receipt.attestation_id);
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].name, "log");
    assert_eq!(artifacts[0].bytes, Some(42));
}

#[test]
fn attest_rejects_wrong_run_and_non_waiting_steps() {
    let manifest = Manifest::new("mixed-attest",
                                 None,
                                 vec![ManifestStep::generation("S1", &[], json!({})),
                                      ManifestStep::compute("C1", &["S1"], json!({}), compute_contract()),]).unwrap();
    let (mut engine, manifest_id) = engine_with(manifest);
    let run_id = engine.start(manifest_id, None).unwrap();

    // S1 terminó SUCCESS: no es atestable
    let s1 = engine.state()
                   .step_runs_for_run(run_id)
                   .into_iter()
                   .find(|s| s.status == StepRunStatus::Success)
                   .unwrap();
    let err = engine.attest(run_id, s1.id, &attest_request("SUCCESS")).unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // Run inexistente
    let waiting = waiting_step_run(&engine, run_id);
    let err = engine.attest(Uuid::new_v4(), waiting.id, &attest_request("SUCCESS")).unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    // StepRun perteneciente a otro run del mismo manifest
    let second_run = engine.start(manifest_id, None).unwrap();
    let second_waiting = waiting_step_run(&engine, second_run);
    let err = engine.attest(run_id, second_waiting.id, &attest_request("SUCCESS")).unwrap_err();
    match err {
        EngineError::Conflict(reason) => assert!(reason.contains("belong"), "got: {reason}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn resume_requires_waiting_run() {
    let manifest = Manifest::new("no-wait",
                                 None,
                                 vec![ManifestStep::generation("S1", &[], json!({}))]).unwrap();
    let (mut engine, manifest_id) = engine_with(manifest);
    let run_id = engine.start(manifest_id, None).unwrap();
    assert_eq!(engine.state().run(run_id).unwrap().status, RunStatus::Success);

    let err = engine.resume(run_id, None).unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let err = engine.resume(Uuid::new_v4(), None).unwrap_err();
    assert_eq!(err, EngineError::NotFound("run"));
}

#[test]
fn resume_refuses_a_running_carryover_step() {
    // Estado simulando un crash a mitad de un paso generation: fila RUNNING
    let manifest = Manifest::new("crashed",
                                 None,
                                 vec![ManifestStep::generation("S1", &[], json!({}))]).unwrap();
    let step_id = manifest.steps()[0].id;
    let mut catalog = InMemoryManifestCatalog::new();
    let manifest_id = catalog.insert_manifest(manifest);

    let mut state = InMemoryRunStateStore::new();
    let now = chrono::Utc::now();
    let run = Run { id: Uuid::new_v4(),
                    manifest_id,
                    status: RunStatus::Waiting,
                    created_at: now,
                    started_at: Some(now),
                    ended_at: None,
                    initiated_by: None };
    let run_id = run.id;
    state.insert_run(run);
    let mut stuck = StepRun::new(run_id, step_id, StepRunStatus::Running);
    stuck.started_at = Some(now);
    state.insert_step_run(stuck);

    let mut engine = RunEngine::new(state,
                                    InMemoryAuditStore::new(),
                                    catalog,
                                    Box::new(StubGenerationClient::new()) as Box<dyn GenerationClient>);
    let err = engine.resume(run_id, None).unwrap_err();
    match err {
        EngineError::Conflict(reason) => assert!(reason.contains("RUNNING"), "got: {reason}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn resume_fails_fast_when_manifest_steps_changed() {
    let manifest = Manifest::new("drift",
                                 None,
                                 vec![ManifestStep::generation("S1", &[], json!({}))]).unwrap();
    let mut catalog = InMemoryManifestCatalog::new();
    let manifest_id = catalog.insert_manifest(manifest);

    let mut state = InMemoryRunStateStore::new();
    let now = chrono::Utc::now();
    let run = Run { id: Uuid::new_v4(),
                    manifest_id,
                    status: RunStatus::Waiting,
                    created_at: now,
                    started_at: Some(now),
                    ended_at: None,
                    initiated_by: None };
    let run_id = run.id;
    state.insert_run(run);
    // StepRun que referencia un paso que ya no existe en el manifest
    state.insert_step_run(StepRun::new(run_id, Uuid::new_v4(), StepRunStatus::Success));

    let mut engine = RunEngine::new(state,
                                    InMemoryAuditStore::new(),
                                    catalog,
                                    Box::new(StubGenerationClient::new()) as Box<dyn GenerationClient>);
    let err = engine.resume(run_id, None).unwrap_err();
    match err {
        EngineError::Conflict(reason) => assert!(reason.contains("manifest"), "got: {reason}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn full_pipeline_generation_compute_generation() {
    // S1 (gen) -> C1 (compute) -> S2 (gen deps C1)
    let manifest = Manifest::new("full",
                                 None,
                                 vec![ManifestStep::generation("S1", &[], json!({})),
                                      ManifestStep::compute("C1", &["S1"], json!({}), compute_contract()),
                                      ManifestStep::generation("S2", &["C1"], json!({})),]).unwrap();
    let (mut engine, manifest_id) = engine_with(manifest);

    let run_id = engine.start(manifest_id, None).unwrap();
    assert_eq!(engine.state().run(run_id).unwrap().status, RunStatus::Waiting);
    // Suspendido en C1: S2 todavía no tiene StepRun
    assert_eq!(engine.state().step_runs_for_run(run_id).len(), 2);

    let waiting = waiting_step_run(&engine, run_id);
    engine.attest(run_id, waiting.id, &attest_request("SUCCESS")).unwrap();
    engine.resume(run_id, None).unwrap();

    let run = engine.state().run(run_id).unwrap();
    assert_eq!(run.status, RunStatus::Success);

    // S2 ejecutó después del resume; su upstream lleva C1 -> null (la
    // atestación no aporta canonical output)
    let snapshot = engine.run_snapshot(run_id).unwrap();
    assert_eq!(snapshot.steps.len(), 3);
    let s2 = snapshot.steps.iter().find(|s| s.step_key.as_deref() == Some("S2")).unwrap();
    assert_eq!(s2.status, StepRunStatus::Success);
    let prompts = engine.audit().prompts_for(s2.step_run_id);
    assert_eq!(prompts[0].context["prompt_payload"]["upstream_canonical"], json!({"C1": Value::Null}));
}

#[test]
fn carried_over_fail_still_ends_run_in_error_after_resume() {
    // S1 falla por política; C1 no depende de S1 y suspende igual
    let manifest = Manifest::new("carryover",
                                 None,
                                 vec![ManifestStep::generation("S1", &[], json!({})),
                                      ManifestStep::compute("C1", &[], json!({}), compute_contract()),]).unwrap();
    let mut catalog = InMemoryManifestCatalog::new();
    let manifest_id = catalog.insert_manifest(manifest);

    // Cliente que produce salida vacía -> FAIL de política en S1
    struct EmptyClient;
    impl GenerationClient for EmptyClient {
        fn complete(&self, _p: &str) -> gate_core::GenerationOutcome {
            let parsed = json!({"decision_rationale": {"version": "v1"}, "output_json": {}});
            gate_core::GenerationOutcome { raw_text: parsed.to_string(),
                                           parsed_json: Some(parsed),
                                           ..gate_core::GenerationOutcome::default() }
        }
    }

    let mut engine = RunEngine::new(InMemoryRunStateStore::new(),
                                    InMemoryAuditStore::new(),
                                    catalog,
                                    Box::new(EmptyClient) as Box<dyn GenerationClient>);
    let run_id = engine.start(manifest_id, None).unwrap();
    assert_eq!(engine.state().run(run_id).unwrap().status, RunStatus::Waiting);

    let waiting = waiting_step_run(&engine, run_id);
    engine.attest(run_id, waiting.id, &attest_request("SUCCESS")).unwrap();
    engine.resume(run_id, None).unwrap();

    // El FAIL heredado de antes del resume sigue contando para el cierre
    assert_eq!(engine.state().run(run_id).unwrap().status, RunStatus::Error);
}
