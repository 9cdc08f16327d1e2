use gate_core::{AttestationRequest, InMemoryAuditStore, InMemoryManifestCatalog, InMemoryRunStateStore, RunEngine,
                RunStateStore, RunStatus, StepRunStatus};
use gate_domain::{ComputeContract, Manifest, ManifestStep};
use gate_providers::StubGenerationClient;
use serde_json::json;
use uuid::Uuid;

type Engine = RunEngine<InMemoryRunStateStore, InMemoryAuditStore, InMemoryManifestCatalog>;

fn new_engine(manifest: Manifest) -> (Engine, Uuid) {
    let mut catalog = InMemoryManifestCatalog::new();
    let manifest_id = catalog.insert_manifest(manifest);
    let engine = RunEngine::new(InMemoryRunStateStore::new(),
                                InMemoryAuditStore::new(),
                                catalog,
                                Box::new(StubGenerationClient::new()));
    (engine, manifest_id)
}

fn print_steps(engine: &Engine, run_id: Uuid) {
    if let Ok(snapshot) = engine.run_snapshot(run_id) {
        for step in snapshot.steps {
            println!("    {:<10} {:?}", step.step_key.unwrap_or_else(|| "?".to_string()), step.status);
        }
    }
}

/// Validación: encadenamiento canónico de dos pasos generation.
fn run_chain_validation() {
    let manifest = Manifest::new("validate-chain",
                                 None,
                                 vec![ManifestStep::generation("S1", &[], json!({})),
                                      ManifestStep::generation("S2", &["S1"], json!({})),]).expect("valid manifest");
    let (mut engine, manifest_id) = new_engine(manifest);
    let run_id = engine.start(manifest_id, Some("validator")).expect("start");
    let run = engine.state().run(run_id).expect("run exists");
    println!("[chain] run ended {:?}", run.status);
    print_steps(&engine, run_id);
    assert_eq!(run.status, RunStatus::Success);
}

/// Validación: gating determinista — dependencia no-SUCCESS salta el paso.
fn run_gating_validation() {
    let manifest = Manifest::new("validate-gating",
                                 None,
                                 vec![ManifestStep::generation("S1", &["missing"], json!({})),
                                      ManifestStep::generation("S2", &["S1"], json!({})),]).expect("valid manifest");
    let (mut engine, manifest_id) = new_engine(manifest);
    let run_id = engine.start(manifest_id, None).expect("start");
    println!("[gating] run ended {:?}", engine.state().run(run_id).expect("run").status);
    print_steps(&engine, run_id);
    let all_skipped = engine.state()
                            .step_runs_for_run(run_id)
                            .iter()
                            .all(|s| s.status == StepRunStatus::Skipped);
    assert!(all_skipped, "both steps must be skipped");
}

/// Validación: suspensión por compute, atestación y resume explícito.
fn run_attestation_validation() {
    let contract = ComputeContract::new("external-runner", vec!["input".to_string()], vec!["output".to_string()]);
    let manifest = Manifest::new("validate-attest",
                                 None,
                                 vec![ManifestStep::generation("draft", &[], json!({})),
                                      ManifestStep::compute("verify", &["draft"], json!({}), contract),
                                      ManifestStep::generation("publish", &["verify"], json!({})),]).expect("valid manifest");
    let (mut engine, manifest_id) = new_engine(manifest);

    let run_id = engine.start(manifest_id, Some("validator")).expect("start");
    println!("[attest] tras start: {:?}", engine.state().run(run_id).expect("run").status);
    print_steps(&engine, run_id);

    let waiting = engine.state()
                        .step_runs_for_run(run_id)
                        .into_iter()
                        .find(|s| s.status == StepRunStatus::WaitingForAttestation)
                        .expect("suspended step");
    let request = AttestationRequest { attested_by: "validator".to_string(),
                                       outcome: "SUCCESS".to_string(),
                                       notes: None,
                                       artifacts: Some(vec![]) };
    engine.attest(run_id, waiting.id, &request).expect("attest");
    println!("[attest] tras attest: {:?}", engine.state().run(run_id).expect("run").status);

    engine.resume(run_id, Some("validator")).expect("resume");
    let run = engine.state().run(run_id).expect("run");
    println!("[attest] tras resume: {:?}", run.status);
    print_steps(&engine, run_id);
    assert_eq!(run.status, RunStatus::Success);
}

fn main() {
    run_chain_validation();
    run_gating_validation();
    run_attestation_validation();
    println!("validaciones completas");
}
