use gate_core::{AttestationRequest, InMemoryAuditStore, InMemoryManifestCatalog, InMemoryRunStateStore, RunEngine,
                RunStateStore, RunStatus, StepRunStatus};
use gate_domain::{ComputeContract, Manifest, ManifestStep};
use gate_providers::{client_from_env, StubGenerationClient};
use uuid::Uuid;

type Engine = RunEngine<InMemoryRunStateStore, InMemoryAuditStore, InMemoryManifestCatalog>;

fn main() {
    // Cargar .env si existe para la selección de proveedor
    let _ = dotenvy::dotenv();
    // CLI mínima:
    //   gate-cli run --manifest <FILE.json> [--initiated-by <NAME>] [--attest SUCCESS|FAIL]
    //   gate-cli demo
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "run" {
        let mut manifest_path: Option<String> = None;
        let mut initiated_by: Option<String> = None;
        let mut attest: Option<String> = None;
        let mut i = 2;
        while i < args.len() {
            match args[i].as_str() {
                "--manifest" => {
                    i += 1;
                    if i < args.len() { manifest_path = Some(args[i].clone()); }
                }
                "--initiated-by" => {
                    i += 1;
                    if i < args.len() { initiated_by = Some(args[i].clone()); }
                }
                "--attest" => {
                    i += 1;
                    if i < args.len() { attest = Some(args[i].clone()); }
                }
                _ => {}
            }
            i += 1;
        }

        let Some(path) = manifest_path else {
            eprintln!("Uso: gate-cli run --manifest <FILE.json> [--initiated-by <NAME>] [--attest SUCCESS|FAIL]");
            std::process::exit(2);
        };
        if let Some(outcome) = &attest {
            if outcome != "SUCCESS" && outcome != "FAIL" {
                eprintln!("[gate run] --attest debe ser SUCCESS o FAIL");
                std::process::exit(2);
            }
        }
        run_from_file(&path, initiated_by.as_deref(), attest.as_deref());
    } else if args.len() >= 2 && args[1] == "demo" {
        run_demo();
    } else {
        eprintln!("Uso: gate-cli <run|demo> [flags]");
        std::process::exit(2);
    }
}

/// Carga un manifest desde archivo JSON, lo ejecuta y reporta el estado por
/// paso. Con `--attest`, cada suspensión se atesta con ese outcome y se
/// reanuda (el resume sigue siendo un acto explícito y separado).
fn run_from_file(path: &str, initiated_by: Option<&str>, attest: Option<&str>) {
    let raw = match std::fs::read_to_string(path) {
        Ok(r) => r,
        Err(e) => { eprintln!("[gate run] no se pudo leer el manifest: {e}"); std::process::exit(4); }
    };
    let manifest: Manifest = match serde_json::from_str(&raw) {
        Ok(m) => m,
        Err(e) => { eprintln!("[gate run] manifest JSON inválido: {e}"); std::process::exit(4); }
    };
    let manifest = match manifest.revalidate() {
        Ok(m) => m,
        Err(e) => { eprintln!("[gate run] definición rechazada: {e}"); std::process::exit(4); }
    };

    let mut catalog = InMemoryManifestCatalog::new();
    let manifest_id = catalog.insert_manifest(manifest);
    let mut engine: Engine =
        RunEngine::new(InMemoryRunStateStore::new(), InMemoryAuditStore::new(), catalog, client_from_env());

    let run_id = match engine.start(manifest_id, initiated_by) {
        Ok(id) => id,
        Err(e) => { eprintln!("[gate run] error: {e}"); std::process::exit(5); }
    };

    // Atestar y reanudar mientras el run siga suspendido
    while run_status(&engine, run_id) == RunStatus::Waiting {
        let Some(outcome) = attest else { break };
        let Some(step_run_id) = waiting_step(&engine, run_id) else { break };
        let request = AttestationRequest { attested_by: initiated_by.unwrap_or("cli-operator").to_string(),
                                           outcome: outcome.to_string(),
                                           notes: None,
                                           artifacts: Some(vec![]) };
        if let Err(e) = engine.attest(run_id, step_run_id, &request) {
            eprintln!("[gate run] atestación rechazada: {e}");
            std::process::exit(4);
        }
        if run_status(&engine, run_id) != RunStatus::Waiting {
            break; // FAIL atestado cierra el run sin resume
        }
        if let Err(e) = engine.resume(run_id, initiated_by) {
            eprintln!("[gate run] resume rechazado: {e}");
            std::process::exit(4);
        }
    }

    print_snapshot(&engine, run_id);
    match run_status(&engine, run_id) {
        RunStatus::Success => std::process::exit(0),
        RunStatus::Waiting => {
            println!("run {run_id} quedó esperando atestación (use --attest para cerrar el ciclo en un solo proceso)");
            std::process::exit(0);
        }
        _ => std::process::exit(4),
    }
}

/// Demo auto-contenida: generation -> compute -> generation con stub.
fn run_demo() {
    let contract = ComputeContract::new("external-runner", vec!["dataset".to_string()], vec!["report".to_string()]);
    let manifest = match Manifest::new("demo-pipeline",
                                       Some("demo con atestación"),
                                       vec![ManifestStep::generation("draft", &[], serde_json::json!({"goal": "draft"})),
                                            ManifestStep::compute("verify", &["draft"], serde_json::json!({}), contract),
                                            ManifestStep::generation("publish", &["verify"], serde_json::json!({})),]) {
        Ok(m) => m,
        Err(e) => { eprintln!("[gate demo] definición rechazada: {e}"); std::process::exit(5); }
    };

    let mut catalog = InMemoryManifestCatalog::new();
    let manifest_id = catalog.insert_manifest(manifest);
    let mut engine: Engine = RunEngine::new(InMemoryRunStateStore::new(),
                                            InMemoryAuditStore::new(),
                                            catalog,
                                            Box::new(StubGenerationClient::new()));

    let run_id = engine.start(manifest_id, Some("demo")).expect("start demo run");
    println!("-- tras start:");
    print_snapshot(&engine, run_id);

    let step_run_id = waiting_step(&engine, run_id).expect("demo must suspend at 'verify'");
    let request = AttestationRequest { attested_by: "demo-operator".to_string(),
                                       outcome: "SUCCESS".to_string(),
                                       notes: Some("manually verified".to_string()),
                                       artifacts: Some(vec![]) };
    engine.attest(run_id, step_run_id, &request).expect("attest demo step");
    println!("-- tras attest SUCCESS (el run sigue waiting hasta el resume):");
    print_snapshot(&engine, run_id);

    engine.resume(run_id, Some("demo")).expect("resume demo run");
    println!("-- tras resume:");
    print_snapshot(&engine, run_id);
}

fn run_status(engine: &Engine, run_id: Uuid) -> RunStatus {
    engine.state().run(run_id).map(|r| r.status).unwrap_or(RunStatus::Error)
}

fn waiting_step(engine: &Engine, run_id: Uuid) -> Option<Uuid> {
    engine.state()
          .step_runs_for_run(run_id)
          .into_iter()
          .find(|s| s.status == StepRunStatus::WaitingForAttestation)
          .map(|s| s.id)
}

fn print_snapshot(engine: &Engine, run_id: Uuid) {
    match engine.run_snapshot(run_id) {
        Ok(snapshot) => {
            println!("run {} status={:?}", snapshot.run.id, snapshot.run.status);
            for step in snapshot.steps {
                println!("  step {:<12} {:?}", step.step_key.unwrap_or_else(|| "?".to_string()), step.status);
            }
        }
        Err(e) => eprintln!("[gate] snapshot error: {e}"),
    }
}
