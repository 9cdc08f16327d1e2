//! gate-core: Motor de ejecución de manifests con gating determinista
pub mod errors;
pub mod hashing;
pub mod model;
pub mod store;
pub mod generation;
pub mod prompt;
pub mod engine;
pub mod attest;


pub use engine::{RunEngine, RunSnapshot, StepSnapshot};
pub use errors::EngineError;
pub use generation::{GenerationClient, GenerationOutcome};
pub use model::{Attestation, AttestationArtifact, AttestationOutcome, GenerationCallRecord, ParsedOutputRecord,
                PromptRecord, Run, RunStatus, StepRun, StepRunStatus};
pub use store::{AuditStore, InMemoryAuditStore, InMemoryManifestCatalog, InMemoryRunStateStore, ManifestCatalog,
                RunStateStore};
pub use attest::{submit_attestation, AttestationArtifactIn, AttestationReceipt, AttestationRequest};
