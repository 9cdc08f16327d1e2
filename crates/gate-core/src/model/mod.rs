//! Registros de estado y auditoría del motor.

pub mod run;
pub mod step_run;
pub mod artifact;

pub use run::{Run, RunStatus};
pub use step_run::{StepRun, StepRunStatus};
pub use artifact::{Attestation, AttestationArtifact, AttestationOutcome, GenerationCallRecord, ParsedOutputRecord,
                   PromptRecord};

use chrono::{DateTime, Utc};

/// Reloj único del motor; los timestamps son metadatos, nunca entran a hashes.
pub(crate) fn now_utc() -> DateTime<Utc> {
    Utc::now()
}
