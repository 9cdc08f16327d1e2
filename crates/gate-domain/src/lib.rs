// gate-domain library entry point
pub mod manifest;
pub mod compute_contract;
pub mod task;
pub mod error;
pub use manifest::{Manifest, ManifestStep, StepKind};
pub use compute_contract::{ComputeContract, VERIFICATION_OPERATOR_ATTEST};
pub use task::Task;
pub use error::DomainError;
