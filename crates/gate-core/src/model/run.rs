//! Run: un intento de ejecución de un manifest.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Estado del run.
///
/// Las transiciones válidas son:
/// - `Running` -> `Waiting` (un paso compute quedó esperando atestación)
/// - `Waiting` -> `Running` (resume explícito)
/// - `Running` -> `Success` | `Error`
/// - `Waiting` -> `Error` (atestación FAIL fuerza el cierre sin resume)
///
/// `Success` y `Error` son terminales: no se crean más StepRuns después.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Waiting,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub manifest_id: Uuid,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub initiated_by: Option<String>,
}
