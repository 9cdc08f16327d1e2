//! Manifest: definición declarativa y ordenada de un pipeline.
//!
//! Un `Manifest` es inmutable una vez que un run lo referencia. La validación
//! ocurre al construirlo: claves de paso únicas, dependencias que nombran
//! pasos anteriores y contrato de cómputo presente y bien formado para todo
//! paso `compute`. Un manifest que pasa por `Manifest::new` nunca produce
//! errores de definición en tiempo de run.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{ComputeContract, DomainError};

/// Clase de paso: `generation` ejecuta el backend de generación;
/// `compute` suspende el run hasta recibir una atestación externa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Generation,
    Compute,
}

fn new_uuid() -> Uuid {
    Uuid::new_v4()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestStep {
    #[serde(default = "new_uuid")]
    pub id: Uuid,
    pub step_key: String,
    #[serde(default)]
    pub task_id: Option<Uuid>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub kind: StepKind,
    #[serde(default = "default_config")]
    pub config: Value,
    #[serde(default)]
    pub compute_contract: Option<ComputeContract>,
    #[serde(default)]
    pub order_index: i32,
}

fn default_config() -> Value {
    Value::Object(serde_json::Map::new())
}

impl ManifestStep {
    pub fn generation(step_key: &str, depends_on: &[&str], config: Value) -> Self {
        Self { id: Uuid::new_v4(),
               step_key: step_key.to_string(),
               task_id: None,
               depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
               kind: StepKind::Generation,
               config,
               compute_contract: None,
               order_index: 0 }
    }

    pub fn compute(step_key: &str, depends_on: &[&str], config: Value, contract: ComputeContract) -> Self {
        Self { id: Uuid::new_v4(),
               step_key: step_key.to_string(),
               task_id: None,
               depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
               kind: StepKind::Compute,
               config,
               compute_contract: Some(contract),
               order_index: 0 }
    }

    pub fn with_task(mut self, task_id: Uuid) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Validación por paso. Para `compute` el contrato debe existir y ser
    /// estructuralmente válido; su ausencia es un error de definición.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.step_key.trim().is_empty() {
            return Err(DomainError::ValidationError("step_key must be non-empty".to_string()));
        }
        match self.kind {
            StepKind::Generation => Ok(()),
            StepKind::Compute => match &self.compute_contract {
                Some(contract) => contract.validate(),
                None => Err(DomainError::InvalidComputeContract(vec![format!("step '{}' is compute but has no compute_contract",
                                                                             self.step_key)])),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "new_uuid")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    steps: Vec<ManifestStep>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Manifest {
    /// Construye un manifest validado. Los pasos quedan en el orden recibido
    /// (orden de iteración del motor) y `order_index` se reasigna secuencial.
    pub fn new(name: &str, description: Option<&str>, mut steps: Vec<ManifestStep>) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::ValidationError("manifest name must be non-empty".to_string()));
        }
        let mut seen: Vec<&str> = Vec::with_capacity(steps.len());
        for step in &steps {
            if seen.contains(&step.step_key.as_str()) {
                return Err(DomainError::ValidationError(format!("duplicate step_key '{}'", step.step_key)));
            }
            seen.push(step.step_key.as_str());
            step.validate()?;
        }
        for (order, step) in steps.iter_mut().enumerate() {
            step.order_index = order as i32;
        }
        let now = Utc::now();
        Ok(Manifest { id: Uuid::new_v4(),
                      name: name.to_string(),
                      description: description.map(|d| d.to_string()),
                      steps,
                      created_at: now,
                      updated_at: now })
    }

    /// Re-valida un manifest deserializado (ej. cargado desde archivo JSON).
    pub fn revalidate(self) -> Result<Self, DomainError> {
        let Manifest { name, description, steps, .. } = self;
        Manifest::new(&name, description.as_deref(), steps)
    }

    /// Pasos en el orden declarado: el único orden de ejecución.
    pub fn steps(&self) -> &[ManifestStep] {
        &self.steps
    }

    pub fn step_by_id(&self, step_id: Uuid) -> Option<&ManifestStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    pub fn step_by_key(&self, step_key: &str) -> Option<&ManifestStep> {
        self.steps.iter().find(|s| s.step_key == step_key)
    }
}
