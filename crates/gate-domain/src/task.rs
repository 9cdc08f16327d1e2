use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::DomainError;

/// Definición reutilizable de tarea referenciada por pasos de un manifest.
///
/// `prompt_template` y `extract_schema` son documentos opacos: el motor los
/// pasa al contexto de renderizado sin interpretarlos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub prompt_template: Option<String>,
    pub extract_schema: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(name: &str) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::ValidationError("task name must be non-empty".to_string()));
        }
        let now = Utc::now();
        Ok(Task { id: Uuid::new_v4(),
                  name: name.to_string(),
                  description: None,
                  prompt_template: None,
                  extract_schema: None,
                  created_at: now,
                  updated_at: now })
    }

    pub fn with_prompt_template(mut self, template: &str) -> Self {
        self.prompt_template = Some(template.to_string());
        self.updated_at = Utc::now();
        self
    }
}
