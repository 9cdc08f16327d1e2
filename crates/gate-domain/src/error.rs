// error.rs
use thiserror::Error;

/// Error de dominio para definiciones de manifests y pasos.
///
/// Todos los errores de definición se detectan al construir la definición,
/// nunca en tiempo de ejecución de un run.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Error de validación: {0}")]
    ValidationError(String),

    #[error("Contrato de cómputo inválido: {0:?}")]
    InvalidComputeContract(Vec<String>),

    #[error("Error de serialización: {0}")]
    SerializationError(String),
}

// Conversión desde serde_json::Error a DomainError
impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::SerializationError(e.to_string())
    }
}
