//! Puerto hacia el backend de generación.
//!
//! El cliente se inyecta al construir el motor (estrategia elegida al inicio
//! del proceso); el core no decide proveedores. Contrato clave: `complete`
//! nunca falla por salida no parseable — la ausencia de `parsed_json` es la
//! señal de "no se pudo parsear" y fluye hacia un FAIL de política.

use serde_json::Value;

/// Resultado crudo de una llamada de generación.
#[derive(Debug, Clone, Default)]
pub struct GenerationOutcome {
    pub raw_text: String,
    /// Objeto parseado si `raw_text` fue JSON parseable; `None` si no.
    pub parsed_json: Option<Value>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub request_json: Option<Value>,
    pub response_json: Option<Value>,
    pub latency_ms: Option<i64>,
    /// Diagnóstico de extracción (errores de parseo, truncamientos).
    pub extraction_errors: Option<Value>,
}

/// Cliente de generación síncrono desde la perspectiva del motor.
///
/// Timeouts y reintentos, si se desean, pertenecen al contrato del cliente,
/// no al motor.
pub trait GenerationClient {
    fn complete(&self, rendered_prompt: &str) -> GenerationOutcome;
}
