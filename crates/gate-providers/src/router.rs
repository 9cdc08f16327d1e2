//! Selección de proveedor al inicio del proceso.
//!
//! Reemplaza la selección global implícita por una estrategia resuelta una
//! vez y entregada por inyección al motor. Sin configuración (o ante un
//! proveedor mal configurado) el default es el stub determinista.

use std::env;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use gate_core::GenerationClient;

use crate::openai_compat::OpenAiCompatClient;
use crate::stub::StubGenerationClient;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Resuelve el cliente según `LLM_PROVIDER` (`stub` | `openai`).
pub fn client_from_env() -> Box<dyn GenerationClient> {
    Lazy::force(&DOTENV_LOADED);
    let provider = env::var("LLM_PROVIDER").unwrap_or_else(|_| "stub".to_string()).to_lowercase();
    if provider == "openai" {
        match OpenAiCompatClient::from_env() {
            Ok(client) => return Box::new(client),
            Err(e) => log::warn!("openai provider unavailable ({e}); falling back to stub"),
        }
    }
    Box::new(StubGenerationClient::new())
}
