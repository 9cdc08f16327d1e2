//! gate-providers: backends de generación para el puerto `GenerationClient`
//!
//! Provee:
//! - `StubGenerationClient`: stub determinista (default y doble de test).
//! - `OpenAiCompatClient`: cliente HTTP compatible con chat-completions que
//!   degrada a "sin parsed_json" ante cualquier problema de transporte o
//!   parseo, nunca lanza.
//! - `client_from_env`: selección de proveedor resuelta una sola vez al
//!   inicio del proceso; el motor recibe el cliente ya inyectado.

pub mod stub;
pub mod openai_compat;
pub mod router;

pub use stub::StubGenerationClient;
pub use openai_compat::{OpenAiCompatClient, ProviderConfigError};
pub use router::client_from_env;
