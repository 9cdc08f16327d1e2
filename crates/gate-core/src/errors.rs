//! Errores del motor (tipados por categoría, sin panics en rutas de librería).
//!
//! Taxonomía: `NotFound` (recurso inexistente), `Conflict` (precondición de
//! estado violada: resume sobre run no-waiting, atestación duplicada, paso
//! RUNNING heredado, manifest alterado bajo un run en vuelo), y
//! `ValidationFailed` (forma estructural de un request). Un FAIL de política
//! NO es un error: es estado terminal normal de un paso.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EngineError {
    #[error("{0} not found")] NotFound(&'static str),
    #[error("conflict: {0}")] Conflict(String),
    #[error("validation failed: {0:?}")] ValidationFailed(Vec<String>),
}
