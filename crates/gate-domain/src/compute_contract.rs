//! Contrato de cómputo declarado por pasos `compute`.
//!
//! El contrato describe el ejecutor externo y sus entradas/salidas, y fija el
//! método de verificación. Invariante: `verification` debe ser exactamente
//! `operator_attest` — la única forma de cerrar un paso compute es una
//! atestación humana.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DomainError;

/// Único método de verificación soportado para pasos compute.
pub const VERIFICATION_OPERATOR_ATTEST: &str = "operator_attest";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeContract {
    pub executor: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub verification: String,
}

impl ComputeContract {
    pub fn new(executor: &str, inputs: Vec<String>, outputs: Vec<String>) -> Self {
        Self { executor: executor.to_string(),
               inputs,
               outputs,
               verification: VERIFICATION_OPERATOR_ATTEST.to_string() }
    }

    /// Valida la forma estructural del contrato y acumula todos los
    /// problemas encontrados (no corta en el primero).
    pub fn check(&self) -> Vec<String> {
        let mut errors: Vec<String> = Vec::new();
        if self.executor.trim().is_empty() {
            errors.push("'executor' must be a non-empty string".to_string());
        }
        for (i, input) in self.inputs.iter().enumerate() {
            if input.trim().is_empty() {
                errors.push(format!("'inputs[{i}]' must be a non-empty string"));
            }
        }
        for (i, output) in self.outputs.iter().enumerate() {
            if output.trim().is_empty() {
                errors.push(format!("'outputs[{i}]' must be a non-empty string"));
            }
        }
        if self.verification != VERIFICATION_OPERATOR_ATTEST {
            errors.push(format!("'verification' must equal \"{VERIFICATION_OPERATOR_ATTEST}\""));
        }
        errors
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let errors = self.check();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::InvalidComputeContract(errors))
        }
    }

    /// Construye y valida un contrato desde un documento JSON opaco.
    pub fn from_value(value: &Value) -> Result<Self, DomainError> {
        let contract: ComputeContract = serde_json::from_value(value.clone())?;
        contract.validate()?;
        Ok(contract)
    }

    /// Snapshot JSON del contrato (se congela al momento de la atestación).
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
