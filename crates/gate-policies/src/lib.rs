//! gate-policies – Gate determinista de ejecución
//!
//! Provee el validador de decision rationale (aporte consultivo) y el
//! evaluador de política de ejecución (veredicto autoritativo). Ambos son
//! funciones puras: mismo input, mismo reporte, sin efectos. El reporte se
//! persiste tal cual en el StepRun y nunca se recalcula después.

use gate_domain::ManifestStep;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reglas que puede citar un reporte de política.
pub const RULE_DECISION_RATIONALE_VALID: &str = "decision_rationale_valid";
pub const RULE_OUTPUT_JSON_IS_OBJECT: &str = "output_json_is_object";
pub const RULE_OUTPUT_JSON_NON_EMPTY: &str = "output_json_non_empty";

/// Veredicto binario del evaluador. FAIL es un estado terminal normal de un
/// paso, no un error del sistema.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyVerdict {
    Pass,
    Fail,
}

/// Violación individual, en el orden en que la regla fue evaluada.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PolicyViolation {
    pub rule: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl PolicyViolation {
    fn with_detail(rule: &str, detail: &str) -> Self {
        Self { rule: rule.to_string(),
               outcome: "fail".to_string(),
               detail: Some(detail.to_string()),
               errors: None }
    }

    fn with_errors(rule: &str, errors: Vec<String>) -> Self {
        Self { rule: rule.to_string(),
               outcome: "fail".to_string(),
               detail: None,
               errors: Some(errors) }
    }
}

/// Registro autoritativo del veredicto por paso.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExecutionPolicyReport {
    pub outcome: PolicyVerdict,
    pub violations: Vec<PolicyViolation>,
}

impl ExecutionPolicyReport {
    /// JSON para persistencia/auditoría.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Valida el contrato estructural mínimo del decision rationale.
///
/// Retorna `(ok, errores)`. El rationale es consultivo: este chequeo alimenta
/// al evaluador de política pero nunca decide por sí mismo el éxito del paso.
pub fn validate_decision_rationale(obj: Option<&Value>) -> (bool, Vec<String>) {
    let map = match obj {
        Some(Value::Object(map)) => map,
        _ => return (false, vec!["Decision Rationale must be a JSON object".to_string()]),
    };

    let mut errors: Vec<String> = Vec::new();

    match map.get("version") {
        Some(Value::String(v)) if !v.trim().is_empty() => {}
        _ => errors.push("Missing or invalid 'version' (must be non-empty string)".to_string()),
    }

    // Campos opcionales: si están presentes y no son null deben tener el tipo esperado
    if let Some(summary) = map.get("summary") {
        if !summary.is_null() && !summary.is_string() {
            errors.push("'summary' must be a string if present".to_string());
        }
    }
    if let Some(nodes) = map.get("nodes") {
        if !nodes.is_null() && !nodes.is_array() {
            errors.push("'nodes' must be a list if present".to_string());
        }
    }
    if let Some(selected) = map.get("selected_path") {
        if !selected.is_null() && !selected.is_array() {
            errors.push("'selected_path' must be a list if present".to_string());
        }
    }

    (errors.is_empty(), errors)
}

/// Evalúa la política de ejecución de un paso.
///
/// Determinista y total: nunca falla para inputs bien tipados. Acumula las
/// violaciones en orden fijo y el veredicto es FAIL si y solo si hay alguna.
/// El paso se recibe por contrato; las reglas v1 no consultan su definición.
pub fn evaluate_execution_policy(_step: &ManifestStep,
                                 output_json: Option<&Value>,
                                 decision_rationale: Option<&Value>)
                                 -> (PolicyVerdict, ExecutionPolicyReport) {
    let mut violations: Vec<PolicyViolation> = Vec::new();

    let (rationale_ok, rationale_errors) = validate_decision_rationale(decision_rationale);
    if !rationale_ok {
        violations.push(PolicyViolation::with_errors(RULE_DECISION_RATIONALE_VALID, rationale_errors));
    }

    match output_json {
        Some(Value::Object(map)) => {
            if map.is_empty() {
                violations.push(PolicyViolation::with_detail(RULE_OUTPUT_JSON_NON_EMPTY, "output_json empty"));
            }
        }
        _ => violations.push(PolicyViolation::with_detail(RULE_OUTPUT_JSON_IS_OBJECT, "output_json not an object")),
    }

    let outcome = if violations.is_empty() { PolicyVerdict::Pass } else { PolicyVerdict::Fail };
    (outcome, ExecutionPolicyReport { outcome, violations })
}
