//! Renderizado de prompts del paso generation.
//!
//! El payload embebe `step_key`, `task_id`, `config` y el mapa upstream de
//! salidas canónicas; se serializa en forma canónica para que el prompt sea
//! determinista ante el mismo input.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use gate_domain::ManifestStep;

use crate::hashing::to_canonical_json;

/// Contexto JSON que alimenta el render (y se persiste en el PromptRecord).
pub fn build_prompt_payload(step: &ManifestStep, upstream: &Map<String, Value>) -> Value {
    json!({
        "step_key": step.step_key,
        "task_id": step.task_id.map(|id: Uuid| id.to_string()),
        "config": step.config,
        "upstream_canonical": Value::Object(upstream.clone()),
    })
}

pub fn render_prompt(payload: &Value) -> String {
    format!("Execute step.\n\nINPUT_JSON:\n{}\n\nReturn STRICT JSON only with keys: decision_rationale, output_json.",
            to_canonical_json(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prompt_embeds_upstream_and_config() {
        let step = ManifestStep::generation("S2", &["S1"], json!({"goal": "refine"}));
        let mut upstream = Map::new();
        upstream.insert("S1".to_string(), json!({"result": 1}));
        let payload = build_prompt_payload(&step, &upstream);
        let prompt = render_prompt(&payload);
        assert!(prompt.contains("\"step_key\":\"S2\""));
        assert!(prompt.contains("\"upstream_canonical\":{\"S1\":{\"result\":1}}"));
        assert!(prompt.ends_with("Return STRICT JSON only with keys: decision_rationale, output_json."));
    }

    #[test]
    fn prompt_is_deterministic_for_same_input() {
        let step = ManifestStep::generation("S1", &[], json!({"b": 2, "a": 1}));
        let upstream = Map::new();
        let p1 = render_prompt(&build_prompt_payload(&step, &upstream));
        let p2 = render_prompt(&build_prompt_payload(&step, &upstream));
        assert_eq!(p1, p2);
    }
}
