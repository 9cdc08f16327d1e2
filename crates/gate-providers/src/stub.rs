//! Stub determinista de generación.
use gate_core::{GenerationClient, GenerationOutcome};
use serde_json::json;

/// Devuelve siempre el mismo rationale válido y un output fijo. Útil como
/// default de proceso y como doble determinista en tests.
#[derive(Debug, Default)]
pub struct StubGenerationClient;

impl StubGenerationClient {
    pub fn new() -> Self {
        Self
    }
}

impl GenerationClient for StubGenerationClient {
    fn complete(&self, _rendered_prompt: &str) -> GenerationOutcome {
        let parsed = json!({
            "decision_rationale": {
                "version": "v1",
                "summary": "stubbed rationale",
                "inputs_used": [],
                "assumptions": []
            },
            "output_json": {
                "result": "stubbed"
            }
        });
        GenerationOutcome { raw_text: parsed.to_string(),
                            parsed_json: Some(parsed),
                            provider: Some("stub".to_string()),
                            model: None,
                            request_json: None,
                            response_json: None,
                            latency_ms: Some(0),
                            extraction_errors: None }
    }
}
