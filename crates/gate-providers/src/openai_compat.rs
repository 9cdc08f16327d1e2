//! Cliente HTTP compatible con la API de chat-completions.
//!
//! Contrato del puerto: `complete` nunca falla por salida ordinaria no
//! parseable — transporte caído, respuesta sin la forma esperada o texto no
//! JSON se degradan todos a `parsed_json: None` con diagnóstico en
//! `extraction_errors`, y la política decide aguas abajo.

use std::env;
use std::time::Instant;

use serde_json::{json, Value};
use thiserror::Error;

use gate_core::{GenerationClient, GenerationOutcome};

#[derive(Debug, Error)]
pub enum ProviderConfigError {
    #[error("LLM_API_KEY is required for the OpenAI-compatible provider")]
    MissingApiKey,
}

pub struct OpenAiCompatClient {
    base_url: String,
    api_key: String,
    model: String,
    http: reqwest::blocking::Client,
}

impl OpenAiCompatClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(),
               api_key: api_key.to_string(),
               model: model.to_string(),
               http: reqwest::blocking::Client::new() }
    }

    /// Configuración por entorno: `LLM_BASE_URL`, `LLM_API_KEY` (requerida),
    /// `LLM_MODEL`.
    pub fn from_env() -> Result<Self, ProviderConfigError> {
        let base_url = env::var("LLM_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = env::var("LLM_API_KEY").map_err(|_| ProviderConfigError::MissingApiKey)?;
        let model = env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());
        Ok(Self::new(&base_url, &api_key, &model))
    }
}

impl GenerationClient for OpenAiCompatClient {
    fn complete(&self, rendered_prompt: &str) -> GenerationOutcome {
        let url = format!("{}/chat/completions", self.base_url);
        let request_json = json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": rendered_prompt}
            ],
            "response_format": {"type": "json_object"}
        });

        let started = Instant::now();
        let response = self.http
                           .post(&url)
                           .bearer_auth(&self.api_key)
                           .json(&request_json)
                           .send();
        let latency_ms = started.elapsed().as_millis() as i64;

        let mut outcome = GenerationOutcome { provider: Some("openai_compat".to_string()),
                                              model: Some(self.model.clone()),
                                              request_json: Some(request_json),
                                              latency_ms: Some(latency_ms),
                                              ..GenerationOutcome::default() };

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                log::warn!("generation transport error: {e}");
                outcome.extraction_errors = Some(json!({"transport": e.to_string()}));
                return outcome;
            }
        };

        let body: Value = match response.json() {
            Ok(v) => v,
            Err(e) => {
                outcome.extraction_errors = Some(json!({"response_decode": e.to_string()}));
                return outcome;
            }
        };

        // Texto crudo: el content de la primera choice, o el body completo si
        // la respuesta no tiene la forma esperada
        let raw_text = body["choices"][0]["message"]["content"].as_str()
                                                               .map(|s| s.to_string())
                                                               .unwrap_or_else(|| body.to_string());
        outcome.response_json = Some(body);
        match serde_json::from_str::<Value>(&raw_text) {
            Ok(parsed) => outcome.parsed_json = Some(parsed),
            Err(e) => outcome.extraction_errors = Some(json!({"json_parse": e.to_string()})),
        }
        outcome.raw_text = raw_text;
        outcome
    }
}
