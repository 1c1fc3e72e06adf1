//! OpenAI-compatible verifier.
//!
//! Covers OpenAI itself and any endpoint that follows the chat completions
//! API (DeepSeek, vLLM, LM Studio, ...).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use super::{build_batch_prompt, map_http_error, map_send_error, parse_numbered_answers};
use crate::config::VerifierConfig;
use crate::error::VerifierError;
use crate::verifier::Verifier;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiCompatibleVerifier {
    client: Client,
    name: String,
    model: String,
    api_key: String,
    base_url: String,
    max_tokens: usize,
    temperature: f32,
}

impl OpenAiCompatibleVerifier {
    pub fn new(config: &VerifierConfig, api_key: String) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            client: Client::new(),
            name: config.name.clone(),
            model: config.model.clone(),
            api_key,
            base_url,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": false,
        })
    }

    /// Text of the first choice.
    fn parse_response(body: &Value) -> Result<String, VerifierError> {
        body["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .map(str::to_string)
            .ok_or_else(|| VerifierError::ResponseParse {
                message: "Missing 'choices[0].message.content' in response".to_string(),
            })
    }
}

#[async_trait]
impl Verifier for OpenAiCompatibleVerifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn verify_batch(&self, claims: &[String]) -> Result<Vec<String>, VerifierError> {
        if claims.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&build_batch_prompt(claims));

        debug!(verifier = %self.name, url = %url, model = %self.model, claims = claims.len(), "Sending verification batch");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| VerifierError::Api {
            message: format!("Failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(map_http_error(&self.name, status, &response_body));
        }

        let json: Value =
            serde_json::from_str(&response_body).map_err(|e| VerifierError::ResponseParse {
                message: format!("Invalid JSON: {e}"),
            })?;

        let text = Self::parse_response(&json)?;
        Ok(parse_numbered_answers(&text, claims.len()))
    }
}
