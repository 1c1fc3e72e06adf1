//! Google Gemini verifier.
//!
//! Auth via the `?key=` query parameter against `models/{model}:generateContent`.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use super::{build_batch_prompt, map_http_error, map_send_error, parse_numbered_answers};
use crate::config::VerifierConfig;
use crate::error::VerifierError;
use crate::verifier::Verifier;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiVerifier {
    client: Client,
    name: String,
    model: String,
    api_key: String,
    base_url: String,
    max_tokens: usize,
    temperature: f32,
}

impl GeminiVerifier {
    pub fn new(config: &VerifierConfig, api_key: String) -> Self {
        Self {
            client: Client::new(),
            name: config.name.clone(),
            model: config.model.clone(),
            api_key,
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    fn endpoint_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_tokens,
            },
        })
    }

    fn parse_response(body: &Value) -> Result<String, VerifierError> {
        let candidates = body["candidates"]
            .as_array()
            .ok_or_else(|| VerifierError::ResponseParse {
                message: "Missing 'candidates' array in response".to_string(),
            })?;
        let Some(candidate) = candidates.first() else {
            return Err(VerifierError::ResponseParse {
                message: "Empty 'candidates' array in response".to_string(),
            });
        };
        let text: Vec<&str> = candidate["content"]["parts"]
            .as_array()
            .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(VerifierError::ResponseParse {
                message: "No text parts in first candidate".to_string(),
            });
        }
        Ok(text.join(""))
    }
}

#[async_trait]
impl Verifier for GeminiVerifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn verify_batch(&self, claims: &[String]) -> Result<Vec<String>, VerifierError> {
        if claims.is_empty() {
            return Ok(Vec::new());
        }
        let body = self.request_body(&build_batch_prompt(claims));

        debug!(verifier = %self.name, model = %self.model, claims = claims.len(), "Sending verification batch");

        let response = self
            .client
            .post(self.endpoint_url())
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
