//! Anthropic Messages API verifier.
//!
//! Auth via `x-api-key` with a required `anthropic-version` header; the reply
//! is a list of content blocks of which only `text` blocks are read.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use super::{build_batch_prompt, map_http_error, map_send_error, parse_numbered_answers};
use crate::config::VerifierConfig;
use crate::error::VerifierError;
use crate::verifier::Verifier;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicVerifier {
    client: Client,
    name: String,
    model: String,
    api_key: String,
    base_url: String,
    max_tokens: usize,
    temperature: f32,
}

impl AnthropicVerifier {
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

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        })
    }

    /// Concatenated text blocks.
    fn parse_response(body: &Value) -> Result<String, VerifierError> {
        let blocks = body["content"]
            .as_array()
            .ok_or_else(|| VerifierError::ResponseParse {
                message: "Missing 'content' array in response".to_string(),
            })?;
        let text: Vec<&str> = blocks
            .iter()
            .filter(|block| block["type"] == "text")
            .filter_map(|block| block["text"].as_str())
            .collect();
        if text.is_empty() {
            return Err(VerifierError::ResponseParse {
                message: "No text block in response".to_string(),
            });
        }
        Ok(text.join("\n"))
    }
}

#[async_trait]
impl Verifier for AnthropicVerifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn verify_batch(&self, claims: &[String]) -> Result<Vec<String>, VerifierError> {
        if claims.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.request_body(&build_batch_prompt(claims));

        debug!(verifier = %self.name, model = %self.model, claims = claims.len(), "Sending verification batch");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
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

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> AnthropicVerifier {
        let config = crate::config::ClaimCheckConfig::default();
        let entry = config.verifier("anthropic").unwrap();
        AnthropicVerifier::new(entry, "k".to_string())
    }

    #[test]
    fn test_request_body() {
        let body = verifier().request_body("prompt");
        assert_eq!(body["model"], "claude-3-5-sonnet-20241022");
        assert_eq!(body["max_tokens"], 200);
        assert_eq!(body["messages"][0]["content"], "prompt");
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_parse_response_joins_text_blocks() {
        let body = json!({
            "content": [
                { "type": "text", "text": "1. Yes" },
                { "type": "text", "text": "2. Uncertain" }
            ],
            "stop_reason": "end_turn"
        });
        let text = AnthropicVerifier::parse_response(&body).unwrap();
        assert_eq!(parse_numbered_answers(&text, 2), vec!["Yes", "Uncertain"]);
    }

    #[test]
    fn test_parse_response_without_text() {
        let body = json!({ "content": [] });
        assert!(matches!(
            AnthropicVerifier::parse_response(&body),
            Err(VerifierError::ResponseParse { .. })
        ));
        assert!(AnthropicVerifier::parse_response(&json!({})).is_err());
    }
}
