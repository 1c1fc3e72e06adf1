//! Shared SPARQL-over-HTTP plumbing for the public endpoints.

use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::SourceError;

/// Run a SELECT query against `endpoint` and return every bound value.
pub(crate) async fn select(
    client: &Client,
    source_name: &str,
    endpoint: &str,
    user_agent: &str,
    query: &str,
) -> Result<Vec<String>, SourceError> {
    debug!(source = source_name, query = %query.trim(), "Sending SPARQL query");

    let response = client
        .get(endpoint)
        .query(&[("query", query), ("format", "json")])
        .header(reqwest::header::USER_AGENT, user_agent)
        .header(reqwest::header::ACCEPT, "application/sparql-results+json")
        .send()
        .await
        .map_err(|e| SourceError::Http {
            source_name: source_name.to_string(),
            message: format!("Request failed: {}", e),
        })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| SourceError::Http {
        source_name: source_name.to_string(),
        message: format!("Failed to read response body: {}", e),
    })?;

    if !status.is_success() {
        return Err(SourceError::Http {
            source_name: source_name.to_string(),
            message: format!("HTTP {}: {}", status, truncate(&body, 200)),
        });
    }

    let json: Value = serde_json::from_str(&body).map_err(|e| SourceError::ResponseParse {
        source_name: source_name.to_string(),
        message: format!("Invalid JSON: {}", e),
    })?;
    binding_values(&json, source_name)
}

/// Flatten `results.bindings[*].<var>.value` into a list, in binding order.
pub(crate) fn binding_values(json: &Value, source_name: &str) -> Result<Vec<String>, SourceError> {
    let bindings = json
        .get("results")
        .and_then(|r| r.get("bindings"))
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::ResponseParse {
            source_name: source_name.to_string(),
            message: "missing results.bindings".to_string(),
        })?;

    let mut values = Vec::new();
    for binding in bindings {
        let Some(vars) = binding.as_object() else {
            continue;
        };
        for cell in vars.values() {
            if let Some(value) = cell.get("value").and_then(Value::as_str) {
                values.push(value.to_string());
            }
        }
    }
    Ok(values)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
