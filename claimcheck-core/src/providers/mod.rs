//! Live verifier back-ends.
//!
//! Each back-end sends the whole batch as one prompt asking for a numbered
//! list of `Yes`/`No`/`Uncertain` answers and parses the numbered reply back
//! into one raw answer per claim.

pub mod anthropic;
pub mod gemini;
pub mod openai_compat;

pub use anthropic::AnthropicVerifier;
pub use gemini::GeminiVerifier;
pub use openai_compat::OpenAiCompatibleVerifier;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use crate::config::{RetryConfig, VerifierConfig, VerifierProvider};
use crate::error::VerifierError;
use crate::verifier::Verifier;

/// Execute an async operation with retry logic for transient errors.
///
/// Retries on `RateLimited`, `Timeout`, and `Connection` errors.
/// Non-transient errors (auth, parse, other API errors) fail immediately.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T, VerifierError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, VerifierError>>,
{
    let mut last_err = None;
    for attempt in 0..=config.max_retries {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if !is_retryable(&e) || attempt == config.max_retries {
                    return Err(e);
                }

                let backoff_ms = compute_backoff(config, attempt, &e);
                tracing::warn!(
                    attempt = attempt + 1,
                    max = config.max_retries,
                    backoff_ms = backoff_ms,
                    error = %e,
                    "Retrying verifier call after transient error"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| VerifierError::Connection {
        message: "All retry attempts exhausted".to_string(),
    }))
}

fn is_retryable(err: &VerifierError) -> bool {
    matches!(
        err,
        VerifierError::RateLimited { .. }
            | VerifierError::Connection { .. }
            | VerifierError::Timeout { .. }
    )
}

/// Backoff delay, never shorter than a rate limit's retry-after.
fn compute_backoff(config: &RetryConfig, attempt: u32, err: &VerifierError) -> u64 {
    if let VerifierError::RateLimited { retry_after_secs } = err {
        let server_ms = retry_after_secs * 1000;
        let computed = compute_exponential_backoff(config, attempt);
        return server_ms.max(computed);
    }
    compute_exponential_backoff(config, attempt)
}

fn compute_exponential_backoff(config: &RetryConfig, attempt: u32) -> u64 {
    let base = config.initial_backoff_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    let capped = base.min(config.max_backoff_ms as f64) as u64;
    if config.jitter {
        // up to 25%
        let jitter = (capped as f64 * 0.25 * jitter_fraction()) as u64;
        capped + jitter
    } else {
        capped
    }
}

/// Cheap pseudo-random fraction in [0, 1) from the clock.
fn jitter_fraction() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

/// The prompt sent to every live verifier for a batch.
pub fn build_batch_prompt(claims: &[String]) -> String {
    let mut prompt = String::from(
        "For each claim below, respond with ONLY one word: \"Yes\", \"No\", or \"Uncertain\"\n\
         - \"Yes\" if the claim is factually correct\n\
         - \"No\" if the claim is factually incorrect\n\
         - \"Uncertain\" if you cannot determine the accuracy\n\nClaims:\n",
    );
    for (idx, claim) in claims.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", idx + 1, claim));
    }
    prompt.push_str("\nResponse format:\n1. [Yes/No/Uncertain]\n2. [Yes/No/Uncertain]\netc.");
    prompt
}

static NUMBERED_ANSWER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)[\.\)\s]+[*_]*([A-Za-z]+)").expect("numbered answer pattern")
});

/// Place the first word after each `N.` / `N)` line at slot `N - 1`.
///
/// Markdown emphasis around the word is ignored. Numbers outside `1..=expected`
/// and repeated numbers are dropped. When at least one line matched, the result
/// has exactly `expected` entries with `Uncertain` in slots the reply skipped;
/// a reply with no numbered lines yields an empty vector.
pub fn parse_numbered_answers(reply: &str, expected: usize) -> Vec<String> {
    let mut slots: Vec<Option<String>> = vec![None; expected];
    let mut matched = false;

    for line in reply.lines() {
        let Some(cap) = NUMBERED_ANSWER.captures(line) else {
            continue;
        };
        let Ok(number) = cap[1].parse::<usize>() else {
            continue;
        };
        if number == 0 || number > expected {
            continue;
        }
        let slot = &mut slots[number - 1];
        if slot.is_none() {
            *slot = Some(cap[2].to_string());
            matched = true;
        }
    }

    if !matched {
        return Vec::new();
    }
    slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| "Uncertain".to_string()))
        .collect()
}

/// Read the API key from the verifier's configured environment variable.
pub fn resolve_api_key(config: &VerifierConfig) -> Result<String, VerifierError> {
    std::env::var(&config.api_key_env)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| VerifierError::AuthFailed {
            verifier: format!("{}: env var '{}' not set", config.name, config.api_key_env),
        })
}

/// Seconds to wait from a 429 body's "try again in Xs" message, defaulting to 5.
pub(crate) fn parse_retry_after(body: &str) -> u64 {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(|s| s.to_string())
        })
        .and_then(|msg| {
            msg.split("in ")
                .last()
                .and_then(|s| s.trim().trim_end_matches(['s', '.']).parse::<f64>().ok())
        })
        .map(|secs| secs.ceil() as u64)
        .unwrap_or(5)
}

/// Map a non-success HTTP status to a verifier error.
pub(crate) fn map_http_error(verifier: &str, status: reqwest::StatusCode, body: &str) -> VerifierError {
    match status.as_u16() {
        401 | 403 => {
            tracing::debug!(verifier, body = %body, "Authentication failed");
            VerifierError::AuthFailed {
                verifier: verifier.to_string(),
            }
        }
        429 => VerifierError::RateLimited {
            retry_after_secs: parse_retry_after(body),
        },
        code if code >= 500 => VerifierError::Connection {
            message: format!("Server error ({status}): {body}"),
        },
        _ => VerifierError::Api {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

/// Map a transport failure from `reqwest`.
pub(crate) fn map_send_error(err: reqwest::Error) -> VerifierError {
    if err.is_timeout() || err.is_connect() {
        VerifierError::Connection {
            message: format!("Request failed: {err}"),
        }
    } else {
        VerifierError::Api {
            message: format!("Request failed: {err}"),
        }
    }
}

/// Wraps a live verifier so transient failures are retried.
pub struct RetryingVerifier {
    inner: Arc<dyn Verifier>,
    retry: RetryConfig,
}

impl RetryingVerifier {
    pub fn new(inner: Arc<dyn Verifier>, retry: RetryConfig) -> Self {
        Self { inner, retry }
    }
}

#[async_trait]
impl Verifier for RetryingVerifier {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn verify_batch(&self, claims: &[String]) -> Result<Vec<String>, VerifierError> {
        with_retry(&self.retry, || self.inner.verify_batch(claims)).await
    }
}

/// Build one live verifier from its configuration.
pub fn create_verifier(
    config: &VerifierConfig,
    retry: &RetryConfig,
) -> Result<Arc<dyn Verifier>, VerifierError> {
    let api_key = resolve_api_key(config)?;
    let verifier: Arc<dyn Verifier> = match config.provider {
        VerifierProvider::OpenAi | VerifierProvider::OpenAiCompatible => {
            Arc::new(OpenAiCompatibleVerifier::new(config, api_key))
        }
        VerifierProvider::Anthropic => Arc::new(AnthropicVerifier::new(config, api_key)),
        VerifierProvider::Gemini => Arc::new(GeminiVerifier::new(config, api_key)),
    };
    Ok(Arc::new(RetryingVerifier::new(verifier, retry.clone())))
}

/// Build every configured verifier that can be initialized, skipping the rest
/// with a warning. The voting engine decides whether enough remain.
pub fn create_verifiers(configs: &[VerifierConfig], retry: &RetryConfig) -> Vec<Arc<dyn Verifier>> {
    configs
        .iter()
        .filter_map(|config| match create_verifier(config, retry) {
            Ok(verifier) => Some(verifier),
            Err(e) => {
                tracing::warn!(
                    verifier = %config.name,
                    provider = %config.provider,
                    error = %e,
                    "Skipping verifier that failed to initialize"
                );
                None
            }
        })
        .collect()
}
