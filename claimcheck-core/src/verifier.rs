//! The verifier gateway: a model (or any oracle) that judges a batch of claims.
//!
//! Live back-ends live in [`crate::providers`]; [`MockVerifier`] is a scripted
//! in-memory implementation for tests and offline runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::VerifierError;

/// Judges claims in batches.
///
/// Implementations return one raw answer per claim, in order. The voting engine
/// normalizes answers and pads or truncates the result to the batch length, so a
/// short reply is not an error here.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Name used for priority ordering and self-exclusion.
    fn name(&self) -> &str;

    /// Judge every claim in `claims` with a single call.
    async fn verify_batch(&self, claims: &[String]) -> Result<Vec<String>, VerifierError>;
}

/// How a [`MockVerifier`] reacts when called.
#[derive(Debug, Clone)]
enum MockMode {
    Answer,
    Fail,
    Panic,
}

/// A scripted verifier for testing and development.
pub struct MockVerifier {
    name: String,
    mode: MockMode,
    default_answer: String,
    answers: HashMap<String, String>,
    delay: Option<Duration>,
    truncate_to: Option<usize>,
    batches: Mutex<Vec<Vec<String>>>,
    call_count: AtomicUsize,
}

impl MockVerifier {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mode: MockMode::Answer,
            default_answer: "Uncertain".to_string(),
            answers: HashMap::new(),
            delay: None,
            truncate_to: None,
            batches: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// A verifier that gives the same raw answer to every claim.
    pub fn answering(name: &str, answer: &str) -> Self {
        Self::new(name).with_default(answer)
    }

    /// A verifier whose every call fails with a connection error.
    pub fn failing(name: &str) -> Self {
        Self {
            mode: MockMode::Fail,
            ..Self::new(name)
        }
    }

    /// A verifier that panics if it is ever called.
    pub fn panicking(name: &str) -> Self {
        Self {
            mode: MockMode::Panic,
            ..Self::new(name)
        }
    }

    /// Answer for claims without a scripted entry.
    pub fn with_default(mut self, answer: &str) -> Self {
        self.default_answer = answer.to_string();
        self
    }

    /// Script the raw answer for one claim text.
    pub fn with_answer(mut self, claim: &str, answer: &str) -> Self {
        self.answers.insert(claim.to_string(), answer.to_string());
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Return at most `len` answers per call.
    pub fn truncated_to(mut self, len: usize) -> Self {
        self.truncate_to = Some(len);
        self
    }

    /// Number of `verify_batch` calls so far.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every batch this verifier has been asked to judge, in call order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches
            .lock()
            .map(|batches| batches.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Verifier for MockVerifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn verify_batch(&self, claims: &[String]) -> Result<Vec<String>, VerifierError> {
        if let MockMode::Panic = self.mode {
            panic!("verifier '{}' must not be called", self.name);
        }

        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(claims.to_vec());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let MockMode::Fail = self.mode {
            return Err(VerifierError::Connection {
                message: format!("mock verifier '{}' is offline", self.name),
            });
        }

        let mut answers: Vec<String> = claims
            .iter()
            .map(|claim| {
                self.answers
                    .get(claim)
                    .cloned()
                    .unwrap_or_else(|| self.default_answer.clone())
            })
            .collect();
        if let Some(len) = self.truncate_to {
            answers.truncate(len);
        }
        Ok(answers)
    }
}
