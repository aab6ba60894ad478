//! The external LLM validator port (§4.4 step 1, §6 "Validator endpoint").
//!
//! Modeled as a sum-type return rather than exceptions (§9 "Exceptions for
//! control flow -> result/sum-type returns"): [`ValidatorOutcome::Valid`] /
//! [`ValidatorOutcome::Invalid`] are both successful HTTP responses with
//! different `valid` fields; transport/timeout/malformed-payload failures
//! are [`ValidatorError`], handled by the queue's retry loop, not by this
//! trait's caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::entities::{Finding, Severity};
use std::time::Duration;
use thiserror::Error;

/// Hard deadline for a single validator call (§5, §6, §8 boundary case:
/// "Validator timeout at 120s is treated as error").
pub const VALIDATOR_TIMEOUT: Duration = Duration::from_secs(120);

/// Request body posted to the validator (§6 exact shape).
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRequest {
    pub finding: FindingPayload,
    pub contract_context: serde_json::Value,
    pub similar_cases: Vec<serde_json::Value>,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FindingPayload {
    pub r#type: String,
    pub function: Option<String>,
    pub line: Option<u32>,
    pub code_snippet: Option<String>,
    pub rule_confidence: f64,
}

impl From<&Finding> for FindingPayload {
    fn from(f: &Finding) -> Self {
        Self {
            r#type: f.r#type.clone(),
            function: f.function_name.clone(),
            line: f.line,
            code_snippet: f.code_snippet.clone(),
            rule_confidence: f.rule_confidence,
        }
    }
}

/// Raw JSON shape of a validator response (§6).
#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorResponseBody {
    pub valid: bool,
    pub confidence: f64,
    pub severity: Option<String>,
    pub reason: Option<String>,
    pub recommendation: Option<String>,
    #[serde(rename = "additionalContext")]
    pub additional_context: Option<String>,
}

/// The validator's decision, parsed into the variants §9 calls for.
#[derive(Debug, Clone)]
pub enum ValidatorOutcome {
    /// The finding was confirmed real; an Alert should be created from
    /// these fields (§4.4 step 2).
    Valid {
        confidence: f64,
        severity: Severity,
        reason: Option<String>,
        recommendation: Option<String>,
        additional_context: Option<String>,
    },
    /// The validator rejected the finding. Not an error (§7): the
    /// finding is still marked validated, just with no Alert.
    Invalid,
}

impl ValidatorOutcome {
    fn from_body(body: ValidatorResponseBody) -> Self {
        if !body.valid {
            return Self::Invalid;
        }
        let severity = body
            .severity
            .as_deref()
            .and_then(parse_severity)
            .unwrap_or(Severity::Medium);
        Self::Valid {
            confidence: body.confidence,
            severity,
            reason: body.reason,
            recommendation: body.recommendation,
            additional_context: body.additional_context,
        }
    }
}

fn parse_severity(s: &str) -> Option<Severity> {
    match s.to_ascii_uppercase().as_str() {
        "CRITICAL" => Some(Severity::Critical),
        "HIGH" => Some(Severity::High),
        "MEDIUM" => Some(Severity::Medium),
        "LOW" => Some(Severity::Low),
        "INFO" => Some(Severity::Info),
        _ => None,
    }
}

/// Transport-level failures from a single validator call (§7 "Validator"
/// kind). Carries no retry bookkeeping; that lives in the queue.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("validator request timed out")]
    Timeout,
    #[error("validator returned non-2xx status: {0}")]
    Status(u16),
    #[error("validator response was malformed: {0}")]
    Malformed(String),
    #[error("validator transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, request: ValidationRequest) -> Result<ValidatorOutcome, ValidatorError>;
}

/// `reqwest`-backed validator client posting to `LLM_WEBHOOK_URL` (§6).
pub struct HttpValidator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpValidator {
    #[must_use]
    pub fn new(endpoint: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(VALIDATOR_TIMEOUT)
            .build()
            .expect("reqwest client with a fixed timeout is infallible to build");
        Self { client, endpoint }
    }
}

#[async_trait]
impl Validator for HttpValidator {
    async fn validate(&self, request: ValidationRequest) -> Result<ValidatorOutcome, ValidatorError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ValidatorError::Timeout
                } else {
                    ValidatorError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ValidatorError::Status(response.status().as_u16()));
        }

        let body: ValidatorResponseBody = response
            .json()
            .await
            .map_err(|e| ValidatorError::Malformed(e.to_string()))?;

        Ok(ValidatorOutcome::from_body(body))
    }
}
