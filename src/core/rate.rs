//! Exchange rate abstractions and core types

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// Message carried by every upstream failure, whatever the cause.
pub const FAILURE_MESSAGE: &str = "API request failed";

/// Failure record handed to callers when the upstream call did not succeed.
///
/// Serializes as `{"success": false, "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamFailure {
    success: bool,
    message: String,
}

impl UpstreamFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Default for UpstreamFailure {
    fn default() -> Self {
        Self::new(FAILURE_MESSAGE)
    }
}

/// Outcome of a rate lookup.
///
/// On the wire both variants are plain JSON objects: a success is the upstream
/// body verbatim and a failure is the fixed failure record. In Rust the two
/// are told apart by variant, not by probing for a `success` key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RateResult {
    Success(Map<String, Value>),
    Failure(UpstreamFailure),
}

impl RateResult {
    pub fn failure() -> Self {
        RateResult::Failure(UpstreamFailure::default())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RateResult::Success(_))
    }
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Never fails: every error is folded into [`RateResult::Failure`].
    async fn fetch_rates(&self) -> RateResult;
}
