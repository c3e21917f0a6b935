//! The three analysis functions.
//!
//! [`ClaimAnalyst`] is the seam between the step sequencer and the model:
//! typed input in, free text out. [`LlmAnalyst`] is the production
//! implementation, closed over the shared [`EvaluationServices`].

use async_trait::async_trait;
use thiserror::Error;

use claimcheck_core::{AnalysisStep, ClaimRecord};

use crate::prompts;
use crate::providers::ProviderError;
use crate::services::EvaluationServices;

/// Why an analysis step produced no content.
///
/// The display text becomes the step's error finding, after the
/// `"Error: "` marker.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{0} not found")]
    PolicyNotFound(String),

    #[error("record has no insurance_policy_id")]
    MissingPolicyId,

    #[error("{0} requires a non-empty record summary and policy summary")]
    MissingInput(&'static str),

    #[error("{0} returned an empty response")]
    EmptyResponse(&'static str),

    #[error("failed to serialize prompt input: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Provider(#[from] ProviderError),
}

/// The analysis functions the sequencer dispatches to.
///
/// Implementations hold no per-claim state; one analyst serves every record
/// of a batch, possibly concurrently.
#[async_trait]
pub trait ClaimAnalyst: Send + Sync {
    /// Structured summary of a claim record.
    async fn summarize_record(&self, record: &ClaimRecord) -> Result<String, AnalysisError>;

    /// Summary of the policy with the given id.
    async fn summarize_policy(&self, policy_id: &str) -> Result<String, AnalysisError>;

    /// Coverage evaluation of a record summary against a policy summary.
    async fn check_coverage(
        &self,
        record_summary: &str,
        policy_summary: &str,
    ) -> Result<String, AnalysisError>;
}

/// Model-backed analyst.
#[derive(Debug, Clone)]
pub struct LlmAnalyst {
    services: EvaluationServices,
}

impl LlmAnalyst {
    pub fn new(services: EvaluationServices) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &EvaluationServices {
        &self.services
    }
}

#[async_trait]
impl ClaimAnalyst for LlmAnalyst {
    async fn summarize_record(&self, record: &ClaimRecord) -> Result<String, AnalysisError> {
        let record_json = record.to_prompt_json()?;
        let messages = prompts::record_summary_messages(&record_json, self.services.reference().codes())?;
        self.services
            .complete(AnalysisStep::SummarizeRecord.name(), messages)
            .await
    }

    async fn summarize_policy(&self, policy_id: &str) -> Result<String, AnalysisError> {
        let policy = self
            .services
            .reference()
            .policy(policy_id)
            .ok_or_else(|| AnalysisError::PolicyNotFound(policy_id.to_string()))?;

        if let Some(cache) = self.services.policy_cache() {
            if let Some(summary) = cache.get(policy_id).await {
                tracing::debug!(policy_id, "Policy summary served from cache");
                return Ok(summary);
            }
        }

        let messages = prompts::policy_summary_messages(policy, self.services.reference().codes())?;
        let summary = self
            .services
            .complete(AnalysisStep::SummarizePolicy.name(), messages)
            .await?;

        if let Some(cache) = self.services.policy_cache() {
            cache.insert(policy_id, summary.clone()).await;
        }
        Ok(summary)
    }

    async fn check_coverage(
        &self,
        record_summary: &str,
        policy_summary: &str,
    ) -> Result<String, AnalysisError> {
        let step = AnalysisStep::CheckCoverage.name();
        if record_summary.trim().is_empty() || policy_summary.trim().is_empty() {
            return Err(AnalysisError::MissingInput(step));
        }

        let messages = prompts::coverage_check_messages(record_summary, policy_summary);
        self.services.complete(step, messages).await
    }
}
