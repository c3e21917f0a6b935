//! Process-wide services shared by every claim evaluation.

use std::sync::Arc;

use claimcheck_core::ReferenceStore;

use crate::analyst::AnalysisError;
use crate::cache::PolicySummaryCache;
use crate::config::RuntimeConfig;
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider};
use crate::usage::UsageMeter;

/// The model handle, reference data and completion settings.
///
/// Built once at startup and cloned cheaply into each run. Nothing in here
/// is mutated by an evaluation except the usage meter and summary cache,
/// both of which are internally synchronized.
#[derive(Clone)]
pub struct EvaluationServices {
    provider: Arc<dyn LlmProvider>,
    reference: Arc<ReferenceStore>,
    completion: CompletionConfig,
    usage: Arc<UsageMeter>,
    policy_cache: Option<PolicySummaryCache>,
}

impl EvaluationServices {
    pub fn new(provider: Arc<dyn LlmProvider>, reference: Arc<ReferenceStore>) -> Self {
        Self {
            provider,
            reference,
            completion: CompletionConfig::default(),
            usage: Arc::new(UsageMeter::new()),
            policy_cache: None,
        }
    }

    /// Apply completion settings and, if enabled, a policy summary cache.
    pub fn with_config(mut self, config: &RuntimeConfig) -> Self {
        self.completion = config.completion.clone();
        self.policy_cache = config
            .cache_policy_summaries
            .then(|| PolicySummaryCache::new(1_000, config.policy_cache_ttl));
        self
    }

    pub fn with_policy_cache(mut self, cache: PolicySummaryCache) -> Self {
        self.policy_cache = Some(cache);
        self
    }

    pub fn reference(&self) -> &ReferenceStore {
        &self.reference
    }

    pub fn usage(&self) -> &UsageMeter {
        &self.usage
    }

    pub fn policy_cache(&self) -> Option<&PolicySummaryCache> {
        self.policy_cache.as_ref()
    }

    /// One call to the model. Empty output counts as a failure.
    pub async fn complete(
        &self,
        label: &'static str,
        messages: Vec<ChatMessage>,
    ) -> Result<String, AnalysisError> {
        tracing::debug!(call = label, provider = self.provider.name(), "Calling model");

        let response = match self.provider.complete(messages, &self.completion).await {
            Ok(response) => response,
            Err(e) => {
                self.usage.record_failure();
                return Err(e.into());
            }
        };
        self.usage.record(&response.usage);

        tracing::debug!(
            call = label,
            model = %response.model,
            tokens = response.usage.total(),
            "Model responded"
        );

        if response.content.trim().is_empty() {
            return Err(AnalysisError::EmptyResponse(label));
        }
        Ok(response.content)
    }
}

impl std::fmt::Debug for EvaluationServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationServices")
            .field("provider", &self.provider.name())
            .field("policies", &self.reference.policies().len())
            .field("completion", &self.completion)
            .field("policy_cache", &self.policy_cache)
            .finish()
    }
}
