//! Claim orchestrator: one full evaluation per record.
//!
//! ## Execution Flow
//! 1. Fresh [`EvaluationContext`] for the record
//! 2. Three sequencer advances (record, policy, coverage)
//! 3. One decision render over the completed context
//!
//! Steps run strictly one after another; nothing is shared between records
//! except the read-only services.

use std::sync::Arc;

use claimcheck_core::{ClaimRecord, EvaluationContext, ReferenceStore};

use crate::analyst::{ClaimAnalyst, LlmAnalyst};
use crate::config::RuntimeConfig;
use crate::providers::LlmProvider;
use crate::renderer::DecisionRenderer;
use crate::sequencer::StepSequencer;
use crate::services::EvaluationServices;
use crate::usage::LlmUsage;
use crate::RuntimeError;

/// Evaluates claims end to end.
#[derive(Clone)]
pub struct ClaimOrchestrator {
    services: EvaluationServices,
    sequencer: StepSequencer,
    renderer: DecisionRenderer,
}

impl ClaimOrchestrator {
    /// Orchestrator using the model-backed analyst.
    pub fn new(services: EvaluationServices) -> Self {
        let analyst = Arc::new(LlmAnalyst::new(services.clone()));
        Self::with_analyst(services, analyst)
    }

    /// Orchestrator with a custom analyst. The renderer still uses the
    /// services' model handle.
    pub fn with_analyst(services: EvaluationServices, analyst: Arc<dyn ClaimAnalyst>) -> Self {
        Self {
            sequencer: StepSequencer::new(analyst),
            renderer: DecisionRenderer::new(services.clone()),
            services,
        }
    }

    /// Run every analysis step and render the decision.
    ///
    /// Step failures end up as error findings inside the returned context.
    /// An `Err` here means the context was driven out of order.
    pub async fn evaluate(&self, record: ClaimRecord) -> Result<EvaluationContext, RuntimeError> {
        let mut ctx = EvaluationContext::new(record);

        while !ctx.is_analysis_complete() {
            self.sequencer.advance(&mut ctx).await?;
        }
        self.renderer.render(&mut ctx).await?;

        tracing::info!(
            patient_id = ctx.record().patient_id.as_deref().unwrap_or("None"),
            "Claim evaluated"
        );
        Ok(ctx)
    }

    /// Evaluate and return just the final response text.
    pub async fn decide(&self, record: ClaimRecord) -> Result<String, RuntimeError> {
        let ctx = self.evaluate(record).await?;
        Ok(ctx
            .final_response()
            .map(|finding| finding.render())
            .unwrap_or_default())
    }

    pub fn services(&self) -> &EvaluationServices {
        &self.services
    }

    /// Model usage accumulated so far.
    pub fn usage(&self) -> LlmUsage {
        self.services.usage().snapshot()
    }
}

/// Builder for [`ClaimOrchestrator`].
#[derive(Default)]
pub struct ClaimOrchestratorBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    reference: Option<Arc<ReferenceStore>>,
    analyst: Option<Arc<dyn ClaimAnalyst>>,
    config: RuntimeConfig,
}

impl ClaimOrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model handle.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the reference data.
    pub fn reference(mut self, reference: Arc<ReferenceStore>) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Replace the model-backed analyst.
    pub fn analyst(mut self, analyst: Arc<dyn ClaimAnalyst>) -> Self {
        self.analyst = Some(analyst);
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> Result<ClaimOrchestrator, RuntimeError> {
        let provider = self
            .provider
            .ok_or_else(|| RuntimeError::NotConfigured("No model provider set".to_string()))?;
        let reference = self
            .reference
            .ok_or_else(|| RuntimeError::NotConfigured("No reference data loaded".to_string()))?;

        let services = EvaluationServices::new(provider, reference).with_config(&self.config);
        Ok(match self.analyst {
            Some(analyst) => ClaimOrchestrator::with_analyst(services, analyst),
            None => ClaimOrchestrator::new(services),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{reference_store, services, FailingAnalyst, ScriptedProvider};
    use claimcheck_core::{AnalysisStep, DecisionLine};

    fn record(policy_id: Option<&str>) -> ClaimRecord {
        ClaimRecord {
            patient_id: Some("PAT-001".to_string()),
            name: Some("Jane Doe".to_string()),
            gender: Some("F".to_string()),
            date_of_birth: Some("1980-03-02".to_string()),
            date_of_service: Some("2024-05-10".to_string()),
            insurance_policy_id: policy_id.map(str::to_string),
            diagnosis_codes: vec!["E11.9".to_string()],
            procedure_codes: vec!["99213".to_string()],
            billed_amount: Some(180.0),
            preauthorization_required: Some(false),
            preauthorization_obtained: Some(false),
            ..Default::default()
        }
        .with_derived_age()
    }

    #[tokio::test]
    async fn test_known_policy_yields_decision() {
        let orchestrator = ClaimOrchestrator::new(services());
        let ctx = orchestrator.evaluate(record(Some("P1"))).await.unwrap();

        let response = ctx.final_response().unwrap().render();
        assert!(!response.is_empty());
        assert!(response.contains("APPROVE") || response.contains("REVIEW REQUIRED"));
        assert!(DecisionLine::extract(&response).is_some());
        assert_eq!(orchestrator.usage().llm_calls, 4);
    }

    #[tokio::test]
    async fn test_absent_policy_still_completes() {
        let orchestrator = ClaimOrchestrator::new(services());
        let ctx = orchestrator.evaluate(record(Some("P404"))).await.unwrap();

        assert_eq!(ctx.policy_summary().unwrap().render(), "Error: P404 not found");
        assert!(!ctx.final_response().unwrap().render().is_empty());
    }

    #[tokio::test]
    async fn test_failing_analyst_still_renders() {
        let orchestrator =
            ClaimOrchestrator::with_analyst(services(), Arc::new(FailingAnalyst::new("timeout")));
        let ctx = orchestrator.evaluate(record(Some("P1"))).await.unwrap();

        for step in AnalysisStep::ALL {
            assert!(ctx.finding(step).unwrap().is_error());
        }
        assert_eq!(
            DecisionLine::extract(&ctx.final_response().unwrap().render()),
            Some(DecisionLine::ReviewRequired)
        );
    }

    #[tokio::test]
    async fn test_decide_returns_text() {
        let orchestrator = ClaimOrchestrator::new(services());
        let text = orchestrator.decide(record(Some("P1"))).await.unwrap();
        assert!(text.starts_with("Decision: "));
    }

    #[test]
    fn test_builder_requires_provider_and_reference() {
        assert!(matches!(
            ClaimOrchestratorBuilder::new().build(),
            Err(RuntimeError::NotConfigured(_))
        ));
        assert!(matches!(
            ClaimOrchestratorBuilder::new()
                .provider(Arc::new(ScriptedProvider::new()))
                .build(),
            Err(RuntimeError::NotConfigured(_))
        ));
        assert!(ClaimOrchestratorBuilder::new()
            .provider(Arc::new(ScriptedProvider::new()))
            .reference(reference_store())
            .build()
            .is_ok());
    }
}
