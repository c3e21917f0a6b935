//! Decision renderer: one final model call over the completed context.

use claimcheck_core::{ContextError, EvaluationContext, Finding};

use crate::analyst::AnalysisError;
use crate::prompts;
use crate::services::EvaluationServices;

const RENDER_CALL: &str = "final_decision";

/// Produces the `final_response` of a completed evaluation.
#[derive(Debug, Clone)]
pub struct DecisionRenderer {
    services: EvaluationServices,
}

impl DecisionRenderer {
    pub fn new(services: EvaluationServices) -> Self {
        Self { services }
    }

    /// Render the decision and store it on the context.
    ///
    /// The model's reply is stored verbatim. A failed call is stored as an
    /// error finding; only calling this before the analysis steps finished
    /// (or twice) is an error.
    pub async fn render(&self, ctx: &mut EvaluationContext) -> Result<(), ContextError> {
        if !ctx.is_analysis_complete() {
            return Err(ContextError::NotReady { step: ctx.step() });
        }

        let response = match self.request(ctx).await {
            Ok(text) => Finding::content(text),
            Err(e) => {
                tracing::warn!(
                    patient_id = ctx.record().patient_id.as_deref().unwrap_or("None"),
                    error = %e,
                    "Final decision failed"
                );
                Finding::error(e)
            }
        };

        ctx.finish(response)
    }

    async fn request(&self, ctx: &EvaluationContext) -> Result<String, AnalysisError> {
        let context_json = serde_json::to_string(&ctx.snapshot())?;
        self.services
            .complete(RENDER_CALL, prompts::final_decision_messages(&context_json))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{reference_store, services, FailingProvider};
    use claimcheck_core::{AnalysisStep, ClaimRecord};
    use std::sync::Arc;

    fn completed(finding: Finding) -> EvaluationContext {
        let mut ctx = EvaluationContext::new(ClaimRecord {
            patient_id: Some("PAT-001".to_string()),
            ..Default::default()
        });
        for step in AnalysisStep::ALL {
            ctx.apply(step, finding.clone()).unwrap();
        }
        ctx
    }

    #[tokio::test]
    async fn test_render_stores_response() {
        let renderer = DecisionRenderer::new(services());
        let mut ctx = completed(Finding::content("all criteria met"));
        renderer.render(&mut ctx).await.unwrap();

        let response = ctx.final_response().unwrap().render();
        assert!(response.contains("Decision: APPROVE"));
    }

    #[tokio::test]
    async fn test_error_markers_reach_the_prompt() {
        let renderer = DecisionRenderer::new(services());
        let mut ctx = completed(Finding::error("P9 not found"));
        renderer.render(&mut ctx).await.unwrap();

        let response = ctx.final_response().unwrap().render();
        assert!(response.contains("REVIEW REQUIRED"));
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_error_marker() {
        let services = EvaluationServices::new(Arc::new(FailingProvider), reference_store());
        let renderer = DecisionRenderer::new(services);
        let mut ctx = completed(Finding::content("ok"));
        renderer.render(&mut ctx).await.unwrap();

        let response = ctx.final_response().unwrap();
        assert!(response.is_error());
        assert!(response.render().starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_render_before_done_rejected() {
        let renderer = DecisionRenderer::new(services());
        let mut ctx = EvaluationContext::new(ClaimRecord::default());
        assert_eq!(
            renderer.render(&mut ctx).await,
            Err(ContextError::NotReady { step: 0 })
        );
    }
}
