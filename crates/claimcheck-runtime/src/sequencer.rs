//! Step sequencer: runs the next analysis step against a context.
//!
//! One call to [`StepSequencer::advance`] runs exactly one analysis and
//! moves the context forward by one stage. A failing analysis is recorded as
//! an error finding and never escapes; only misuse of the context itself
//! (advancing a finished evaluation) is returned as an error.

use std::sync::Arc;

use claimcheck_core::{AnalysisStep, ContextError, EvaluationContext, Finding};

use crate::analyst::{AnalysisError, ClaimAnalyst};

/// Drives an [`EvaluationContext`] through its analysis steps.
#[derive(Clone)]
pub struct StepSequencer {
    analyst: Arc<dyn ClaimAnalyst>,
}

impl StepSequencer {
    pub fn new(analyst: Arc<dyn ClaimAnalyst>) -> Self {
        Self { analyst }
    }

    /// Run the pending step and record its finding.
    ///
    /// Returns the step that ran. Fails with
    /// [`ContextError::AlreadyComplete`] once all steps have run.
    pub async fn advance(&self, ctx: &mut EvaluationContext) -> Result<AnalysisStep, ContextError> {
        let step = ctx.pending_step().ok_or(ContextError::AlreadyComplete)?;

        let finding = match self.run(step, ctx).await {
            Ok(text) => Finding::content(text),
            Err(e) => {
                tracing::warn!(
                    step = %step,
                    patient_id = ctx.record().patient_id.as_deref().unwrap_or("None"),
                    error = %e,
                    "Analysis step failed"
                );
                Finding::error(e)
            }
        };

        ctx.apply(step, finding)?;
        tracing::debug!(step = %step, stage = ctx.step(), "Analysis step applied");
        Ok(step)
    }

    async fn run(&self, step: AnalysisStep, ctx: &EvaluationContext) -> Result<String, AnalysisError> {
        match step {
            AnalysisStep::SummarizeRecord => self.analyst.summarize_record(ctx.record()).await,
            AnalysisStep::SummarizePolicy => {
                let policy_id = ctx
                    .record()
                    .insurance_policy_id
                    .as_deref()
                    .ok_or(AnalysisError::MissingPolicyId)?;
                self.analyst.summarize_policy(policy_id).await
            }
            AnalysisStep::CheckCoverage => {
                let rendered = |finding: Option<&Finding>| finding.map(Finding::render).unwrap_or_default();
                let record_summary = rendered(ctx.record_summary());
                let policy_summary = rendered(ctx.policy_summary());
                self.analyst
                    .check_coverage(&record_summary, &policy_summary)
                    .await
            }
        }
    }
}
