//! Evaluation context: the state threaded through one claim's evaluation.
//!
//! ## Stages
//!
//! | Step | Stage | Next analysis |
//! |------|-------|---------------|
//! | 0 | `AwaitRecordSummary` | record summary |
//! | 1 | `AwaitPolicySummary` | policy summary |
//! | 2 | `AwaitCoverageCheck` | coverage check |
//! | 3 | `Done` | none, ready for the decision |
//!
//! Each stage carries exactly the findings gathered before it, so a field
//! for a later step cannot be populated early and one for an earlier step
//! cannot be missing.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::finding::Finding;
use crate::record::ClaimRecord;

/// Errors from driving the context out of order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Evaluation already complete: no analysis step remains")]
    AlreadyComplete,

    #[error("Step {got} applied while awaiting {expected}")]
    StepMismatch {
        expected: AnalysisStep,
        got: AnalysisStep,
    },

    #[error("Final response recorded before analysis finished (step {step})")]
    NotReady { step: u8 },

    #[error("Final response already recorded")]
    AlreadyRendered,
}

/// The three analysis functions, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisStep {
    SummarizeRecord,
    SummarizePolicy,
    CheckCoverage,
}

impl AnalysisStep {
    pub const ALL: [AnalysisStep; 3] = [
        AnalysisStep::SummarizeRecord,
        AnalysisStep::SummarizePolicy,
        AnalysisStep::CheckCoverage,
    ];

    /// Step counter value at which this analysis runs.
    pub fn index(self) -> u8 {
        match self {
            AnalysisStep::SummarizeRecord => 0,
            AnalysisStep::SummarizePolicy => 1,
            AnalysisStep::CheckCoverage => 2,
        }
    }

    /// Name of the context field this step writes.
    pub fn field(self) -> &'static str {
        match self {
            AnalysisStep::SummarizeRecord => "record_summary",
            AnalysisStep::SummarizePolicy => "policy_summary",
            AnalysisStep::CheckCoverage => "coverage_report",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AnalysisStep::SummarizeRecord => "summarize_patient_record",
            AnalysisStep::SummarizePolicy => "summarize_policy_guideline",
            AnalysisStep::CheckCoverage => "check_claim_coverage",
        }
    }
}

impl fmt::Display for AnalysisStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where an evaluation stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    AwaitRecordSummary,
    AwaitPolicySummary {
        record_summary: Finding,
    },
    AwaitCoverageCheck {
        record_summary: Finding,
        policy_summary: Finding,
    },
    Done {
        record_summary: Finding,
        policy_summary: Finding,
        coverage_report: Finding,
    },
}

impl Stage {
    /// The step counter: number of analyses already applied.
    pub fn step(&self) -> u8 {
        match self {
            Stage::AwaitRecordSummary => 0,
            Stage::AwaitPolicySummary { .. } => 1,
            Stage::AwaitCoverageCheck { .. } => 2,
            Stage::Done { .. } => 3,
        }
    }

    /// The analysis that runs next, or `None` once done.
    pub fn pending(&self) -> Option<AnalysisStep> {
        match self {
            Stage::AwaitRecordSummary => Some(AnalysisStep::SummarizeRecord),
            Stage::AwaitPolicySummary { .. } => Some(AnalysisStep::SummarizePolicy),
            Stage::AwaitCoverageCheck { .. } => Some(AnalysisStep::CheckCoverage),
            Stage::Done { .. } => None,
        }
    }

    /// Apply the finding for `step`, returning the following stage.
    ///
    /// On mismatch the unchanged stage comes back alongside the error.
    fn advance(self, step: AnalysisStep, finding: Finding) -> Result<Stage, (Stage, ContextError)> {
        match (self, step) {
            (Stage::AwaitRecordSummary, AnalysisStep::SummarizeRecord) => {
                Ok(Stage::AwaitPolicySummary {
                    record_summary: finding,
                })
            }
            (Stage::AwaitPolicySummary { record_summary }, AnalysisStep::SummarizePolicy) => {
                Ok(Stage::AwaitCoverageCheck {
                    record_summary,
                    policy_summary: finding,
                })
            }
            (
                Stage::AwaitCoverageCheck {
                    record_summary,
                    policy_summary,
                },
                AnalysisStep::CheckCoverage,
            ) => Ok(Stage::Done {
                record_summary,
                policy_summary,
                coverage_report: finding,
            }),
            (stage, got) => {
                let error = match stage.pending() {
                    Some(expected) => ContextError::StepMismatch { expected, got },
                    None => ContextError::AlreadyComplete,
                };
                Err((stage, error))
            }
        }
    }
}

/// State for one claim's evaluation. Created fresh per record.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    record: ClaimRecord,
    stage: Stage,
    final_response: Option<Finding>,
}

impl EvaluationContext {
    pub fn new(record: ClaimRecord) -> Self {
        Self {
            record,
            stage: Stage::AwaitRecordSummary,
            final_response: None,
        }
    }

    pub fn record(&self) -> &ClaimRecord {
        &self.record
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn step(&self) -> u8 {
        self.stage.step()
    }

    pub fn pending_step(&self) -> Option<AnalysisStep> {
        self.stage.pending()
    }

    /// True once all three analyses have been applied.
    pub fn is_analysis_complete(&self) -> bool {
        self.stage.pending().is_none()
    }

    pub fn record_summary(&self) -> Option<&Finding> {
        self.finding(AnalysisStep::SummarizeRecord)
    }

    pub fn policy_summary(&self) -> Option<&Finding> {
        self.finding(AnalysisStep::SummarizePolicy)
    }

    pub fn coverage_report(&self) -> Option<&Finding> {
        self.finding(AnalysisStep::CheckCoverage)
    }

    pub fn final_response(&self) -> Option<&Finding> {
        self.final_response.as_ref()
    }

    /// The finding written by `step`, if it has run.
    pub fn finding(&self, step: AnalysisStep) -> Option<&Finding> {
        match (&self.stage, step) {
            (Stage::AwaitPolicySummary { record_summary }, AnalysisStep::SummarizeRecord)
            | (Stage::AwaitCoverageCheck { record_summary, .. }, AnalysisStep::SummarizeRecord)
            | (Stage::Done { record_summary, .. }, AnalysisStep::SummarizeRecord) => {
                Some(record_summary)
            }
            (Stage::AwaitCoverageCheck { policy_summary, .. }, AnalysisStep::SummarizePolicy)
            | (Stage::Done { policy_summary, .. }, AnalysisStep::SummarizePolicy) => {
                Some(policy_summary)
            }
            (Stage::Done { coverage_report, .. }, AnalysisStep::CheckCoverage) => {
                Some(coverage_report)
            }
            _ => None,
        }
    }

    /// Record the finding for the pending step and advance by one.
    ///
    /// Blank content is stored as an error finding so that every field of a
    /// completed step is non-empty.
    pub fn apply(&mut self, step: AnalysisStep, finding: Finding) -> Result<(), ContextError> {
        let finding = if finding.is_blank() {
            Finding::error(format!("{} produced no output", step))
        } else {
            finding
        };

        let stage = std::mem::replace(&mut self.stage, Stage::AwaitRecordSummary);
        match stage.advance(step, finding) {
            Ok(next) => {
                self.stage = next;
                Ok(())
            }
            Err((unchanged, error)) => {
                self.stage = unchanged;
                Err(error)
            }
        }
    }

    /// Record the rendered decision. Allowed once, after the last analysis.
    pub fn finish(&mut self, response: Finding) -> Result<(), ContextError> {
        if !self.is_analysis_complete() {
            return Err(ContextError::NotReady { step: self.step() });
        }
        if self.final_response.is_some() {
            return Err(ContextError::AlreadyRendered);
        }
        self.final_response = Some(response);
        Ok(())
    }

    /// Text-form view of the whole context, error markers included.
    pub fn snapshot(&self) -> ContextSnapshot<'_> {
        let render = |finding: Option<&Finding>| finding.map(Finding::render).unwrap_or_default();
        ContextSnapshot {
            record: &self.record,
            record_summary: render(self.record_summary()),
            policy_summary: render(self.policy_summary()),
            coverage_report: render(self.coverage_report()),
            final_response: render(self.final_response()),
            step: self.step(),
        }
    }
}

/// Serializable text-form of an [`EvaluationContext`].
#[derive(Debug, Clone, Serialize)]
pub struct ContextSnapshot<'a> {
    pub record: &'a ClaimRecord,
    pub record_summary: String,
    pub policy_summary: String,
    pub coverage_report: String,
    pub final_response: String,
    pub step: u8,
}
