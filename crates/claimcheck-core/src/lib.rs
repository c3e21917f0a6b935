//! # claimcheck-core
//!
//! Deterministic building blocks for health-insurance claim evaluation.
//!
//! This crate holds everything about a claim evaluation that does not talk
//! to a language model:
//! - Claim records and age derivation
//! - Reference data (policies, code descriptions) and policy lookup
//! - The evaluation context and its stage progression
//! - Findings, which keep real analysis output apart from step failures
//!
//! Model calls live in `claimcheck-runtime`.
//!
//! ## Example
//!
//! ```rust
//! use claimcheck_core::{AnalysisStep, ClaimRecord, EvaluationContext, Finding};
//!
//! let record = ClaimRecord {
//!     patient_id: Some("PAT-001".to_string()),
//!     insurance_policy_id: Some("P1".to_string()),
//!     ..Default::default()
//! };
//!
//! let mut ctx = EvaluationContext::new(record);
//! ctx.apply(AnalysisStep::SummarizeRecord, Finding::content("summary")).unwrap();
//! assert_eq!(ctx.step(), 1);
//! assert_eq!(ctx.pending_step(), Some(AnalysisStep::SummarizePolicy));
//! ```

pub mod context;
pub mod decision;
pub mod finding;
pub mod record;
pub mod reference;

// Re-export main types at crate root
pub use context::{AnalysisStep, ContextError, ContextSnapshot, EvaluationContext, Stage};
pub use decision::DecisionLine;
pub use finding::{Finding, ERROR_MARKER};
pub use record::{calculate_age, ClaimRecord, RecordError};
pub use reference::{
    CodeBook, CoveredProcedure, Policy, ReferenceDocument, ReferenceError, ReferenceStore,
};
