//! # claimcheck-runtime
//!
//! Model-backed claim evaluation.
//!
//! `claimcheck-core` owns the evaluation context and its stages; this crate
//! fills those stages in by calling a language model:
//! - [`StepSequencer`] runs one analysis step per call
//! - [`DecisionRenderer`] turns the completed context into a decision
//! - [`ClaimOrchestrator`] runs both for one record
//! - [`BatchDriver`] runs the orchestrator over a file of records
//!
//! ## Example
//!
//! ```rust,ignore
//! use claimcheck_runtime::{AzureOpenAiProvider, AzureOpenAiSettings, ClaimOrchestratorBuilder};
//!
//! let provider = AzureOpenAiProvider::connect(AzureOpenAiSettings::from_env()?).await?;
//! let orchestrator = ClaimOrchestratorBuilder::new()
//!     .provider(Arc::new(provider))
//!     .reference(Arc::new(ReferenceStore::load("Data")?))
//!     .build()?;
//!
//! let decision = orchestrator.decide(record).await?;
//! ```

use thiserror::Error;

pub mod analyst;
pub mod batch;
pub mod cache;
pub mod config;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod renderer;
pub mod sequencer;
pub mod services;
pub mod usage;

#[cfg(test)]
mod testing;

pub use analyst::{AnalysisError, ClaimAnalyst, LlmAnalyst};
pub use batch::{load_records, BatchDriver, BatchError, BatchReport, BatchSummary, RecordOutcome};
pub use cache::PolicySummaryCache;
pub use config::{ConfigError, RuntimeConfig};
pub use orchestrator::{ClaimOrchestrator, ClaimOrchestratorBuilder};
pub use providers::{ChatMessage, CompletionConfig, LlmProvider, ProviderError};
pub use renderer::DecisionRenderer;
pub use sequencer::StepSequencer;
pub use services::EvaluationServices;
pub use usage::{LlmUsage, UsageMeter};

#[cfg(feature = "azure-openai")]
pub use providers::{AzureOpenAiProvider, AzureOpenAiSettings};

use claimcheck_core::{ContextError, RecordError};

/// Errors from the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid evaluation state: {0}")]
    InvalidState(#[from] ContextError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
