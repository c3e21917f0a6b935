//! Batch driver: evaluates every record of an input file.
//!
//! A record that cannot be decoded, whose evaluation errors, or whose
//! evaluation panics is reported as that record's outcome. The batch always
//! produces one outcome per input record, in input order.

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use thiserror::Error;

use claimcheck_core::{calculate_age, ClaimRecord, DecisionLine, ERROR_MARKER};

use crate::orchestrator::ClaimOrchestrator;
use crate::usage::LlmUsage;

/// Errors reading the batch input.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{0} must contain a JSON array of claim records")]
    NotAnArray(PathBuf),
}

/// Read a JSON array of raw claim records.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<JsonValue>, BatchError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: JsonValue = serde_json::from_str(&contents).map_err(|source| BatchError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        JsonValue::Array(records) => Ok(records),
        _ => Err(BatchError::NotAnArray(path.to_path_buf())),
    }
}

/// What happened to one input record.
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    /// Position in the input
    pub index: usize,
    pub patient_id: Option<String>,
    pub age: Option<i32>,
    /// Final response text, or why the record could not be evaluated
    pub response: Result<String, String>,
}

impl RecordOutcome {
    /// `patient_id, age, response` line. Missing values print as `None`;
    /// a failed record carries `Error processing patient <id>: <error>` in
    /// the response column.
    pub fn report_line(&self) -> String {
        let patient_id = self.patient_id.as_deref().unwrap_or("None");
        let age = display_age(self.age);
        match &self.response {
            Ok(text) => format!("{}, {}, {}", patient_id, age, text),
            Err(e) => format!(
                "{}, {}, Error processing patient {}: {}",
                patient_id, age, patient_id, e
            ),
        }
    }

    pub fn is_failure(&self) -> bool {
        match &self.response {
            Ok(text) => text.starts_with(ERROR_MARKER),
            Err(_) => true,
        }
    }

    /// Decision read from the response, for tallying.
    pub fn decision(&self) -> Option<DecisionLine> {
        match &self.response {
            Ok(text) if !self.is_failure() => DecisionLine::extract(text),
            _ => None,
        }
    }
}

fn display_age(age: Option<i32>) -> String {
    age.map(|a| a.to_string()).unwrap_or_else(|| "None".to_string())
}

/// Tally of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub approved: usize,
    pub review_required: usize,
    /// Responses without a recognizable decision line
    pub unparsed: usize,
    /// Records with no decision at all
    pub failed: usize,
}

impl BatchSummary {
    pub fn tally<'a>(outcomes: impl IntoIterator<Item = &'a RecordOutcome>) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.total += 1;
            if outcome.is_failure() {
                summary.failed += 1;
                continue;
            }
            match outcome.decision() {
                Some(DecisionLine::Approve) => summary.approved += 1,
                Some(DecisionLine::ReviewRequired) => summary.review_required += 1,
                None => summary.unparsed += 1,
            }
        }
        summary
    }
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<RecordOutcome>,
    pub summary: BatchSummary,
    pub usage: LlmUsage,
}

/// Runs the orchestrator over many records.
#[derive(Clone)]
pub struct BatchDriver {
    orchestrator: ClaimOrchestrator,
    concurrency: usize,
}

impl BatchDriver {
    pub fn new(orchestrator: ClaimOrchestrator) -> Self {
        Self {
            orchestrator,
            concurrency: 1,
        }
    }

    /// Evaluate up to `concurrency` records at once. Output order is
    /// unchanged.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn run(&self, records: Vec<JsonValue>) -> BatchReport {
        self.run_with(records, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_outcome` as each outcome
    /// becomes available, in input order.
    pub async fn run_with<F>(&self, records: Vec<JsonValue>, mut on_outcome: F) -> BatchReport
    where
        F: FnMut(&RecordOutcome),
    {
        tracing::info!(
            records = records.len(),
            concurrency = self.concurrency,
            "Num records to process"
        );

        let mut outcomes = Vec::with_capacity(records.len());
        let mut pending = stream::iter(records.into_iter().enumerate())
            .map(|(index, raw)| self.process(index, raw))
            .buffered(self.concurrency);

        while let Some(outcome) = pending.next().await {
            on_outcome(&outcome);
            outcomes.push(outcome);
        }

        let summary = BatchSummary::tally(&outcomes);
        let usage = self.orchestrator.usage();
        tracing::info!(
            total = summary.total,
            approved = summary.approved,
            review_required = summary.review_required,
            unparsed = summary.unparsed,
            failed = summary.failed,
            llm_calls = usage.llm_calls,
            tokens = usage.total_tokens(),
            "Batch complete"
        );

        BatchReport {
            outcomes,
            summary,
            usage,
        }
    }

    async fn process(&self, index: usize, raw: JsonValue) -> RecordOutcome {
        let patient_id = raw_patient_id(&raw);
        let age = raw_age(&raw);

        let response = match ClaimRecord::from_value(raw) {
            Ok(record) => {
                let run = self.orchestrator.decide(record.with_derived_age());
                match AssertUnwindSafe(run).catch_unwind().await {
                    Ok(Ok(text)) => Ok(text),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(panic) => Err(panic_message(panic.as_ref())),
                }
            }
            Err(e) => Err(e.to_string()),
        };

        if let Err(e) = &response {
            tracing::error!(
                index,
                patient_id = patient_id.as_deref().unwrap_or("None"),
                error = %e,
                "Error processing patient"
            );
        }

        RecordOutcome {
            index,
            patient_id,
            age,
            response,
        }
    }
}

fn raw_patient_id(raw: &JsonValue) -> Option<String> {
    match raw.get("patient_id")? {
        JsonValue::Null => None,
        JsonValue::String(id) => Some(id.clone()),
        other => Some(other.to_string()),
    }
}

fn raw_age(raw: &JsonValue) -> Option<i32> {
    let dob = raw.get("date_of_birth")?.as_str()?;
    let dos = raw.get("date_of_service")?.as_str()?;
    calculate_age(dob, dos)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("evaluation panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("evaluation panicked: {}", message)
    } else {
        "evaluation panicked".to_string()
    }
}
