//! Token usage accounting across model calls.

use parking_lot::Mutex;
use serde::Serialize;

use crate::providers::TokenUsage;

/// Accumulated model usage for a run or batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LlmUsage {
    /// Prompt/input tokens
    pub prompt_tokens: u64,

    /// Completion/output tokens
    pub completion_tokens: u64,

    /// Calls that returned a response
    pub llm_calls: u32,

    /// Calls that ended in a provider error
    pub failed_calls: u32,
}

impl LlmUsage {
    /// Add token usage from a provider response.
    pub fn add(&mut self, usage: &TokenUsage) {
        self.prompt_tokens += u64::from(usage.prompt_tokens);
        self.completion_tokens += u64::from(usage.completion_tokens);
        self.llm_calls += 1;
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Thread-safe usage accumulator shared by every analyst of a process.
#[derive(Debug, Default)]
pub struct UsageMeter {
    usage: Mutex<LlmUsage>,
}

impl UsageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, usage: &TokenUsage) {
        self.usage.lock().add(usage);
    }

    pub fn record_failure(&self) {
        self.usage.lock().failed_calls += 1;
    }

    /// Copy of the usage so far.
    pub fn snapshot(&self) -> LlmUsage {
        self.usage.lock().clone()
    }
}
