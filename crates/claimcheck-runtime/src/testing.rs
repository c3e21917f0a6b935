//! Test doubles shared by the runtime's unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use claimcheck_core::{ClaimRecord, ReferenceStore};

use crate::analyst::{AnalysisError, ClaimAnalyst};
use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};
use crate::services::EvaluationServices;

const POLICIES: &str = r#"[
    {
        "policy_id": "P1",
        "plan_name": "Basic Health",
        "covered_procedures": [
            {
                "procedure_code": "99213",
                "covered_diagnoses": ["E11.9", "I10"],
                "gender_restriction": "Any",
                "age_range": [18, 65],
                "requires_preauthorization": false
            }
        ]
    }
]"#;

const CODES: &str = r#"{
    "ICD10": { "E11.9": "Type 2 diabetes mellitus without complications", "I10": "Essential hypertension" },
    "CPT": { "99213": "Established patient office visit" }
}"#;

pub fn reference_store() -> Arc<ReferenceStore> {
    Arc::new(ReferenceStore::from_json(POLICIES, CODES).expect("test reference data"))
}

pub fn services() -> EvaluationServices {
    EvaluationServices::new(Arc::new(ScriptedProvider::new()), reference_store())
}

/// Answers like a claims desk would, keyed on the system prompt.
///
/// The final decision is REVIEW REQUIRED whenever the serialized context
/// carries an error marker, APPROVE otherwise.
pub struct ScriptedProvider {
    silent: bool,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self { silent: false }
    }

    /// Returns empty content for every call.
    pub fn silent() -> Self {
        Self { silent: true }
    }

    fn reply(messages: &[ChatMessage]) -> String {
        let system = messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str());
        let user = messages
            .iter()
            .filter(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        match system {
            Some(prompt) if prompt.contains("claim summarization agent") => {
                "- Patient Demographics: Jane Doe, F, 44\n- Insurance Policy ID: P1\n- Diagnoses and Descriptions: E11.9 Type 2 diabetes".to_string()
            }
            Some(prompt) if prompt.contains("policy agent") => {
                "- Policy Details: P1, Basic Health\n- Covered Procedures: 99213 for E11.9, I10, ages 18-65".to_string()
            }
            Some(prompt) if prompt.contains("claim validation agent") => {
                "1. Coverage Review: all five criteria met\n2. Summary of Findings: covered\n3. Final Decision: 99213 APPROVE".to_string()
            }
            _ if user.contains("\"Error: ") => {
                "Decision: REVIEW REQUIRED\nReason: One or more analysis steps failed.".to_string()
            }
            _ => "Decision: APPROVE\nReason: Diagnosis, age and preauthorization requirements are met.".to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let content = if self.silent {
            String::new()
        } else {
            Self::reply(&messages)
        };

        Ok(CompletionResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 20,
            },
            model: "scripted".to_string(),
            stop_reason: Some("stop".to_string()),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Every call fails with a connection error.
pub struct FailingProvider;

#[async_trait]
impl LlmProvider for FailingProvider {
    async fn complete(
        &self,
        _messages: Vec<ChatMessage>,
        _config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        Err(ProviderError::HttpError("connection refused".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Every analysis fails with the same message.
pub struct FailingAnalyst {
    message: String,
}

impl FailingAnalyst {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn fail(&self) -> Result<String, AnalysisError> {
        Err(AnalysisError::Provider(ProviderError::HttpError(
            self.message.clone(),
        )))
    }
}

#[async_trait]
impl ClaimAnalyst for FailingAnalyst {
    async fn summarize_record(&self, _record: &ClaimRecord) -> Result<String, AnalysisError> {
        self.fail()
    }

    async fn summarize_policy(&self, _policy_id: &str) -> Result<String, AnalysisError> {
        self.fail()
    }

    async fn check_coverage(&self, _r: &str, _p: &str) -> Result<String, AnalysisError> {
        self.fail()
    }
}

/// Fails policy summaries and remembers what the coverage check received.
pub struct RecordingAnalyst {
    coverage_inputs: Mutex<Option<(String, String)>>,
}

impl RecordingAnalyst {
    pub fn failing_policy() -> Self {
        Self {
            coverage_inputs: Mutex::new(None),
        }
    }

    pub fn coverage_inputs(&self) -> Option<(String, String)> {
        self.coverage_inputs.lock().clone()
    }
}

#[async_trait]
impl ClaimAnalyst for RecordingAnalyst {
    async fn summarize_record(&self, _record: &ClaimRecord) -> Result<String, AnalysisError> {
        Ok("record summary".to_string())
    }

    async fn summarize_policy(&self, policy_id: &str) -> Result<String, AnalysisError> {
        Err(AnalysisError::PolicyNotFound(policy_id.to_string()))
    }

    async fn check_coverage(
        &self,
        record_summary: &str,
        policy_summary: &str,
    ) -> Result<String, AnalysisError> {
        *self.coverage_inputs.lock() = Some((record_summary.to_string(), policy_summary.to_string()));
        Ok("coverage report".to_string())
    }
}

/// Panics while summarizing the record of `patient_id`; otherwise returns
/// canned text.
pub struct PanickingAnalyst {
    patient_id: &'static str,
}

impl PanickingAnalyst {
    pub fn on(patient_id: &'static str) -> Self {
        Self { patient_id }
    }
}

#[async_trait]
impl ClaimAnalyst for PanickingAnalyst {
    async fn summarize_record(&self, record: &ClaimRecord) -> Result<String, AnalysisError> {
        if record.patient_id.as_deref() == Some(self.patient_id) {
            panic!("analyst blew up on {}", self.patient_id);
        }
        Ok("record summary".to_string())
    }

    async fn summarize_policy(&self, _policy_id: &str) -> Result<String, AnalysisError> {
        Ok("policy summary".to_string())
    }

    async fn check_coverage(&self, _r: &str, _p: &str) -> Result<String, AnalysisError> {
        Ok("coverage report".to_string())
    }
}
