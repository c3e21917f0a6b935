//! Prompts for the analysis steps and the final decision.
//!
//! Each step sends a system prompt describing the task and output layout,
//! followed by one user message carrying the step's input. Reference codes
//! travel as JSON so the model can map ICD-10 and CPT codes to descriptions.

use claimcheck_core::{CodeBook, Policy};

use crate::providers::ChatMessage;

/// Record summarization.
pub const RECORD_SUMMARY_PROMPT: &str = r#"
You are a health insurance claim summarization agent.

Read the patient claim record and the reference code mappings, then write a
summary with these seven labeled sections, in this order:

- Patient Demographics: name, gender, age
- Insurance Policy ID
- Diagnoses and Descriptions: every ICD-10 code with its mapped description
- Procedures and Descriptions: every CPT code with its mapped description
- Preauthorization Status: whether preauthorization was required, and whether it was obtained
- Billed Amount (in USD)
- Date of Service

Use the reference code mappings to give every code a human-readable
description. Format the summary as bullet points or clearly separated
labeled sections.
"#;

/// Policy summarization.
pub const POLICY_SUMMARY_PROMPT: &str = r#"
You are a health insurance policy agent.

Read the policy data and write a summary with these labeled sections, in
this order:

- Policy Details: policy ID and plan name
- Covered Procedures: for each covered procedure in the policy, give
  * Procedure code and description (from the CPT mappings)
  * Covered diagnoses and descriptions: ALL diagnosis codes covered for this
    procedure (from the ICD-10 mappings)
  * Gender restriction
  * Age range, with the exact lower and upper bounds
  * Preauthorization requirement
  * Notes on coverage, if any
"#;

/// Coverage check.
pub const COVERAGE_CHECK_PROMPT: &str = r#"
You are a claim validation agent. Evaluate the patient record summary
against the policy summary step by step.

## Coverage Criteria
Approve a procedure only if ALL five conditions hold:
1. Diagnosis match: at least ONE of the patient's diagnosis codes matches ANY
   diagnosis the policy covers for the claimed procedure.
2. The procedure code is explicitly listed in the policy and every condition
   attached to it is satisfied.
3. The patient's age falls within the policy's age range: lower bound
   inclusive, upper bound exclusive.
4. The patient's gender matches the policy's requirement for the procedure.
5. If the policy requires preauthorization, it was obtained.

## Output Format
Three sections:
1. Coverage Review
2. Summary of Findings
3. Final Decision: for each claimed procedure, either "APPROVE" or
   "REVIEW REQUIRED" with a brief explanation.
"#;

/// Instruction appended to the serialized context for the final decision.
pub const DECISION_INSTRUCTION: &str = "Now, extract the final decision and the concise reason for the decision, and present it in the following format:\nDecision: [APPROVE or REVIEW REQUIRED]\nReason: [A concise reason based on the tool's findings].";

pub fn record_summary_messages(record_json: &str, codes: &CodeBook) -> Result<Vec<ChatMessage>, serde_json::Error> {
    let codes = serde_json::to_string(codes)?;
    Ok(vec![
        ChatMessage::system(RECORD_SUMMARY_PROMPT.trim()),
        ChatMessage::user(format!(
            "The patient record is: {}\nThe reference codes are: {}",
            record_json, codes
        )),
    ])
}

pub fn policy_summary_messages(policy: &Policy, codes: &CodeBook) -> Result<Vec<ChatMessage>, serde_json::Error> {
    let policy = serde_json::to_string(policy)?;
    let codes = serde_json::to_string(codes)?;
    Ok(vec![
        ChatMessage::system(POLICY_SUMMARY_PROMPT.trim()),
        ChatMessage::user(format!(
            "The policy data is: {}\nThe reference codes are: {}",
            policy, codes
        )),
    ])
}

pub fn coverage_check_messages(record_summary: &str, policy_summary: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(COVERAGE_CHECK_PROMPT.trim()),
        ChatMessage::user(format!(
            "Patient record summary: {}\nPolicy summary: {}",
            record_summary, policy_summary
        )),
    ]
}

/// The decision prompt: the serialized context, then the format instruction.
pub fn final_decision_messages(context_json: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user(format!(
        "{}\n{}",
        context_json, DECISION_INSTRUCTION
    ))]
}
