//! Reference data: insurance policies and medical code descriptions.
//!
//! Loaded once before any claim is evaluated and read-only afterwards.
//! Both documents are checked against embedded JSON Schemas on load.

mod schema;

pub use schema::{validate_document, ReferenceDocument};

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

/// Errors from loading reference data.
#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Failed to read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {file}: {source}")]
    Json {
        file: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{file} failed schema validation: {}", .errors.join("; "))]
    Schema {
        file: &'static str,
        errors: Vec<String>,
    },

    #[error("Duplicate policy id: {0}")]
    DuplicatePolicy(String),
}

/// One procedure a policy covers, with its conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveredProcedure {
    /// CPT code
    pub procedure_code: String,

    /// ICD-10 codes for which this procedure is covered
    #[serde(default)]
    pub covered_diagnoses: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender_restriction: Option<String>,

    /// `[lower, upper)` in years
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<[u32; 2]>,

    #[serde(default)]
    pub requires_preauthorization: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// An insurance policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub policy_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,

    #[serde(default)]
    pub covered_procedures: Vec<CoveredProcedure>,

    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Code to human-readable description, across all code systems.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CodeBook {
    entries: BTreeMap<String, String>,
}

impl CodeBook {
    /// Build from either a flat `code -> description` object or one grouped
    /// by code system (`{"ICD10": {...}, "CPT": {...}}`). Groups are merged.
    fn from_value(value: &JsonValue) -> Self {
        let mut entries = BTreeMap::new();
        if let Some(object) = value.as_object() {
            for (key, entry) in object {
                match entry {
                    JsonValue::String(description) => {
                        entries.insert(key.clone(), description.clone());
                    }
                    JsonValue::Object(group) => {
                        for (code, description) in group {
                            if let Some(description) = description.as_str() {
                                entries.insert(code.clone(), description.to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for CodeBook {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Read-only store of policies and code descriptions.
#[derive(Debug, Clone, Default)]
pub struct ReferenceStore {
    policies: Vec<Policy>,
    codes: CodeBook,
}

impl ReferenceStore {
    /// Build a store from already-parsed parts.
    pub fn new(policies: Vec<Policy>, codes: CodeBook) -> Result<Self, ReferenceError> {
        let mut seen = HashSet::new();
        for policy in &policies {
            if !seen.insert(policy.policy_id.as_str()) {
                return Err(ReferenceError::DuplicatePolicy(policy.policy_id.clone()));
            }
        }
        Ok(Self { policies, codes })
    }

    /// Load `policies.json` and `diagnosis_codes.json` from a directory.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, ReferenceError> {
        let data_dir = data_dir.as_ref();
        let policies = read_document(data_dir, ReferenceDocument::Policies)?;
        let codes = read_document(data_dir, ReferenceDocument::Codes)?;
        let store = Self::from_values(&policies, &codes)?;

        tracing::info!(
            data_dir = %data_dir.display(),
            policies = store.policies.len(),
            codes = store.codes.len(),
            "Loaded reference data"
        );
        Ok(store)
    }

    /// Parse both documents from JSON strings.
    pub fn from_json(policies: &str, codes: &str) -> Result<Self, ReferenceError> {
        let policies = parse_document(policies, ReferenceDocument::Policies)?;
        let codes = parse_document(codes, ReferenceDocument::Codes)?;
        Self::from_values(&policies, &codes)
    }

    fn from_values(policies: &JsonValue, codes: &JsonValue) -> Result<Self, ReferenceError> {
        for (document, value) in [
            (ReferenceDocument::Policies, policies),
            (ReferenceDocument::Codes, codes),
        ] {
            validate_document(document, value).map_err(|errors| ReferenceError::Schema {
                file: document.file_name(),
                errors,
            })?;
        }

        let parsed: Vec<Policy> =
            serde_json::from_value(policies.clone()).map_err(|source| ReferenceError::Json {
                file: ReferenceDocument::Policies.file_name(),
                source,
            })?;

        Self::new(parsed, CodeBook::from_value(codes))
    }

    /// Find a policy by id. Linear scan; the policy set is small and static.
    pub fn policy(&self, policy_id: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.policy_id == policy_id)
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn codes(&self) -> &CodeBook {
        &self.codes
    }
}

fn read_document(dir: &Path, document: ReferenceDocument) -> Result<JsonValue, ReferenceError> {
    let path = dir.join(document.file_name());
    let contents = fs::read_to_string(&path).map_err(|source| ReferenceError::Io {
        file: path.display().to_string(),
        source,
    })?;
    parse_document(&contents, document)
}

fn parse_document(contents: &str, document: ReferenceDocument) -> Result<JsonValue, ReferenceError> {
    serde_json::from_str(contents).map_err(|source| ReferenceError::Json {
        file: document.file_name(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

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
                    "requires_preauthorization": false,
                    "notes": "Office visits only"
                }
            ]
        },
        { "policy_id": "P2", "plan_name": "Women's Health" }
    ]"#;

    const CODES: &str = r#"{
        "ICD10": { "E11.9": "Type 2 diabetes mellitus without complications" },
        "CPT": { "99213": "Established patient office visit" }
    }"#;

    #[test]
    fn test_lookup_by_id() {
        let store = ReferenceStore::from_json(POLICIES, CODES).unwrap();
        let policy = store.policy("P1").unwrap();
        assert_eq!(policy.plan_name.as_deref(), Some("Basic Health"));
        assert_eq!(policy.covered_procedures[0].age_range, Some([18, 65]));
        assert_eq!(store.policies().len(), 2);
    }

    #[test]
    fn test_lookup_miss_is_none() {
        let store = ReferenceStore::from_json(POLICIES, CODES).unwrap();
        assert!(store.policy("P404").is_none());
    }

    #[test]
    fn test_grouped_codes_are_merged() {
        let store = ReferenceStore::from_json(POLICIES, CODES).unwrap();
        assert_eq!(store.codes().len(), 2);
        let flattened = serde_json::to_value(store.codes()).unwrap();
        assert_eq!(flattened["99213"], "Established patient office visit");
    }

    #[test]
    fn test_null_optional_fields_load_as_none() {
        let policies = r#"[{
            "policy_id": "P3",
            "plan_name": null,
            "covered_procedures": [{
                "procedure_code": "99213",
                "gender_restriction": null,
                "age_range": null,
                "notes": null
            }]
        }]"#;
        let store = ReferenceStore::from_json(policies, "{}").unwrap();
        let policy = store.policy("P3").unwrap();
        assert_eq!(policy.plan_name, None);
        let procedure = &policy.covered_procedures[0];
        assert_eq!(procedure.gender_restriction, None);
        assert_eq!(procedure.age_range, None);
        assert_eq!(procedure.notes, None);
    }

    #[test]
    fn test_duplicate_policy_rejected() {
        let policies = r#"[{ "policy_id": "P1" }, { "policy_id": "P1" }]"#;
        let result = ReferenceStore::from_json(policies, "{}");
        assert!(matches!(result, Err(ReferenceError::DuplicatePolicy(id)) if id == "P1"));
    }

    #[test]
    fn test_schema_violation_reported() {
        let result = ReferenceStore::from_json(r#"{"policy_id": "P1"}"#, "{}");
        match result {
            Err(ReferenceError::Schema { file, errors }) => {
                assert_eq!(file, "policies.json");
                assert!(!errors.is_empty());
            }
            other => panic!("Expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_directory() {
        let result = ReferenceStore::load("/nonexistent/claimcheck-data");
        assert!(matches!(result, Err(ReferenceError::Io { .. })));
    }
}
