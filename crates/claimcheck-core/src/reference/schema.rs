//! JSON Schema validation for reference data files.
//!
//! Both schemas are embedded at compile time and compiled once on first use.

use std::sync::OnceLock;

const POLICIES_SCHEMA_JSON: &str = include_str!("../../schemas/policies.schema.json");
const CODES_SCHEMA_JSON: &str = include_str!("../../schemas/codes.schema.json");

static POLICIES_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();
static CODES_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Which reference document is being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceDocument {
    Policies,
    Codes,
}

impl ReferenceDocument {
    pub fn file_name(self) -> &'static str {
        match self {
            ReferenceDocument::Policies => "policies.json",
            ReferenceDocument::Codes => "diagnosis_codes.json",
        }
    }
}

fn compile(source: &str) -> Result<jsonschema::Validator, String> {
    let schema_value: serde_json::Value =
        serde_json::from_str(source).map_err(|e| format!("Invalid schema JSON: {}", e))?;

    jsonschema::options()
        .build(&schema_value)
        .map_err(|e| format!("Failed to compile schema: {}", e))
}

fn validator(document: ReferenceDocument) -> Result<&'static jsonschema::Validator, String> {
    let compiled = match document {
        ReferenceDocument::Policies => POLICIES_SCHEMA.get_or_init(|| compile(POLICIES_SCHEMA_JSON)),
        ReferenceDocument::Codes => CODES_SCHEMA.get_or_init(|| compile(CODES_SCHEMA_JSON)),
    };
    compiled.as_ref().map_err(|e| e.clone())
}

/// Validate a reference document against its schema.
///
/// Returns every violation found, formatted as `<message> at <path>`.
pub fn validate_document(
    document: ReferenceDocument,
    value: &serde_json::Value,
) -> Result<(), Vec<String>> {
    let validator = validator(document).map_err(|e| vec![e])?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_policies_pass() {
        let value = serde_json::json!([
            {
                "policy_id": "P1",
                "plan_name": "Basic Health",
                "covered_procedures": [
                    {
                        "procedure_code": "99213",
                        "covered_diagnoses": ["E11.9"],
                        "gender_restriction": "Any",
                        "age_range": [18, 65],
                        "requires_preauthorization": false
                    }
                ]
            }
        ]);
        assert!(validate_document(ReferenceDocument::Policies, &value).is_ok());
    }

    #[test]
    fn test_null_optional_fields_pass() {
        let value = serde_json::json!([
            {
                "policy_id": "P1",
                "plan_name": null,
                "covered_procedures": [
                    {
                        "procedure_code": "99213",
                        "gender_restriction": null,
                        "age_range": null,
                        "notes": null
                    }
                ]
            }
        ]);
        assert!(validate_document(ReferenceDocument::Policies, &value).is_ok());
    }

    #[test]
    fn test_policy_without_id_fails() {
        let value = serde_json::json!([{ "plan_name": "No id" }]);
        let errors = validate_document(ReferenceDocument::Policies, &value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_bad_age_range_fails() {
        let value = serde_json::json!([
            {
                "policy_id": "P1",
                "covered_procedures": [{ "procedure_code": "99213", "age_range": [18] }]
            }
        ]);
        assert!(validate_document(ReferenceDocument::Policies, &value).is_err());
    }

    #[test]
    fn test_flat_and_grouped_codes_pass() {
        let flat = serde_json::json!({ "E11.9": "Type 2 diabetes" });
        let grouped = serde_json::json!({
            "ICD10": { "E11.9": "Type 2 diabetes" },
            "CPT": { "99213": "Office visit" }
        });
        assert!(validate_document(ReferenceDocument::Codes, &flat).is_ok());
        assert!(validate_document(ReferenceDocument::Codes, &grouped).is_ok());
    }

    #[test]
    fn test_codes_must_be_strings() {
        let value = serde_json::json!({ "E11.9": 42 });
        assert!(validate_document(ReferenceDocument::Codes, &value).is_err());
    }
}
