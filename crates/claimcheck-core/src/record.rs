//! Claim records as submitted for evaluation.
//!
//! A record is mostly free-form: the fields the evaluation reads are typed,
//! everything else is kept verbatim in `extra` so that the model sees the
//! record as it was submitted. A known field holding a value of the wrong
//! JSON type is not an error; it stays in `extra` untouched and the typed
//! field is left empty.

use chrono::{Datelike, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

/// Errors from decoding a raw claim record.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Claim record must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// A single patient claim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    /// ISO-8601 date (`YYYY-MM-DD`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,

    /// ISO-8601 date (`YYYY-MM-DD`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_service: Option<String>,

    /// Full years between birth and service; derived, never trusted from input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance_policy_id: Option<String>,

    /// ICD-10 codes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnosis_codes: Vec<String>,

    /// CPT codes
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub procedure_codes: Vec<String>,

    /// Billed amount in USD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billed_amount: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preauthorization_required: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preauthorization_obtained: Option<bool>,

    /// Any other submitted fields, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl ClaimRecord {
    /// Decode a record from a raw JSON value.
    ///
    /// Only a non-object fails. Any incoming `age` is discarded; call
    /// [`with_derived_age`](Self::with_derived_age) to fill it from the dates.
    pub fn from_value(value: JsonValue) -> Result<Self, RecordError> {
        let mut fields = match value {
            JsonValue::Object(fields) => fields,
            other => return Err(RecordError::NotAnObject(json_kind(&other))),
        };
        fields.remove("age");

        let patient_id = take_id(&mut fields, "patient_id");
        let name = take(&mut fields, "name");
        let gender = take(&mut fields, "gender");
        let date_of_birth = take(&mut fields, "date_of_birth");
        let date_of_service = take(&mut fields, "date_of_service");
        let insurance_policy_id = take_id(&mut fields, "insurance_policy_id");
        let diagnosis_codes = take::<Vec<String>>(&mut fields, "diagnosis_codes").unwrap_or_default();
        let procedure_codes = take::<Vec<String>>(&mut fields, "procedure_codes").unwrap_or_default();
        let billed_amount = take(&mut fields, "billed_amount");
        let preauthorization_required = take(&mut fields, "preauthorization_required");
        let preauthorization_obtained = take(&mut fields, "preauthorization_obtained");

        Ok(Self {
            patient_id,
            name,
            gender,
            date_of_birth,
            date_of_service,
            age: None,
            insurance_policy_id,
            diagnosis_codes,
            procedure_codes,
            billed_amount,
            preauthorization_required,
            preauthorization_obtained,
            extra: fields,
        })
    }

    /// Recompute `age` from the record's dates.
    ///
    /// Missing or unparseable dates clear the field rather than failing.
    pub fn with_derived_age(mut self) -> Self {
        self.age = match (&self.date_of_birth, &self.date_of_service) {
            (Some(dob), Some(dos)) => calculate_age(dob, dos),
            _ => None,
        };
        self
    }

    /// Serialize the record for inclusion in a prompt.
    pub fn to_prompt_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Full years elapsed between `date_of_birth` and `date_of_service`.
///
/// Both dates are ISO-8601 (`YYYY-MM-DD`). The count drops by one when the
/// service month/day falls before the birth month/day. Returns `None` for
/// anything that does not parse.
pub fn calculate_age(date_of_birth: &str, date_of_service: &str) -> Option<i32> {
    let dob = parse_iso_date(date_of_birth)?;
    let dos = parse_iso_date(date_of_service)?;

    let mut age = dos.year() - dob.year();
    if (dos.month(), dos.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    Some(age)
}

fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Move `key` into a typed value, or leave it in `fields` if it does not fit.
fn take<T: DeserializeOwned>(fields: &mut Map<String, JsonValue>, key: &str) -> Option<T> {
    let value = fields.remove(key)?;
    match T::deserialize(&value) {
        Ok(typed) => Some(typed),
        Err(_) => {
            fields.insert(key.to_string(), value);
            None
        }
    }
}

/// Identifiers may be submitted as strings or numbers.
fn take_id(fields: &mut Map<String, JsonValue>, key: &str) -> Option<String> {
    if let Some(JsonValue::Number(n)) = fields.get(key) {
        let id = n.to_string();
        fields.remove(key);
        return Some(id);
    }
    take(fields, key)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
