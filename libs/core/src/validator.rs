//! JSON Schema validation of event payloads.
//!
//! Keyword evaluation is delegated to the `jsonschema` crate; this module only
//! turns its output into [`ValidationOutcome`] values the pipeline can act on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// JSON pointer into the payload ("" for the payload root).
    pub path: String,

    pub message: String,

    /// JSON pointer into the schema of the keyword that failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,
}

/// Result of validating a payload against a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub valid: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationIssue>,
}

impl ValidationOutcome {
    fn passed() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    fn failed(errors: Vec<ValidationIssue>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/// Validates payloads against JSON Schema documents.
#[derive(Debug, Clone, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Validates `data` against `schema`, collecting every violation.
    ///
    /// A schema that does not compile is reported as a single issue at the
    /// payload root rather than as an error.
    pub fn validate(&self, schema: &Value, data: &Value) -> ValidationOutcome {
        let compiled = match jsonschema::validator_for(schema) {
            Ok(compiled) => compiled,
            Err(e) => {
                return ValidationOutcome::failed(vec![ValidationIssue {
                    path: String::new(),
                    message: format!("Invalid schema: {e}"),
                    schema_path: None,
                }]);
            }
        };

        let errors: Vec<ValidationIssue> = compiled
            .iter_errors(data)
            .map(|error| ValidationIssue {
                path: error.instance_path.to_string(),
                message: error.to_string(),
                schema_path: Some(error.schema_path.to_string()),
            })
            .collect();

        if errors.is_empty() {
            ValidationOutcome::passed()
        } else {
            ValidationOutcome::failed(errors)
        }
    }

    /// Renders issues one per line as `Path <pointer>: <message>`.
    pub fn format_errors(errors: &[ValidationIssue]) -> String {
        errors
            .iter()
            .map(|issue| {
                if issue.path.is_empty() {
                    issue.message.clone()
                } else {
                    format!("Path {}: {}", issue.path, issue.message)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
