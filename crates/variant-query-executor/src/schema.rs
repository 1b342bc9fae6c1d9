//! Built-in structural schema validation.
//!
//! Used when the hosting application has no OpenAPI validator of its own.
//! Only the shape of the request body is checked; the query tree itself is
//! left to the query model.

use serde_json::Value;

use crate::traits::{SchemaValidator, SearchRequest};

const BODY_KEYS: &[&str] = &["query", "offset", "limit", "sort"];

/// Structural validator for search request bodies.
///
/// A missing body is accepted as an empty search. Properties are checked in
/// key order and every violation is reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinSchemaValidator;

impl BuiltinSchemaValidator {
    /// Creates the validator.
    pub fn new() -> Self {
        Self
    }
}

impl SchemaValidator for BuiltinSchemaValidator {
    fn validate(&self, request: &SearchRequest) -> Result<(), Vec<String>> {
        let body = match &request.body {
            Value::Null => return Ok(()),
            Value::Object(body) => body,
            _ => return Err(vec!["body: expected an object".to_string()]),
        };

        let mut errors = Vec::new();
        for (key, value) in body {
            let problem = match key.as_str() {
                "query" if !(value.is_object() || value.is_null()) => Some("expected an object"),
                "offset" if !(value.is_u64() || value.is_array() || value.is_null()) => {
                    Some("expected a non-negative integer or an array")
                }
                "limit" if !(value.is_u64() || value.is_null()) => {
                    Some("expected a non-negative integer")
                }
                "sort" if !(value.is_array() || value.is_null()) => Some("expected an array"),
                k if !BODY_KEYS.contains(&k) => Some("unknown property"),
                _ => None,
            };
            if let Some(problem) = problem {
                errors.push(format!("body.{}: {}", key, problem));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
