//! Error types for query construction and compilation.

use thiserror::Error;

use crate::path::FieldPath;

/// Errors that can occur while building or compiling a variant query.
///
/// Semantic problems (unknown datasets, bad bounds, ...) are never reported
/// through this type; they are collected by the validator instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// The parameter map has a shape that cannot be turned into a query tree.
    #[error("{path}: {message}")]
    Construction {
        /// Location of the offending value.
        path: FieldPath,
        /// Description of the problem.
        message: String,
    },

    /// A location shorthand such as `chr1:100-200` could not be parsed.
    #[error("invalid location at position {position}: {message}")]
    Location {
        /// Byte offset in the input where parsing failed.
        position: usize,
        /// Description of the error.
        message: String,
    },

    /// Compilation met a node that cannot have passed validation.
    #[error("query tree is not valid: {0}")]
    NotValidated(String),

    /// A disease node was compiled without its ontology closure.
    #[error("disease '{0}' has not been resolved against the ontology")]
    UnresolvedDisease(String),
}

impl QueryError {
    /// Creates a construction error at the given path.
    pub fn construction(path: &FieldPath, message: impl Into<String>) -> Self {
        Self::Construction {
            path: path.clone(),
            message: message.into(),
        }
    }
}

/// Result type for query operations.
pub type QueryResult<T> = std::result::Result<T, QueryError>;
