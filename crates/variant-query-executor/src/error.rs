//! Error types for search execution.

use thiserror::Error;
use variant_query::{QueryError, ValidationMessage};

use crate::orchestrator::SearchState;

/// Errors raised by the disease ontology collaborator or the resolver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OntologyError {
    /// The ontology index could not be reached.
    #[error("Disease ontology unavailable: {0}")]
    Unavailable(String),

    /// The ontology index answered with data that cannot be used.
    #[error("Malformed ontology data: {0}")]
    Malformed(String),

    /// A descendant closure grew past the configured limit.
    #[error("Closure of {id} too large: more than {limit} descendants")]
    ClosureTooLarge {
        /// Disease whose closure was being expanded.
        id: String,
        /// Configured limit.
        limit: usize,
    },

    /// A node has more direct children than one lookup page can hold.
    #[error("Children of {id} exceed the lookup page size of {page_size}")]
    PageOverflow {
        /// Parent whose children were requested.
        id: String,
        /// Configured page size.
        page_size: usize,
    },
}

/// Result type for ontology operations.
pub type OntologyResult<T> = std::result::Result<T, OntologyError>;

/// Errors raised by the backing search index.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    /// Transport or execution failure.
    #[error("Search index request failed: {0}")]
    Transport(String),

    /// Response could not be interpreted.
    #[error("Malformed search index response: {0}")]
    Malformed(String),
}

/// Result type for search index operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Errors that end a search request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// The request does not match the wire schema.
    #[error("Request does not match the schema: {}", .0.join("; "))]
    SchemaInvalid(Vec<String>),

    /// The query tree could not be built or failed validation.
    #[error("Invalid query: {}", join_messages(.0))]
    ModelInvalid(Vec<ValidationMessage>),

    /// The disease ontology failed during resolution.
    #[error(transparent)]
    OntologyUnavailable(#[from] OntologyError),

    /// The search index failed to answer.
    #[error(transparent)]
    IndexExecution(#[from] IndexError),

    /// The requested API version has no query model.
    #[error("Unsupported schema version: {0}")]
    UnsupportedSchemaVersion(String),

    /// Compilation failed on a tree that passed validation.
    #[error("Query compilation failed: {0}")]
    Compile(QueryError),
}

fn join_messages(messages: &[ValidationMessage]) -> String {
    messages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl SearchError {
    /// Terminal state of a request that ended with this error.
    pub fn terminal_state(&self) -> SearchState {
        if self.is_client_error() {
            SearchState::Rejected
        } else {
            SearchState::Failed
        }
    }

    /// Returns true for errors caused by the request itself.
    ///
    /// Client errors are deterministic and must not be retried.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SearchError::SchemaInvalid(_)
                | SearchError::ModelInvalid(_)
                | SearchError::UnsupportedSchemaVersion(_)
        )
    }

    /// Validation messages rendered as `path: message` strings.
    pub fn messages(&self) -> Vec<String> {
        match self {
            SearchError::SchemaInvalid(messages) => messages.clone(),
            SearchError::ModelInvalid(messages) => {
                messages.iter().map(ToString::to_string).collect()
            }
            other => vec![other.to_string()],
        }
    }
}

impl From<QueryError> for SearchError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Construction { path, message } => {
                SearchError::ModelInvalid(vec![ValidationMessage { path, message }])
            }
            other => SearchError::Compile(other),
        }
    }
}

/// Result type for search operations.
pub type SearchResult<T> = std::result::Result<T, SearchError>;
