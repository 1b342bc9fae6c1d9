//! Collaborator traits for search execution.
//!
//! The orchestrator talks to three external systems through these traits:
//! a wire-schema validator, the disease ontology index and the variant
//! search index. Concrete clients live in the consuming application; this
//! crate ships an in-memory ontology and a structural schema validator.
//!
//! # Example: Implementing DiseaseOntology
//!
//! ```ignore
//! use async_trait::async_trait;
//! use variant_query_executor::{DiseaseOntology, DiseaseRecord, OntologyResult};
//!
//! struct EsOntology { client: Elasticsearch }
//!
//! #[async_trait]
//! impl DiseaseOntology for EsOntology {
//!     async fn lookup_by_parent(&self, parent_id: &str, limit: usize)
//!         -> OntologyResult<Vec<DiseaseRecord>> {
//!         // term query on `parent`, size = limit
//!     }
//!
//!     async fn lookup_by_id(&self, id: &str) -> OntologyResult<Option<DiseaseRecord>> {
//!         // term query on `id`, size = 1
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{IndexResult, OntologyResult};

// =============================================================================
// Disease ontology
// =============================================================================

/// One node of the disease ontology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseRecord {
    /// Ontology identifier (e.g. `MONDO_0007254`).
    pub id: String,
    /// UMLS concept identifier, if mapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cui: Option<String>,
    /// Preferred label.
    pub label: String,
    /// Identifiers of the direct parents.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// Lookup contract of the disease ontology index.
#[async_trait]
pub trait DiseaseOntology: Send + Sync {
    /// Returns the direct children of `parent_id`, at most `limit` of them.
    async fn lookup_by_parent(
        &self,
        parent_id: &str,
        limit: usize,
    ) -> OntologyResult<Vec<DiseaseRecord>>;

    /// Returns the record for `id`, or `None` if the index has no such node.
    async fn lookup_by_id(&self, id: &str) -> OntologyResult<Option<DiseaseRecord>>;
}

// =============================================================================
// Search index
// =============================================================================

/// Answer to a search or statistics request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexResponse {
    /// Total number of matching records.
    pub total: u64,
    /// Returned documents, in sort order.
    #[serde(default)]
    pub records: Vec<Value>,
    /// Aggregation results keyed by aggregation name.
    #[serde(default)]
    pub aggregations: Map<String, Value>,
}

/// Query contract of the backing variant index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Counts the records matched by a count request (`{"query": ..}`).
    async fn count(&self, request: &Value) -> IndexResult<u64>;

    /// Runs a search or statistics request.
    async fn search(&self, request: &Value) -> IndexResult<IndexResponse>;
}

// =============================================================================
// Schema validation
// =============================================================================

/// An incoming API request, as seen by the schema validator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// API version requested by the client; `None` selects the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Query string parameters.
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Request headers.
    #[serde(default)]
    pub headers: Map<String, Value>,
    /// JSON body.
    #[serde(default)]
    pub body: Value,
}

impl SearchRequest {
    /// Creates a `POST /search` request carrying `body`.
    pub fn post(body: Value) -> Self {
        Self {
            method: "POST".to_string(),
            path: "/search".to_string(),
            body,
            ..Self::default()
        }
    }

    /// Sets the requested API version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Wire-schema validation contract.
///
/// Returns every schema violation found, in a stable order.
pub trait SchemaValidator: Send + Sync {
    /// Validates the request against the API schema.
    fn validate(&self, request: &SearchRequest) -> Result<(), Vec<String>>;
}
