//! # variant-query-executor
//!
//! Search orchestration for the [`variant-query`] model.
//!
//! This crate runs one search request end to end: wire-schema check, query
//! tree construction and validation, disease closure resolution against an
//! ontology, compilation, and concurrent count/search/statistics requests
//! against a backing index.
//!
//! ## Key Features
//!
//! - **Collaborator traits** - plug in any schema validator, ontology or index
//! - **Level-batched ontology walks** - one round of lookups per hierarchy level
//! - **Closure cache** - optional LRU + TTL cache of disease closures
//! - **Explicit state machine** - every request ends `Responded`, `Rejected` or `Failed`
//!
//! ## Quick Start
//!
//! ```ignore
//! use serde_json::json;
//! use variant_query_executor::{
//!     BuiltinSchemaValidator, InMemoryOntology, SearchExecutor, SearchRequest,
//! };
//!
//! let ontology = InMemoryOntology::from_json_file("mondo.json")?;
//! let index = MyElasticsearchIndex::connect(url).await?;
//! let executor = SearchExecutor::new(&BuiltinSchemaValidator, &ontology, &index);
//!
//! let request = SearchRequest::post(json!({
//!     "query": {"disease": {"id": "MONDO_0005148"}}
//! }));
//! let outcome = executor.execute(&request, None).await?;
//! println!("{} variants", outcome.filtered_total);
//! ```
//!
//! ## With Configuration
//!
//! ```ignore
//! use variant_query_executor::{CacheConfig, OntologyConfig, SearchConfig, SearchExecutor};
//!
//! let config = SearchConfig::builder()
//!     .with_limits(100, 1_000)
//!     .with_ontology(
//!         OntologyConfig::default()
//!             .with_cache(CacheConfig::default())
//!             .with_max_closure_size(50_000),
//!     )
//!     .build();
//!
//! let executor = SearchExecutor::with_config(&schema, &ontology, &index, config);
//! ```
//!
//! ## Error Mapping
//!
//! | Error | Terminal state | Client error |
//! |-------|----------------|--------------|
//! | `SchemaInvalid` | `Rejected` | Yes |
//! | `ModelInvalid` | `Rejected` | Yes |
//! | `UnsupportedSchemaVersion` | `Rejected` | Yes |
//! | `OntologyUnavailable` | `Failed` | No |
//! | `IndexExecution` | `Failed` | No |
//! | `Compile` | `Failed` | No |
//!
//! [`variant-query`]: variant_query

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod cache;
mod config;
mod error;
mod memory;
mod ontology;
mod orchestrator;
mod result;
mod schema;
mod traits;

// Public re-exports
pub use cache::{CacheStats, ClosureCache};
pub use config::{CacheConfig, ConfigError, OntologyConfig, SearchConfig, SearchConfigBuilder};
pub use error::{
    IndexError, IndexResult, OntologyError, OntologyResult, SearchError, SearchResult,
};
pub use memory::InMemoryOntology;
pub use ontology::{well_known, DiseaseInspection, DiseaseOntologyResolver};
pub use orchestrator::{SearchExecutor, SearchState};
pub use result::{ExecutionStats, SearchOutcome};
pub use schema::BuiltinSchemaValidator;
pub use traits::{
    DiseaseOntology, DiseaseRecord, IndexResponse, SchemaValidator, SearchIndex, SearchRequest,
};
