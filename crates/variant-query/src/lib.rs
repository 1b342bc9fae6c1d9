//! # variant-query
//!
//! Query model for genomic variant search: a typed query tree built from a
//! JSON request body, semantic validation with path-qualified messages, and
//! compilation into an Elasticsearch-style query DSL.
//!
//! This crate provides:
//! - **Builder**: turn a request body into a [`VariationSearch`] tree
//! - **Validator**: collect every semantic problem in one pre-order pass
//! - **Compiler**: emit count, search and statistics requests
//!
//! ## Usage
//!
//! ```rust
//! use serde_json::json;
//! use variant_query::{build, DiseaseClosures};
//!
//! let search = build(&json!({
//!     "query": {"and": [
//!         {"type": {"value": ["SNV"]}},
//!         {"not": {"significance": {"value": ["pathogenic"]}}}
//!     ]}
//! })).unwrap();
//!
//! let validated = search.into_validated(None).unwrap();
//! let compiled = validated.compile(&DiseaseClosures::new(), None).unwrap();
//! assert!(compiled.statistics.is_some());
//! ```
//!
//! Disease nodes need their ontology closure before compilation; the
//! `variant-query-executor` crate resolves them.
//!
//! ## Query Keys
//!
//! | Key | Operand | Example |
//! |-----|---------|---------|
//! | `and` / `or` | array of nodes | `{"or": [..]}` |
//! | `not` | node | `{"not": {"type": {"value": ["SNV"]}}}` |
//! | `gene` | symbol and/or HGNC id | `{"gene": {"symbol": "BRCA2"}}` |
//! | `disease` | ontology id | `{"disease": "MONDO_0007254"}` |
//! | `significance` | ClinVar labels | `{"significance": {"value": ["pathogenic"]}}` |
//! | `consequence` | SO terms | `{"consequence": {"value": ["missense_variant"]}}` |
//! | `type` | variation types | `{"type": {"value": ["SNV"]}}` |
//! | `frequency` | dataset + ranges | `{"frequency": {"source": "tommo", "frequency": {"lt": 0.01}}}` |
//! | `location` | region | `{"location": "chr17:7668402-7687550"}` |
//! | `range` | numeric field | `{"range": {"field": "start", "gte": 100}}` |
//! | `terms` | keyword field | `{"terms": {"field": "rs", "value": ["rs123"], "strict": false}}` |

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod ast;
mod builder;
mod compile;
mod debug;
mod error;
pub mod fields;
pub mod location;
mod path;
mod statistics;
mod validation;
pub mod vocabulary;

pub use ast::{
    BoolNode, Bound, Disease, GeneSymbol, Interval, LabelSet, Limits, Location, Node, Offset,
    RangeNode, Sort, SortKey, SortOrder, TermsNode, VariationFrequency, VariationSearch,
};
pub use builder::{build, build_with};
pub use compile::{
    match_all, CompileOptions, CompiledSearch, DiseaseClosure, DiseaseClosures,
};
pub use debug::{DebugEntry, DebugSink, DebugStage};
pub use error::{QueryError, QueryResult};
pub use path::{FieldPath, PathSegment};
pub use statistics::aggregations;
pub use validation::{ValidatedSearch, ValidationMessage, ValidationReport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let _: Option<VariationSearch> = None;
        let _: Option<CompiledSearch> = None;
        let _: Option<ValidationReport> = None;
        let _: Option<DebugSink> = None;
        let _: Option<QueryResult<()>> = None;
    }
}
