//! Aggregation-only derivative of a compiled search request.
//!
//! The statistics request reuses the search request's `query` untouched, so
//! both always select the same records. Only paging and sort directives are
//! removed and the aggregation block is added.

use serde_json::{json, Value};

use crate::compile::DiseaseClosures;
use crate::error::QueryResult;
use crate::fields;
use crate::validation::ValidatedSearch;
use crate::vocabulary;

/// Directives that only affect which page of hits is returned.
const PAGING_KEYS: &[&str] = &["from", "size", "sort", "search_after", "track_total_hits"];

/// Allele frequency buckets reported per dataset.
const FREQUENCY_BUCKETS: &[(Option<f64>, Option<f64>)] = &[
    (None, Some(0.0001)),
    (Some(0.0001), Some(0.001)),
    (Some(0.001), Some(0.01)),
    (Some(0.01), Some(0.05)),
    (Some(0.05), Some(0.5)),
    (Some(0.5), None),
];

/// Derives the statistics request from a compiled search request.
pub fn derive(search: &Value) -> Value {
    let mut body = match search {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    for key in PAGING_KEYS {
        body.remove(*key);
    }
    if !body.contains_key("query") {
        body.insert("query".into(), crate::compile::match_all());
    }
    body.insert("size".into(), json!(0));
    body.insert("track_total_hits".into(), json!(true));
    body.insert("aggs".into(), aggregations());
    Value::Object(body)
}

/// Fixed aggregation block: counts by type, consequence and clinical
/// significance, and per-dataset allele frequency histograms.
pub fn aggregations() -> Value {
    json!({
        "type": {
            "terms": { "field": fields::TYPE.path, "size": vocabulary::VARIATION_TYPES.len() }
        },
        "vep": {
            "nested": { "path": fields::NESTED_VEP },
            "aggs": {
                "consequence": {
                    "terms": {
                        "field": fields::CONSEQUENCE.path,
                        "size": vocabulary::CONSEQUENCES.len()
                    },
                    "aggs": { "variants": { "reverse_nested": {} } }
                }
            }
        },
        "clinvar": {
            "nested": { "path": fields::NESTED_CLINVAR },
            "aggs": {
                "significance": {
                    "terms": {
                        "field": fields::SIGNIFICANCE.path,
                        "size": vocabulary::significance::ALL.len()
                    },
                    "aggs": { "variants": { "reverse_nested": {} } }
                }
            }
        },
        "frequency": {
            "nested": { "path": fields::NESTED_FREQUENCY },
            "aggs": {
                "source": {
                    "terms": {
                        "field": fields::FREQUENCY_SOURCE.path,
                        "size": vocabulary::datasets::ALL.len()
                    },
                    "aggs": {
                        "af": {
                            "range": { "field": fields::FREQUENCY_AF.path, "ranges": frequency_ranges() }
                        }
                    }
                }
            }
        }
    })
}

fn frequency_ranges() -> Vec<Value> {
    FREQUENCY_BUCKETS
        .iter()
        .map(|(from, to)| {
            let mut bucket = serde_json::Map::new();
            if let Some(from) = from {
                bucket.insert("from".into(), json!(from));
            }
            if let Some(to) = to {
                bucket.insert("to".into(), json!(to));
            }
            Value::Object(bucket)
        })
        .collect()
}

impl ValidatedSearch {
    /// Compiles the statistics request for this search.
    ///
    /// Unlike [`ValidatedSearch::compile`] this ignores the paging state.
    pub fn compile_statistics(&self, closures: &DiseaseClosures) -> QueryResult<Value> {
        self.compile_search(closures).map(|search| derive(&search))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;

    #[test]
    fn test_derive_strips_paging() {
        let search = json!({
            "from": 20,
            "size": 10,
            "sort": [{"id": "asc"}],
            "search_after": [1],
            "query": {"terms": {"type": ["SNV"]}}
        });
        let stats = derive(&search);
        assert_eq!(stats["size"], json!(0));
        assert_eq!(stats["track_total_hits"], json!(true));
        assert_eq!(stats["query"], search["query"]);
        assert!(stats.get("from").is_none());
        assert!(stats.get("sort").is_none());
        assert!(stats.get("search_after").is_none());
        assert!(stats["aggs"].get("type").is_some());
    }

    #[test]
    fn test_statistics_share_filter_with_search() {
        let validated = build(&json!({
            "query": {"consequence": {"value": ["missense_variant"]}},
            "offset": 100
        }))
        .unwrap()
        .into_validated(None)
        .unwrap();
        let closures = DiseaseClosures::new();
        let search = validated.compile_search(&closures).unwrap();
        let stats = validated.compile_statistics(&closures).unwrap();
        assert_eq!(stats["query"], search["query"]);
    }

    #[test]
    fn test_frequency_buckets_cover_unit_interval() {
        let ranges = frequency_ranges();
        assert_eq!(ranges.first().unwrap(), &json!({"to": 0.0001}));
        assert_eq!(ranges.last().unwrap(), &json!({"from": 0.5}));
        assert_eq!(ranges.len(), FREQUENCY_BUCKETS.len());
    }
}
