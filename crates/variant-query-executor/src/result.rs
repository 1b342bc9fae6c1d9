//! Search outcome types.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

/// Result of one search request, ready for response shaping.
///
/// # Example
///
/// ```ignore
/// let outcome = executor.execute(&request, None).await?;
///
/// println!("{} variants match", outcome.filtered_total);
///
/// if let Some(aggs) = &outcome.aggregations {
///     println!("type buckets: {}", aggs["type"]);
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchOutcome {
    /// Number of records matching the filter.
    pub filtered_total: u64,
    /// The requested page of records.
    pub results: Vec<Value>,
    /// Aggregations, when statistics were computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Map<String, Value>>,
    /// Total reported by the statistics request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics_total: Option<u64>,
    /// Execution statistics.
    #[serde(skip)]
    pub stats: ExecutionStats,
}

impl SearchOutcome {
    /// Returns true if the statistics request was issued.
    pub fn statistics_computed(&self) -> bool {
        self.aggregations.is_some()
    }

    /// Number of records on this page.
    pub fn page_len(&self) -> usize {
        self.results.len()
    }
}

/// Statistics from search execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Total execution duration.
    pub duration: Duration,
    /// Ontology lookups issued while resolving disease closures.
    pub ontology_lookups: usize,
    /// Disease closures served from the cache.
    pub closure_cache_hits: usize,
}

impl ExecutionStats {
    /// Creates new execution stats.
    pub fn new(duration: Duration, ontology_lookups: usize, closure_cache_hits: usize) -> Self {
        Self {
            duration,
            ontology_lookups,
            closure_cache_hits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_default() {
        let outcome = SearchOutcome::default();
        assert_eq!(outcome.filtered_total, 0);
        assert_eq!(outcome.page_len(), 0);
        assert!(!outcome.statistics_computed());
    }

    #[test]
    fn test_outcome_serialization_omits_stats() {
        let outcome = SearchOutcome {
            filtered_total: 2,
            results: vec![json!({"id": "tgv1"})],
            stats: ExecutionStats::new(Duration::from_millis(5), 3, 1),
            ..SearchOutcome::default()
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"filtered_total": 2, "results": [{"id": "tgv1"}]})
        );
    }

    #[test]
    fn test_execution_stats() {
        let stats = ExecutionStats::new(Duration::from_millis(50), 4, 2);
        assert_eq!(stats.duration, Duration::from_millis(50));
        assert_eq!(stats.ontology_lookups, 4);
        assert_eq!(stats.closure_cache_hits, 2);
    }
}
