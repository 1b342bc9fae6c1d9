//! End-to-end tests for building, validating and compiling variant queries.

use serde_json::{json, Value};
use variant_query::{
    build, build_with, DebugSink, DebugStage, DiseaseClosure, DiseaseClosures, Limits, Node,
    QueryError, ValidatedSearch,
};

fn validated(body: Value) -> ValidatedSearch {
    build(&body)
        .expect("request should build")
        .into_validated(None)
        .expect("request should validate")
}

/// Collects every object in `value` that has `key`, depth first.
fn find_all<'a>(value: &'a Value, key: &str, found: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            if let Some(v) = map.get(key) {
                found.push(v);
            }
            for v in map.values() {
                find_all(v, key, found);
            }
        }
        Value::Array(items) => {
            for v in items {
                find_all(v, key, found);
            }
        }
        _ => {}
    }
}

#[test]
fn test_gene_symbol_scenario() {
    let search = validated(json!({"query": {"gene": {"symbol": "BRCA2"}}}));
    let compiled = search.compile(&DiseaseClosures::new(), None).unwrap();

    let mut terms = Vec::new();
    find_all(&compiled.filter, "terms", &mut terms);
    assert!(terms.contains(&&json!({"vep.symbol": ["BRCA2"]})));
    assert!(compiled.statistics.is_some());
}

#[test]
fn test_unknown_dataset_scenario() {
    let search = build(&json!({"query": {"frequency": {
        "source": "unknown_dataset",
        "frequency": {"gte": 0.01}
    }}}))
    .unwrap();

    let report = search.into_validated(None).unwrap_err();
    assert_eq!(report.len(), 1);
    let message = &report.messages()[0];
    assert_eq!(message.path.to_string(), "query.frequency.source");
    assert!(message.message.contains("unknown_dataset"));
}

#[test]
fn test_type_and_negated_significance_scenario() {
    let search = validated(json!({"query": {"and": [
        {"type": {"value": ["SNV"]}},
        {"not": {"significance": {"value": ["pathogenic"]}}}
    ]}}));
    let filter = search.compile_filter(&DiseaseClosures::new()).unwrap();

    let must = filter["bool"]["must"].as_array().unwrap();
    assert_eq!(must.len(), 2);
    assert_eq!(must[0], json!({"terms": {"type": ["SNV"]}}));
    let negated = &must[1]["bool"]["must_not"][0];
    assert_eq!(
        negated["nested"]["query"],
        json!({"terms": {"clinvar.interpretation": ["pathogenic"]}})
    );
}

#[test]
fn test_leaf_disease_scenario() {
    let search = validated(json!({"query": {"disease": {"id": "MONDO_0011450"}}}));
    let mut closures = DiseaseClosures::new();
    closures.insert(
        "MONDO_0011450",
        DiseaseClosure::Ids(["MONDO_0011450".to_string()].into()),
    );
    let filter = search.compile_filter(&closures).unwrap();
    assert_eq!(
        filter["nested"]["query"],
        json!({"terms": {"clinvar.disease": ["MONDO_0011450"]}})
    );
}

#[test]
fn test_unresolved_disease_is_compile_error() {
    let search = validated(json!({"query": {"or": [{"disease": "MONDO_0005148"}]}}));
    assert_eq!(
        search.compile_filter(&DiseaseClosures::new()),
        Err(QueryError::UnresolvedDisease("MONDO_0005148".to_string()))
    );
}

#[test]
fn test_statistics_skipped_only_when_paging() {
    let closures = DiseaseClosures::new();
    for (offset, expect_stats) in [
        (Value::Null, true),
        (json!(0), true),
        (json!(5), false),
        (json!(["10", 123456]), false),
    ] {
        let search = validated(json!({"query": {"type": {"value": ["SNV"]}}, "offset": offset}));
        let compiled = search.compile(&closures, None).unwrap();
        assert_eq!(
            compiled.statistics.is_some(),
            expect_stats,
            "offset {}",
            offset
        );
    }
}

#[test]
fn test_statistics_keep_filter_and_drop_paging() {
    let search = validated(json!({
        "query": {"location": "chr13:32315474-32400266"},
        "limit": 50,
        "sort": ["type"]
    }));
    let compiled = search.compile(&DiseaseClosures::new(), None).unwrap();
    let stats = compiled.statistics.unwrap();
    assert_eq!(stats["query"], compiled.search["query"]);
    assert_eq!(stats["size"], json!(0));
    assert!(stats.get("sort").is_none());
    assert!(stats["aggs"]["frequency"]["aggs"]["source"].is_object());
}

#[test]
fn test_limit_above_configured_maximum() {
    let limits = Limits {
        default_limit: 20,
        max_limit: 200,
    };
    let search = build_with(&json!({"limit": 500}), limits).unwrap();
    let report = search.validate(None);
    assert!(!report.is_valid());
    assert_eq!(report.messages()[0].path.to_string(), "limit");

    let search = build_with(&json!({}), limits).unwrap();
    let compiled = search
        .into_validated(None)
        .unwrap()
        .compile(&DiseaseClosures::new(), None)
        .unwrap();
    assert_eq!(compiled.search["size"], json!(20));
}

#[test]
fn test_debug_trace_covers_every_stage() {
    let search = build(&json!({"query": {"consequence": {"value": ["stop_gained"]}}})).unwrap();
    let mut sink = DebugSink::new();
    let validated = search.into_validated(Some(&mut sink)).unwrap();
    validated
        .compile(&DiseaseClosures::new(), Some(&mut sink))
        .unwrap();

    let stages: Vec<_> = sink.entries().iter().map(|e| e.stage).collect();
    assert_eq!(
        stages,
        vec![
            DebugStage::Ast,
            DebugStage::Validation,
            DebugStage::Query,
            DebugStage::Count,
            DebugStage::Statistics,
        ]
    );
    assert_eq!(sink.get(DebugStage::Validation), Some(&json!([])));
}

#[test]
fn test_disease_ids_collected_from_tree() {
    let search = build(&json!({"query": {"and": [
        {"disease": "A"},
        {"or": [{"not": {"disease": {"id": "B"}}}, {"gene": {"symbol": "TP53"}}]}
    ]}}))
    .unwrap();
    assert_eq!(search.disease_ids(), vec!["A", "B"]);
    assert!(matches!(search.query, Some(Node::And(_))));
}
