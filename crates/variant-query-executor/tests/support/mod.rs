//! Shared collaborators and fixtures for executor integration tests.
//!
//! `InMemoryIndex` evaluates the compiled query JSON against a handful of
//! variant documents, so filter semantics can be checked end to end.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use variant_query_executor::{
    well_known, DiseaseOntology, DiseaseRecord, IndexError, IndexResponse, IndexResult,
    InMemoryOntology, OntologyError, OntologyResult, SearchIndex,
};

// =============================================================================
// Search index
// =============================================================================

/// Index over in-memory documents that records every request it receives.
pub struct InMemoryIndex {
    records: Vec<Value>,
    failure: Option<IndexError>,
    requests: Mutex<Vec<Value>>,
}

impl InMemoryIndex {
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records,
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// An index whose every call fails with `error`.
    pub fn failing(error: IndexError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(Vec::new())
        }
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    /// Ids of the records matched by `query`, in storage order.
    pub fn matching_ids(&self, query: &Value) -> Vec<String> {
        self.matching(query)
            .into_iter()
            .filter_map(|r| r["id"].as_str().map(str::to_string))
            .collect()
    }

    fn matching(&self, query: &Value) -> Vec<&Value> {
        self.records.iter().filter(|r| matches(query, r)).collect()
    }

    fn receive(&self, request: &Value) -> IndexResult<()> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SearchIndex for InMemoryIndex {
    async fn count(&self, request: &Value) -> IndexResult<u64> {
        self.receive(request)?;
        Ok(self.matching(&request["query"]).len() as u64)
    }

    async fn search(&self, request: &Value) -> IndexResult<IndexResponse> {
        self.receive(request)?;
        let hits = self.matching(&request["query"]);
        let from = request["from"].as_u64().unwrap_or(0) as usize;
        let size = request["size"].as_u64().unwrap_or(10) as usize;

        let mut aggregations = Map::new();
        if let Some(aggs) = request["aggs"].as_object() {
            for (name, spec) in aggs {
                aggregations.insert(name.clone(), aggregate(spec, &hits));
            }
        }

        Ok(IndexResponse {
            total: hits.len() as u64,
            records: hits.into_iter().skip(from).take(size).cloned().collect(),
            aggregations,
        })
    }
}

/// Top-level `terms` aggregations get bucket counts; others an empty object.
fn aggregate(spec: &Value, hits: &[&Value]) -> Value {
    let Some(field) = spec["terms"]["field"].as_str() else {
        return json!({});
    };
    let mut buckets: Vec<(String, u64)> = Vec::new();
    for hit in hits {
        for value in values_at(hit, field) {
            let key = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
            match buckets.iter_mut().find(|(k, _)| *k == key) {
                Some((_, count)) => *count += 1,
                None => buckets.push((key, 1)),
            }
        }
    }
    let buckets: Vec<Value> = buckets
        .into_iter()
        .map(|(key, count)| json!({"key": key, "doc_count": count}))
        .collect();
    json!({ "buckets": buckets })
}

/// Failing search index that never records anything.
pub struct UnreachableIndex;

#[async_trait]
impl SearchIndex for UnreachableIndex {
    async fn count(&self, _request: &Value) -> IndexResult<u64> {
        Err(IndexError::Transport("connection refused".into()))
    }

    async fn search(&self, _request: &Value) -> IndexResult<IndexResponse> {
        Err(IndexError::Transport("connection refused".into()))
    }
}

// =============================================================================
// Query evaluation
// =============================================================================

/// Evaluates a compiled filter against one document.
pub fn matches(query: &Value, doc: &Value) -> bool {
    let Some((kind, body)) = query.as_object().and_then(|q| q.iter().next()) else {
        return true;
    };
    match kind.as_str() {
        "match_all" => true,
        "bool" => {
            let all = |key: &str| clauses(body, key).iter().all(|c| matches(c, doc));
            let should = clauses(body, "should");
            let needed = body["minimum_should_match"].as_u64().unwrap_or(1) as usize;
            let should_ok =
                should.is_empty() || should.iter().filter(|c| matches(c, doc)).count() >= needed;
            let none = clauses(body, "must_not").iter().all(|c| !matches(c, doc));
            all("must") && all("filter") && should_ok && none
        }
        "term" => field_and_operand(body)
            .map(|(field, value)| values_at(doc, field).iter().any(|v| same(v, value)))
            .unwrap_or(false),
        "terms" => field_and_operand(body)
            .and_then(|(field, values)| values.as_array().map(|vs| (field, vs)))
            .map(|(field, values)| {
                values_at(doc, field)
                    .iter()
                    .any(|v| values.iter().any(|candidate| same(v, candidate)))
            })
            .unwrap_or(false),
        "range" => field_and_operand(body)
            .map(|(field, bounds)| {
                values_at(doc, field)
                    .iter()
                    .filter_map(|v| v.as_f64())
                    .any(|v| in_range(v, bounds))
            })
            .unwrap_or(false),
        "exists" => body["field"]
            .as_str()
            .map(|field| !values_at(doc, field).is_empty())
            .unwrap_or(false),
        "nested" => {
            let path = body["path"].as_str().unwrap_or_default();
            values_at(doc, path).into_iter().any(|element| {
                let scoped = json!({ path: element });
                matches(&body["query"], &scoped)
            })
        }
        other => panic!("unsupported query clause '{}'", other),
    }
}

fn clauses<'a>(body: &'a Value, key: &str) -> Vec<&'a Value> {
    match &body[key] {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        single => vec![single],
    }
}

fn field_and_operand(body: &Value) -> Option<(&str, &Value)> {
    body.as_object()
        .and_then(|b| b.iter().next())
        .map(|(field, operand)| (field.as_str(), operand))
}

fn in_range(value: f64, bounds: &Value) -> bool {
    let check = |op: &str, ok: fn(f64, f64) -> bool| {
        bounds[op].as_f64().map(|b| ok(value, b)).unwrap_or(true)
    };
    check("gte", |v, b| v >= b)
        && check("gt", |v, b| v > b)
        && check("lte", |v, b| v <= b)
        && check("lt", |v, b| v < b)
}

fn same(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Values under a dotted path, flattening arrays on the way.
pub fn values_at<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![doc];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => {
                    if let Some(v) = map.get(segment) {
                        next.push(v);
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        if let Some(v) = item.get(segment) {
                            next.push(v);
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }
    current
        .into_iter()
        .flat_map(|v| match v {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            Value::Null => Vec::new(),
            other => vec![other],
        })
        .collect()
}

// =============================================================================
// Disease ontology
// =============================================================================

pub const DIABETES: &str = "MONDO_0005015";
pub const TYPE_1_DIABETES: &str = "MONDO_0005147";
pub const TYPE_2_DIABETES: &str = "MONDO_0005148";
pub const LI_FRAUMENI: &str = "MONDO_0018875";
pub const HBOC: &str = "MONDO_0003582";

/// ```text
/// root
/// ├── diabetes mellitus
/// │   ├── type 1 diabetes mellitus
/// │   └── type 2 diabetes mellitus
/// ├── Li-Fraumeni syndrome
/// └── hereditary breast ovarian cancer syndrome
/// ```
pub fn ontology() -> InMemoryOntology {
    let mut ontology = InMemoryOntology::new();
    ontology.insert(DIABETES, "diabetes mellitus", &[well_known::DISEASE_ROOT_ID]);
    ontology.insert(TYPE_1_DIABETES, "type 1 diabetes mellitus", &[DIABETES]);
    ontology.insert(TYPE_2_DIABETES, "type 2 diabetes mellitus", &[DIABETES]);
    ontology.insert(LI_FRAUMENI, "Li-Fraumeni syndrome", &[well_known::DISEASE_ROOT_ID]);
    ontology.insert(
        HBOC,
        "hereditary breast ovarian cancer syndrome",
        &[well_known::DISEASE_ROOT_ID],
    );
    ontology
}

/// Ontology whose every lookup fails.
pub struct UnavailableOntology;

#[async_trait]
impl DiseaseOntology for UnavailableOntology {
    async fn lookup_by_parent(
        &self,
        _parent_id: &str,
        _limit: usize,
    ) -> OntologyResult<Vec<DiseaseRecord>> {
        Err(OntologyError::Unavailable("ontology index timed out".into()))
    }

    async fn lookup_by_id(&self, _id: &str) -> OntologyResult<Option<DiseaseRecord>> {
        Err(OntologyError::Unavailable("ontology index timed out".into()))
    }
}

/// Ontology that answers every child lookup with a record lacking an id.
pub struct MalformedOntology;

#[async_trait]
impl DiseaseOntology for MalformedOntology {
    async fn lookup_by_parent(
        &self,
        _parent_id: &str,
        _limit: usize,
    ) -> OntologyResult<Vec<DiseaseRecord>> {
        Ok(vec![DiseaseRecord {
            id: String::new(),
            cui: None,
            label: "unnamed disease".into(),
            parents: vec![DIABETES.into()],
        }])
    }

    async fn lookup_by_id(&self, _id: &str) -> OntologyResult<Option<DiseaseRecord>> {
        Ok(None)
    }
}

// =============================================================================
// Variant documents
// =============================================================================

/// Five variants covering every nested scope.
///
/// | id   | chr | start  | type      | gene  | clinvar                    | frequency              |
/// |------|-----|--------|-----------|-------|----------------------------|------------------------|
/// | tgv1 | 13  | 32340300 | SNV     | BRCA2 | pathogenic, HBOC           | gem_j_wga 0.001 PASS   |
/// | tgv2 | 17  | 7675088 | SNV      | TP53  | pathogenic, Li-Fraumeni    | tommo 0.02 PASS        |
/// | tgv3 | 1   | 100-102 | deletion | GENE1 | benign, type 2 diabetes    | gem_j_wga 0.3 LowQual  |
/// | tgv4 | 1   | 200    | insertion | GENE1 | none                       | tommo 0.05 PASS        |
/// | tgv5 | X   | 5000   | SNV       | none  | uncertain, type 1 diabetes | none                   |
pub fn variants() -> Vec<Value> {
    vec![
        json!({
            "id": "tgv1", "rs": ["rs80357906"], "type": "SNV",
            "chromosome": "13", "chromosome_index": 13, "start": 32340300, "stop": 32340300,
            "reference": "A", "alternate": "G",
            "vep": [{"symbol": "BRCA2", "symbol_aliases": ["FANCD1"], "hgnc_id": 1101,
                     "consequence": ["missense_variant"], "sift": 0.01}],
            "clinvar": [{"interpretation": ["pathogenic"], "medgen": "C0677776", "disease": HBOC}],
            "frequency": [{"source": "gem_j_wga", "af": 0.001, "ac": 2, "filter": ["PASS"]}]
        }),
        json!({
            "id": "tgv2", "rs": ["rs28934578"], "type": "SNV",
            "chromosome": "17", "chromosome_index": 17, "start": 7675088, "stop": 7675088,
            "reference": "C", "alternate": "T",
            "vep": [{"symbol": "TP53", "symbol_aliases": ["LFS1"], "hgnc_id": 11998,
                     "consequence": ["stop_gained"]}],
            "clinvar": [{"interpretation": ["pathogenic"], "medgen": "C0085390", "disease": LI_FRAUMENI}],
            "frequency": [{"source": "tommo", "af": 0.02, "ac": 40, "filter": ["PASS"]}]
        }),
        json!({
            "id": "tgv3", "type": "deletion",
            "chromosome": "1", "chromosome_index": 1, "start": 100, "stop": 102,
            "reference": "ACG", "alternate": "A",
            "vep": [{"symbol": "GENE1", "symbol_aliases": ["OLD1"], "hgnc_id": 5,
                     "consequence": ["frameshift_variant"]}],
            "clinvar": [{"interpretation": ["benign"], "disease": TYPE_2_DIABETES}],
            "frequency": [{"source": "gem_j_wga", "af": 0.3, "ac": 600, "filter": ["LowQual"]}]
        }),
        json!({
            "id": "tgv4", "type": "insertion",
            "chromosome": "1", "chromosome_index": 1, "start": 200, "stop": 200,
            "reference": "A", "alternate": "AT",
            "vep": [{"symbol": "GENE1", "symbol_aliases": ["OLD1"], "hgnc_id": 5,
                     "consequence": ["intron_variant"]}],
            "frequency": [{"source": "tommo", "af": 0.05, "ac": 100, "filter": ["PASS"]}]
        }),
        json!({
            "id": "tgv5", "type": "SNV",
            "chromosome": "X", "chromosome_index": 23, "start": 5000, "stop": 5000,
            "reference": "G", "alternate": "C",
            "clinvar": [{"interpretation": ["uncertain_significance"], "disease": TYPE_1_DIABETES}]
        }),
    ]
}
