//! Compilation of validated query trees into search index requests.
//!
//! The target is an Elasticsearch-style JSON query DSL. Fields stored inside
//! nested objects are wrapped in `nested` queries so that every condition of
//! one leaf applies to the same nested record.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::ast::{
    Disease, GeneSymbol, Interval, LabelSet, Location, Node, Offset, Sort, SortKey, SortOrder,
    TermsNode, VariationFrequency,
};
use crate::debug::{DebugSink, DebugStage};
use crate::error::{QueryError, QueryResult};
use crate::fields::{self, FieldSpec};
use crate::statistics;
use crate::validation::ValidatedSearch;
use crate::vocabulary;

// =============================================================================
// Disease closures
// =============================================================================

/// Resolved ontology closure of one disease node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiseaseClosure {
    /// The node is the ontology root: every disease-annotated record matches.
    All,
    /// The node's own identifier plus all of its descendants.
    Ids(BTreeSet<String>),
}

/// Closures for the disease nodes of one tree, keyed by disease id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiseaseClosures {
    closures: HashMap<String, DiseaseClosure>,
}

impl DiseaseClosures {
    /// Creates an empty set of closures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the closure for `id`.
    pub fn insert(&mut self, id: impl Into<String>, closure: DiseaseClosure) {
        self.closures.insert(id.into(), closure);
    }

    /// Closure for `id`, if resolved.
    pub fn get(&self, id: &str) -> Option<&DiseaseClosure> {
        self.closures.get(id)
    }

    /// Returns true if `id` has been resolved.
    pub fn contains(&self, id: &str) -> bool {
        self.closures.contains_key(id)
    }

    /// Number of resolved ids.
    pub fn len(&self) -> usize {
        self.closures.len()
    }

    /// Returns true if nothing has been resolved.
    pub fn is_empty(&self) -> bool {
        self.closures.is_empty()
    }
}

// =============================================================================
// Compiled requests
// =============================================================================

/// Requests produced for one validated search.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSearch {
    /// Filter query shared by every request.
    pub filter: Value,
    /// Count request.
    pub count: Value,
    /// Paged result request.
    pub search: Value,
    /// Aggregation request; `None` for paging requests.
    pub statistics: Option<Value>,
}

/// Switches applied while compiling a validated search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Ask the index for an exact hit total on the paged request.
    pub track_total_hits: bool,
}

/// Always-true filter.
pub fn match_all() -> Value {
    json!({ "match_all": {} })
}

impl ValidatedSearch {
    /// Compiles the filter query alone.
    pub fn compile_filter(&self, closures: &DiseaseClosures) -> QueryResult<Value> {
        match &self.search().query {
            Some(node) => node.compile(closures),
            None => Ok(match_all()),
        }
    }

    /// Compiles the paged result request.
    pub fn compile_search(&self, closures: &DiseaseClosures) -> QueryResult<Value> {
        let filter = self.compile_filter(closures)?;
        Ok(self.search_request(filter))
    }

    /// Compiles the count, result and (unless paging) statistics requests.
    pub fn compile(
        &self,
        closures: &DiseaseClosures,
        debug: Option<&mut DebugSink>,
    ) -> QueryResult<CompiledSearch> {
        self.compile_with(closures, CompileOptions::default(), debug)
    }

    /// Like [`compile`](Self::compile), with explicit options.
    pub fn compile_with(
        &self,
        closures: &DiseaseClosures,
        options: CompileOptions,
        debug: Option<&mut DebugSink>,
    ) -> QueryResult<CompiledSearch> {
        let filter = self.compile_filter(closures)?;
        let count = json!({ "query": filter.clone() });
        let mut search = self.search_request(filter.clone());
        if options.track_total_hits {
            if let Value::Object(body) = &mut search {
                body.insert("track_total_hits".into(), Value::Bool(true));
            }
        }
        let statistics = if self.search().is_paging() {
            None
        } else {
            Some(statistics::derive(&search))
        };

        if let Some(sink) = debug {
            sink.record(DebugStage::Query, search.clone());
            sink.record(DebugStage::Count, count.clone());
            if let Some(stats) = &statistics {
                sink.record(DebugStage::Statistics, stats.clone());
            }
        }

        Ok(CompiledSearch {
            filter,
            count,
            search,
            statistics,
        })
    }

    fn search_request(&self, filter: Value) -> Value {
        let search = self.search();
        let mut body = Map::new();
        match &search.offset {
            Some(Offset::Index(from)) if *from > 0 => {
                body.insert("from".into(), json!(from));
            }
            Some(Offset::Cursor(values)) => {
                body.insert("search_after".into(), Value::Array(values.clone()));
            }
            _ => {}
        }
        body.insert("size".into(), json!(search.effective_limit()));
        body.insert("sort".into(), sort_clauses(&search.effective_sort()));
        body.insert("query".into(), filter);
        Value::Object(body)
    }
}

const LOCATION_SORT: &[&str] = &[
    fields::CHROMOSOME_INDEX.path,
    fields::START.path,
    fields::STOP.path,
];
const TYPE_SORT: &[&str] = &[fields::TYPE.path];
const ID_SORT: &[&str] = &[fields::ID.path];

fn sort_clauses(sort: &[Sort]) -> Value {
    let mut clauses = Vec::new();
    for directive in sort {
        let order = match directive.order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        let keys = match directive.key {
            SortKey::Location => LOCATION_SORT,
            SortKey::Type => TYPE_SORT,
            SortKey::Id => ID_SORT,
        };
        for key in keys {
            clauses.push(json!({ *key: order }));
        }
    }
    Value::Array(clauses)
}

// =============================================================================
// Nodes
// =============================================================================

impl Node {
    /// Compiles this subtree into a filter query.
    ///
    /// Disease nodes must have an entry in `closures`. Calling this on a tree
    /// that failed validation yields [`QueryError::NotValidated`].
    pub fn compile(&self, closures: &DiseaseClosures) -> QueryResult<Value> {
        match self {
            Node::And(children) => {
                if children.is_empty() {
                    return Ok(match_all());
                }
                let clauses = compile_all(children, closures)?;
                Ok(json!({ "bool": { "must": clauses } }))
            }
            Node::Or(children) => {
                if children.is_empty() {
                    return Ok(match_all());
                }
                let clauses = compile_all(children, closures)?;
                Ok(any_of(clauses))
            }
            Node::Bool(b) => {
                let child = b.child.compile(closures)?;
                Ok(if b.negate { negate(child) } else { child })
            }
            Node::Range(r) => {
                let spec = resolve_field(r.field.as_deref())?;
                Ok(scoped(spec, range(spec.path, &r.interval)))
            }
            Node::Terms(t) | Node::NonStrictTerms(t) => compile_terms(t),
            Node::GeneSymbol(g) => Ok(compile_gene(g)),
            Node::Disease(d) => compile_disease(d, closures),
            Node::ClinicalSignificance(labels) => Ok(compile_significance(labels)),
            Node::VariationConsequence(labels) => Ok(scoped(
                &fields::CONSEQUENCE,
                terms(fields::CONSEQUENCE.path, &labels.values),
            )),
            Node::VariationType(labels) => Ok(terms(fields::TYPE.path, &labels.values)),
            Node::VariationFrequency(f) => compile_frequency(f),
            Node::Location(l) => compile_location(l),
        }
    }
}

fn compile_all(children: &[Node], closures: &DiseaseClosures) -> QueryResult<Vec<Value>> {
    children.iter().map(|c| c.compile(closures)).collect()
}

fn resolve_field(name: Option<&str>) -> QueryResult<&'static FieldSpec> {
    let name = name.ok_or_else(|| QueryError::NotValidated("field is required".into()))?;
    fields::lookup(name).ok_or_else(|| QueryError::NotValidated(format!("unknown field '{}'", name)))
}

fn compile_terms(t: &TermsNode) -> QueryResult<Value> {
    let spec = resolve_field(t.field.as_deref())?;
    Ok(scoped(spec, terms(spec.path, &t.values)))
}

fn compile_gene(g: &GeneSymbol) -> Value {
    let mut clauses = Vec::new();
    if !g.symbols.is_empty() {
        clauses.push(terms(fields::SYMBOL.path, &g.symbols));
        clauses.push(terms(fields::SYMBOL_ALIAS.path, &g.symbols));
    }
    if !g.hgnc_ids.is_empty() {
        clauses.push(terms(fields::HGNC_ID.path, &g.hgnc_ids));
    }
    nested(fields::NESTED_VEP, any_of(clauses))
}

fn compile_disease(d: &Disease, closures: &DiseaseClosures) -> QueryResult<Value> {
    let id = d
        .id
        .as_deref()
        .ok_or_else(|| QueryError::NotValidated("disease id is required".into()))?;
    let inner = match closures.get(id) {
        Some(DiseaseClosure::All) => exists(fields::DISEASE.path),
        Some(DiseaseClosure::Ids(ids)) => terms(fields::DISEASE.path, ids),
        None => return Err(QueryError::UnresolvedDisease(id.to_string())),
    };
    Ok(nested(fields::NESTED_CLINVAR, inner))
}

fn compile_significance(labels: &LabelSet) -> Value {
    let (absent, present): (Vec<&String>, Vec<&String>) = labels
        .values
        .iter()
        .partition(|v| v.as_str() == vocabulary::significance::NOT_IN_CLINVAR);

    let mut clauses = Vec::new();
    if !present.is_empty() {
        clauses.push(nested(
            fields::NESTED_CLINVAR,
            terms(fields::SIGNIFICANCE.path, &present),
        ));
    }
    if !absent.is_empty() {
        clauses.push(negate(nested(
            fields::NESTED_CLINVAR,
            exists(fields::SIGNIFICANCE.path),
        )));
    }

    match clauses.len() {
        1 => clauses.remove(0),
        _ => any_of(clauses),
    }
}

fn compile_frequency(f: &VariationFrequency) -> QueryResult<Value> {
    let source = f
        .source
        .as_deref()
        .ok_or_else(|| QueryError::NotValidated("frequency source is required".into()))?;

    let mut clauses = vec![term(fields::FREQUENCY_SOURCE.path, source)];
    if let Some(interval) = &f.frequency {
        clauses.push(range(fields::FREQUENCY_AF.path, interval));
    }
    if let Some(interval) = &f.count {
        clauses.push(range(fields::FREQUENCY_AC.path, interval));
    }
    if f.filtered {
        clauses.push(term(fields::FREQUENCY_FILTER.path, fields::FILTER_PASS));
    }

    Ok(nested(
        fields::NESTED_FREQUENCY,
        json!({ "bool": { "must": clauses } }),
    ))
}

/// A variant at `[start, stop]` overlaps the interval when its start is not
/// past the upper end and its stop is not before the lower end.
fn compile_location(l: &Location) -> QueryResult<Value> {
    let chromosome = l
        .chromosome
        .as_deref()
        .ok_or_else(|| QueryError::NotValidated("chromosome is required".into()))?;

    let mut clauses = vec![term(fields::CHROMOSOME.path, chromosome)];
    if l.position.upper.is_some() {
        let upper = Interval::new(None, l.position.upper);
        clauses.push(range(fields::START.path, &upper));
    }
    if l.position.lower.is_some() {
        let lower = Interval::new(l.position.lower, None);
        clauses.push(range(fields::STOP.path, &lower));
    }
    Ok(json!({ "bool": { "must": clauses } }))
}

// =============================================================================
// DSL helpers
// =============================================================================

fn term(field: &str, value: &str) -> Value {
    json!({ "term": { field: value } })
}

fn terms<T: Serialize>(field: &str, values: T) -> Value {
    json!({ "terms": { field: values } })
}

fn exists(field: &str) -> Value {
    json!({ "exists": { "field": field } })
}

fn any_of(clauses: Vec<Value>) -> Value {
    json!({ "bool": { "should": clauses, "minimum_should_match": 1 } })
}

fn negate(clause: Value) -> Value {
    json!({ "bool": { "must_not": [clause] } })
}

fn nested(path: &str, query: Value) -> Value {
    json!({ "nested": { "path": path, "query": query } })
}

fn scoped(spec: &FieldSpec, query: Value) -> Value {
    match spec.nested {
        Some(path) => nested(path, query),
        None => query,
    }
}

fn range(field: &str, interval: &Interval) -> Value {
    let mut body = Map::new();
    if let Some(b) = interval.lower {
        let op = if b.inclusive { "gte" } else { "gt" };
        body.insert(op.into(), number(b.value));
    }
    if let Some(b) = interval.upper {
        let op = if b.inclusive { "lte" } else { "lt" };
        body.insert(op.into(), number(b.value));
    }
    json!({ "range": { field: body } })
}

/// Whole values are emitted as JSON integers so integer fields get integer
/// bounds.
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        json!(value as i64)
    } else {
        json!(value)
    }
}
