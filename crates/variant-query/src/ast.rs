//! Abstract Syntax Tree types for variant queries.
//!
//! The tree is closed: every query shape is one [`Node`] variant, and the
//! validator and compiler each handle all variants in one exhaustive match.

use serde::Serialize;
use serde_json::Value;

// =============================================================================
// Intervals
// =============================================================================

/// One end of an [`Interval`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bound {
    /// Bound value.
    pub value: f64,
    /// Whether the value itself is part of the interval.
    pub inclusive: bool,
}

impl Bound {
    /// Creates an inclusive bound (`gte`/`lte`).
    pub fn inclusive(value: f64) -> Self {
        Self {
            value,
            inclusive: true,
        }
    }

    /// Creates an exclusive bound (`gt`/`lt`).
    pub fn exclusive(value: f64) -> Self {
        Self {
            value,
            inclusive: false,
        }
    }
}

/// A numeric interval with optional, independently inclusive ends.
///
/// An absent end is unbounded; it is never replaced by a sentinel value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Interval {
    /// Lower end (`gte` or `gt`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower: Option<Bound>,
    /// Upper end (`lte` or `lt`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<Bound>,
}

impl Interval {
    /// Creates an interval from optional ends.
    pub fn new(lower: Option<Bound>, upper: Option<Bound>) -> Self {
        Self { lower, upper }
    }

    /// Closed interval `[lower, upper]`.
    pub fn closed(lower: f64, upper: f64) -> Self {
        Self::new(Some(Bound::inclusive(lower)), Some(Bound::inclusive(upper)))
    }

    /// Interval `[lower, ∞)`.
    pub fn at_least(lower: f64) -> Self {
        Self::new(Some(Bound::inclusive(lower)), None)
    }

    /// Interval `(-∞, upper]`.
    pub fn at_most(upper: f64) -> Self {
        Self::new(None, Some(Bound::inclusive(upper)))
    }

    /// Degenerate interval containing exactly `value`.
    pub fn exactly(value: f64) -> Self {
        Self::closed(value, value)
    }

    /// Returns true if neither end is set.
    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// Returns true if the lower end lies above the upper end.
    pub fn is_inverted(&self) -> bool {
        matches!((self.lower, self.upper), (Some(l), Some(u)) if l.value > u.value)
    }

    /// Returns true if no value can satisfy the interval.
    pub fn is_empty(&self) -> bool {
        match (self.lower, self.upper) {
            (Some(l), Some(u)) => {
                l.value > u.value || (l.value == u.value && !(l.inclusive && u.inclusive))
            }
            _ => false,
        }
    }

    /// Checks whether `value` lies inside the interval.
    pub fn contains(&self, value: f64) -> bool {
        let above = match self.lower {
            Some(b) if b.inclusive => value >= b.value,
            Some(b) => value > b.value,
            None => true,
        };
        let below = match self.upper {
            Some(b) if b.inclusive => value <= b.value,
            Some(b) => value < b.value,
            None => true,
        };
        above && below
    }

    /// Iterates over the set ends.
    pub fn bounds(&self) -> impl Iterator<Item = Bound> {
        self.lower.into_iter().chain(self.upper)
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.lower {
            Some(b) if b.inclusive => write!(f, "[{}", b.value)?,
            Some(b) => write!(f, "({}", b.value)?,
            None => write!(f, "(-inf")?,
        }
        write!(f, ", ")?;
        match self.upper {
            Some(b) if b.inclusive => write!(f, "{}]", b.value),
            Some(b) => write!(f, "{})", b.value),
            None => write!(f, "inf)"),
        }
    }
}

// =============================================================================
// Query nodes
// =============================================================================

/// Logical negation of a child node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoolNode {
    /// Whether the child is negated.
    pub negate: bool,
    /// The wrapped node.
    pub child: Box<Node>,
    /// Negation was written as `relation: "ne"` on the leaf itself rather
    /// than as a `not` node, so the child shares this node's path.
    #[serde(skip_serializing_if = "is_false")]
    pub inline: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Interval filter over a numeric field from the known-field table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeNode {
    /// Field name as used by clients.
    pub field: Option<String>,
    /// The interval to match.
    #[serde(flatten)]
    pub interval: Interval,
}

/// Exact-match filter over a keyword field from the known-field table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermsNode {
    /// Field name as used by clients.
    pub field: Option<String>,
    /// Values matched with "any of" semantics.
    pub values: Vec<String>,
}

/// Gene filter by symbol (or alias) and/or HGNC identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeneSymbol {
    /// Gene symbols; aliases are accepted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
    /// HGNC identifiers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hgnc_ids: Vec<u64>,
}

/// Disease filter expanded through the disease ontology.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Disease {
    /// Ontology node identifier.
    pub id: Option<String>,
}

/// Values for one of the enumerated leaves.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelSet {
    /// Requested labels.
    pub values: Vec<String>,
}

impl LabelSet {
    /// Creates a label set.
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Allele frequency filter scoped to one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariationFrequency {
    /// Dataset name.
    pub source: Option<String>,
    /// Allele frequency interval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Interval>,
    /// Allele count interval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<Interval>,
    /// Only match records that passed the dataset's quality filter.
    pub filtered: bool,
}

/// Genomic region filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    /// Chromosome label.
    pub chromosome: Option<String>,
    /// Positions the variant must overlap.
    pub position: Interval,
}

/// A node of the query tree.
///
/// Nodes own their children; the tree has no sharing and no cycles.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Conjunction.
    And(Vec<Node>),
    /// Disjunction.
    Or(Vec<Node>),
    /// Negation.
    Bool(BoolNode),
    /// Numeric interval over a known field.
    Range(RangeNode),
    /// Exact match, values checked against the field's vocabulary.
    Terms(TermsNode),
    /// Exact match, values taken literally.
    NonStrictTerms(TermsNode),
    /// Gene symbol / HGNC filter.
    GeneSymbol(GeneSymbol),
    /// Disease ontology filter.
    Disease(Disease),
    /// ClinVar interpretation filter.
    ClinicalSignificance(LabelSet),
    /// VEP consequence filter.
    VariationConsequence(LabelSet),
    /// Variation type filter.
    VariationType(LabelSet),
    /// Dataset frequency filter.
    VariationFrequency(VariationFrequency),
    /// Genomic region filter.
    Location(Location),
}

impl Node {
    /// Wraps `node` in a negation.
    pub fn not(node: Node) -> Self {
        Node::Bool(BoolNode {
            negate: true,
            child: Box::new(node),
            inline: false,
        })
    }

    /// Strict terms leaf.
    pub fn terms<I, S>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Node::Terms(TermsNode {
            field: Some(field.to_string()),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Range leaf.
    pub fn range(field: &str, interval: Interval) -> Self {
        Node::Range(RangeNode {
            field: Some(field.to_string()),
            interval,
        })
    }

    /// Gene leaf matching the given symbols.
    pub fn gene<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Node::GeneSymbol(GeneSymbol {
            symbols: symbols.into_iter().map(Into::into).collect(),
            hgnc_ids: Vec::new(),
        })
    }

    /// Disease leaf.
    pub fn disease(id: &str) -> Self {
        Node::Disease(Disease {
            id: Some(id.to_string()),
        })
    }

    /// Key under which this node appears in the parameter map.
    pub fn key(&self) -> &'static str {
        match self {
            Node::And(_) => "and",
            Node::Or(_) => "or",
            Node::Bool(_) => "not",
            Node::Range(_) => "range",
            Node::Terms(_) | Node::NonStrictTerms(_) => "terms",
            Node::GeneSymbol(_) => "gene",
            Node::Disease(_) => "disease",
            Node::ClinicalSignificance(_) => "significance",
            Node::VariationConsequence(_) => "consequence",
            Node::VariationType(_) => "type",
            Node::VariationFrequency(_) => "frequency",
            Node::Location(_) => "location",
        }
    }

    /// Collects the identifiers of every disease leaf, in pre-order.
    pub fn disease_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_disease_ids(&mut ids);
        ids
    }

    fn collect_disease_ids<'a>(&'a self, ids: &mut Vec<&'a str>) {
        match self {
            Node::And(children) | Node::Or(children) => {
                for child in children {
                    child.collect_disease_ids(ids);
                }
            }
            Node::Bool(b) => b.child.collect_disease_ids(ids),
            Node::Disease(Disease { id: Some(id) }) => ids.push(id),
            _ => {}
        }
    }
}

// =============================================================================
// Root
// =============================================================================

/// Paging offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Offset {
    /// Number of records to skip.
    Index(u64),
    /// Sort values of the last record of the previous page.
    Cursor(Vec<Value>),
}

/// Sortable result keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Chromosome, then start, then stop.
    Location,
    /// Variation type.
    Type,
    /// Variant identifier.
    Id,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// One sort directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sort {
    /// Sort key.
    pub key: SortKey,
    /// Direction.
    pub order: SortOrder,
}

/// Page size limits applied to a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Limits {
    /// Page size used when the request has none.
    pub default_limit: u64,
    /// Largest page size a request may ask for.
    pub max_limit: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 1_000,
        }
    }
}

/// Root of a query tree: the filter plus paging and sort directives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariationSearch {
    /// Filter tree; `None` matches every record.
    pub query: Option<Node>,
    /// Paging offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<Offset>,
    /// Requested page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Sort directives.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<Sort>,
    /// Page size limits.
    #[serde(skip)]
    pub limits: Limits,
}

impl VariationSearch {
    /// Creates a search over `query` with default paging.
    pub fn new(query: Option<Node>) -> Self {
        Self {
            query,
            offset: None,
            limit: None,
            sort: Vec::new(),
            limits: Limits::default(),
        }
    }

    /// Sets the paging offset.
    pub fn with_offset(mut self, offset: Offset) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the page size.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the sort directives.
    pub fn with_sort(mut self, sort: Vec<Sort>) -> Self {
        self.sort = sort;
        self
    }

    /// Sets the page size limits.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Returns true if this request asks for a page after the first one.
    ///
    /// A cursor offset always counts as paging, whatever its contents.
    pub fn is_paging(&self) -> bool {
        match &self.offset {
            None => false,
            Some(Offset::Index(n)) => *n > 0,
            Some(Offset::Cursor(_)) => true,
        }
    }

    /// Page size to request from the index.
    pub fn effective_limit(&self) -> u64 {
        self.limit.unwrap_or(self.limits.default_limit)
    }

    /// Sort directives, defaulting to ascending location order.
    pub fn effective_sort(&self) -> Vec<Sort> {
        if self.sort.is_empty() {
            vec![Sort {
                key: SortKey::Location,
                order: SortOrder::Asc,
            }]
        } else {
            self.sort.clone()
        }
    }

    /// Identifiers of every disease leaf in the tree, in pre-order.
    pub fn disease_ids(&self) -> Vec<&str> {
        self.query.as_ref().map(Node::disease_ids).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_interval_contains_inclusive() {
        let interval = Interval::closed(10.0, 20.0);
        assert!(interval.contains(10.0));
        assert!(interval.contains(20.0));
        assert!(!interval.contains(9.0));
        assert!(!interval.contains(21.0));
    }

    #[test]
    fn test_interval_contains_exclusive() {
        let interval = Interval::new(Some(Bound::exclusive(10.0)), Some(Bound::exclusive(20.0)));
        assert!(!interval.contains(10.0));
        assert!(interval.contains(11.0));
        assert!(interval.contains(19.0));
        assert!(!interval.contains(20.0));
    }

    #[test]
    fn test_interval_half_open() {
        let interval = Interval::at_least(0.5);
        assert!(interval.contains(1e9));
        assert!(!interval.contains(0.49));
    }

    #[test]
    fn test_interval_emptiness() {
        assert!(!Interval::exactly(3.0).is_empty());
        assert!(Interval::new(Some(Bound::exclusive(3.0)), Some(Bound::inclusive(3.0))).is_empty());
        assert!(Interval::closed(4.0, 3.0).is_empty());
        assert!(Interval::closed(4.0, 3.0).is_inverted());
        assert!(!Interval::at_most(3.0).is_inverted());
    }

    #[test]
    fn test_interval_display() {
        let interval = Interval::new(Some(Bound::exclusive(0.01)), None);
        assert_eq!(interval.to_string(), "(0.01, inf)");
        assert_eq!(Interval::closed(1.0, 2.0).to_string(), "[1, 2]");
    }

    #[test]
    fn test_node_serializes_externally_tagged() {
        let node = Node::And(vec![Node::terms("type", ["SNV"]), Node::not(Node::disease("D1"))]);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["and"][0]["terms"]["values"], json!(["SNV"]));
        assert_eq!(value["and"][1]["bool"]["negate"], json!(true));
        assert_eq!(value["and"][1]["bool"]["child"]["disease"]["id"], json!("D1"));
    }

    #[test]
    fn test_disease_ids_pre_order() {
        let node = Node::Or(vec![
            Node::disease("A"),
            Node::And(vec![Node::not(Node::disease("B")), Node::terms("type", ["SNV"])]),
            Node::disease("C"),
        ]);
        assert_eq!(node.disease_ids(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_is_paging() {
        let search = VariationSearch::new(None);
        assert!(!search.is_paging());
        assert!(!search.clone().with_offset(Offset::Index(0)).is_paging());
        assert!(search.clone().with_offset(Offset::Index(5)).is_paging());
        assert!(search
            .clone()
            .with_offset(Offset::Cursor(vec![json!(1), json!(12345)]))
            .is_paging());
        assert!(search.with_offset(Offset::Cursor(vec![json!(0)])).is_paging());
    }

    #[test]
    fn test_effective_limit_and_sort() {
        let search = VariationSearch::new(None);
        assert_eq!(search.effective_limit(), 100);
        assert_eq!(search.effective_sort()[0].key, SortKey::Location);
        assert_eq!(search.with_limit(25).effective_limit(), 25);
    }
}
