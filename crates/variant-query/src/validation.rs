//! Semantic validation of query trees.
//!
//! Traversal is depth-first and pre-order. Every node is visited whatever
//! the outcome for its ancestors or siblings, so a report always carries the
//! complete set of violations in a stable order.

use std::fmt;

use serde::Serialize;

use crate::ast::{
    Interval, LabelSet, Location, Node, Offset, TermsNode, VariationFrequency, VariationSearch,
};
use crate::debug::{DebugSink, DebugStage};
use crate::fields::{self, FieldKind, FieldSpec};
use crate::path::FieldPath;
use crate::vocabulary;

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationMessage {
    /// Location of the offending value in the request.
    pub path: FieldPath,
    /// Description of the problem.
    pub message: String,
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Ordered list of validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationReport {
    messages: Vec<ValidationMessage>,
}

impl ValidationReport {
    /// Returns true if no failures were found.
    pub fn is_valid(&self) -> bool {
        self.messages.is_empty()
    }

    /// Failures in traversal order.
    pub fn messages(&self) -> &[ValidationMessage] {
        &self.messages
    }

    /// Consumes the report, returning its failures.
    pub fn into_messages(self) -> Vec<ValidationMessage> {
        self.messages
    }

    /// Number of failures.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if there are no failures.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn error(&mut self, path: FieldPath, message: impl Into<String>) {
        self.messages.push(ValidationMessage {
            path,
            message: message.into(),
        });
    }
}

/// A search whose tree has passed validation.
///
/// Only [`VariationSearch::into_validated`] produces one, so compilation can
/// never see an invalid tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSearch {
    search: VariationSearch,
}

impl ValidatedSearch {
    /// The validated search.
    pub fn search(&self) -> &VariationSearch {
        &self.search
    }
}

// =============================================================================
// Root
// =============================================================================

impl VariationSearch {
    /// Validates the whole request: the query tree, page size and offset.
    ///
    /// With a sink, the tree and the report are recorded whatever the
    /// outcome.
    pub fn validate(&self, debug: Option<&mut DebugSink>) -> ValidationReport {
        let root = FieldPath::new();
        let mut report = ValidationReport::default();

        if let Some(query) = &self.query {
            query.validate_into(&root.key("query"), &mut report);
        }

        if let Some(limit) = self.limit {
            if limit > self.limits.max_limit {
                report.error(
                    root.key("limit"),
                    format!(
                        "limit {} exceeds the maximum of {}",
                        limit, self.limits.max_limit
                    ),
                );
            }
        }

        if let Some(Offset::Cursor(values)) = &self.offset {
            if values.is_empty() {
                report.error(root.key("offset"), "cursor must not be empty");
            }
        }

        if let Some(sink) = debug {
            sink.record_serialized(DebugStage::Ast, self);
            sink.record_serialized(DebugStage::Validation, &report);
        }

        report
    }

    /// Validates the request and, if it passes, marks it as compilable.
    pub fn into_validated(
        self,
        debug: Option<&mut DebugSink>,
    ) -> Result<ValidatedSearch, ValidationReport> {
        let report = self.validate(debug);
        if report.is_valid() {
            Ok(ValidatedSearch { search: self })
        } else {
            Err(report)
        }
    }
}

// =============================================================================
// Nodes
// =============================================================================

impl Node {
    /// Validates this subtree. `path` is the location of the node object.
    pub fn validate(&self, path: &FieldPath) -> ValidationReport {
        let mut report = ValidationReport::default();
        self.validate_into(path, &mut report);
        report
    }

    fn validate_into(&self, path: &FieldPath, report: &mut ValidationReport) {
        let leaf = path.key(self.key());
        match self {
            Node::And(children) | Node::Or(children) => {
                for (i, child) in children.iter().enumerate() {
                    child.validate_into(&leaf.index(i), report);
                }
            }
            Node::Bool(b) => {
                let child_path = if b.inline { path } else { &leaf };
                b.child.validate_into(child_path, report);
            }
            Node::Range(r) => {
                if let Some(spec) = known_field(r.field.as_deref(), &leaf, report) {
                    if !spec.kind.is_numeric() {
                        report.error(
                            leaf.key("field"),
                            format!("field '{}' does not support range queries", spec.name),
                        );
                    }
                }
                check_interval(&r.interval, &leaf, report);
            }
            Node::Terms(t) => check_terms(t, true, &leaf, report),
            Node::NonStrictTerms(t) => check_terms(t, false, &leaf, report),
            Node::GeneSymbol(g) => {
                if g.symbols.is_empty() && g.hgnc_ids.is_empty() {
                    report.error(leaf.clone(), "at least one of symbol, id is required");
                }
                check_not_blank(&g.symbols, &leaf.key("symbol"), report);
            }
            Node::Disease(d) => match d.id.as_deref() {
                None => report.error(leaf.key("id"), "field is required"),
                Some(id) if id.trim().is_empty() => {
                    report.error(leaf.key("id"), "value must not be empty")
                }
                Some(_) => {}
            },
            Node::ClinicalSignificance(labels) => check_labels(
                labels,
                vocabulary::significance::ALL,
                "clinical significance",
                &leaf,
                report,
            ),
            Node::VariationConsequence(labels) => check_labels(
                labels,
                vocabulary::CONSEQUENCES,
                "consequence",
                &leaf,
                report,
            ),
            Node::VariationType(labels) => check_labels(
                labels,
                vocabulary::VARIATION_TYPES,
                "variation type",
                &leaf,
                report,
            ),
            Node::VariationFrequency(f) => check_frequency(f, &leaf, report),
            Node::Location(l) => check_location(l, &leaf, report),
        }
    }
}

// =============================================================================
// Leaf checks
// =============================================================================

fn known_field(
    name: Option<&str>,
    leaf: &FieldPath,
    report: &mut ValidationReport,
) -> Option<&'static FieldSpec> {
    match name {
        None => {
            report.error(leaf.key("field"), "field is required");
            None
        }
        Some(name) => {
            let spec = fields::lookup(name);
            if spec.is_none() {
                report.error(leaf.key("field"), format!("unknown field '{}'", name));
            }
            spec
        }
    }
}

fn check_terms(terms: &TermsNode, strict: bool, leaf: &FieldPath, report: &mut ValidationReport) {
    let spec = known_field(terms.field.as_deref(), leaf, report);
    if let Some(spec) = spec {
        if spec.kind != FieldKind::Keyword {
            report.error(
                leaf.key("field"),
                format!("field '{}' does not support term matching", spec.name),
            );
        }
    }

    let value_path = leaf.key("value");
    if terms.values.is_empty() {
        report.error(value_path.clone(), "at least one value is required");
    }
    for (i, value) in terms.values.iter().enumerate() {
        if value.trim().is_empty() {
            report.error(value_path.index(i), "value must not be empty");
        } else if let Some(allowed) = spec.filter(|_| strict).and_then(|s| s.vocabulary) {
            if !vocabulary::contains(allowed, value) {
                report.error(
                    value_path.index(i),
                    format!(
                        "'{}' is not a valid value for field '{}'",
                        value,
                        terms.field.as_deref().unwrap_or_default()
                    ),
                );
            }
        }
    }
}

fn check_labels(
    labels: &LabelSet,
    allowed: &[&str],
    what: &str,
    leaf: &FieldPath,
    report: &mut ValidationReport,
) {
    let value_path = leaf.key("value");
    if labels.values.is_empty() {
        report.error(value_path.clone(), "at least one value is required");
    }
    for (i, value) in labels.values.iter().enumerate() {
        if value.trim().is_empty() {
            report.error(value_path.index(i), "value must not be empty");
        } else if !vocabulary::contains(allowed, value) {
            report.error(
                value_path.index(i),
                format!("'{}' is not a valid {}", value, what),
            );
        }
    }
}

fn check_not_blank(values: &[String], path: &FieldPath, report: &mut ValidationReport) {
    for (i, value) in values.iter().enumerate() {
        if value.trim().is_empty() {
            report.error(path.index(i), "value must not be empty");
        }
    }
}

fn check_frequency(f: &VariationFrequency, leaf: &FieldPath, report: &mut ValidationReport) {
    match f.source.as_deref() {
        None => report.error(leaf.key("source"), "field is required"),
        Some(source) if !vocabulary::contains(vocabulary::datasets::ALL, source) => {
            report.error(leaf.key("source"), format!("unknown dataset '{}'", source))
        }
        Some(_) => {}
    }

    if let Some(interval) = &f.frequency {
        let path = leaf.key("frequency");
        check_interval(interval, &path, report);
        if interval.bounds().any(|b| !(0.0..=1.0).contains(&b.value)) {
            report.error(path, "allele frequency must be between 0 and 1");
        }
    }

    if let Some(interval) = &f.count {
        let path = leaf.key("count");
        check_interval(interval, &path, report);
        if interval.bounds().any(|b| b.value < 0.0) {
            report.error(path, "allele count must not be negative");
        }
    }
}

fn check_location(l: &Location, leaf: &FieldPath, report: &mut ValidationReport) {
    match l.chromosome.as_deref() {
        None => report.error(leaf.key("chromosome"), "field is required"),
        Some(chromosome) if !vocabulary::contains(vocabulary::CHROMOSOMES, chromosome) => report
            .error(
                leaf.key("chromosome"),
                format!("unknown chromosome '{}'", chromosome),
            ),
        Some(_) => {}
    }

    let path = leaf.key("position");
    check_interval(&l.position, &path, report);
    if l.position.bounds().any(|b| b.value < 1.0) {
        report.error(path, "position must be at least 1");
    }
}

fn check_interval(interval: &Interval, path: &FieldPath, report: &mut ValidationReport) {
    if interval.is_unbounded() {
        report.error(path.clone(), "at least one of gte, gt, lte, lt is required");
    } else if interval.is_inverted() {
        if let (Some(l), Some(u)) = (interval.lower, interval.upper) {
            report.error(
                path.clone(),
                format!("lower bound {} is greater than upper bound {}", l.value, u.value),
            );
        }
    } else if interval.is_empty() {
        report.error(path.clone(), format!("interval {} is empty", interval));
    }
}
