//! Construction of query trees from request parameter maps.
//!
//! The builder only checks shape: every node object has exactly one
//! recognised key, operands have the expected JSON types and no unknown
//! members. Semantic checks (vocabularies, bound ordering, required values)
//! are left to the validator so that they can all be reported at once.

use serde_json::{Map, Value};

use crate::ast::{
    Bound, BoolNode, Disease, GeneSymbol, Interval, LabelSet, Limits, Location, Node, Offset,
    RangeNode, Sort, SortKey, SortOrder, TermsNode, VariationFrequency, VariationSearch,
};
use crate::error::{QueryError, QueryResult};
use crate::location::parse_location;
use crate::path::FieldPath;
use crate::vocabulary;

/// Builds a query tree from a request body using default page limits.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use variant_query::build;
///
/// let search = build(&json!({"query": {"gene": {"symbol": "BRCA2"}}})).unwrap();
/// assert!(search.query.is_some());
/// ```
pub fn build(params: &Value) -> QueryResult<VariationSearch> {
    build_with(params, Limits::default())
}

/// Builds a query tree from a request body with the given page limits.
pub fn build_with(params: &Value, limits: Limits) -> QueryResult<VariationSearch> {
    let root = FieldPath::new();
    let body = params
        .as_object()
        .ok_or_else(|| QueryError::construction(&root, "request body must be an object"))?;

    let query = match body.get("query") {
        None | Some(Value::Null) => None,
        Some(value) => Some(node(value, &root.key("query"))?),
    };

    let offset = match body.get("offset") {
        None | Some(Value::Null) => None,
        Some(value) => Some(offset(value, &root.key("offset"))?),
    };

    let limit = match body.get("limit") {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.as_u64().ok_or_else(|| {
            QueryError::construction(&root.key("limit"), "expected a non-negative integer")
        })?),
    };

    let sort = match body.get("sort") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => sort(value, &root.key("sort"))?,
    };

    Ok(VariationSearch {
        query,
        offset,
        limit,
        sort,
        limits,
    })
}

/// Builds a single query node. `path` points at the node object.
pub fn node(value: &Value, path: &FieldPath) -> QueryResult<Node> {
    let object = value
        .as_object()
        .ok_or_else(|| QueryError::construction(path, "expected a query object"))?;

    let mut entries = object.iter();
    let (key, operand) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        (None, _) => {
            return Err(QueryError::construction(
                path,
                "query object must have exactly one key, found none",
            ))
        }
        (Some(_), Some(_)) => {
            let keys: Vec<_> = object.keys().map(|k| format!("'{}'", k)).collect();
            return Err(QueryError::construction(
                path,
                format!("query object must have exactly one key, found {}", keys.join(", ")),
            ));
        }
    };

    let path = &path.key(key.as_str());
    match key.as_str() {
        "and" => Ok(Node::And(children(operand, path)?)),
        "or" => Ok(Node::Or(children(operand, path)?)),
        "not" => Ok(Node::not(node(operand, path)?)),
        "gene" => gene(operand, path),
        "disease" => disease(operand, path),
        "significance" => labels(operand, path, Node::ClinicalSignificance),
        "consequence" => labels(operand, path, Node::VariationConsequence),
        "type" => labels(operand, path, Node::VariationType),
        "frequency" => frequency(operand, path),
        "location" => location(operand, path),
        "range" => range(operand, path),
        "terms" => terms(operand, path),
        other => Err(QueryError::construction(
            path,
            format!("unknown query key '{}'", other),
        )),
    }
}

// =============================================================================
// Composites
// =============================================================================

fn children(value: &Value, path: &FieldPath) -> QueryResult<Vec<Node>> {
    let items = value
        .as_array()
        .ok_or_else(|| QueryError::construction(path, "expected an array of query objects"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| node(item, &path.index(i)))
        .collect()
}

// =============================================================================
// Leaves
// =============================================================================

fn gene(value: &Value, path: &FieldPath) -> QueryResult<Node> {
    let object = operand(value, path, &["symbol", "id", "relation"])?;
    let symbols = strings(object.get("symbol"), &path.key("symbol"))?;
    let hgnc_ids = match object.get("id") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| unsigned(item, &path.key("id").index(i)))
            .collect::<QueryResult<_>>()?,
        Some(item) => vec![unsigned(item, &path.key("id"))?],
    };
    let leaf = Node::GeneSymbol(GeneSymbol { symbols, hgnc_ids });
    with_relation(leaf, object, path)
}

fn disease(value: &Value, path: &FieldPath) -> QueryResult<Node> {
    if let Value::String(id) = value {
        return Ok(Node::Disease(Disease {
            id: Some(id.clone()),
        }));
    }
    let object = operand(value, path, &["id", "relation"])?;
    let id = optional_string(object.get("id"), &path.key("id"))?;
    with_relation(Node::Disease(Disease { id }), object, path)
}

fn labels(value: &Value, path: &FieldPath, variant: fn(LabelSet) -> Node) -> QueryResult<Node> {
    let object = operand(value, path, &["value", "relation"])?;
    let values = strings(object.get("value"), &path.key("value"))?;
    with_relation(variant(LabelSet { values }), object, path)
}

fn frequency(value: &Value, path: &FieldPath) -> QueryResult<Node> {
    let object = operand(
        value,
        path,
        &["source", "frequency", "count", "filtered", "relation"],
    )?;
    let source = optional_string(object.get("source"), &path.key("source"))?;
    let frequency = optional_interval(object.get("frequency"), &path.key("frequency"))?;
    let count = optional_interval(object.get("count"), &path.key("count"))?;
    let filtered = match object.get("filtered") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            return Err(QueryError::construction(
                &path.key("filtered"),
                "expected a boolean",
            ))
        }
    };
    let leaf = Node::VariationFrequency(VariationFrequency {
        source,
        frequency,
        count,
        filtered,
    });
    with_relation(leaf, object, path)
}

fn location(value: &Value, path: &FieldPath) -> QueryResult<Node> {
    if let Value::String(text) = value {
        let parsed =
            parse_location(text).map_err(|e| QueryError::construction(path, e.to_string()))?;
        return Ok(Node::Location(parsed));
    }
    let object = operand(value, path, &["chromosome", "position", "relation"])?;
    let chromosome = optional_string(object.get("chromosome"), &path.key("chromosome"))?
        .map(|c| vocabulary::normalize_chromosome(&c));
    let position_path = path.key("position");
    let position = match object.get("position") {
        None | Some(Value::Null) => Interval::default(),
        Some(Value::Number(n)) => Interval::exactly(number(n, &position_path)?),
        Some(other) => interval(other, &position_path)?,
    };
    with_relation(
        Node::Location(Location {
            chromosome,
            position,
        }),
        object,
        path,
    )
}

fn range(value: &Value, path: &FieldPath) -> QueryResult<Node> {
    let object = operand(value, path, &["field", "gte", "gt", "lte", "lt"])?;
    let field = optional_string(object.get("field"), &path.key("field"))?;
    let interval = bounds(object, path)?;
    Ok(Node::Range(RangeNode { field, interval }))
}

fn terms(value: &Value, path: &FieldPath) -> QueryResult<Node> {
    let object = operand(value, path, &["field", "value", "strict"])?;
    let field = optional_string(object.get("field"), &path.key("field"))?;
    let values = strings(object.get("value"), &path.key("value"))?;
    let strict = match object.get("strict") {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            return Err(QueryError::construction(
                &path.key("strict"),
                "expected a boolean",
            ))
        }
    };
    let leaf = TermsNode { field, values };
    Ok(if strict {
        Node::Terms(leaf)
    } else {
        Node::NonStrictTerms(leaf)
    })
}

// =============================================================================
// Operand helpers
// =============================================================================

fn operand<'a>(
    value: &'a Value,
    path: &FieldPath,
    allowed: &[&str],
) -> QueryResult<&'a Map<String, Value>> {
    let object = value
        .as_object()
        .ok_or_else(|| QueryError::construction(path, "expected an object"))?;
    if let Some(unknown) = object.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(QueryError::construction(
            &path.key(unknown.as_str()),
            format!(
                "unknown key '{}' (expected one of: {})",
                unknown,
                allowed.join(", ")
            ),
        ));
    }
    Ok(object)
}

fn with_relation(leaf: Node, object: &Map<String, Value>, path: &FieldPath) -> QueryResult<Node> {
    match object.get("relation") {
        None | Some(Value::Null) => Ok(leaf),
        Some(Value::String(r)) if r == "eq" => Ok(leaf),
        Some(Value::String(r)) if r == "ne" => Ok(Node::Bool(BoolNode {
            negate: true,
            child: Box::new(leaf),
            inline: true,
        })),
        Some(_) => Err(QueryError::construction(
            &path.key("relation"),
            "relation must be 'eq' or 'ne'",
        )),
    }
}

fn strings(value: Option<&Value>, path: &FieldPath) -> QueryResult<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(QueryError::construction(&path.index(i), "expected a string")),
            })
            .collect(),
        Some(_) => Err(QueryError::construction(
            path,
            "expected a string or an array of strings",
        )),
    }
}

fn optional_string(value: Option<&Value>, path: &FieldPath) -> QueryResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(QueryError::construction(path, "expected a string")),
    }
}

fn unsigned(value: &Value, path: &FieldPath) -> QueryResult<u64> {
    value
        .as_u64()
        .ok_or_else(|| QueryError::construction(path, "expected a non-negative integer"))
}

fn number(value: &serde_json::Number, path: &FieldPath) -> QueryResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| QueryError::construction(path, "expected a number"))
}

fn optional_interval(value: Option<&Value>, path: &FieldPath) -> QueryResult<Option<Interval>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => interval(v, path).map(Some),
    }
}

fn interval(value: &Value, path: &FieldPath) -> QueryResult<Interval> {
    let object = operand(value, path, &["gte", "gt", "lte", "lt"])?;
    bounds(object, path)
}

fn bounds(object: &Map<String, Value>, path: &FieldPath) -> QueryResult<Interval> {
    let lower = bound(object, path, "gte", "gt")?;
    let upper = bound(object, path, "lte", "lt")?;
    Ok(Interval::new(lower, upper))
}

fn bound(
    object: &Map<String, Value>,
    path: &FieldPath,
    inclusive: &str,
    exclusive: &str,
) -> QueryResult<Option<Bound>> {
    let read = |key: &str| -> QueryResult<Option<f64>> {
        match object.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => number(n, &path.key(key)).map(Some),
            Some(_) => Err(QueryError::construction(&path.key(key), "expected a number")),
        }
    };
    match (read(inclusive)?, read(exclusive)?) {
        (Some(_), Some(_)) => Err(QueryError::construction(
            path,
            format!("'{}' and '{}' cannot both be set", inclusive, exclusive),
        )),
        (Some(v), None) => Ok(Some(Bound::inclusive(v))),
        (None, Some(v)) => Ok(Some(Bound::exclusive(v))),
        (None, None) => Ok(None),
    }
}

// =============================================================================
// Paging and sort
// =============================================================================

fn offset(value: &Value, path: &FieldPath) -> QueryResult<Offset> {
    match value {
        Value::Array(items) => Ok(Offset::Cursor(items.clone())),
        other => other.as_u64().map(Offset::Index).ok_or_else(|| {
            QueryError::construction(
                path,
                "expected a non-negative integer or an array of sort values",
            )
        }),
    }
}

fn sort(value: &Value, path: &FieldPath) -> QueryResult<Vec<Sort>> {
    let items = value
        .as_array()
        .ok_or_else(|| QueryError::construction(path, "expected an array of sort directives"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| sort_directive(item, &path.index(i)))
        .collect()
}

fn sort_directive(value: &Value, path: &FieldPath) -> QueryResult<Sort> {
    let (key, order) = match value {
        Value::String(key) => (key.as_str(), None),
        _ => {
            let object = operand(value, path, &["key", "order"])?;
            let key = object
                .get("key")
                .and_then(Value::as_str)
                .ok_or_else(|| QueryError::construction(&path.key("key"), "expected a string"))?;
            (key, object.get("order"))
        }
    };
    let key = match key {
        "location" => SortKey::Location,
        "type" => SortKey::Type,
        "id" => SortKey::Id,
        other => {
            return Err(QueryError::construction(
                &path.key("key"),
                format!("unknown sort key '{}'", other),
            ))
        }
    };
    let order = match order {
        None | Some(Value::Null) => SortOrder::Asc,
        Some(Value::String(o)) if o == "asc" => SortOrder::Asc,
        Some(Value::String(o)) if o == "desc" => SortOrder::Desc,
        Some(_) => {
            return Err(QueryError::construction(
                &path.key("order"),
                "order must be 'asc' or 'desc'",
            ))
        }
    };
    Ok(Sort { key, order })
}
