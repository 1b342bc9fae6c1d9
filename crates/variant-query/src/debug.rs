//! Optional capture of intermediate forms for debug/trace output.

use serde::Serialize;
use serde_json::{Map, Value};

/// Stage that produced a [`DebugEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugStage {
    /// The query tree as built from the request.
    Ast,
    /// The validation report.
    Validation,
    /// The compiled search request.
    Query,
    /// The compiled count request.
    Count,
    /// The compiled statistics request.
    Statistics,
}

impl DebugStage {
    /// Name used as the key in [`DebugSink::into_value`].
    pub fn as_str(self) -> &'static str {
        match self {
            DebugStage::Ast => "ast",
            DebugStage::Validation => "validation",
            DebugStage::Query => "query",
            DebugStage::Count => "count",
            DebugStage::Statistics => "statistics",
        }
    }
}

/// One captured artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugEntry {
    /// Producing stage.
    pub stage: DebugStage,
    /// Serialized form.
    pub payload: Value,
}

/// Collects serialized intermediate forms while a request is processed.
///
/// Stages append to the sink only when one is passed in; passing `None`
/// leaves every other behaviour unchanged.
#[derive(Debug, Clone, Default)]
pub struct DebugSink {
    entries: Vec<DebugEntry>,
}

impl DebugSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a payload for `stage`.
    pub fn record(&mut self, stage: DebugStage, payload: Value) {
        self.entries.push(DebugEntry { stage, payload });
    }

    /// Serializes `value` and appends it for `stage`.
    ///
    /// A value that fails to serialize is recorded as its error message.
    pub fn record_serialized<T: Serialize + ?Sized>(&mut self, stage: DebugStage, value: &T) {
        let payload = serde_json::to_value(value).unwrap_or_else(|e| Value::String(e.to_string()));
        self.record(stage, payload);
    }

    /// All entries in recording order.
    pub fn entries(&self) -> &[DebugEntry] {
        &self.entries
    }

    /// Latest payload recorded for `stage`.
    pub fn get(&self, stage: DebugStage) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.stage == stage)
            .map(|e| &e.payload)
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts the sink into an object keyed by stage name.
    pub fn into_value(self) -> Value {
        let mut map = Map::new();
        for entry in self.entries {
            map.insert(entry.stage.as_str().to_string(), entry.payload);
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_and_get() {
        let mut sink = DebugSink::new();
        assert!(sink.is_empty());
        sink.record(DebugStage::Ast, json!({"and": []}));
        sink.record_serialized(DebugStage::Validation, &vec!["a", "b"]);
        assert_eq!(sink.entries().len(), 2);
        assert_eq!(sink.get(DebugStage::Validation), Some(&json!(["a", "b"])));
        assert_eq!(sink.get(DebugStage::Query), None);
    }

    #[test]
    fn test_into_value_keys_by_stage() {
        let mut sink = DebugSink::new();
        sink.record(DebugStage::Query, json!(1));
        sink.record(DebugStage::Statistics, json!(2));
        assert_eq!(sink.into_value(), json!({"query": 1, "statistics": 2}));
    }
}
