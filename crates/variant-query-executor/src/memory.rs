//! In-memory disease ontology.
//!
//! Loaded from a JSON array of records:
//!
//! ```json
//! [
//!   {"id": "MONDO_0005148", "cui": "C0011860", "label": "type 2 diabetes mellitus",
//!    "parents": ["MONDO_0005015"]}
//! ]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;

use crate::error::{OntologyError, OntologyResult};
use crate::traits::{DiseaseOntology, DiseaseRecord};

/// Disease ontology held in memory, keyed by id.
///
/// Children are returned in id order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOntology {
    records: BTreeMap<String, DiseaseRecord>,
}

impl InMemoryOntology {
    /// Creates an empty ontology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an ontology from records; later records replace earlier ones
    /// with the same id.
    pub fn from_records(records: impl IntoIterator<Item = DiseaseRecord>) -> Self {
        let mut ontology = Self::new();
        for record in records {
            ontology.add(record);
        }
        ontology
    }

    /// Parses a JSON array of records.
    pub fn from_json_str(json: &str) -> OntologyResult<Self> {
        let records: Vec<DiseaseRecord> =
            serde_json::from_str(json).map_err(|e| OntologyError::Malformed(e.to_string()))?;
        Ok(Self::from_records(records))
    }

    /// Reads a JSON array of records from a file.
    pub fn from_json_file(path: impl AsRef<Path>) -> OntologyResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| OntologyError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Adds a record.
    pub fn add(&mut self, record: DiseaseRecord) {
        self.records.insert(record.id.clone(), record);
    }

    /// Adds a record without a CUI.
    pub fn insert(&mut self, id: &str, label: &str, parents: &[&str]) {
        self.add(DiseaseRecord {
            id: id.to_string(),
            cui: None,
            label: label.to_string(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
        });
    }

    /// Gets a record by id.
    pub fn get(&self, id: &str) -> Option<&DiseaseRecord> {
        self.records.get(id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl DiseaseOntology for InMemoryOntology {
    async fn lookup_by_parent(
        &self,
        parent_id: &str,
        limit: usize,
    ) -> OntologyResult<Vec<DiseaseRecord>> {
        Ok(self
            .records
            .values()
            .filter(|r| r.parents.iter().any(|p| p == parent_id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn lookup_by_id(&self, id: &str) -> OntologyResult<Option<DiseaseRecord>> {
        Ok(self.records.get(id).cloned())
    }
}
