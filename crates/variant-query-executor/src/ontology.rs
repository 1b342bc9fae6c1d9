//! Disease ontology resolution.
//!
//! This module provides the [`DiseaseOntologyResolver`] for walking the
//! disease hierarchy through the [`DiseaseOntology`] collaborator using BFS.
//! Each hierarchy level costs one batch of concurrent lookups.

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::try_join_all;
use serde::Serialize;
use variant_query::{DiseaseClosure, DiseaseClosures};

use crate::cache::ClosureCache;
use crate::config::OntologyConfig;
use crate::error::{OntologyError, OntologyResult};
use crate::traits::{DiseaseOntology, DiseaseRecord};

/// Well-known ontology nodes.
///
/// The root is never looked up: the ontology index is not expected to hold
/// a record for it, so its identifier and label are fixed here.
pub mod well_known {
    use crate::traits::DiseaseRecord;

    /// Identifier of the disease ontology root.
    pub const DISEASE_ROOT_ID: &str = "MONDO_0000001";

    /// Label of the disease ontology root.
    pub const DISEASE_ROOT_LABEL: &str = "disease";

    /// Returns true if `id` is the ontology root.
    pub fn is_root(id: &str) -> bool {
        id == DISEASE_ROOT_ID
    }

    /// Record describing the ontology root.
    pub fn root_record() -> DiseaseRecord {
        DiseaseRecord {
            id: DISEASE_ROOT_ID.to_string(),
            cui: None,
            label: DISEASE_ROOT_LABEL.to_string(),
            parents: Vec::new(),
        }
    }
}

/// Summary of one disease node for inspection/suggest views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiseaseInspection {
    /// The node itself.
    pub node: DiseaseRecord,
    /// Ancestors, nearest first, ending with the root.
    pub parents: Vec<DiseaseRecord>,
    /// Direct children.
    pub children: Vec<DiseaseRecord>,
    /// True if no node lists this one as parent.
    pub is_leaf: bool,
}

/// Walks the disease hierarchy using BFS over an ontology collaborator.
///
/// One resolver serves one request. Lookup counts are kept so callers can
/// report how much ontology traffic a request caused.
///
/// # Example
///
/// ```ignore
/// let resolver = DiseaseOntologyResolver::new(&ontology);
/// let closure = resolver.expand_descendants("MONDO_0005148").await?;
/// assert!(matches!(closure, DiseaseClosure::Ids(ids) if ids.contains("MONDO_0005148")));
/// ```
pub struct DiseaseOntologyResolver<'a> {
    ontology: &'a dyn DiseaseOntology,
    config: OntologyConfig,
    cache: Option<&'a ClosureCache>,
    lookups: AtomicUsize,
    cache_hits: AtomicUsize,
}

impl<'a> DiseaseOntologyResolver<'a> {
    /// Creates a resolver with default settings and no cache.
    pub fn new(ontology: &'a dyn DiseaseOntology) -> Self {
        Self::with_config(ontology, OntologyConfig::default())
    }

    /// Creates a resolver with custom settings.
    pub fn with_config(ontology: &'a dyn DiseaseOntology, config: OntologyConfig) -> Self {
        Self {
            ontology,
            config,
            cache: None,
            lookups: AtomicUsize::new(0),
            cache_hits: AtomicUsize::new(0),
        }
    }

    /// Uses `cache` for descendant closures.
    pub fn with_cache(mut self, cache: &'a ClosureCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Number of ontology lookups issued so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Number of closures served from the cache so far.
    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    // =========================================================================
    // Single lookups
    // =========================================================================

    /// Gets the record for `id`. The root is answered without a lookup.
    pub async fn lookup(&self, id: &str) -> OntologyResult<Option<DiseaseRecord>> {
        if well_known::is_root(id) {
            return Ok(Some(well_known::root_record()));
        }
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let record = self.ontology.lookup_by_id(id).await?;
        if let Some(record) = &record {
            check_record(record)?;
        }
        Ok(record)
    }

    /// Gets the direct children of `id`.
    ///
    /// One extra record is requested so a node with more children than
    /// `page_size` is reported instead of silently cut short.
    pub async fn children_of(&self, id: &str) -> OntologyResult<Vec<DiseaseRecord>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let page_size = self.config.page_size;
        let children = self
            .ontology
            .lookup_by_parent(id, page_size.saturating_add(1))
            .await?;
        if children.len() > page_size {
            tracing::warn!(id, page_size, "Child lookup overflowed its page");
            return Err(OntologyError::PageOverflow {
                id: id.to_string(),
                page_size,
            });
        }
        for child in &children {
            check_record(child)?;
        }
        Ok(children)
    }

    /// Returns true iff no node lists `id` as its parent.
    ///
    /// The root is never a leaf and costs no lookup.
    pub async fn is_leaf(&self, id: &str) -> OntologyResult<bool> {
        if well_known::is_root(id) {
            return Ok(false);
        }
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let children = self.ontology.lookup_by_parent(id, 1).await?;
        Ok(children.is_empty())
    }

    // =========================================================================
    // Traversals
    // =========================================================================

    /// Gets the closure of `id`: the id itself and all of its transitive
    /// descendants.
    ///
    /// The root resolves to [`DiseaseClosure::All`] without any lookup.
    /// Expanding the same id twice against an unchanged ontology yields the
    /// same closure.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn expand_descendants(&self, id: &str) -> OntologyResult<DiseaseClosure> {
        if id.trim().is_empty() {
            return Err(OntologyError::Malformed("empty disease id".to_string()));
        }
        if well_known::is_root(id) {
            return Ok(DiseaseClosure::All);
        }

        if let Some(cache) = self.cache {
            if let Some(closure) = cache.get(id) {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(id, size = closure.len(), "Closure served from cache");
                return Ok(DiseaseClosure::Ids(closure));
            }
        }

        let mut visited = BTreeSet::new();
        visited.insert(id.to_string());
        let mut frontier = vec![id.to_string()];

        while !frontier.is_empty() {
            let levels = try_join_all(frontier.iter().map(|parent| self.children_of(parent))).await?;

            let mut next = Vec::new();
            for child in levels.into_iter().flatten() {
                if visited.insert(child.id.clone()) {
                    next.push(child.id);
                }
            }

            if let Some(limit) = self.config.max_closure_size {
                if visited.len() - 1 > limit {
                    return Err(OntologyError::ClosureTooLarge {
                        id: id.to_string(),
                        limit,
                    });
                }
            }
            frontier = next;
        }

        tracing::debug!(id, size = visited.len(), "Expanded disease closure");

        if let Some(cache) = self.cache {
            cache.set(id.to_string(), visited.clone());
        }
        Ok(DiseaseClosure::Ids(visited))
    }

    /// Gets the ancestors of `id`, nearest first, ending with the root.
    ///
    /// The root itself and ids unknown to the ontology have no ancestors.
    pub async fn parents_of(&self, id: &str) -> OntologyResult<Vec<DiseaseRecord>> {
        if well_known::is_root(id) {
            return Ok(Vec::new());
        }
        let Some(record) = self.lookup(id).await? else {
            return Ok(Vec::new());
        };

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(record.id.clone());
        let mut ancestors = Vec::new();
        let mut frontier = record.parents;

        while !frontier.is_empty() {
            let level: Vec<String> = frontier
                .into_iter()
                .filter(|p| !well_known::is_root(p) && visited.insert(p.clone()))
                .collect();
            let records = try_join_all(level.iter().map(|p| self.lookup(p))).await?;

            let mut next = Vec::new();
            for (parent_id, record) in level.iter().zip(records) {
                match record {
                    Some(record) => {
                        next.extend(record.parents.iter().cloned());
                        ancestors.push(record);
                    }
                    None => tracing::warn!(
                        id,
                        parent = parent_id.as_str(),
                        "Parent listed in the ontology has no record"
                    ),
                }
            }
            frontier = next;
        }

        ancestors.push(well_known::root_record());
        Ok(ancestors)
    }

    /// Gets the node, its ancestors and its direct children in one call.
    pub async fn inspect(&self, id: &str) -> OntologyResult<Option<DiseaseInspection>> {
        let Some(node) = self.lookup(id).await? else {
            return Ok(None);
        };
        let (parents, children) = futures::try_join!(self.parents_of(id), self.children_of(id))?;
        let is_leaf = !well_known::is_root(id) && children.is_empty();
        Ok(Some(DiseaseInspection {
            node,
            parents,
            children,
            is_leaf,
        }))
    }

    /// Resolves the closures of every disease id in a query tree.
    ///
    /// Each distinct id is expanded once; the expansions run concurrently.
    pub async fn resolve_closures(&self, ids: &[&str]) -> OntologyResult<DiseaseClosures> {
        let mut unique: Vec<&str> = Vec::new();
        for &id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }

        let expansions = try_join_all(unique.iter().map(|id| async move {
            Ok::<_, OntologyError>((*id, self.expand_descendants(id).await?))
        }))
        .await?;

        let mut closures = DiseaseClosures::new();
        for (id, closure) in expansions {
            closures.insert(id, closure);
        }
        Ok(closures)
    }
}

impl std::fmt::Debug for DiseaseOntologyResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiseaseOntologyResolver")
            .field("config", &self.config)
            .field("cached", &self.cache.is_some())
            .field("lookups", &self.lookups())
            .finish()
    }
}

fn check_record(record: &DiseaseRecord) -> OntologyResult<()> {
    if record.id.trim().is_empty() {
        return Err(OntologyError::Malformed(format!(
            "record '{}' has an empty id",
            record.label
        )));
    }
    Ok(())
}
