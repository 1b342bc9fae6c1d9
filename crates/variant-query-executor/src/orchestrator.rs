//! Search orchestration.
//!
//! One call to [`SearchExecutor::execute`] takes a request through
//!
//! ```text
//! Received → SchemaValidated → ModelValidated → Compiled → Executed → Formatted → Responded
//!     │             │                               │
//!     └─────────────┴──────────→ Rejected           └──→ Failed
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{Map, Value};
use variant_query::{CompileOptions, CompiledSearch, DebugSink, DebugStage, ValidatedSearch};

use crate::cache::ClosureCache;
use crate::config::SearchConfig;
use crate::error::{IndexResult, SearchError, SearchResult};
use crate::ontology::{DiseaseInspection, DiseaseOntologyResolver};
use crate::result::{ExecutionStats, SearchOutcome};
use crate::traits::{DiseaseOntology, IndexResponse, SchemaValidator, SearchIndex, SearchRequest};

/// Lifecycle state of one search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchState {
    /// The request has arrived.
    Received,
    /// The request matches the wire schema.
    SchemaValidated,
    /// The query tree is built and valid.
    ModelValidated,
    /// Count, search and statistics requests are compiled.
    Compiled,
    /// The index has answered every request.
    Executed,
    /// The outcome is shaped.
    Formatted,
    /// Terminal: the outcome was returned.
    Responded,
    /// Terminal: the request was invalid.
    Rejected,
    /// Terminal: a collaborator failed.
    Failed,
}

impl SearchState {
    /// Returns true for `Responded`, `Rejected` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SearchState::Responded | SearchState::Rejected | SearchState::Failed
        )
    }

    /// Lower-case name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            SearchState::Received => "received",
            SearchState::SchemaValidated => "schema_validated",
            SearchState::ModelValidated => "model_validated",
            SearchState::Compiled => "compiled",
            SearchState::Executed => "executed",
            SearchState::Formatted => "formatted",
            SearchState::Responded => "responded",
            SearchState::Rejected => "rejected",
            SearchState::Failed => "failed",
        }
    }
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the state of a single request.
struct SearchRun {
    state: SearchState,
}

impl SearchRun {
    fn new() -> Self {
        tracing::debug!(state = %SearchState::Received, "Search received");
        Self {
            state: SearchState::Received,
        }
    }

    fn advance(&mut self, next: SearchState) {
        tracing::debug!(from = %self.state, to = %next, "Search state transition");
        self.state = next;
    }

    fn end(&mut self, err: SearchError) -> SearchError {
        let next = err.terminal_state();
        if next == SearchState::Rejected {
            tracing::warn!(from = %self.state, error = %err, "Search rejected");
        } else {
            tracing::error!(from = %self.state, error = %err, "Search failed");
        }
        self.state = next;
        err
    }
}

/// Runs search requests against the schema validator, disease ontology and
/// search index collaborators.
///
/// The executor holds no per-request state; the closure cache, if
/// configured, is the only thing shared between requests.
///
/// # Example
///
/// ```ignore
/// use variant_query_executor::{BuiltinSchemaValidator, SearchExecutor, SearchRequest};
///
/// let executor = SearchExecutor::new(&BuiltinSchemaValidator, &ontology, &index);
/// let request = SearchRequest::post(json!({"query": {"gene": {"symbol": "BRCA2"}}}));
///
/// let outcome = executor.execute(&request, None).await?;
/// println!("{} variants", outcome.filtered_total);
/// ```
pub struct SearchExecutor<'a> {
    schema: &'a dyn SchemaValidator,
    ontology: &'a dyn DiseaseOntology,
    index: &'a dyn SearchIndex,
    config: SearchConfig,
    cache: Option<Arc<ClosureCache>>,
}

impl<'a> SearchExecutor<'a> {
    /// Creates an executor with default configuration.
    pub fn new(
        schema: &'a dyn SchemaValidator,
        ontology: &'a dyn DiseaseOntology,
        index: &'a dyn SearchIndex,
    ) -> Self {
        Self::with_config(schema, ontology, index, SearchConfig::default())
    }

    /// Creates an executor with custom configuration.
    pub fn with_config(
        schema: &'a dyn SchemaValidator,
        ontology: &'a dyn DiseaseOntology,
        index: &'a dyn SearchIndex,
        config: SearchConfig,
    ) -> Self {
        let cache = config
            .ontology
            .cache
            .as_ref()
            .map(|c| Arc::new(ClosureCache::new(c)));
        Self {
            schema,
            ontology,
            index,
            config,
            cache,
        }
    }

    /// Uses a closure cache shared with other executors.
    pub fn with_shared_cache(mut self, cache: Arc<ClosureCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Returns the closure cache, if enabled.
    pub fn cache(&self) -> Option<&ClosureCache> {
        self.cache.as_deref()
    }

    /// Returns the executor configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs one search request to completion.
    ///
    /// With a sink, the query tree and validation report are captured even
    /// when validation fails, followed by the compiled requests.
    #[tracing::instrument(skip_all, fields(method = %request.method, path = %request.path))]
    pub async fn execute(
        &self,
        request: &SearchRequest,
        mut debug: Option<&mut DebugSink>,
    ) -> SearchResult<SearchOutcome> {
        let start = Instant::now();
        let mut run = SearchRun::new();

        if let Err(err) = self.check_schema(request) {
            return Err(run.end(err));
        }
        run.advance(SearchState::SchemaValidated);

        let validated = match self.build_model(request, debug.as_deref_mut()) {
            Ok(validated) => validated,
            Err(err) => return Err(run.end(err)),
        };
        run.advance(SearchState::ModelValidated);

        let resolver = self.resolver();
        let compiled = match self
            .compile_validated(&validated, &resolver, debug.as_deref_mut())
            .await
        {
            Ok(compiled) => compiled,
            Err(err) => return Err(run.end(err)),
        };
        run.advance(SearchState::Compiled);

        let (total, page, statistics) = match futures::try_join!(
            self.index.count(&compiled.count),
            self.index.search(&compiled.search),
            self.run_statistics(compiled.statistics.as_ref()),
        ) {
            Ok(responses) => responses,
            Err(err) => return Err(run.end(err.into())),
        };
        run.advance(SearchState::Executed);

        if let Some(stats) = &statistics {
            if stats.total != total {
                tracing::warn!(
                    count = total,
                    statistics_total = stats.total,
                    "Statistics total differs from count"
                );
            }
        }

        let outcome = SearchOutcome {
            filtered_total: total,
            results: page.records,
            statistics_total: statistics.as_ref().map(|s| s.total),
            aggregations: statistics.map(|s| s.aggregations),
            stats: ExecutionStats::new(
                start.elapsed(),
                resolver.lookups(),
                resolver.cache_hits(),
            ),
        };
        run.advance(SearchState::Formatted);

        tracing::info!(
            filtered_total = outcome.filtered_total,
            results = outcome.page_len(),
            statistics = outcome.statistics_computed(),
            ontology_lookups = outcome.stats.ontology_lookups,
            elapsed_ms = outcome.stats.duration.as_millis() as u64,
            "Search completed"
        );
        run.advance(SearchState::Responded);
        Ok(outcome)
    }

    /// Checks the version and schema, then builds and validates the query
    /// tree without touching any collaborator but the schema validator.
    pub fn validate(
        &self,
        request: &SearchRequest,
        debug: Option<&mut DebugSink>,
    ) -> SearchResult<ValidatedSearch> {
        self.check_schema(request)?;
        self.build_model(request, debug)
    }

    /// Validates the request and compiles it, resolving disease closures
    /// against the ontology. The index is not queried.
    pub async fn compile(
        &self,
        request: &SearchRequest,
        mut debug: Option<&mut DebugSink>,
    ) -> SearchResult<CompiledSearch> {
        let validated = self.validate(request, debug.as_deref_mut())?;
        let resolver = self.resolver();
        self.compile_validated(&validated, &resolver, debug).await
    }

    /// Describes one disease node: its record, ancestors and children.
    pub async fn inspect_disease(&self, id: &str) -> SearchResult<Option<DiseaseInspection>> {
        Ok(self.resolver().inspect(id).await?)
    }

    fn resolver(&self) -> DiseaseOntologyResolver<'_> {
        let resolver =
            DiseaseOntologyResolver::with_config(self.ontology, self.config.ontology.clone());
        match self.cache.as_deref() {
            Some(cache) => resolver.with_cache(cache),
            None => resolver,
        }
    }

    fn check_schema(&self, request: &SearchRequest) -> SearchResult<()> {
        let version = request
            .version
            .as_deref()
            .or_else(|| self.config.default_version())
            .unwrap_or_default();
        if !self.config.supports_version(version) {
            return Err(SearchError::UnsupportedSchemaVersion(version.to_string()));
        }
        self.schema
            .validate(request)
            .map_err(SearchError::SchemaInvalid)
    }

    fn build_model(
        &self,
        request: &SearchRequest,
        debug: Option<&mut DebugSink>,
    ) -> SearchResult<ValidatedSearch> {
        let empty = Value::Object(Map::new());
        let body = if request.body.is_null() {
            &empty
        } else {
            &request.body
        };

        let search = match variant_query::build_with(body, self.config.limits()) {
            Ok(search) => search,
            Err(err) => {
                let err = SearchError::from(err);
                if let (Some(sink), SearchError::ModelInvalid(messages)) = (debug, &err) {
                    sink.record_serialized(DebugStage::Validation, messages);
                }
                return Err(err);
            }
        };

        search
            .into_validated(debug)
            .map_err(|report| SearchError::ModelInvalid(report.into_messages()))
    }

    async fn compile_validated(
        &self,
        validated: &ValidatedSearch,
        resolver: &DiseaseOntologyResolver<'_>,
        debug: Option<&mut DebugSink>,
    ) -> SearchResult<CompiledSearch> {
        let closures = resolver
            .resolve_closures(&validated.search().disease_ids())
            .await?;
        let options = CompileOptions {
            track_total_hits: self.config.track_total_hits,
        };
        Ok(validated.compile_with(&closures, options, debug)?)
    }

    async fn run_statistics(&self, request: Option<&Value>) -> IndexResult<Option<IndexResponse>> {
        match request {
            Some(request) => Ok(Some(self.index.search(request).await?)),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for SearchExecutor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchExecutor")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish()
    }
}

