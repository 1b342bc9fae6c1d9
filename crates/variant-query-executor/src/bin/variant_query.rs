//! Command line front end for the variant query compiler.
//!
//! Validates request bodies, prints compiled index requests and inspects
//! disease ontology nodes. No search index is contacted.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use variant_query::DebugSink;
use variant_query_executor::{
    BuiltinSchemaValidator, IndexError, IndexResponse, IndexResult, InMemoryOntology,
    SearchConfig, SearchError, SearchExecutor, SearchIndex, SearchRequest,
};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "variant-query")]
#[command(about = "Validate and compile variant search requests")]
struct Args {
    /// Executor configuration (JSON)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a request body against the schema and the query model
    Validate {
        /// Request body (JSON)
        file: PathBuf,
        /// API version of the request
        #[arg(long)]
        api_version: Option<String>,
    },
    /// Print the count, search and statistics requests for a body
    Compile {
        /// Request body (JSON)
        file: PathBuf,
        /// Disease ontology records (JSON array)
        #[arg(long, value_name = "FILE")]
        ontology: Option<PathBuf>,
        /// Print every intermediate stage
        #[arg(long)]
        debug: bool,
    },
    /// Show a disease node with its ancestors and children
    Inspect {
        /// Disease identifier
        id: String,
        /// Disease ontology records (JSON array)
        #[arg(long, value_name = "FILE")]
        ontology: PathBuf,
    },
}

/// Index stand-in for commands that never execute a search.
struct OfflineIndex;

#[async_trait]
impl SearchIndex for OfflineIndex {
    async fn count(&self, _request: &Value) -> IndexResult<u64> {
        Err(IndexError::Transport("no search index configured".to_string()))
    }

    async fn search(&self, _request: &Value) -> IndexResult<IndexResponse> {
        Err(IndexError::Transport("no search index configured".to_string()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let config = match &args.config {
        Some(path) => SearchConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SearchConfig::default(),
    };

    match args.command {
        Command::Validate { file, api_version } => {
            let mut request = SearchRequest::post(read_json(&file)?);
            request.version = api_version;
            let ontology = InMemoryOntology::new();
            let executor =
                SearchExecutor::with_config(&BuiltinSchemaValidator, &ontology, &OfflineIndex, config);
            match executor.validate(&request, None) {
                Ok(_) => println!("valid"),
                Err(err) => return report(err),
            }
        }
        Command::Compile {
            file,
            ontology,
            debug,
        } => {
            let request = SearchRequest::post(read_json(&file)?);
            let ontology = match ontology {
                Some(path) => InMemoryOntology::from_json_file(&path)?,
                None => InMemoryOntology::new(),
            };
            let executor =
                SearchExecutor::with_config(&BuiltinSchemaValidator, &ontology, &OfflineIndex, config);

            let mut sink = DebugSink::new();
            let compiled = executor
                .compile(&request, if debug { Some(&mut sink) } else { None })
                .await;
            if debug {
                println!("{}", serde_json::to_string_pretty(&sink.into_value())?);
            }
            match compiled {
                Ok(compiled) if !debug => {
                    let output = serde_json::json!({
                        "count": compiled.count,
                        "search": compiled.search,
                        "statistics": compiled.statistics,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                Ok(_) => {}
                Err(err) => return report(err),
            }
        }
        Command::Inspect { id, ontology } => {
            let ontology = InMemoryOntology::from_json_file(&ontology)?;
            let executor =
                SearchExecutor::with_config(&BuiltinSchemaValidator, &ontology, &OfflineIndex, config);
            match executor.inspect_disease(&id).await? {
                Some(inspection) => println!("{}", serde_json::to_string_pretty(&inspection)?),
                None => bail!("unknown disease '{}'", id),
            }
        }
    }

    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn report(err: SearchError) -> anyhow::Result<()> {
    for message in err.messages() {
        eprintln!("{}", message);
    }
    bail!("request {}", err.terminal_state())
}
