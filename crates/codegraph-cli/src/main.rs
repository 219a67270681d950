use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use codegraph_core::{
    Chunk, ChunkStore, Direction, Edge, EngineConfig, HasherEmbedder, InMemoryChunkStore,
    InMemoryEdgeStore, InMemoryNodeStore, Node,
};
use codegraph_retrieval::{
    Engine, GraphPattern, GraphQuery, ResolutionTarget, RetrievalRequest, TraversalStep,
};
use colored::Colorize;
use serde::Serialize;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "codegraph")]
#[command(about = "CodeGraph retrieval engine CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Path to an engine configuration file (layered over defaults and env)
    #[arg(long, global = true, env = "CODEGRAPH_CONFIG")]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed a small in-memory graph (a doctor treating two patients, one
    /// with a linked clinical note) and run one retrieval against it
    Demo {
        /// The retrieval query text
        #[arg(short, long, default_value = "chronic condition")]
        query: String,

        /// Vector/top-k pull size
        #[arg(short, long, default_value_t = 5)]
        top_k: usize,

        /// Default traversal depth when no pattern is declared
        #[arg(short, long, default_value_t = 2)]
        depth: usize,

        /// Run the "same doctor, other patients" declared pattern (R2)
        /// instead of the default k-hop expansion
        #[arg(short, long)]
        pattern: bool,

        /// Print the assembled, token-budgeted context instead of the raw result
        #[arg(short, long)]
        assemble: bool,

        /// Token budget for --assemble
        #[arg(long, default_value_t = 512)]
        max_tokens: usize,
    },

    /// Print the resolved engine configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "codegraph=debug" } else { "codegraph=info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = EngineConfig::load(cli.config.as_deref().map(std::path::Path::new))
        .context("failed to load engine configuration")?;

    match execute_command(&cli, config).await {
        Ok(output) => {
            print_output(&cli.output, &output)?;
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn execute_command(cli: &Cli, config: EngineConfig) -> Result<serde_json::Value> {
    match &cli.command {
        Commands::Demo { query, top_k, depth, pattern, assemble, max_tokens } => {
            execute_demo_command(query, *top_k, *depth, *pattern, *assemble, *max_tokens, config).await
        }
        Commands::Status => execute_status_command(config),
    }
}

#[derive(Serialize)]
struct RetrievalSummary {
    strategy: String,
    retrieval_time_ms: u64,
    empty: bool,
    node_count: usize,
    edge_count: usize,
    chunk_count: usize,
    matched_path_count: usize,
    context: Option<String>,
}

/// Builds a tiny fixture: `Doctor --TREATS--> Patient A`, `Doctor
/// --TREATS--> Patient B`, with a clinical note chunk linked to B (spec §8
/// scenario S1 "same-doctor-patients" and the hybrid vector+graph fusion
/// path).
async fn execute_demo_command(
    query: &str,
    top_k: usize,
    depth: usize,
    use_pattern: bool,
    assemble: bool,
    max_tokens: usize,
    mut config: EngineConfig,
) -> Result<serde_json::Value> {
    config.retrieval.top_k = top_k;
    config.retrieval.traversal_depth = depth;

    let chunk_store = Arc::new(InMemoryChunkStore::new());
    let embedder = Arc::new(HasherEmbedder::new(config.embedding.dimension));

    let doctor = Node::new("Doctor").with_property("name", "Dr. Avery");
    let patient_a = Node::new("Patient").with_property("name", "Alex");
    let patient_b = Node::new("Patient")
        .with_property("name", "Bailey")
        .with_property("chronic", true);
    let (doctor_id, a_id, b_id) = (doctor.id, patient_a.id, patient_b.id);

    let note = Chunk::new("Bailey presents with a chronic condition requiring follow-up.")
        .with_embedding(embedder.embed("chronic condition").await?)
        .with_linked_node(b_id);
    chunk_store.save(note).await.context("failed to seed demo chunk")?;

    let engine = Engine::new(
        Arc::new(InMemoryNodeStore::new()),
        Arc::new(InMemoryEdgeStore::new()),
        chunk_store,
        embedder,
        config,
    );
    engine
        .load_from_store(
            vec![doctor, patient_a, patient_b],
            vec![Edge::new(doctor_id, a_id, "TREATS"), Edge::new(doctor_id, b_id, "TREATS")],
        )
        .await
        .context("failed to seed demo graph")?;

    let mut request = RetrievalRequest::new(query);
    request.top_k = top_k;
    request.traversal_depth = depth;

    let patterns = if use_pattern {
        vec![GraphPattern::new("same-doctor", "patients sharing a doctor")
            .with_step(TraversalStep::new(Direction::Incoming).with_relation_type("TREATS"))
            .with_step(TraversalStep::new(Direction::Outgoing).with_relation_type("TREATS"))]
    } else {
        Vec::new()
    };
    request.graph_query = Some(GraphQuery {
        targets: vec![ResolutionTarget::new("patient").with_type_hint("Patient")],
        patterns,
        traversal_hint: Some(depth),
    });

    let result = engine.retrieve(&request).await.context("retrieval failed")?;

    let context = if assemble {
        Some(engine.assemble(&result, max_tokens).context("context assembly failed")?)
    } else {
        None
    };

    let summary = RetrievalSummary {
        strategy: result.strategy.clone(),
        retrieval_time_ms: result.retrieval_time_ms,
        empty: result.empty,
        node_count: result.nodes.len(),
        edge_count: result.edges.len(),
        chunk_count: result.chunks.len(),
        matched_path_count: result.matched_paths.len(),
        context,
    };

    Ok(serde_json::to_value(summary)?)
}

fn execute_status_command(config: EngineConfig) -> Result<serde_json::Value> {
    Ok(serde_json::json!({
        "status": "ok",
        "retrieval": config.retrieval,
        "concurrency": config.concurrency,
        "timeouts": config.timeouts,
        "embedding": config.embedding,
    }))
}

fn print_output(format: &OutputFormat, value: &serde_json::Value) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Pretty => {
            print_pretty(value)?;
        }
    }
    Ok(())
}

fn print_pretty(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    serde_json::Value::String(s) => {
                        println!("{}: {}", key_colored, s.green());
                    }
                    serde_json::Value::Number(n) => {
                        println!("{}: {}", key_colored, n.to_string().yellow());
                    }
                    serde_json::Value::Bool(b) => {
                        let val_colored = if *b { "true".green() } else { "false".red() };
                        println!("{}: {}", key_colored, val_colored);
                    }
                    _ => {
                        println!("{}: {}", key_colored, val);
                    }
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                println!("\n{}{}:", "Item ".cyan(), (i + 1).to_string().yellow());
                print_pretty(item)?;
            }
        }
        _ => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}
