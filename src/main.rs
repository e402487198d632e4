//! kgraph CLI: load an extraction batch, reason over it, inspect the result.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};

use kgraph::config::EngineConfig;
use kgraph::engine::Engine;
use kgraph::graph::Timestamp;
use kgraph::graph::analytics::degree_centrality;
use kgraph::ingest::IngestBatch;

#[derive(Parser)]
#[command(name = "kgraph", version, about = "In-memory knowledge graph with inference")]
struct Cli {
    /// JSON extraction batch (`{"nodes": [...], "edges": [...]}`) to load.
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// TOML engine configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Inference passes to run after loading.
    #[arg(long, global = true, default_value = "1")]
    passes: usize,

    /// Apply confidence decay with the configured half-life after inference.
    #[arg(long, global = true)]
    decay: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show graph statistics.
    Stats {
        /// Also list the N best-connected nodes.
        #[arg(long, default_value = "0")]
        top: usize,
    },

    /// Build the retrieval context for a free-text query.
    Query {
        /// Query text.
        text: String,

        /// Maximum number of nodes in the context.
        #[arg(long)]
        max_nodes: Option<usize>,

        /// Print the context as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List nodes and edges valid at an instant.
    Valid {
        /// Epoch seconds or a `YYYY-MM-DD` date. Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let engine = build_engine(&cli)?;

    match cli.command {
        Commands::Stats { top } => {
            print!("{}", engine.get_stats());
            if top > 0 {
                println!("  most connected:");
                for entry in degree_centrality(engine.graph()).into_iter().take(top) {
                    println!(
                        "    {} (in {}, out {})",
                        entry.id, entry.in_degree, entry.out_degree
                    );
                }
            }
        }

        Commands::Query {
            text,
            max_nodes,
            json,
        } => {
            let context = engine.get_context_for_query(&text, max_nodes);
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&context).into_diagnostic()?
                );
            } else {
                print!("{context}");
            }
        }

        Commands::Valid { at } => {
            let at = match at {
                Some(raw) => parse_instant(&raw)?,
                None => kgraph::graph::now_secs(),
            };
            let nodes = engine.get_valid_nodes(at);
            let edges = engine.get_valid_edges(at);
            println!("valid nodes ({}):", nodes.len());
            for node in &nodes {
                println!("  {} [{}] {}", node.id, node.node_type, node.label);
            }
            println!("valid edges ({}):", edges.len());
            for edge in &edges {
                println!("  {} -{}-> {}", edge.source, edge.relation, edge.target);
            }
        }
    }

    Ok(())
}

fn build_engine(cli: &Cli) -> Result<Engine> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let mut engine = Engine::new(config)?;

    if let Some(path) = &cli.input {
        let content = std::fs::read_to_string(path).into_diagnostic()?;
        let report = IngestBatch::from_json(&content)?.apply(&mut engine);
        tracing::info!(
            file = %path.display(),
            rejected = report.edges_rejected,
            "loaded input"
        );
    }

    for pass in 1..=cli.passes {
        let report = engine.run_inference();
        if report.is_empty() {
            tracing::debug!(pass, "inference reached a fixed point");
            break;
        }
    }

    if cli.decay {
        engine.apply_default_decay()?;
    }
    Ok(engine)
}

/// Accept epoch seconds or a calendar date (midnight UTC).
fn parse_instant(raw: &str) -> Result<Timestamp> {
    if let Ok(secs) = raw.parse::<Timestamp>() {
        return Ok(secs);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        miette!("invalid instant {raw:?}: {e} (expected epoch seconds or YYYY-MM-DD)")
    })?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| miette!("invalid instant {raw:?}"))?;
    Timestamp::try_from(midnight.and_utc().timestamp())
        .map_err(|_| miette!("instant {raw:?} is before the UNIX epoch"))
}
