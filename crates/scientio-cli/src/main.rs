//! CLI entry point for the Scientio knowledge graph.

mod args;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use scientio_core::{Node, NodeDocument, SchemaRecord, SchemaRegistry, ScientioConfig};
use scientio_graph::{GraphConfig, Lookup, Operations, Session};

use crate::args::NodeArgs;

#[derive(Parser)]
#[command(name = "scientio")]
#[command(about = "Ontology-typed memory on a Neo4j knowledge graph")]
struct Cli {
    /// Config file prefix (default: scientio).
    #[arg(short, long, default_value = "scientio")]
    config: String,

    /// Ontology file, overriding ontology.path from config.
    #[arg(long)]
    ontology: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the entity types in the ontology.
    Types,
    /// Create a node.
    Create(NodeArgs),
    /// Fetch the node with the given id.
    Get {
        #[arg(long)]
        id: i64,
    },
    /// Find nodes matching an example.
    Find(NodeArgs),
    /// Set properties and merge relationships on a stored node.
    Update(NodeArgs),
    /// Remove properties and relationships from a stored node.
    Delete(NodeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let mut config = ScientioConfig::load(&cli.config)?;
    let ontology = Arc::new(load_ontology(cli.ontology.as_deref(), &mut config)?);

    let graph_config = GraphConfig::from(config.neo4j.clone());
    let driver = config.session.driver.as_str();

    match cli.command {
        Command::Types => {
            let records: Vec<SchemaRecord> =
                ontology.types().map(|t| SchemaRecord::from(&**t)).collect();
            print_json(&records)
        }
        Command::Create(args) => {
            let node = to_node(args, &ontology)?;
            let session = Session::connect(driver, ontology.clone(), &graph_config).await?;
            let created = session
                .create(&node)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Store returned no node for create"))?;
            print_json(&created.to_document())
        }
        Command::Get { id } => {
            let session = Session::connect(driver, ontology.clone(), &graph_config).await?;
            let nodes = session.retrieve(Lookup::Id(id)).await?;
            print_nodes(&nodes)
        }
        Command::Find(args) => {
            let example = to_node(args, &ontology)?;
            let session = Session::connect(driver, ontology.clone(), &graph_config).await?;
            let nodes = session.retrieve(Lookup::Example(&example)).await?;
            print_nodes(&nodes)
        }
        Command::Update(args) => {
            let node = to_stored_node(args, &ontology)?;
            let session = Session::connect(driver, ontology.clone(), &graph_config).await?;
            let updated = session
                .update(&node)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Node {} not found after update", node.id()))?;
            print_json(&updated.to_document())
        }
        Command::Delete(args) => {
            let node = to_stored_node(args, &ontology)?;
            let session = Session::connect(driver, ontology.clone(), &graph_config).await?;
            let removed = session.delete(&node).await?;
            print_json(&serde_json::json!({ "id": node.id(), "removed": removed }))
        }
    }
}

/// Load the ontology, with `override_path` taking precedence over the
/// configured `ontology.path`.
fn load_ontology(
    override_path: Option<&Path>,
    config: &mut ScientioConfig,
) -> anyhow::Result<SchemaRegistry> {
    if let Some(path) = override_path {
        config.ontology.path = Some(path.to_string_lossy().into_owned());
    }
    Ok(config.load_ontology()?)
}

fn to_node(args: NodeArgs, ontology: &SchemaRegistry) -> anyhow::Result<Node> {
    let entity = args.entity.clone();
    args.into_document()
        .into_node(ontology)
        .ok_or_else(|| anyhow::anyhow!("Unknown entity: {entity}. Run `scientio types` to list them"))
}

fn to_stored_node(args: NodeArgs, ontology: &SchemaRegistry) -> anyhow::Result<Node> {
    if args.id.is_none() {
        anyhow::bail!("--id is required to change a stored node");
    }
    to_node(args, ontology)
}

fn print_nodes(nodes: &[Node]) -> anyhow::Result<()> {
    let docs: Vec<NodeDocument> = nodes.iter().map(NodeDocument::from).collect();
    print_json(&docs)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
