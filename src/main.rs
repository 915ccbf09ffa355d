//! convmem CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use convmem::{
    commands::{
        cmd_graph, cmd_import, cmd_init, cmd_search, cmd_stats, open_for_query, parse_entity,
        print_graph_response, print_import_report, print_init_summary, print_search_results,
        print_stats, GraphRequest, InitOptions,
    },
    config::Config,
    db::MemoryDb,
    error::Result,
    progress::LogWriterFactory,
};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "convmem")]
#[command(version, about = "Import Claude and ChatGPT exports into a searchable memory database", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and create the database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,

        /// Database file to use instead of the default
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Import the configured Claude and ChatGPT exports
    Import,

    /// Search memories, or show statistics when no search terms are given
    Query {
        /// Search terms (joined with spaces)
        terms: Vec<String>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Talk to the memory knowledge-graph service
    Graph {
        #[command(subcommand)]
        action: GraphCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum GraphCommands {
    /// Create an entity
    CreateEntity {
        /// Entity name
        name: String,

        /// Entity type
        #[arg(value_name = "TYPE")]
        entity_type: String,

        /// Extra fields as a JSON object
        #[arg(long)]
        data: Option<String>,
    },

    /// Record an observation about an entity
    AddObservation {
        /// Entity the observation is about
        entity: String,

        /// Observation text
        content: String,

        /// Where the observation came from
        #[arg(long)]
        source: Option<String>,
    },

    /// Search entities
    Search {
        /// Search terms (joined with spaces)
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Show the graph around an entity
    Get {
        /// Entity name
        entity: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force, db } => handle_init(cli.config, force, db, cli.json).await,

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "convmem", &mut std::io::stdout());
            Ok(())
        }

        Commands::Import => {
            let config = load_config(cli.config.as_deref())?;
            let db = MemoryDb::open(&config.database.file).await?;

            let result = cmd_import(&config, &db).await;
            db.close().await;
            let report = result?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_import_report(&report);
            }
            Ok(())
        }

        Commands::Graph { action } => {
            let config = load_config(cli.config.as_deref())?;
            let request = match action {
                GraphCommands::CreateEntity {
                    name,
                    entity_type,
                    data,
                } => GraphRequest::CreateEntity(parse_entity(&name, &entity_type, data.as_deref())?),
                GraphCommands::AddObservation {
                    entity,
                    content,
                    source,
                } => GraphRequest::AddObservation {
                    entity_name: entity,
                    content,
                    source,
                },
                GraphCommands::Search { terms } => GraphRequest::Search {
                    query: terms.join(" "),
                },
                GraphCommands::Get { entity } => GraphRequest::Get {
                    entity_name: entity,
                },
            };

            let response = cmd_graph(&config.graph, request).await?;
            print_graph_response(&response)
        }

        Commands::Query { terms, limit } => {
            let config = load_config(cli.config.as_deref())?;
            let db = open_for_query(&config.database.file).await?;

            let result = handle_query(&config, &db, &terms, limit, cli.json).await;
            db.close().await;
            result
        }
    }
}

async fn handle_init(
    config_path: Option<PathBuf>,
    force: bool,
    db_file: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    // A .toml path is the config file itself; anything else is its directory.
    let config_path = match config_path {
        Some(path) if path.extension().map_or(false, |e| e == "toml") => path,
        Some(dir) => dir.join("config.toml"),
        None => Config::default_config_path(),
    };

    let summary = cmd_init(InitOptions {
        config_path,
        db_file,
        force,
    })
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_init_summary(&summary);
    }
    Ok(())
}

async fn handle_query(
    config: &Config,
    db: &MemoryDb,
    terms: &[String],
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    if terms.is_empty() {
        let stats = cmd_stats(db, config.query.recent_conversations).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            print_stats(&stats, config.query.title_chars);
            println!("Usage: convmem query <search term>");
            println!("Example: convmem query 'memory MCP'");
        }
        return Ok(());
    }

    let query = terms.join(" ");
    let limit = limit.unwrap_or(config.query.default_limit);
    let results = cmd_search(db, &query, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_search_results(&results, config.query.snippet_chars);
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_from(None),
    }
}
