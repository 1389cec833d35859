//! MemoRable command-line client
//!
//! Probes and exercises a MemoRable MCP endpoint: health, status, store,
//! recall, forget, briefings, open loops, and an end-to-end smoke run.

use anyhow::Context;
use clap::{Parser, Subcommand};
use memorable_core::{MemorableClient, MemorableConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "memorable")]
#[command(about = "MCP client for the MemoRable long-term memory service", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Configuration file (defaults to ./memorable.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// MCP endpoint (overrides config and MEMORABLE_MCP_URL)
    #[arg(long)]
    url: Option<String>,

    /// Entity to speak for (overrides config and MEMORABLE_ENTITY)
    #[arg(long)]
    entity: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the service is reachable
    Health,

    /// Show service status
    Status,

    /// Store a memory
    Store {
        /// Memory text
        text: String,

        /// Person the memory is about
        #[arg(short, long)]
        person: Option<String>,
    },

    /// Search memories
    Recall {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Minimum salience (0-100)
        #[arg(long, default_value = "0")]
        min_salience: f64,
    },

    /// Forget a memory
    Forget {
        /// Memory ID
        id: String,

        /// archive, suppress or delete
        #[arg(short, long, default_value = "archive")]
        mode: String,
    },

    /// Pre-conversation briefing about a person
    Briefing {
        /// Person's name
        person: String,

        /// Ask for the short version
        #[arg(long)]
        quick: bool,
    },

    /// List open commitments
    Loops {
        /// Only commitments involving this person
        #[arg(short, long)]
        person: Option<String>,
    },

    /// Run health, connect, context, store, recall and status in sequence
    Smoke,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<MemorableConfig> {
    let mut config = match &cli.config {
        Some(path) => MemorableConfig::load_from(path),
        None => MemorableConfig::load(),
    }
    .context("failed to load configuration")?;

    if let Some(url) = &cli.url {
        config = config.with_mcp_url(url.clone());
    }
    if let Some(entity) = &cli.entity {
        config = config.with_entity(entity.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn smoke(client: &MemorableClient) -> anyhow::Result<bool> {
    println!("Testing MemoRable MCP client");
    println!("Endpoint: {}", client.config().mcp_url);
    println!("{}", "=".repeat(50));

    let healthy = client.health_check().await;
    println!("Health: {}", if healthy { "ok" } else { "UNREACHABLE" });
    if !healthy {
        println!("Cannot reach {}", client.config().mcp_url);
        return Ok(false);
    }

    let connected = client.connect().await;
    println!("MCP session: {}", if connected { "ok" } else { "FAILED" });
    if !connected {
        return Ok(false);
    }

    println!("\nSetting context...");
    let ctx = client.set_context(Some("lab"), None, Some("testing")).await?;
    println!("  Context: {}", preview(&serde_json::to_string_pretty(&ctx)?));

    println!("\nStoring test memory...");
    let memory_id = client
        .store("MCP client smoke test, hello cloud!", None, None)
        .await?;
    println!("  Stored: {}", memory_id.as_deref().unwrap_or("(no id)"));

    println!("\nRecalling 'test'...");
    for memory in client.recall("test", 3, 0.0).await? {
        println!("  [{:.0}] {}", memory.salience, preview_chars(&memory.content, 60));
    }

    println!("\nStatus...");
    let status = client.get_status().await?;
    println!("  {}", preview(&serde_json::to_string_pretty(&status)?));

    Ok(true)
}

fn preview(text: &str) -> &str {
    preview_chars(text, 200)
}

fn preview_chars(text: &str, max: usize) -> &str {
    let end = text
        .char_indices()
        .nth(max)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    &text[..end]
}

async fn run(cli: Cli, client: &MemorableClient) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Health => {
            let healthy = client.health_check().await;
            println!("{}", if healthy { "ok" } else { "unreachable" });
            Ok(healthy)
        }
        Commands::Status => {
            print_json(&client.get_status().await?)?;
            Ok(true)
        }
        Commands::Store { text, person } => {
            let context = person.map(|p| {
                let mut ctx = serde_json::Map::new();
                ctx.insert("person".into(), serde_json::Value::String(p));
                ctx
            });
            let id = client.store(&text, context, None).await?;
            println!("{}", id.as_deref().unwrap_or("(no id)"));
            Ok(true)
        }
        Commands::Recall {
            query,
            limit,
            min_salience,
        } => {
            print_json(&client.recall(&query, limit, min_salience).await?)?;
            Ok(true)
        }
        Commands::Forget { id, mode } => {
            let forgotten = client.forget(&id, Some(&mode)).await?;
            println!("{}", if forgotten { "forgotten" } else { "not forgotten" });
            Ok(forgotten)
        }
        Commands::Briefing { person, quick } => match client.get_briefing(&person, quick).await? {
            Some(briefing) => {
                print_json(&briefing)?;
                Ok(true)
            }
            None => {
                println!("No briefing for {}", person);
                Ok(false)
            }
        },
        Commands::Loops { person } => {
            print_json(&client.list_loops(person.as_deref()).await?)?;
            Ok(true)
        }
        Commands::Smoke => smoke(client).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Quiet the HTTP stack unless it is explicitly asked for
    let filter = EnvFilter::new(format!(
        "memorable={level},memorable_core={level},hyper=warn,reqwest=warn",
        level = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("MemoRable client v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    let client = MemorableClient::new(config);

    let result = run(cli, &client).await;
    client.close().await;

    Ok(if result? {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
