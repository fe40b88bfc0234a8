//! pgagent — LLM-driven PostgreSQL admin agent.
//!
//! Usage:
//!   pgagent                  → start the gateway (default)
//!   pgagent serve             → start the gateway
//!   pgagent refresh-registry  → force a binary discovery scan and persist it
//!   pgagent version           → show version

use clap::{Parser, Subcommand};
use pgagent_core::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "pgagent",
    about = "LLM-driven PostgreSQL admin agent with a sandboxed execution envelope",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the JSON config file (overridden by AGENT_CONFIG)
    #[arg(long, default_value = "./config.json")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway (default when no subcommand is given)
    Serve,
    /// Force a binary discovery scan and persist the resulting snapshot
    RefreshRegistry,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Version => {
            println!("pgagent v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::RefreshRegistry => {
            let config = AppConfig::load(&cli.config);
            init_tracing(&config.log);
            refresh_registry(&config)
        }
        Commands::Serve => {
            let config = AppConfig::load(&cli.config);
            init_tracing(&config.log);
            pgagent_gateway::start_gateway(config).await
        }
    }
}

fn init_tracing(log: &pgagent_core::LogSettings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("pgagent={},tower_http=info", log.level).into());

    let registry = tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer());

    match &log.file {
        Some(path) => {
            let directory = std::path::Path::new(path).parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = std::path::Path::new(path).file_name().and_then(|n| n.to_str()).unwrap_or("pgagent.log");
            let appender = tracing_appender::rolling::daily(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            // Leaking the guard is deliberate: it must outlive the process
            // for the background flush thread to keep running.
            std::mem::forget(guard);
            registry.with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false)).init();
        }
        None => registry.init(),
    }
}

fn refresh_registry(config: &AppConfig) -> anyhow::Result<()> {
    let allowed = [
        "psql", "pg_dump", "pg_isready", "patronictl", "pgbackrest", "pg_verifybackup", "repmgr", "pg_basebackup",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    let snapshot = pgagent_registry::refresh_registry(&config.registry_path, &allowed)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
