use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mcp_agentic_reasoning::config::LogFormat;
use mcp_agentic_reasoning::server::rpc::RpcServer;
use mcp_agentic_reasoning::{AppState, Config};

/// MCP server for agentic reasoning orchestration
#[derive(Parser, Debug)]
#[command(name = "mcp-agentic-reasoning", version, about)]
struct Cli {
    /// Log level override (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format override (pretty, json)
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
    }

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        chat_model = %config.model.chat_model,
        reasoning_model = %config.model.reasoning_model,
        "Starting agentic reasoning server"
    );

    let state = AppState::new(config)?;
    let server = RpcServer::new(state);
    server.run().await?;

    Ok(())
}

/// Initialize tracing. Logs go to stderr: stdout carries the protocol.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
