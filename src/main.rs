use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chat_moderation_pipeline::{
    config::{Config, LogFormat},
    pipeline::{ModerationReport, ModerationRequest, ScoreReport},
    server::{AppState, RpcServer},
};

/// Multi-stage chat moderation over stdio JSON-RPC.
#[derive(Debug, Parser)]
#[command(name = "chat-moderation", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve JSON-RPC requests on stdin/stdout (default)
    Serve,
    /// Run one message through the full pipeline and print the report
    Analyze(MessageArgs),
    /// Print the sentiment score for one message
    Score(MessageArgs),
}

#[derive(Debug, Args)]
struct MessageArgs {
    /// Message text
    message: String,
    /// Sender display name
    #[arg(long, default_value = "player")]
    username: String,
    /// Player identifier (generated when absent)
    #[arg(long)]
    id: Option<String>,
    /// Message identifier (generated when absent)
    #[arg(long)]
    message_id: Option<String>,
}

impl From<MessageArgs> for ModerationRequest {
    fn from(args: MessageArgs) -> Self {
        Self {
            message: args.message,
            username: args.username,
            id: args.id,
            message_id: args.message_id,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Chat moderation pipeline starting..."
    );

    let state = match AppState::from_config(&config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!(error = %e, "Failed to initialize pipeline");
            return Err(e.into());
        }
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let server = RpcServer::new(state);
            if let Err(e) = server.run().await {
                error!(error = %e, "Server error");
                return Err(e.into());
            }
            info!("Server shutdown complete");
        }
        Command::Analyze(args) => {
            let message = ModerationRequest::from(args).into_message();
            let outcome = state.pipeline.run(message).await;
            print_json(&ModerationReport::from(&outcome))?;
        }
        Command::Score(args) => {
            let message = ModerationRequest::from(args).into_message();
            let analysis = state.pipeline.analyze(&message).await;
            print_json(&ScoreReport::new(&message, &analysis))?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
