use clap::{Parser, Subcommand};
use tracing::{info, warn};

use scrawl_channel::SessionApi;
use scrawl_client::{ClientUpdate, CollabClient};
use scrawl_core::{ClientConfig, SessionCode};

#[derive(Parser)]
#[command(
    name = "scrawl",
    about = "Headless client for Scrawl collaborative canvas sessions",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Base service URL (overrides the config file)
    #[arg(short, long, global = true)]
    server: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new session and follow it
    Create,

    /// Join an existing session and follow it
    Join {
        /// Six-character session code (case-insensitive)
        code: String,
    },

    /// Join a session, clear its canvas, and exit
    Clear {
        /// Six-character session code (case-insensitive)
        code: String,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(server) = &cli.server {
        config.base_url = server.clone();
    }
    Ok(config)
}

enum Step {
    Interrupted,
    Update(ClientUpdate),
    Ended,
}

/// Follow a session: log every update, keep the raster current, exit on
/// Ctrl-C or on disconnect (no automatic reconnect).
async fn follow(config: &ClientConfig, code: SessionCode) -> anyhow::Result<()> {
    let mut client = CollabClient::connect(config, &code, None).await?;
    info!(%code, "Connecting to session");

    loop {
        let step = tokio::select! {
            _ = tokio::signal::ctrl_c() => Step::Interrupted,
            update = client.next_update() => match update {
                Some(update) => Step::Update(update),
                None => Step::Ended,
            },
        };

        match step {
            Step::Interrupted => {
                info!("Interrupted, closing channel");
                client.close();
                break;
            }
            Step::Ended => break,
            Step::Update(ClientUpdate::Opened(transport)) => {
                info!(?transport, "Connected");
            }
            Step::Update(ClientUpdate::HistoryReplayed(count)) => {
                info!(
                    events = count,
                    painted = client.surface().painted_count(),
                    "History replayed"
                );
            }
            Step::Update(ClientUpdate::Drawn) => {
                info!(
                    painted = client.surface().painted_count(),
                    authors = client.active_authors(),
                    "Draw event applied"
                );
            }
            Step::Update(ClientUpdate::Cleared) => {
                info!("Canvas cleared by a peer");
            }
            Step::Update(ClientUpdate::Ignored) => {}
            Step::Update(ClientUpdate::Disconnected(reason)) => {
                warn!(?reason, "Disconnected");
                break;
            }
        }
    }
    Ok(())
}

async fn clear(config: &ClientConfig, code: SessionCode) -> anyhow::Result<()> {
    let mut client = CollabClient::connect(config, &code, None).await?;
    // Waits for the clear to come back so we know the server applied it; an
    // unconfirmed clear is a failure, not a silent exit.
    client.clear_confirmed().await?;
    info!(%code, "Canvas cleared");
    client.close();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let config = load_config(&cli)?;
    let api = SessionApi::new(&config.base_url);

    match cli.command {
        Commands::Create => {
            let code = api.create().await?;
            println!("Session code: {code}");
            follow(&config, code).await
        }
        Commands::Join { code } => {
            let code = api.join(&code).await?;
            follow(&config, code).await
        }
        Commands::Clear { code } => {
            let code = api.join(&code).await?;
            clear(&config, code).await
        }
    }
}
