use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chirp_api::BackendClient;
use chirp_monitor::HealthMonitor;

#[derive(Parser)]
#[command(name = "chirp", version, about = "Floating chat overlay for a local inference backend")]
struct Cli {
    /// Backend base URL (localhost may use http; other hosts require https)
    #[arg(long, env = chirp_api::BASE_URL_ENV)]
    base_url: Option<String>,

    /// Model name sent with every prompt
    #[arg(long, env = "CHIRP_MODEL", default_value = "phi")]
    model: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Perform one classified health probe and exit (status 0 iff healthy)
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Log to a file while the TUI owns the terminal.
    init_tracing(cli.command.is_none())?;

    let client = match cli.base_url.as_deref() {
        Some(base_url) => BackendClient::with_base_url(base_url)?,
        None => BackendClient::new_from_env()?,
    };

    match cli.command {
        Some(Command::Health) => run_health(&client).await,
        None => run_tui(client, cli.model).await,
    }
}

/// Log to stderr for one-shot commands; to a file otherwise.
fn init_tracing(to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if to_file {
        let dir = dirs_next::data_dir().unwrap_or_else(std::env::temp_dir).join("chirp");
        std::fs::create_dir_all(&dir).with_context(|| format!("create log directory {}", dir.display()))?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("chirp.log"))
            .context("open log file")?;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(file)
            .with_ansi(false)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
    Ok(())
}

async fn run_health(client: &BackendClient) -> Result<()> {
    let state = chirp_monitor::check_now(client).await;
    println!("{}: {}", state.status.label(), state.message);
    if !state.status.chat_enabled() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_tui(client: BackendClient, model: String) -> Result<()> {
    tracing::info!(base_url = client.base_url(), %model, "starting chat overlay");
    let client = Arc::new(client);
    let monitor = HealthMonitor::new(Arc::clone(&client));
    monitor.start();

    let result = chirp_tui::run(Arc::clone(&client), monitor.subscribe(), model).await;

    monitor.stop();
    result
}
