use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use socratic_core::{Config, Coordinator, DialogueBackend, DialogueClient};
use tracing::info;

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "socratic", version)]
#[command(about = "Terminal client for the Socratic tutor dialogue service")]
struct Cli {
    /// Base URL of the dialogue service
    #[arg(long, env = "SOCRATIC_API_URL", global = true)]
    api_url: Option<String>,

    /// Write logs here instead of the default cache location
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Remember the resolved API URL in the config file
    #[arg(long, global = true)]
    save: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the tutor's reply
    Ask {
        /// Your question
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::init(cli.log_file.as_deref())?;

    let mut config = Config::load().context("loading configuration")?;
    let api_url = config.resolve_api_url(cli.api_url.as_deref());
    info!(%api_url, "starting socratic client");

    if cli.save {
        config.api_url = Some(api_url.clone());
        config.save().context("saving configuration")?;
    }

    let client = match config.request_timeout() {
        Some(timeout) => DialogueClient::with_timeout(&api_url, timeout)?,
        None => DialogueClient::new(&api_url),
    };

    match cli.command {
        Some(Commands::Ask { question }) => ask(&client, &question).await,
        None => run_tui(Arc::new(client), api_url).await,
    }
}

async fn ask(client: &DialogueClient, question: &str) -> Result<()> {
    let mut coordinator = Coordinator::new();

    if !coordinator.send(client, question).await {
        bail!("Nothing to ask: the question is empty");
    }
    if let Some(error) = coordinator.last_error() {
        bail!("{}", error);
    }

    if let Some(reply) = coordinator.messages().last() {
        println!("{}", reply.content);
        if let Some(meta) = &reply.meta {
            println!("\n{}", meta.summary());
        }
    }

    Ok(())
}

async fn run_tui(backend: Arc<dyn DialogueBackend>, api_url: String) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = EventHandler::new();
    let mut app = App::new(backend, api_url, events.sender());

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    info!(
        messages = app.messages().len(),
        total_tokens = app.coordinator.total_tokens(),
        "session ended"
    );
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}
