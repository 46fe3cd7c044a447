use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use copilot_core::{
    is_emergency_turn, ChatRole, ChatSession, Config, CopilotClient, FileStore, MemoryStore,
    TranscriptStore,
};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::{wait_for_reply, App};
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "copilot")]
#[command(version, about = "Terminal chat client for IMCI clinical guideline support")]
struct Cli {
    /// Backend base URL (overrides config and COPILOT_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Transcript file to use instead of the default location
    #[arg(long, global = true)]
    history_file: Option<PathBuf>,

    /// Keep the transcript in memory only for this run
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the full-screen chat (default)
    Chat,
    /// Send one message and print the reply
    Ask {
        /// Patient symptoms or question
        message: String,
    },
    /// Print the stored transcript
    History,
    /// Clear the stored transcript
    Clear,
    /// Show or update saved configuration
    Config {
        /// Backend base URL to save
        #[arg(long)]
        url: Option<String>,
        /// Session identifier sent with every request
        #[arg(long)]
        user_id: Option<String>,
        /// Request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);

    if matches!(command, Commands::Chat) {
        logging::init_file(&logging::default_log_path()?)?;
    } else {
        logging::init_stderr()?;
    }

    let mut config = Config::load()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable config");
            Config::new()
        })
        .with_env_overrides();
    if let Some(url) = cli.base_url {
        config.base_url = Some(url);
    }
    if let Some(path) = cli.history_file {
        config.history_path = Some(path);
    }

    match command {
        Commands::Config { url, user_id, timeout_secs } => update_config(url, user_id, timeout_secs),
        Commands::Chat => run_tui(build_session(&config, cli.ephemeral)?).await,
        Commands::Ask { message } => ask(build_session(&config, cli.ephemeral)?, &message).await,
        Commands::History => {
            print_history(&build_session(&config, cli.ephemeral)?);
            Ok(())
        }
        Commands::Clear => {
            let mut session = build_session(&config, cli.ephemeral)?;
            session.clear();
            println!("{}", "Chat history cleared.".green());
            Ok(())
        }
    }
}

fn build_session(config: &Config, ephemeral: bool) -> Result<ChatSession> {
    let store: Box<dyn TranscriptStore> = if ephemeral {
        Box::new(MemoryStore::new())
    } else {
        let path = match &config.history_path {
            Some(path) => path.clone(),
            None => FileStore::default_path()?,
        };
        let store = FileStore::new(path);
        tracing::info!(path = %store.path().display(), "using transcript file");
        Box::new(store)
    };

    let client = CopilotClient::new(config.base_url(), config.timeout())?;
    tracing::info!(base_url = client.base_url(), "using backend");

    Ok(ChatSession::initialize(store, Arc::new(client), config.user_id()))
}

async fn run_tui(session: ChatSession) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut app = App::new(session);
    let mut events = EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            tokio::select! {
                event = events.next() => match event {
                    Some(event) => handler::handle_event(&mut app, event),
                    None => break,
                },
                outcome = wait_for_reply(&mut app.reply_task), if app.reply_task.is_some() => {
                    app.finish_reply(outcome);
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;

    // Submissions are never cancelled; let an outstanding one land in the transcript
    if app.reply_task.is_some() {
        println!("Waiting for the co-pilot to finish the last reply...");
        app.await_reply().await;
    }

    result
}

async fn ask(mut session: ChatSession, message: &str) -> Result<()> {
    if message.trim().is_empty() {
        anyhow::bail!("message must not be empty");
    }

    println!("🩺 Asking the co-pilot...\n");
    session.submit(message).await;

    if let Some(reply) = session.messages().last() {
        print_turn(reply);
    }
    Ok(())
}

fn print_history(session: &ChatSession) {
    println!("{} {}\n", "Session:".bold(), session.user_id());
    for message in session.messages() {
        print_turn(message);
    }
    println!("{} turns", session.messages().len().to_string().bold());
}

fn print_turn(message: &copilot_core::ChatMessage) {
    match message.role {
        ChatRole::User => {
            println!("{}", "You:".bold().cyan());
            println!("{}\n", message.content);
        }
        ChatRole::Assistant if is_emergency_turn(message) => {
            println!("{} {}", "Co-pilot:".bold().yellow(), " EMERGENCY ".on_red().white().bold());
            println!("{}\n", message.content.red().bold());
        }
        ChatRole::Assistant => {
            println!("{}", "Co-pilot:".bold().yellow());
            println!("{}\n", message.content);
        }
    }
}

fn update_config(
    base_url: Option<String>,
    user_id: Option<String>,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let mut config = Config::load()?;
    let changed = base_url.is_some() || user_id.is_some() || timeout_secs.is_some();

    if let Some(url) = base_url {
        config.base_url = Some(url);
    }
    if let Some(id) = user_id {
        config.user_id = Some(id);
    }
    if let Some(secs) = timeout_secs {
        config.timeout_secs = Some(secs);
    }

    if changed {
        config.save()?;
        println!("{} {}", "Saved".green(), Config::get_config_path()?.display());
    }

    println!("{}  {}", "base_url".bold(), config.base_url());
    println!("{}   {}", "user_id".bold(), config.user_id());
    match config.timeout_secs {
        Some(secs) => println!("{}   {}s", "timeout".bold(), secs),
        None => println!("{}   {}", "timeout".bold(), "transport default".dimmed()),
    }
    Ok(())
}
