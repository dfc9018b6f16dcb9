use anyhow::{Context, Result};
use clap::Parser;
use parking_assistant::ai::{ChatClient, RelayBackend};
use parking_assistant::cli::Cli;
use parking_assistant::config::{Config, LOG_VAR};
use parking_assistant::rate_limit::{Clock, RateLimiter, SystemClock};
use parking_assistant::session::ChatSession;
use parking_assistant::storage::{FileStore, KeyValueStore, MemoryStore};
use parking_assistant::view::{self, Command};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(config: &Config, ephemeral: bool) -> Arc<dyn KeyValueStore> {
    if ephemeral {
        return Arc::new(MemoryStore::new());
    }
    match &config.data_dir {
        Some(dir) => Arc::new(FileStore::new(dir.clone())),
        None => Arc::new(FileStore::default_location()),
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("invalid configuration")?;
    let cli = Cli::parse();
    let config = cli.apply(config);
    init_logging();

    let store = open_store(&config, cli.ephemeral);
    let backend = RelayBackend::new(
        config.relay_url.clone(),
        config.api_key.clone(),
        Some(config.timeout),
    )
    .context("failed to build HTTP client")?;
    let client = ChatClient::new(Arc::new(backend), Arc::new(RateLimiter::new(store)));
    let mut session = ChatSession::new(client);

    println!("Parking Ticket Assistant (type /help for commands)");
    for message in session.history() {
        println!("{}", view::render_message(message));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await? {
        match view::parse_command(&line) {
            Command::Quit => break,
            Command::Help => println!("{}", view::HELP),
            Command::Clear => {
                session.clear_ticket();
                println!("Ticket photo removed.");
            }
            Command::Remaining => {
                let remaining = session.remaining();
                println!("{}", view::render_remaining(&remaining, SystemClock.now_ms()));
            }
            Command::Attach(path) => {
                let before = session.history().len();
                match session.attach_ticket_file(path).await {
                    Ok(()) => {
                        for message in &session.history()[before..] {
                            println!("{}", view::render_message(message));
                        }
                    }
                    Err(err) => println!("{err}"),
                }
            }
            Command::Analyze(question) => match session.analyze_ticket(question).await {
                Ok(Some(message)) => println!("{}", view::render_message(&message)),
                Ok(None) => println!("Attach a ticket photo first with /attach <path>."),
                Err(_) => println!("{}", view::FAILURE_NOTICE),
            },
            Command::Say(text) => match session.send_message(text).await {
                Ok(Some(message)) => {
                    println!("{}", view::render_message(&message));
                    let remaining = session.remaining();
                    let now = SystemClock.now_ms();
                    if let Some(notice) = view::render_limit_notice(&remaining, now) {
                        println!("{notice}");
                    }
                }
                Ok(None) => {}
                Err(_) => println!("{}", view::FAILURE_NOTICE),
            },
        }
        prompt();
    }

    Ok(())
}
