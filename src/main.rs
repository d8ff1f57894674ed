use anyhow::Result;
use clap::Parser;
use floodwatch::cli::{Cli, Commands};
use floodwatch::{init_with_settings, shutdown, utils, ChatReply, ServiceError, Settings};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::new()?,
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Initialize the system
    init_with_settings(settings).await?;

    let result = match cli.command {
        Commands::Chat { message, trace } => handle_chat(message, trace).await,
        Commands::Interactive { trace } => handle_interactive(trace).await,
        Commands::Tools => handle_tools(),
    };

    // Shutdown gracefully
    shutdown().await?;

    result
}

async fn handle_chat(message: String, trace: bool) -> Result<()> {
    utils::print_info("Sending request...");

    let reply = floodwatch::chat(message).await.map_err(explain)?;
    println!();
    show_reply(&reply, trace).await
}

async fn handle_interactive(trace: bool) -> Result<()> {
    utils::print_header("Floodwatch Interactive Mode");
    utils::print_info("Ask about floods, pumps, earthquakes or weather (Ctrl+D to exit)");
    utils::print_info("Note: history is kept only until you exit\n");

    let mut conversation = floodwatch::Conversation::new();

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        utils::print_prompt("You: ");
        let mut input = String::new();
        if reader.read_line(&mut input).await? == 0 {
            println!();
            return Ok(());
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        // Special commands
        match input {
            "/clear" => {
                conversation.clear();
                utils::print_success("Conversation cleared");
                println!();
                continue;
            }
            "/count" => {
                utils::print_info(&format!("Turns in conversation: {}", conversation.turns().len()));
                println!();
                continue;
            }
            "/help" => {
                println!("Special commands:");
                println!("  /clear  - Forget the conversation so far");
                println!("  /count  - Show number of turns");
                println!("  /help   - Show this help");
                println!("  Ctrl+D  - Exit\n");
                continue;
            }
            _ => {}
        }

        utils::print_info("Assistant: ");
        match conversation.send(input).await {
            Ok(reply) => show_reply(&reply, trace).await?,
            Err(e) => {
                let e = explain(e);
                utils::print_error(&format!("{:#}", e));
                if e.downcast_ref::<ServiceError>().is_some() {
                    return Err(e);
                }
            }
        }
        println!();
    }
}

fn handle_tools() -> Result<()> {
    let overview = floodwatch::catalog_overview()?;

    utils::print_header(&format!("Tool catalog v{}", overview.version));
    if !overview.configured {
        utils::print_error("Credentials missing: chat is disabled, listing only");
    }
    println!("{}", overview.description);
    Ok(())
}

async fn show_reply(reply: &ChatReply, trace: bool) -> Result<()> {
    if trace && !reply.trace.is_empty() {
        utils::print_trace(&reply.trace);
    }
    utils::print_reply(reply);

    for alert in floodwatch::pending_alerts().await? {
        utils::print_alert(&alert);
    }
    Ok(())
}

/// Give configuration failures an actionable hint
fn explain(e: anyhow::Error) -> anyhow::Error {
    let not_configured = matches!(
        e.downcast_ref::<ServiceError>(),
        Some(ServiceError::NotConfigured { .. })
    );
    if not_configured {
        e.context("set the missing variables in the environment or a .env file")
    } else {
        e
    }
}
