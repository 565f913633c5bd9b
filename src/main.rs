use anyhow::{anyhow, Result};
use clap::Parser;
use convcache::cli::{Cli, Commands, SourceArgs};
use convcache::{utils, ConversationEngine, ConversationHub, Settings, SourceType, UnifiedMessage};
use futures::stream::{self, StreamExt};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;
    init_tracing(&settings.logging.level);

    let cli = Cli::parse();
    let hub = ConversationHub::from_settings(&settings)?;
    tracing::info!(
        "Conversation hub ready (page_size: {}, cache_size: {}, cache: {})",
        hub.options().page_size,
        hub.options().cache_size,
        hub.options().enable_cache
    );

    match cli.command {
        Commands::Dump { key, source, all } => {
            let source = resolve_source(source, &settings)?;
            handle_dump(&hub, key, source, all).await
        }
        Commands::Browse { key, source } => {
            let source = resolve_source(source, &settings)?;
            handle_browse(&hub, key, source).await
        }
        Commands::Prefetch { keys, source, concurrency } => {
            let source = resolve_source(source, &settings)?;
            handle_prefetch(&hub, keys, source, concurrency).await
        }
    }
}

fn init_tracing(level: &str) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn resolve_source(args: SourceArgs, settings: &Settings) -> Result<SourceType> {
    if let Some(dir) = args.dir {
        return Ok(SourceType::FileSystem(dir));
    }
    if let Some(url) = args.url.or_else(|| settings.http.base_url.clone()) {
        return Ok(SourceType::Http(url));
    }
    Err(anyhow!(
        "No conversation source: pass --dir or --url, or set http.base_url"
    ))
}

async fn handle_dump(hub: &ConversationHub, key: String, source: SourceType, all: bool) -> Result<()> {
    let engine = hub.engine()?;
    engine.bind(hub.open(source, key.clone())?).await;

    if all {
        while engine.has_more_before() && engine.error().is_none() {
            let loaded = engine.messages().len();
            engine.load_more_before().await;
            if engine.messages().len() == loaded {
                break;
            }
        }
    }

    let snapshot = engine.snapshot();
    utils::print_header(&format!("Conversation {} ({} messages)", key, snapshot.messages.len()));
    utils::print_snapshot(&snapshot);

    match snapshot.error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

async fn handle_browse(hub: &ConversationHub, key: String, source: SourceType) -> Result<()> {
    utils::print_header("Conversation Browser");
    utils::print_info("Commands: more, open <key>, send <text>, reset, status, help, quit\n");

    let engine = hub.engine()?;
    engine.bind(hub.open(source.clone(), key)?).await;
    utils::print_snapshot(&engine.snapshot());

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin);
    let mut sent = 0usize;

    loop {
        utils::print_prompt("> ");
        let mut input = String::new();
        if reader.read_line(&mut input).await? == 0 {
            return Ok(());
        }

        let input = input.trim();
        let (command, argument) = match input.split_once(' ') {
            Some((command, argument)) => (command, argument.trim()),
            None => (input, ""),
        };

        match command {
            "" => continue,
            "quit" | "exit" => return Ok(()),
            "more" => {
                if !engine.has_more_before() {
                    utils::print_info("Already at the start of the conversation");
                    continue;
                }
                engine.load_more_before().await;
                utils::print_snapshot(&engine.snapshot());
            }
            "open" if !argument.is_empty() => {
                engine.bind(hub.open(source.clone(), argument)?).await;
                utils::print_header(&format!("Conversation {}", argument));
                utils::print_snapshot(&engine.snapshot());
            }
            "send" if !argument.is_empty() => {
                sent += 1;
                send_local(&engine, argument, sent);
                utils::print_snapshot(&engine.snapshot());
            }
            "reset" => {
                engine.reset();
                utils::print_success("Conversation discarded from cache");
            }
            "status" => print_status(hub, &engine),
            _ => {
                println!("Commands:");
                println!("  more          - Load older messages");
                println!("  open <key>    - Switch to another conversation");
                println!("  send <text>   - Append a local message");
                println!("  reset         - Clear the conversation and its cache entry");
                println!("  status        - Show engine and cache state");
                println!("  quit          - Exit\n");
            }
        }
    }
}

/// Optimistic echo followed by the confirmed record
fn send_local(engine: &ConversationEngine, text: &str, sequence: usize) {
    let temp_id = format!("temp-{}", sequence);
    let draft = UnifiedMessage::new(temp_id.clone())
        .with_field("role", "user")
        .with_field("content", text);
    engine.append_message(draft.clone());

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let mut confirmed = draft;
    confirmed.id = format!("local-{}-{}", millis, sequence);
    engine.finalize_message(&temp_id, confirmed);
}

fn print_status(hub: &ConversationHub, engine: &ConversationEngine) {
    let snapshot = engine.snapshot();
    utils::print_info(&format!(
        "Bound: {}",
        snapshot.key.as_deref().unwrap_or("<none>")
    ));
    utils::print_info(&format!("Messages loaded: {}", snapshot.messages.len()));
    utils::print_info(&format!("Older messages available: {}", snapshot.has_more_before));
    utils::print_info(&format!(
        "Cached conversations ({}/{}): {}",
        hub.store().len(),
        hub.options().cache_size,
        hub.store().keys().join(", ")
    ));
    if let Some(error) = snapshot.error {
        utils::print_error(&error.to_string());
    }
    println!();
}

async fn handle_prefetch(
    hub: &ConversationHub,
    keys: Vec<String>,
    source: SourceType,
    concurrency: usize,
) -> Result<()> {
    utils::print_info(&format!(
        "Prefetching {} conversations with concurrency {}",
        keys.len(),
        concurrency
    ));

    let source = &source;
    let results: Vec<Result<(String, usize, Option<String>)>> = stream::iter(keys)
        .map(|key| async move {
            let engine = hub.engine()?;
            engine.bind(hub.open(source.clone(), key.clone())?).await;
            let snapshot = engine.snapshot();
            Ok::<_, anyhow::Error>((
                key,
                snapshot.messages.len(),
                snapshot.error.map(|e| e.to_string()),
            ))
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    for result in results {
        match result {
            Ok((key, _, Some(error))) => utils::print_error(&format!("{}: {}", key, error)),
            Ok((key, count, None)) => utils::print_success(&format!("{}: {} messages", key, count)),
            Err(e) => utils::print_error(&format!("Prefetch failed: {}", e)),
        }
    }

    utils::print_info(&format!(
        "Resident in cache ({}/{}): {}",
        hub.store().len(),
        hub.options().cache_size,
        hub.store().keys().join(", ")
    ));
    Ok(())
}
