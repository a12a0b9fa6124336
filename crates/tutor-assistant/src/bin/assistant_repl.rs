//! Interactive console for the assistant.
//!
//! Usage: assistant_repl [config.json] [seed.json]
//!
//! Without a config file the default location is tried, then built-in
//! defaults. Without a seed file the store starts empty.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use tutor_assistant::{AssistantConfig, ChatEngine, ChatRequest, ConversationTurn, InMemoryStore, UserRole};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let seed_path = args.next().map(PathBuf::from);

    let config = match config_path {
        Some(path) => AssistantConfig::from_file(&path).map_err(anyhow::Error::msg)?,
        None => {
            let path = AssistantConfig::default_path();
            if path.exists() {
                AssistantConfig::from_file(&path).map_err(anyhow::Error::msg)?
            } else {
                AssistantConfig::default()
            }
        }
    };

    let store = match seed_path {
        Some(path) => InMemoryStore::from_file(&path)
            .with_context(|| format!("Failed to load seed data from {}", path.display()))?,
        None => InMemoryStore::default(),
    };

    let engine = ChatEngine::from_config(&config, Arc::new(store))?;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut history: Vec<ConversationTurn> = Vec::new();

    stdout.write_all("Nhập câu hỏi (Ctrl-D để thoát).\n> ".as_bytes()).await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let request = ChatRequest::new(line.clone())
            .with_role(UserRole::Student)
            .with_history(history.clone());
        let reply = engine.chat(request).await;

        stdout
            .write_all(format!("\n{}\n\n> ", reply.response).as_bytes())
            .await?;
        stdout.flush().await?;

        history.push(ConversationTurn::user(line));
        history.push(ConversationTurn::assistant(reply.response));
    }

    Ok(())
}
