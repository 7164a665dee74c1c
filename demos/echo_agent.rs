//! Echo agent served over HTTP, then called by a client in the same process.
//!
//! Run with `cargo run --example echo_agent`. Set `RUST_LOG=a2a_relay=debug`
//! to follow the protocol traffic.

use a2a_relay::{prelude::*, server::ContinuationHandle};
use async_trait::async_trait;
use serde_json::json;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const ADDRESS: &str = "127.0.0.1:10000";

/// Echoes the caller's text back as a message and an artifact.
///
/// A lone `?` asks the caller for the text to echo first.
struct EchoExecutor;

#[async_trait]
impl AgentExecutor for EchoExecutor {
    async fn execute(&self, context: ExecutionContext, updater: TaskUpdater) -> anyhow::Result<()> {
        let Some(text) = context.user_text() else {
            updater.fail("Error processing task: no text in message")?;
            return Ok(());
        };

        if text.trim() == "?" {
            updater.require_input(
                Message::agent("What should I echo?"),
                Some(ContinuationHandle::new(json!({"asked": true}))),
            )?;
            return Ok(());
        }

        updater.start_work(Some(Message::agent("Echoing...")))?;
        updater.add_artifact(Artifact::text("echo", "echo", text.clone()))?;
        updater.complete(Some(Message::agent(format!("Echo received: '{}'", text))))?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let card = AgentCard::new("Echo Agent", "Repeats what it is told", format!("http://{}/", ADDRESS))
        .with_version("1.0.0")
        .with_capabilities(AgentCapabilities::default().with_streaming())
        .with_skill(AgentSkill::new("echo", "Echo", "Returns the input text"));

    let listener = TcpListener::bind(ADDRESS).await?;
    let server = A2AServer::new(card, InMemoryTaskManager::new(EchoExecutor));
    tokio::spawn(server.serve(listener));

    let base = format!("http://{}", ADDRESS).parse()?;
    let card = CardResolver::new().discover(&base).await?;
    println!("Discovered {} (streaming: {})", card.name, card.capabilities.streaming);

    let mut client = A2AClientBuilder::for_card(&card, &base)?.build()?;

    let mut conversation = Conversation::generate();
    let task = conversation.send(&mut client, Message::user("?")).await?;
    println!("{}: {}", task.id, task.status.state.as_str());
    if let Some(question) = conversation.prompt_text() {
        println!("Agent asks: {}", question);
    }

    let completion = conversation
        .stream(&mut client, Message::user("hello relay"), |event| match event {
            Ok(event) => println!("  event: {}", event.kind()),
            Err(e) => println!("  stream error: {}", e),
        })
        .await?;
    println!(
        "{}: {} with {} artifact(s)",
        completion.task.id,
        completion.task.status.state.as_str(),
        completion.task.artifacts.len()
    );

    Ok(())
}
