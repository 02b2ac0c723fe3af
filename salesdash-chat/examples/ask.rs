//! Ask the assistant one question about a dashboard snapshot.
//!
//! Set SALESDASH_LLM_API_KEY in your environment and run:
//!   cargo run -p salesdash-chat --example ask -- "Which deals should I focus on?" [snapshot.json]
//!
//! Ctrl-C cancels the request. Set RUST_LOG=salesdash_chat=debug for request logs.

use std::io::Write as _;

use rust_decimal::Decimal;
use salesdash_chat::{ChatClient, ChatConfig, ChatError, ChatRequest, system_prompt};
use salesdash_pipeline::{DashboardSnapshot, Deal, Stage};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn demo_snapshot() -> DashboardSnapshot {
    let deal = |id: &str, name: &str, owner: &str, stage, value| Deal {
        id: id.into(),
        name: name.into(),
        owner: owner.into(),
        stage,
        value: Decimal::new(value, 0),
        probability: None,
    };
    DashboardSnapshot {
        tenant: "Demo Co".into(),
        currency: "USD".into(),
        deals: vec![
            deal("d1", "Contoso", "ari", Stage::Proposal, 18_000),
            deal("d2", "Fabrikam", "lee", Stage::Negotiation, 42_000),
            deal("d3", "Tailspin", "ari", Stage::Lead, 7_500),
            deal("d4", "Wingtip", "lee", Stage::ClosedWon, 12_000),
        ],
        funnel: None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let question = args
        .next()
        .unwrap_or_else(|| "Summarize the pipeline.".to_string());
    let snapshot = match args.next() {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => demo_snapshot(),
    };

    let client = ChatClient::new(ChatConfig::from_env()?);
    let request = ChatRequest::new(question).system(system_prompt(&snapshot));

    let token = CancellationToken::new();
    let on_ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let mut stdout = std::io::stdout();
    let result = client
        .send(
            &request,
            |delta| {
                let _ = stdout.write_all(delta.as_bytes());
                let _ = stdout.flush();
            },
            Some(&token),
        )
        .await;

    match result {
        Ok(reply) => {
            println!();
            tracing::info!(chars = reply.chars().count(), "reply complete");
            Ok(())
        }
        Err(ChatError::Cancelled) => {
            eprintln!("\ncancelled");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
