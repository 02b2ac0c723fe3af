#![deny(missing_docs)]
//! Streaming chat client for the salesdash assistant.
//!
//! The assistant answers questions about the dashboard by forwarding a
//! text-rendered [`DashboardSnapshot`](salesdash_pipeline::DashboardSnapshot)
//! plus the conversation to an OpenAI-compatible Chat Completions endpoint and
//! streaming the reply back.
//!
//! # Usage
//!
//! ```no_run
//! use salesdash_chat::{ChatClient, ChatConfig, ChatRequest, system_prompt};
//! use salesdash_pipeline::DashboardSnapshot;
//!
//! # async fn run(snapshot: DashboardSnapshot) -> Result<(), salesdash_chat::ChatError> {
//! let client = ChatClient::new(ChatConfig::from_env()?);
//! let request = ChatRequest::new("What is our weighted pipeline?")
//!     .system(system_prompt(&snapshot));
//! let reply = client.send(&request, |delta| print!("{delta}"), None).await?;
//! println!("\n{} chars", reply.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Layout
//!
//! - [`decode`], [`lines`], [`event`], [`delta`], [`aggregate`]: the stages of
//!   the SSE consumer, each usable on its own.
//! - [`consumer`]: the stages wired together, sync and async.
//! - [`client`], [`config`], [`mapping`]: the HTTP side.

pub mod aggregate;
pub mod client;
pub mod config;
pub mod consumer;
pub mod decode;
pub mod delta;
pub mod error;
pub mod event;
pub mod lines;
pub mod mapping;
pub mod types;

pub use client::{ChatClient, DeltaStream};
pub use config::{ApiKey, ChatConfig};
pub use consumer::{ConsumerState, SseDeltaParser, StreamConsumer, consume, delta_stream};
pub use error::ChatError;
pub use mapping::{system_prompt, to_api_request};
pub use types::{ChatRequest, ChatTurn, Role};
