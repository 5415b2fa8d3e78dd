#![deny(missing_docs)]
//! Client for an [Ollama](https://ollama.ai/) inference server.
//!
//! The client keeps an *active model* and reconciles it with the server's
//! local inventory before use, pulling it only when it is missing. Generated
//! text is read as a chunked stream and assembled in arrival order.
//!
//! # Usage
//!
//! ```no_run
//! use ollama_client::Ollama;
//!
//! # async fn run() -> Result<(), ollama_client::OllamaError> {
//! let mut client = Ollama::new().option("temperature", 0.2);
//!
//! // Pulls llama2 if the server does not have it yet.
//! let text = client.complete("Say hi", Some("llama2")).await?;
//! println!("{text}");
//!
//! for model in client.list_local_models().await?.names() {
//!     println!("{model}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Every operation returns `Result<_, OllamaError>` and logs its failure
//! through [`tracing`]; nothing is retried automatically.

pub mod client;
pub mod config;
mod embeddings;
pub mod error;
mod generate;
pub mod models;
pub mod streaming;
mod types;

pub use client::Ollama;
pub use config::ClientConfig;
pub use error::OllamaError;
pub use models::{ModelState, Reconciliation};
pub use streaming::{ChunkStream, StreamedAnswer, response_text};
pub use types::{LocalModel, ModelDetails, ModelInfo, ModelInventory};
