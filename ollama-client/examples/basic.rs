//! Basic usage of the Ollama client.
//!
//! Make sure Ollama is running locally and run:
//!   cargo run --example basic -- llama2 "Say hello in one sentence."

use ollama_client::{Ollama, OllamaError};

#[tokio::main]
async fn main() -> Result<(), OllamaError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let model = args.next().unwrap_or_else(|| "llama2".into());
    let prompt = args
        .next()
        .unwrap_or_else(|| "Say hello in one sentence.".into());

    let mut client = Ollama::from_env()?.option("temperature", 0.7);

    let outcome = client.set_model(&model).await?;
    println!("Model {model}: {outcome:?}");

    let text = client.complete(&prompt, None).await?;
    println!("Response: {text}");

    let inventory = client.list_local_models().await?;
    println!("Local models: {}", inventory.names().collect::<Vec<_>>().join(", "));

    Ok(())
}
