//! Text generation against the active model.

use crate::client::Ollama;
use crate::error::OllamaError;
use crate::streaming::{ChunkStream, assemble, response_text, stream_chunks};
use crate::types::GenerateRequest;

impl Ollama {
    /// Generate a completion for `prompt` and return the assembled stream.
    ///
    /// With `Some(model)` that model becomes the active one and is
    /// reconciled first; a reconciliation failure fails the call. Without
    /// an override the active model is used, reconciling it if still pending.
    ///
    /// The result is the exact concatenation of the streamed response
    /// chunks, i.e. the server's NDJSON body. Use [`Ollama::complete`] for
    /// just the generated text.
    pub async fn generate(&mut self, prompt: &str, model: Option<&str>) -> Result<String, OllamaError> {
        let result = match self.open_generation(prompt, model).await {
            Ok(stream) => assemble(stream).await,
            Err(e) => Err(e),
        };
        result.inspect_err(|e| tracing::warn!(model = %self.config.model, error = %e, "generation failed"))
    }

    /// Start a generation and return its decoded chunks as they arrive.
    pub async fn generate_stream(
        &mut self,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<ChunkStream, OllamaError> {
        self.open_generation(prompt, model)
            .await
            .inspect_err(|e| tracing::warn!(model = %self.config.model, error = %e, "generation failed"))
    }

    /// Generate a completion and return only the generated text.
    pub async fn complete(&mut self, prompt: &str, model: Option<&str>) -> Result<String, OllamaError> {
        let body = self.generate(prompt, model).await?;
        response_text(&body)
            .inspect_err(|e| tracing::warn!(model = %self.config.model, error = %e, "could not parse generation"))
    }

    async fn open_generation(&mut self, prompt: &str, model: Option<&str>) -> Result<ChunkStream, OllamaError> {
        match model {
            Some(name) => {
                self.select_model(name.to_string()).await?;
            }
            None => self.ensure_reconciled().await?,
        }

        let body = GenerateRequest {
            model: &self.config.model,
            prompt,
            options: &self.config.options,
            keep_alive: self.config.keep_alive.as_deref(),
        };
        let response = self.post("generate", &body, &self.config.model).await?;
        stream_chunks(response, self.config.timeout, self.cancel.clone())
    }
}
