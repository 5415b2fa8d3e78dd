//! Embeddings API.

use serde_json::{Map, Value};

use crate::client::Ollama;
use crate::error::OllamaError;
use crate::types::{EmbeddingsRequest, EmbeddingsResponse};

impl Ollama {
    /// Generate embeddings for `prompt` and return the raw response body.
    ///
    /// `model` switches (and reconciles) the active model first, as in
    /// [`Ollama::generate`]. `options` default to the client's options.
    pub async fn embeddings(
        &mut self,
        prompt: &str,
        model: Option<&str>,
        options: Option<Map<String, Value>>,
    ) -> Result<String, OllamaError> {
        self.embed_raw(prompt, model, options)
            .await
            .inspect_err(|e| tracing::warn!(model = %self.config.model, error = %e, "embedding failed"))
    }

    /// Generate embeddings for `prompt` and parse the vector.
    pub async fn embedding_vector(
        &mut self,
        prompt: &str,
        model: Option<&str>,
        options: Option<Map<String, Value>>,
    ) -> Result<Vec<f64>, OllamaError> {
        let result = match self.embed_raw(prompt, model, options).await {
            Ok(body) => serde_json::from_str::<EmbeddingsResponse>(&body)
                .map(|r| r.embedding)
                .map_err(|e| OllamaError::InvalidResponse(format!("invalid embeddings response: {e}"))),
            Err(e) => Err(e),
        };
        result.inspect_err(|e| tracing::warn!(model = %self.config.model, error = %e, "embedding failed"))
    }

    async fn embed_raw(
        &mut self,
        prompt: &str,
        model: Option<&str>,
        options: Option<Map<String, Value>>,
    ) -> Result<String, OllamaError> {
        match model {
            Some(name) => {
                self.select_model(name.to_string()).await?;
            }
            None => self.ensure_reconciled().await?,
        }

        let options = options.unwrap_or_else(|| self.config.options.clone());
        let body = EmbeddingsRequest {
            model: &self.config.model,
            prompt,
            options: &options,
            keep_alive: self.config.keep_alive.as_deref(),
        };

        tracing::debug!(model = %self.config.model, "requesting embeddings");
        let response = self.post("embeddings", &body, &self.config.model).await?;
        self.read_text(response).await
    }
}
