//! Ollama API client struct and builder.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::{OllamaError, map_http_status, map_reqwest_error};
use crate::models::ModelState;

/// Client for an Ollama server.
///
/// Owns the [`ClientConfig`] and the reconciliation state of the active
/// model. Operations that may change the active model take `&mut self`.
///
/// # Example
///
/// ```no_run
/// use ollama_client::Ollama;
///
/// # async fn run() -> Result<(), ollama_client::OllamaError> {
/// let mut client = Ollama::new().host("127.0.0.1").port(11434);
/// let answer = client.generate("Say hi", Some("llama2")).await?;
/// println!("{answer}");
/// # Ok(())
/// # }
/// ```
pub struct Ollama {
    /// Connection and model settings.
    pub(crate) config: ClientConfig,
    /// Where the active model stands with respect to the server inventory.
    pub(crate) state: ModelState,
    /// Fires to abort in-flight requests.
    pub(crate) cancel: Option<CancellationToken>,
    /// Shared HTTP client.
    pub(crate) client: reqwest::Client,
}

impl Ollama {
    /// Create a client for `127.0.0.1:11434` with no active model.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client from an explicit configuration.
    ///
    /// A non-empty `config.model` starts out pending; it is reconciled with
    /// the server on first use.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let state = ModelState::pending(&config.model);
        Self {
            config,
            state,
            cancel: None,
            client: reqwest::Client::new(),
        }
    }

    /// Create a client configured from `OLLAMA_HOST` and `OLLAMA_MODEL`.
    pub fn from_env() -> Result<Self, OllamaError> {
        ClientConfig::from_env().map(Self::with_config)
    }

    /// Override the server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Override the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Choose the initial active model without contacting the server.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self.state = ModelState::pending(&self.config.model);
        self
    }

    /// Add one default model option (e.g. `temperature`).
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.options.insert(key.into(), value.into());
        self
    }

    /// Replace the default model options.
    #[must_use]
    pub fn options(mut self, options: Map<String, Value>) -> Self {
        self.config.options = options;
        self
    }

    /// Set the keep_alive duration for model memory residency.
    ///
    /// Examples: `"5m"` (keep for 5 minutes), `"0"` (unload immediately after request).
    /// When not set, Ollama uses its server default.
    #[must_use]
    pub fn keep_alive(mut self, duration: impl Into<String>) -> Self {
        self.config.keep_alive = Some(duration.into());
        self
    }

    /// Bound every request, including reading a streamed body, by `timeout`.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Abort in-flight requests with [`OllamaError::Cancelled`] once `token` fires.
    #[must_use]
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Use a preconfigured [`reqwest::Client`] (proxies, TLS roots, pools).
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Change the server host.
    pub fn set_host(&mut self, host: impl Into<String>) {
        self.config.host = host.into();
        self.state = ModelState::pending(&self.config.model);
    }

    /// Change the server port.
    pub fn set_port(&mut self, port: u16) {
        self.config.port = port;
        self.state = ModelState::pending(&self.config.model);
    }

    /// Replace the default model options.
    pub fn set_options(&mut self, options: Map<String, Value>) {
        self.config.options = options;
    }

    /// Current configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Name of the active model, empty when none is set.
    pub fn active_model(&self) -> &str {
        &self.config.model
    }

    /// Reconciliation state of the active model.
    pub fn state(&self) -> &ModelState {
        &self.state
    }

    /// Run `fut`, resolving to [`OllamaError::Cancelled`] if the token fires first.
    pub(crate) async fn cancellable<T>(
        &self,
        fut: impl Future<Output = Result<T, OllamaError>>,
    ) -> Result<T, OllamaError> {
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(OllamaError::Cancelled),
                    result = fut => result,
                }
            }
            None => fut.await,
        }
    }

    /// Send a request and return the response if its status is a success.
    ///
    /// `model` names the model the request concerns; a 404 maps to
    /// [`OllamaError::NotFound`] for it.
    pub(crate) async fn send(
        &self,
        mut request: reqwest::RequestBuilder,
        model: &str,
    ) -> Result<reqwest::Response, OllamaError> {
        let timeout = self.config.timeout;
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        self.cancellable(async move {
            let response = request
                .send()
                .await
                .map_err(|e| map_reqwest_error(e, timeout))?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .map_err(|e| map_reqwest_error(e, timeout))?;
                return Err(map_http_status(status, model, &body));
            }
            Ok(response)
        })
        .await
    }

    /// Read a successful response body as text.
    pub(crate) async fn read_text(&self, response: reqwest::Response) -> Result<String, OllamaError> {
        let timeout = self.config.timeout;
        self.cancellable(async move { response.text().await.map_err(|e| map_reqwest_error(e, timeout)) })
            .await
    }

    /// GET `path` and parse the JSON response.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, OllamaError> {
        let url = self.config.endpoint(path);
        tracing::debug!(url = %url, "sending GET to Ollama");

        let response = self.send(self.client.get(&url), "").await?;
        let text = self.read_text(response).await?;
        serde_json::from_str(&text)
            .map_err(|e| OllamaError::InvalidResponse(format!("invalid JSON from {path}: {e}")))
    }

    /// POST a JSON body to `path`.
    pub(crate) async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        model: &str,
    ) -> Result<reqwest::Response, OllamaError> {
        let url = self.config.endpoint(path);
        tracing::debug!(url = %url, model = %model, "sending POST to Ollama");

        let request = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(body);
        self.send(request, model).await
    }

    /// DELETE `path` with a JSON body.
    pub(crate) async fn delete<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        model: &str,
    ) -> Result<reqwest::Response, OllamaError> {
        let url = self.config.endpoint(path);
        tracing::debug!(url = %url, model = %model, "sending DELETE to Ollama");

        let request = self
            .client
            .delete(&url)
            .header("content-type", "application/json")
            .json(body);
        self.send(request, model).await
    }
}

impl Default for Ollama {
    fn default() -> Self {
        Self::new()
    }
}
