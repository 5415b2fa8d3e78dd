//! Client configuration.

use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::OllamaError;

/// Default Ollama server address.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default Ollama server port.
pub const DEFAULT_PORT: u16 = 11434;

/// Environment variable holding the server address (`host`, `host:port` or a URL).
pub const HOST_ENV: &str = "OLLAMA_HOST";

/// Environment variable holding the initial active model.
pub const MODEL_ENV: &str = "OLLAMA_MODEL";

/// Settings owned by an [`Ollama`](crate::Ollama) client.
///
/// Created once with the client and changed only through its setters.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Server host name or IP address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Active model name. Empty until a model is chosen.
    pub model: String,
    /// Model options sent with generation and embedding requests.
    pub options: Map<String, Value>,
    /// How long the server keeps the model loaded (e.g. "5m", "0").
    pub keep_alive: Option<String>,
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            model: String::new(),
            options: Map::new(),
            keep_alive: None,
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Build a configuration from `OLLAMA_HOST` and `OLLAMA_MODEL`.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, OllamaError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, OllamaError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(HOST_ENV).filter(|v| !v.trim().is_empty()) {
            let (host, port) = parse_host(&raw)?;
            config.host = host;
            if let Some(port) = port {
                config.port = port;
            }
        }

        if let Some(model) = lookup(MODEL_ENV) {
            config.model = model.trim().to_string();
        }

        Ok(config)
    }

    /// Base URL of the API, e.g. `http://127.0.0.1:11434/api`.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/api", self.host, self.port)
    }

    /// Full URL of an API endpoint.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path.trim_start_matches('/'))
    }
}

/// Split an `OLLAMA_HOST` value into host and optional port.
fn parse_host(raw: &str) -> Result<(String, Option<u16>), OllamaError> {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .unwrap_or(trimmed)
        .trim_end_matches('/');

    match without_scheme.rsplit_once(':') {
        Some((host, _)) if !host.ends_with(']') && host.contains(':') => {
            // Bare IPv6 address without a port.
            Ok((without_scheme.to_string(), None))
        }
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|e| OllamaError::Config(format!("invalid port in {HOST_ENV}={raw}: {e}")))?;
            Ok((host.to_string(), Some(port)))
        }
        None => Ok((without_scheme.to_string(), None)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_local_server() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 11434);
        assert!(config.model.is_empty());
        assert!(config.options.is_empty());
        assert!(config.timeout.is_none());
    }

    #[test]
    fn base_url_includes_api_prefix() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url(), "http://127.0.0.1:11434/api");
        assert_eq!(config.endpoint("/tags"), "http://127.0.0.1:11434/api/tags");
        assert_eq!(config.endpoint("pull"), "http://127.0.0.1:11434/api/pull");
    }

    #[test]
    fn from_vars_without_variables_uses_defaults() {
        let config = ClientConfig::from_vars(vars(&[])).expect("defaults");
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn from_vars_reads_host_and_port() {
        let config = ClientConfig::from_vars(vars(&[("OLLAMA_HOST", "gpu-box:8080")])).expect("valid");
        assert_eq!(config.host, "gpu-box");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn from_vars_accepts_url_form() {
        let config =
            ClientConfig::from_vars(vars(&[("OLLAMA_HOST", "http://10.0.0.2:11500/")])).expect("valid");
        assert_eq!(config.host, "10.0.0.2");
        assert_eq!(config.port, 11500);
    }

    #[test]
    fn from_vars_host_only_keeps_default_port() {
        let config = ClientConfig::from_vars(vars(&[("OLLAMA_HOST", "remote")])).expect("valid");
        assert_eq!(config.host, "remote");
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn from_vars_reads_model() {
        let config = ClientConfig::from_vars(vars(&[("OLLAMA_MODEL", " llama2 ")])).expect("valid");
        assert_eq!(config.model, "llama2");
    }

    #[test]
    fn from_vars_rejects_bad_port() {
        let err = ClientConfig::from_vars(vars(&[("OLLAMA_HOST", "localhost:notaport")])).unwrap_err();
        assert!(matches!(err, OllamaError::Config(msg) if msg.contains("notaport")));
    }

    #[test]
    fn from_vars_handles_bracketed_ipv6() {
        let config = ClientConfig::from_vars(vars(&[("OLLAMA_HOST", "[::1]:9000")])).expect("valid");
        assert_eq!(config.host, "[::1]");
        assert_eq!(config.port, 9000);
    }
}
