//! Error type for all client operations, plus helpers mapping HTTP and
//! reqwest failures onto it.

use std::time::Duration;

/// Errors from Ollama client operations.
#[derive(Debug, thiserror::Error)]
pub enum OllamaError {
    // Retryable errors
    /// Transport-level failure (unreachable server, refused or reset connection).
    #[error("could not connect to ollama server: {0}")]
    Connectivity(#[source] reqwest::Error),
    /// The configured request timeout elapsed.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    /// Non-success status from a reachable server.
    #[error("server returned {status}: {body}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    // Terminal errors
    /// The referenced model does not exist on the server.
    #[error("model not found: {0}")]
    NotFound(String),
    /// The operation is not supported by this client.
    #[error("not implemented: {0}")]
    Unimplemented(&'static str),
    /// The operation needs an active model and none is set.
    #[error("no active model set")]
    NoModel,
    /// Response bytes could not be decoded as text.
    #[error("decode error: {0}")]
    Decode(String),
    /// Response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Client configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The client's cancellation token fired.
    #[error("cancelled")]
    Cancelled,
}

impl OllamaError {
    /// Whether this error is likely transient and the request can be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connectivity(_) | Self::Timeout(_) => true,
            Self::Server { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

/// Map an HTTP status code (from the Ollama API) to an [`OllamaError`].
///
/// `model` names the model the request was about, used for 404 responses.
///
/// Reference: <https://github.com/ollama/ollama/blob/main/docs/api.md>
pub(crate) fn map_http_status(status: reqwest::StatusCode, model: &str, body: &str) -> OllamaError {
    match status.as_u16() {
        404 => OllamaError::NotFound(model.to_string()),
        code => OllamaError::Server {
            status: code,
            body: body.to_string(),
        },
    }
}

/// Map a [`reqwest::Error`] to an [`OllamaError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error, timeout: Option<Duration>) -> OllamaError {
    if err.is_timeout() {
        OllamaError::Timeout(timeout.unwrap_or_default())
    } else if err.is_decode() {
        OllamaError::InvalidResponse(err.to_string())
    } else {
        OllamaError::Connectivity(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_404_maps_to_not_found() {
        let err = map_http_status(reqwest::StatusCode::NOT_FOUND, "llama2", "model 'llama2' not found");
        assert!(matches!(err, OllamaError::NotFound(name) if name == "llama2"));
    }

    #[test]
    fn status_500_maps_to_server_error() {
        let err = map_http_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "m", "boom");
        assert!(matches!(
            err,
            OllamaError::Server { status: 500, ref body } if body == "boom"
        ));
    }

    #[test]
    fn status_400_maps_to_server_error_with_status() {
        let err = map_http_status(reqwest::StatusCode::BAD_REQUEST, "m", "bad body");
        let msg = err.to_string();
        assert!(msg.contains("400"), "expected status in message: {msg}");
        assert!(msg.contains("bad body"), "expected body in message: {msg}");
    }

    #[test]
    fn status_5xx_errors_are_retryable() {
        let err = map_http_status(reqwest::StatusCode::BAD_GATEWAY, "m", "");
        assert!(err.is_retryable());
    }

    #[test]
    fn status_4xx_errors_are_not_retryable() {
        let err = map_http_status(reqwest::StatusCode::BAD_REQUEST, "m", "");
        assert!(!err.is_retryable());
        let err = map_http_status(reqwest::StatusCode::NOT_FOUND, "m", "");
        assert!(!err.is_retryable());
    }

    #[test]
    fn timeout_is_retryable() {
        assert!(OllamaError::Timeout(Duration::from_secs(5)).is_retryable());
    }

    #[test]
    fn local_errors_are_not_retryable() {
        assert!(!OllamaError::Unimplemented("push").is_retryable());
        assert!(!OllamaError::NoModel.is_retryable());
        assert!(!OllamaError::Cancelled.is_retryable());
        assert!(!OllamaError::Decode("bad".into()).is_retryable());
    }

    #[test]
    fn not_found_message_names_model() {
        let err = OllamaError::NotFound("mistral".into());
        assert_eq!(err.to_string(), "model not found: mistral");
    }
}
