//! Ollama `/api/*` request and response types.
//!
//! Request bodies borrow from the client so building one never clones the
//! option map. Response types default every field the server may omit;
//! older servers leave out `model`, `details` and most of `/api/show`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `/api/generate` request body.
#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub options: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<&'a str>,
}

/// `/api/embeddings` request body.
#[derive(Debug, Serialize)]
pub(crate) struct EmbeddingsRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub options: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<&'a str>,
}

/// Body for endpoints addressed by model name (`/api/show`, `/api/delete`).
#[derive(Debug, Serialize)]
pub(crate) struct NameRequest<'a> {
    pub name: &'a str,
}

/// `/api/pull` request body.
///
/// `stream: false` makes the server answer once the download finished, so a
/// success status confirms the model is present.
#[derive(Debug, Serialize)]
pub(crate) struct PullRequest<'a> {
    pub name: &'a str,
    pub stream: bool,
}

/// `/api/embeddings` response body.
#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingsResponse {
    pub embedding: Vec<f64>,
}

/// One NDJSON line of a streamed `/api/generate` body.
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateLine {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Snapshot of the models available on the server (`GET /api/tags`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelInventory {
    /// Locally available models.
    #[serde(default)]
    pub models: Vec<LocalModel>,
}

/// One entry of a [`ModelInventory`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LocalModel {
    /// Model name including tag, e.g. `llama2:latest`.
    pub name: String,
    /// Model identifier (same as `name` on current servers).
    #[serde(default)]
    pub model: String,
    /// Last modification time, as reported by the server.
    #[serde(default)]
    pub modified_at: String,
    /// Size on disk in bytes.
    #[serde(default)]
    pub size: u64,
    /// Content digest.
    #[serde(default)]
    pub digest: String,
    /// Format and quantization details.
    #[serde(default)]
    pub details: ModelDetails,
}

/// Format and family details of a model.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelDetails {
    /// File format, e.g. `gguf`.
    #[serde(default)]
    pub format: String,
    /// Model family, e.g. `llama`.
    #[serde(default)]
    pub family: String,
    /// Parameter count label, e.g. `7B`.
    #[serde(default)]
    pub parameter_size: String,
    /// Quantization label, e.g. `Q4_0`.
    #[serde(default)]
    pub quantization_level: String,
}

/// Model metadata returned by `/api/show`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelInfo {
    /// The Modelfile the model was built from.
    #[serde(default)]
    pub modelfile: String,
    /// Default parameters, one per line.
    #[serde(default)]
    pub parameters: String,
    /// Prompt template.
    #[serde(default)]
    pub template: String,
    /// License text.
    #[serde(default)]
    pub license: String,
    /// System prompt.
    #[serde(default)]
    pub system: String,
    /// Format and family details.
    #[serde(default)]
    pub details: ModelDetails,
    /// Any other fields the server reported.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelInventory {
    /// Whether `name` is available on the server.
    ///
    /// A name without a tag also matches its `:latest` variant, which is how
    /// the server lists untagged pulls.
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// The inventory entry matching `name`, if any.
    pub fn find(&self, name: &str) -> Option<&LocalModel> {
        let latest = (!name.contains(':')).then(|| format!("{name}:latest"));
        self.models.iter().find(|m| {
            m.name == name
                || m.model == name
                || latest
                    .as_deref()
                    .is_some_and(|l| m.name == l || m.model == l)
        })
    }

    /// Names of all models in the inventory.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.name.as_str())
    }

    /// Number of models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the server has no models.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory() -> ModelInventory {
        serde_json::from_value(serde_json::json!({
            "models": [
                {
                    "name": "llama2:latest",
                    "model": "llama2:latest",
                    "modified_at": "2024-01-01T00:00:00Z",
                    "size": 3825819519_u64,
                    "digest": "fe938a131f40",
                    "details": {"format": "gguf", "family": "llama", "parameter_size": "7B", "quantization_level": "Q4_0"}
                },
                {"name": "mistral:7b-instruct"}
            ]
        }))
        .expect("valid inventory")
    }

    #[test]
    fn inventory_parses_full_and_sparse_entries() {
        let inv = inventory();
        assert_eq!(inv.len(), 2);
        assert_eq!(inv.models[0].details.family, "llama");
        assert_eq!(inv.models[1].size, 0);
        assert!(inv.models[1].model.is_empty());
    }

    #[test]
    fn contains_exact_name() {
        assert!(inventory().contains("llama2:latest"));
        assert!(inventory().contains("mistral:7b-instruct"));
    }

    #[test]
    fn untagged_name_matches_latest() {
        assert!(inventory().contains("llama2"));
    }

    #[test]
    fn untagged_name_does_not_match_other_tags() {
        assert!(!inventory().contains("mistral"));
    }

    #[test]
    fn different_tag_does_not_match() {
        assert!(!inventory().contains("llama2:13b"));
    }

    #[test]
    fn empty_inventory_parses_from_empty_object() {
        let inv: ModelInventory = serde_json::from_str("{}").expect("valid");
        assert!(inv.is_empty());
        assert!(!inv.contains("llama2"));
    }

    #[test]
    fn names_lists_in_server_order() {
        let inv = inventory();
        let names: Vec<&str> = inv.names().collect();
        assert_eq!(names, vec!["llama2:latest", "mistral:7b-instruct"]);
    }

    #[test]
    fn generate_request_serializes_empty_options() {
        let options = Map::new();
        let body = serde_json::to_value(GenerateRequest {
            model: "llama2",
            prompt: "Say hi",
            options: &options,
            keep_alive: None,
        })
        .expect("serializable");
        assert_eq!(
            body,
            serde_json::json!({"model": "llama2", "prompt": "Say hi", "options": {}})
        );
    }

    #[test]
    fn model_info_keeps_unknown_fields() {
        let info: ModelInfo = serde_json::from_value(serde_json::json!({
            "modelfile": "FROM llama2",
            "template": "{{ .Prompt }}",
            "model_info": {"general.architecture": "llama"}
        }))
        .expect("valid");
        assert_eq!(info.modelfile, "FROM llama2");
        assert!(info.extra.contains_key("model_info"));
        assert!(info.license.is_empty());
    }
}
