//! Active-model reconciliation and model management.
//!
//! The client keeps one active model. Before it is used, the server's
//! inventory (`GET /api/tags`) is consulted and the model is pulled only if
//! it is missing. Absence from the inventory is the only pull trigger; tags
//! and digests are never compared, and a failed pull is not retried.
//!
//! ```text
//! Unset ──set_model──▶ Pending ──reconcile ok──▶ Reconciled
//!                         ▲  └──reconcile err──▶ (stays Pending)
//!                         └──────set_model / delete / server change
//! ```

use crate::client::Ollama;
use crate::error::OllamaError;
use crate::types::{ModelInfo, ModelInventory, NameRequest, PullRequest};

/// Reconciliation state of the active model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModelState {
    /// No active model.
    #[default]
    Unset,
    /// A model was chosen but not yet confirmed on the server.
    Pending(String),
    /// The model was confirmed present, or a pull for it succeeded.
    Reconciled(String),
}

impl ModelState {
    /// `Pending(name)`, or `Unset` for an empty name.
    pub(crate) fn pending(name: &str) -> Self {
        if name.is_empty() {
            Self::Unset
        } else {
            Self::Pending(name.to_string())
        }
    }

    /// The model this state refers to.
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Unset => None,
            Self::Pending(name) | Self::Reconciled(name) => Some(name),
        }
    }

    /// Whether the model is known to be available on the server.
    pub fn is_reconciled(&self) -> bool {
        matches!(self, Self::Reconciled(_))
    }
}

/// Outcome of a successful reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The model was already in the inventory; nothing was pulled.
    AlreadyPresent,
    /// The model was missing and the server completed a pull for it.
    Pulled,
}

impl Ollama {
    /// Make `name` the active model and reconcile it with the server.
    ///
    /// The name is kept even if reconciliation fails; the state then stays
    /// [`ModelState::Pending`] and the next generation retries it.
    pub async fn set_model(&mut self, name: impl Into<String>) -> Result<Reconciliation, OllamaError> {
        self.select_model(name.into())
            .await
            .inspect_err(|e| tracing::warn!(model = %self.config.model, error = %e, "could not reconcile model"))
    }

    /// Reconcile the active model with the server inventory.
    ///
    /// Fetches the inventory and pulls the model only if it is absent.
    /// Calling this again for a present model issues no pull.
    pub async fn reconcile(&mut self) -> Result<Reconciliation, OllamaError> {
        self.reconcile_active()
            .await
            .inspect_err(|e| tracing::warn!(model = %self.config.model, error = %e, "could not reconcile model"))
    }

    /// List the models available on the server.
    pub async fn list_local_models(&self) -> Result<ModelInventory, OllamaError> {
        self.fetch_inventory()
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "could not list local models"))
    }

    /// Show details about a model; `None` means the active model.
    pub async fn show_model_info(&self, model: Option<&str>) -> Result<ModelInfo, OllamaError> {
        let name = model.unwrap_or(&self.config.model);
        self.show(name)
            .await
            .inspect_err(|e| tracing::warn!(model = %name, error = %e, "could not get details about model"))
    }

    /// Delete a model from the server.
    ///
    /// `name` must match an inventory entry (including `:tag` where
    /// applicable). A missing model fails with [`OllamaError::NotFound`]
    /// and no DELETE request is sent.
    pub async fn delete_model(&mut self, name: &str) -> Result<(), OllamaError> {
        self.delete_existing(name)
            .await
            .inspect_err(|e| tracing::warn!(model = %name, error = %e, "could not delete model"))
    }

    /// Pull `name` onto the server unconditionally.
    ///
    /// Does not change the active model.
    pub async fn pull_model(&self, name: &str) -> Result<(), OllamaError> {
        self.pull(name)
            .await
            .inspect_err(|e| tracing::warn!(model = %name, error = %e, "could not pull model"))
    }

    /// Create a model from a Modelfile. Not supported by this client.
    pub async fn create_model(&self, name: &str, path: &str) -> Result<(), OllamaError> {
        tracing::warn!(model = %name, path = %path, "create model is not implemented");
        Err(OllamaError::Unimplemented("create model"))
    }

    /// Upload a model to a registry. Not supported by this client.
    pub async fn push_model(&self, name: &str) -> Result<(), OllamaError> {
        tracing::warn!(model = %name, "push model is not implemented");
        Err(OllamaError::Unimplemented("push model"))
    }

    pub(crate) async fn select_model(&mut self, name: String) -> Result<Reconciliation, OllamaError> {
        self.state = ModelState::pending(&name);
        self.config.model = name;
        self.reconcile_active().await
    }

    /// Reconcile only if the active model is still pending.
    pub(crate) async fn ensure_reconciled(&mut self) -> Result<(), OllamaError> {
        match self.state {
            ModelState::Unset => Err(OllamaError::NoModel),
            ModelState::Pending(_) => self.reconcile_active().await.map(|_| ()),
            ModelState::Reconciled(_) => Ok(()),
        }
    }

    async fn reconcile_active(&mut self) -> Result<Reconciliation, OllamaError> {
        let name = self.config.model.clone();
        if name.is_empty() {
            return Err(OllamaError::NoModel);
        }

        let inventory = self.fetch_inventory().await?;
        let outcome = if inventory.contains(&name) {
            tracing::debug!(model = %name, "model already present");
            Reconciliation::AlreadyPresent
        } else {
            self.pull(&name).await?;
            Reconciliation::Pulled
        };

        self.state = ModelState::Reconciled(name);
        Ok(outcome)
    }

    async fn fetch_inventory(&self) -> Result<ModelInventory, OllamaError> {
        self.get_json("tags").await
    }

    async fn pull(&self, name: &str) -> Result<(), OllamaError> {
        if name.is_empty() {
            return Err(OllamaError::NoModel);
        }

        tracing::info!(model = %name, "pulling model");
        let body = PullRequest { name, stream: false };
        let response = self.post("pull", &body, name).await?;
        // Drain so the pull has finished server-side before we report success.
        self.read_text(response).await?;
        Ok(())
    }

    async fn show(&self, name: &str) -> Result<ModelInfo, OllamaError> {
        if name.is_empty() {
            return Err(OllamaError::NoModel);
        }

        let response = self.post("show", &NameRequest { name }, name).await?;
        let text = self.read_text(response).await?;
        serde_json::from_str(&text)
            .map_err(|e| OllamaError::InvalidResponse(format!("invalid JSON from show: {e}")))
    }

    async fn delete_existing(&mut self, name: &str) -> Result<(), OllamaError> {
        let inventory = self.fetch_inventory().await?;
        let Some(entry) = inventory.find(name) else {
            return Err(OllamaError::NotFound(name.to_string()));
        };

        let target = entry.name.clone();
        self.delete("delete", &NameRequest { name: &target }, &target)
            .await?;
        tracing::info!(model = %target, "deleted model");

        if self.state.is_reconciled() && inventory.find(&self.config.model).is_some_and(|m| m.name == target) {
            self.state = ModelState::pending(&self.config.model);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_of_empty_name_is_unset() {
        assert_eq!(ModelState::pending(""), ModelState::Unset);
        assert_eq!(ModelState::pending("llama2"), ModelState::Pending("llama2".into()));
    }

    #[test]
    fn state_reports_model() {
        assert_eq!(ModelState::Unset.model(), None);
        assert_eq!(ModelState::Pending("a".into()).model(), Some("a"));
        assert_eq!(ModelState::Reconciled("b".into()).model(), Some("b"));
    }

    #[test]
    fn only_reconciled_state_is_reconciled() {
        assert!(!ModelState::Unset.is_reconciled());
        assert!(!ModelState::Pending("a".into()).is_reconciled());
        assert!(ModelState::Reconciled("a".into()).is_reconciled());
    }

    #[tokio::test]
    async fn create_and_push_are_unimplemented() {
        let client = Ollama::new();
        assert!(matches!(
            client.create_model("mine", "./Modelfile").await,
            Err(OllamaError::Unimplemented(_))
        ));
        assert!(matches!(
            client.push_model("mine").await,
            Err(OllamaError::Unimplemented(_))
        ));
    }

    #[tokio::test]
    async fn reconcile_without_model_fails_without_network() {
        // Port 9 (discard) is never contacted: the empty model is rejected first.
        let mut client = Ollama::new().port(9);
        assert!(matches!(client.reconcile().await, Err(OllamaError::NoModel)));
        assert_eq!(client.state(), &ModelState::Unset);
    }

    #[tokio::test]
    async fn show_without_model_fails_without_network() {
        let client = Ollama::new().port(9);
        assert!(matches!(client.show_model_info(None).await, Err(OllamaError::NoModel)));
    }
}
