//! Executors for provider-state callbacks

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use pactman_models::provider_states::ProviderState;

/// Outcome of applying a provider state
#[derive(Debug, Clone, PartialEq)]
pub enum StateOutcome {
  /// The state was set up
  Applied,
  /// The setter does not recognise the state
  Missing,
  /// The setter failed while applying the state
  Error(String)
}

/// Trait for anything that can put the provider into a named state before
/// an interaction is replayed
#[async_trait]
pub trait ProviderStateSetter {
  /// Applies the given provider state
  async fn apply(&self, state: &ProviderState) -> StateOutcome;
}

/// A setter for providers with no state requirements: every state is
/// reported as applied.
#[derive(Debug, Default)]
pub struct NullStateSetter;

#[async_trait]
impl ProviderStateSetter for NullStateSetter {
  async fn apply(&self, state: &ProviderState) -> StateOutcome {
    debug!("Ignoring provider state '{}'", state.name);
    StateOutcome::Applied
  }
}

/// Applies provider states by posting them to a setup URL on the provider.
/// A 404 from the setup URL means the provider does not know the state.
#[derive(Debug)]
pub struct HttpStateSetter {
  setup_url: String,
  client: reqwest::Client
}

impl HttpStateSetter {
  /// Creates a setter posting to the given URL
  pub fn new(setup_url: impl Into<String>) -> HttpStateSetter {
    HttpStateSetter {
      setup_url: setup_url.into(),
      client: reqwest::Client::new()
    }
  }
}

#[async_trait]
impl ProviderStateSetter for HttpStateSetter {
  async fn apply(&self, state: &ProviderState) -> StateOutcome {
    let body = json!({
      "state": state.name,
      "params": state.params
    });
    debug!("Posting {} to the provider state setup URL {}", body, self.setup_url);
    match self.client.post(&self.setup_url).json(&body).send().await {
      Ok(response) => {
        if response.status().is_success() {
          StateOutcome::Applied
        } else if response.status() == reqwest::StatusCode::NOT_FOUND {
          warn!("The provider does not know the state '{}'", state.name);
          StateOutcome::Missing
        } else {
          StateOutcome::Error(format!(
            "Provider state setup URL returned status {}", response.status()))
        }
      },
      Err(err) => StateOutcome::Error(format!(
        "Failed to post to the provider state setup URL: {}", err))
    }
  }
}
