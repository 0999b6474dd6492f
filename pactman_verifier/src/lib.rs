//! The `pactman_verifier` crate implements the provider side of contract
//! verification: it fetches pacts from files or a pact broker, replays each
//! interaction against the running provider, drives provider-state setup
//! between interactions, compares the observed responses with the matching
//! engine, and optionally publishes the outcome back to the broker.
//!
//! Interactions are verified sequentially, in the order their pact declares
//! them, so provider states are never interleaved. A cancellation flag is
//! honoured at interaction boundaries only; the run never stops part way
//! through a provider-state setup.

#![warn(missing_docs)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ansi_term::Colour::{Green, Red, Yellow};
use tracing::{debug, info, warn};

use pactman_matching::match_response;
use pactman_models::interaction::Interaction;
use pactman_models::pact::{Pact, read_pact};

pub mod callback_executors;
pub mod pact_broker;
pub mod provider_client;
pub mod verification_result;

use callback_executors::{ProviderStateSetter, StateOutcome};
use pact_broker::{BrokerClient, HalBrokerClient, HttpAuth, PactRef, TransportError};
use provider_client::make_provider_request;
use verification_result::{
  InteractionOutcome,
  InteractionResult,
  PactVerificationResult,
  VerificationExecutionResult
};

/// Where pacts to verify come from
#[derive(Debug, Clone)]
pub enum PactSource {
  /// A pact file on disk
  File(PathBuf),
  /// The latest pacts for the provider on a pact broker
  Broker {
    /// Base URL of the broker
    url: String,
    /// Optional authentication
    auth: Option<HttpAuth>
  }
}

/// Details of the provider being verified
#[derive(Debug, Clone)]
pub struct ProviderInfo {
  /// Name of the provider, used to query the broker
  pub name: String,
  /// Base URL requests are replayed against
  pub base_url: String
}

/// Options controlling a verification run
#[derive(Clone)]
pub struct VerificationOptions {
  /// Extra headers added to every request to the provider
  pub custom_headers: HashMap<String, String>,
  /// Only verify pacts for these consumers (empty means all)
  pub consumer_names: Vec<String>,
  /// Request timeout for provider calls
  pub request_timeout: Duration,
  /// Disables coloured summary output
  pub no_colour: bool,
  /// Cancellation flag, checked between interactions
  pub cancel: Option<Arc<AtomicBool>>
}

impl Default for VerificationOptions {
  fn default() -> Self {
    VerificationOptions {
      custom_headers: HashMap::default(),
      consumer_names: vec![],
      request_timeout: Duration::from_secs(5),
      no_colour: false,
      cancel: None
    }
  }
}

/// Options for publishing verification results to the broker
#[derive(Debug, Clone)]
pub struct PublishOptions {
  /// The version of the provider being verified
  pub provider_version: String
}

/// Fetches the pacts to verify from the given sources. Pacts fetched from a
/// broker carry a reference results can be published against.
pub async fn fetch_pacts(
  sources: &[PactSource],
  provider: &str,
  consumers: &[String]
) -> anyhow::Result<Vec<(Pact, Option<PactRef>)>> {
  let mut pacts = vec![];
  for source in sources {
    match source {
      PactSource::File(path) => {
        let pact = read_pact(path)?;
        debug!("Loaded pact for consumer '{}' from {:?}", pact.consumer.name, path);
        pacts.push((pact, None));
      },
      PactSource::Broker { url, auth } => {
        let client = HalBrokerClient::new(url.clone(), auth.clone());
        for (pact, pact_ref) in client.fetch_pacts(provider, consumers).await? {
          pacts.push((pact, Some(pact_ref)));
        }
      }
    }
  }
  if !consumers.is_empty() {
    pacts.retain(|(pact, _)| consumers.contains(&pact.consumer.name));
  }
  Ok(pacts)
}

async fn execute_provider_states<S: ProviderStateSetter>(
  interaction: &Interaction,
  state_setter: &S
) -> Option<InteractionOutcome> {
  for state in &interaction.provider_states {
    info!("Setting up provider state '{}'", state.name);
    match state_setter.apply(state).await {
      StateOutcome::Applied => (),
      StateOutcome::Missing => {
        warn!("Provider state '{}' is not known to the provider, skipping '{}'",
          state.name, interaction.description);
        return Some(InteractionOutcome::SkippedStateMissing(state.name.clone()));
      },
      StateOutcome::Error(error) => {
        warn!("Provider state '{}' failed to apply ({}), skipping '{}'",
          state.name, error, interaction.description);
        return Some(InteractionOutcome::SkippedStateError(error));
      }
    }
  }
  None
}

async fn verify_interaction<S: ProviderStateSetter>(
  provider: &ProviderInfo,
  interaction: &Interaction,
  state_setter: &S,
  options: &VerificationOptions,
  client: &reqwest::Client
) -> InteractionResult {
  info!("Verifying '{}'", interaction.description);

  if let Some(outcome) = execute_provider_states(interaction, state_setter).await {
    return InteractionResult { description: interaction.description.clone(), outcome };
  }

  let outcome = match make_provider_request(
    &provider.base_url, &interaction.request, &options.custom_headers, client).await {
    Ok(actual_response) => {
      let mismatches = match_response(&interaction.response, &actual_response);
      if mismatches.is_empty() {
        InteractionOutcome::Pass
      } else {
        InteractionOutcome::Fail(mismatches)
      }
    },
    // a network failure against the provider fails this interaction only
    Err(err) => InteractionOutcome::RequestFailed(err.to_string())
  };
  InteractionResult { description: interaction.description.clone(), outcome }
}

fn is_cancelled(options: &VerificationOptions) -> bool {
  options.cancel.as_ref()
    .map(|flag| flag.load(Ordering::Relaxed))
    .unwrap_or(false)
}

/// Verifies the provider against the given pacts. Interactions are
/// verified sequentially per pact; the result accumulates every outcome.
/// When publish options and a broker client are given, a pass/fail result
/// is published for every pact that carries a broker reference. A broker
/// failure aborts the run.
pub async fn verify_provider<S: ProviderStateSetter>(
  provider: &ProviderInfo,
  pacts: Vec<(Pact, Option<PactRef>)>,
  state_setter: &S,
  options: &VerificationOptions,
  publish: Option<(&dyn BrokerClient, &PublishOptions)>
) -> Result<VerificationExecutionResult, TransportError> {
  let client = reqwest::Client::builder()
    .timeout(options.request_timeout)
    .build()
    .unwrap_or_default();

  let mut execution = VerificationExecutionResult::default();
  'pacts: for (pact, pact_ref) in &pacts {
    info!("Verifying the pact between '{}' and '{}'", pact.consumer.name, pact.provider.name);
    let mut results = vec![];
    for interaction in &pact.interactions {
      if is_cancelled(options) {
        warn!("Verification cancelled, stopping at the next interaction boundary");
        execution.cancelled = true;
        execution.pacts.push(PactVerificationResult {
          consumer: pact.consumer.name.clone(),
          results
        });
        break 'pacts;
      }
      results.push(verify_interaction(provider, interaction, state_setter, options,
        &client).await);
    }
    let pact_result = PactVerificationResult {
      consumer: pact.consumer.name.clone(),
      results
    };
    if let (Some((broker, publish_options)), Some(pact_ref)) = (&publish, pact_ref) {
      broker.publish_result(pact_ref, pact_result.passed(),
        &publish_options.provider_version).await?;
    }
    execution.pacts.push(pact_result);
  }
  Ok(execution)
}

/// Renders the human-readable summary of a verification run
pub fn generate_summary(result: &VerificationExecutionResult, coloured: bool) -> String {
  let mut output = vec![];
  for pact in &result.pacts {
    output.push(format!("\nVerifying pact for consumer {}", pact.consumer));
    for interaction in &pact.results {
      let line = match &interaction.outcome {
        InteractionOutcome::Pass => format!("  {} ... {}", interaction.description,
          paint(coloured, Green, "OK")),
        InteractionOutcome::Fail(mismatches) => {
          let mut lines = vec![format!("  {} ... {}", interaction.description,
            paint(coloured, Red, "FAILED"))];
          for mismatch in mismatches {
            lines.push(format!("    - {}", mismatch.description()));
          }
          lines.join("\n")
        },
        InteractionOutcome::RequestFailed(error) => format!("  {} ... {}\n    - {}",
          interaction.description, paint(coloured, Red, "FAILED"), error),
        InteractionOutcome::SkippedStateMissing(state) => format!("  {} ... {} (unknown provider state '{}')",
          interaction.description, paint(coloured, Yellow, "SKIPPED"), state),
        InteractionOutcome::SkippedStateError(error) => format!("  {} ... {} (provider state error: {})",
          interaction.description, paint(coloured, Yellow, "SKIPPED"), error)
      };
      output.push(line);
    }
  }
  if result.cancelled {
    output.push("\nVerification was cancelled before all interactions were verified".to_string());
  }
  output.push(String::default());
  output.push(if result.all_passed() {
    paint(coloured, Green, "Verification passed")
  } else {
    paint(coloured, Red, "Verification failed")
  });
  output.join("\n")
}

fn paint(coloured: bool, colour: ansi_term::Colour, text: &str) -> String {
  if coloured {
    colour.paint(text).to_string()
  } else {
    text.to_string()
  }
}
