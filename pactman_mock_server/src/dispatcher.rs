//! The dispatcher that holds the registered interactions for the current
//! test and matches incoming requests against them

use std::sync::{Arc, Mutex};

use itertools::Itertools;
use tracing::{debug, info, warn};

use pactman_matching::match_request;
use pactman_models::interaction::Interaction;
use pactman_models::request::Request;
use pactman_models::response::Response;

use crate::matching::MatchResult;
use crate::MockServerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InteractionState {
  Registered,
  Consumed
}

#[derive(Debug)]
struct RegisteredInteraction {
  interaction: Interaction,
  state: InteractionState
}

#[derive(Debug, Default)]
struct DispatcherState {
  interactions: Vec<RegisteredInteraction>,
  failures: Vec<MatchResult>,
  received: Vec<Request>
}

/// Holds the interactions registered for the current test, dispatches
/// incoming requests to them in declaration order, and enforces the
/// single-use lifecycle: an interaction answers exactly one request.
///
/// All state sits behind one mutex, shared with the HTTP transport thread
/// when a real server is used.
#[derive(Debug, Clone, Default)]
pub struct MockDispatcher {
  state: Arc<Mutex<DispatcherState>>
}

impl MockDispatcher {
  /// Creates an empty dispatcher
  pub fn new() -> MockDispatcher {
    MockDispatcher::default()
  }

  /// Registers an interaction. Interactions answer requests in the order
  /// they were registered.
  pub fn register(&self, interaction: Interaction) {
    debug!("Registering interaction '{}'", interaction.description);
    let mut state = self.state.lock().unwrap();
    state.interactions.push(RegisteredInteraction {
      interaction,
      state: InteractionState::Registered
    });
  }

  /// Dispatches a request to the registered interactions. The first
  /// registered interaction with no mismatches is consumed and its
  /// response returned. Requests that only match an already consumed
  /// interaction are recorded as duplicate calls; requests that match
  /// nothing are recorded with the mismatches of the closest candidate.
  pub fn dispatch(&self, request: Request) -> MatchResult {
    let mut state = self.state.lock().unwrap();
    state.received.push(request.clone());

    let mut candidates = vec![];
    for entry in state.interactions.iter_mut() {
      if entry.state != InteractionState::Registered {
        continue;
      }
      let mismatches = match_request(&entry.interaction.request, &request);
      if mismatches.is_empty() {
        info!("Request matched interaction '{}'", entry.interaction.description);
        entry.state = InteractionState::Consumed;
        return MatchResult::RequestMatch(entry.interaction.clone());
      }
      candidates.push((entry.interaction.clone(), mismatches));
    }

    // nothing open matched; a match against a consumed interaction is a
    // duplicate call
    let duplicate = state.interactions.iter()
      .filter(|entry| entry.state == InteractionState::Consumed)
      .find(|entry| match_request(&entry.interaction.request, &request).is_empty())
      .map(|entry| entry.interaction.clone());
    if let Some(interaction) = duplicate {
      warn!("Duplicate call to interaction '{}'", interaction.description);
      let result = MatchResult::DuplicateRequest(interaction);
      state.failures.push(result.clone());
      return result;
    }

    let result = match candidates.into_iter()
      .sorted_by_key(|(_, mismatches)| mismatches.iter()
        .map(|m| m.mismatch_type()).unique().count())
      .next() {
      Some((interaction, mismatches)) =>
        MatchResult::RequestMismatch(interaction, mismatches),
      None => MatchResult::RequestNotFound(request)
    };
    warn!("Request did not match any interaction: {}", result.description());
    state.failures.push(result.clone());
    result
  }

  /// The response the caller should receive for a dispatch result: the
  /// interaction's declared response on a match, a 500 otherwise
  pub fn response_for(&self, result: &MatchResult) -> Response {
    match result {
      MatchResult::RequestMatch(interaction) => interaction.response.clone(),
      _ => Response { status: 500, .. Response::default() }
    }
  }

  /// All the requests received so far, in order
  pub fn received_requests(&self) -> Vec<Request> {
    self.state.lock().unwrap().received.clone()
  }

  /// All the interactions that were registered, regardless of state
  pub fn interactions(&self) -> Vec<Interaction> {
    self.state.lock().unwrap().interactions.iter()
      .map(|entry| entry.interaction.clone())
      .collect()
  }

  /// Verifies the session: succeeds when every registered interaction was
  /// consumed and no failures were recorded. Otherwise returns the
  /// composite list of unused interactions and mismatched requests.
  pub fn verify(&self) -> Result<(), Vec<MockServerError>> {
    let state = self.state.lock().unwrap();
    let mut errors = vec![];
    for failure in &state.failures {
      errors.push(MockServerError::MockMismatch(failure.description()));
    }
    for entry in &state.interactions {
      if entry.state == InteractionState::Registered {
        errors.push(MockServerError::InteractionUnused(entry.interaction.description.clone()));
      }
    }
    if errors.is_empty() {
      Ok(())
    } else {
      Err(errors)
    }
  }
}
