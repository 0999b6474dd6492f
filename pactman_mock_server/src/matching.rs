//! The result of matching a request against the registered interactions

use serde_json::json;

use pactman_matching::Mismatch;
use pactman_models::interaction::Interaction;
use pactman_models::PactSpecification;
use pactman_models::request::Request;

/// Result of dispatching a request to the registered interactions
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
  /// The request matched a registered interaction
  RequestMatch(Interaction),
  /// The request was close to an interaction, but violated some rules
  RequestMismatch(Interaction, Vec<Mismatch>),
  /// The request did not match any registered interaction
  RequestNotFound(Request),
  /// The request matched an interaction that was already consumed
  DuplicateRequest(Interaction),
  /// A registered interaction never received its request
  MissingRequest(Interaction)
}

impl MatchResult {
  /// The key used to report this result
  pub fn match_key(&self) -> &'static str {
    match self {
      MatchResult::RequestMatch(_) => "Request-Matched",
      MatchResult::RequestMismatch(_, _) => "Request-Mismatch",
      MatchResult::RequestNotFound(_) => "Unexpected-Request",
      MatchResult::DuplicateRequest(_) => "Duplicate-Request",
      MatchResult::MissingRequest(_) => "Missing-Request"
    }
  }

  /// If this result is a successful match
  pub fn matched(&self) -> bool {
    matches!(self, MatchResult::RequestMatch(_))
  }

  /// Converts this result to a `Value` struct
  pub fn to_json(&self) -> serde_json::Value {
    match self {
      MatchResult::RequestMatch(_) => json!({ "type": "request-match" }),
      MatchResult::RequestMismatch(interaction, mismatches) => json!({
        "type": "request-mismatch",
        "method": interaction.request.method,
        "path": interaction.request.path,
        "mismatches": mismatches.iter().map(|m| m.to_json()).collect::<serde_json::Value>()
      }),
      MatchResult::RequestNotFound(request) => json!({
        "type": "request-not-found",
        "method": request.method,
        "path": request.path,
        "request": request.to_json(PactSpecification::V3)
      }),
      MatchResult::DuplicateRequest(interaction) => json!({
        "type": "duplicate-request",
        "method": interaction.request.method,
        "path": interaction.request.path,
        "description": interaction.description
      }),
      MatchResult::MissingRequest(interaction) => json!({
        "type": "missing-request",
        "method": interaction.request.method,
        "path": interaction.request.path,
        "request": interaction.request.to_json(PactSpecification::V3)
      })
    }
  }

  /// A one-line description of this result for error reports
  pub fn description(&self) -> String {
    match self {
      MatchResult::RequestMatch(interaction) =>
        format!("request matched '{}'", interaction.description),
      MatchResult::RequestMismatch(interaction, mismatches) =>
        format!("request for '{}' had {} mismatch(es): {}", interaction.description,
          mismatches.len(),
          mismatches.iter().map(|m| m.description()).collect::<Vec<String>>().join("; ")),
      MatchResult::RequestNotFound(request) =>
        format!("no interaction matched {} {}", request.method, request.path),
      MatchResult::DuplicateRequest(interaction) =>
        format!("duplicate call to interaction '{}'", interaction.description),
      MatchResult::MissingRequest(interaction) =>
        format!("interaction '{}' was never received", interaction.description)
    }
  }
}
