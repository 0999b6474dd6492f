//! The results of a verification execution

use serde_json::{json, Value};

use pactman_matching::Mismatch;

/// Outcome of verifying a single interaction
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionOutcome {
  /// The provider's response satisfied every rule
  Pass,
  /// The provider's response violated one or more rules
  Fail(Vec<Mismatch>),
  /// The request to the provider could not be completed
  RequestFailed(String),
  /// The provider state setter did not recognise a state
  SkippedStateMissing(String),
  /// The provider state setter failed while applying a state
  SkippedStateError(String)
}

impl InteractionOutcome {
  /// If this outcome counts towards a successful verification. Skipped
  /// interactions do not fail the run.
  pub fn passed_or_skipped(&self) -> bool {
    !matches!(self, InteractionOutcome::Fail(_) | InteractionOutcome::RequestFailed(_))
  }
}

/// The result of verifying one interaction
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionResult {
  /// Description of the interaction
  pub description: String,
  /// The outcome of the verification
  pub outcome: InteractionOutcome
}

impl InteractionResult {
  /// Converts this result to a `Value` struct for reports
  pub fn to_json(&self) -> Value {
    match &self.outcome {
      InteractionOutcome::Pass => json!({
        "description": self.description, "result": "passed"
      }),
      InteractionOutcome::Fail(mismatches) => json!({
        "description": self.description,
        "result": "failed",
        "mismatches": mismatches.iter().map(|m| m.to_json()).collect::<Value>()
      }),
      InteractionOutcome::RequestFailed(error) => json!({
        "description": self.description, "result": "failed", "error": error
      }),
      InteractionOutcome::SkippedStateMissing(state) => json!({
        "description": self.description, "result": "skipped", "missingState": state
      }),
      InteractionOutcome::SkippedStateError(error) => json!({
        "description": self.description, "result": "skipped", "stateError": error
      })
    }
  }
}

/// The result of verifying one pact
#[derive(Debug, Clone, PartialEq)]
pub struct PactVerificationResult {
  /// Name of the consumer of the pact
  pub consumer: String,
  /// Per-interaction results, in the order the pact declares them
  pub results: Vec<InteractionResult>
}

impl PactVerificationResult {
  /// If every interaction of this pact passed or was skipped
  pub fn passed(&self) -> bool {
    self.results.iter().all(|result| result.outcome.passed_or_skipped())
  }
}

/// The accumulated result of a verification run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationExecutionResult {
  /// Per-pact results
  pub pacts: Vec<PactVerificationResult>,
  /// Whether the run was cancelled before every interaction was verified
  pub cancelled: bool
}

impl VerificationExecutionResult {
  /// If the whole run succeeded
  pub fn all_passed(&self) -> bool {
    self.pacts.iter().all(|pact| pact.passed())
  }
}

#[cfg(test)]
mod tests {
  use expectest::prelude::*;

  use super::*;

  #[test]
  fn skipped_interactions_do_not_fail_the_run() {
    let result = VerificationExecutionResult {
      pacts: vec![PactVerificationResult {
        consumer: "C".to_string(),
        results: vec![
          InteractionResult {
            description: "passing".to_string(),
            outcome: InteractionOutcome::Pass
          },
          InteractionResult {
            description: "skipped".to_string(),
            outcome: InteractionOutcome::SkippedStateMissing("some state".to_string())
          }
        ]
      }],
      cancelled: false
    };
    expect!(result.all_passed()).to(be_true());
  }

  #[test]
  fn a_failing_interaction_fails_the_run() {
    let result = VerificationExecutionResult {
      pacts: vec![PactVerificationResult {
        consumer: "C".to_string(),
        results: vec![InteractionResult {
          description: "failing".to_string(),
          outcome: InteractionOutcome::Fail(vec![])
        }]
      }],
      cancelled: false
    };
    expect!(result.all_passed()).to(be_false());
  }
}
