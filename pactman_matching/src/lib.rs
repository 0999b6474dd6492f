//! The `pactman_matching` crate provides the core logic for matching HTTP
//! requests and responses against the expectations recorded in a pact. It
//! implements the matching rules of the V1.1, V2 and V3 Pact specifications.
//!
//! The two entry points are [`match_request`] and [`match_response`]. Both
//! take an expected and an actual model from `pactman_models` and return the
//! full list of mismatches found; an empty list means a match. The engine
//! collects every mismatch rather than stopping at the first.
//!
//! Matching rules are addressed by a pseudo JSONPath syntax and selected by
//! weight, so the most specific rule for a value wins and type-based rules
//! cascade to descendants unless a more specific rule intervenes.

#![warn(missing_docs)]

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use serde_json::json;
use tracing::{debug, instrument};

use pactman_models::content_types::ContentType;
use pactman_models::http_parts::HttpPart;
use pactman_models::matchingrules::{Category, MatchingRuleCategory, RuleList};
use pactman_models::query_strings::parse_query_string;
use pactman_models::request::Request;
use pactman_models::response::Response;

pub mod headers;
pub mod json;
mod matchers;
pub mod query;

pub use matchers::{match_values, Matches};

/// Enum that defines the different types of mismatches that can occur
#[derive(Debug, Clone, Eq)]
pub enum Mismatch {
  /// Request method mismatch
  MethodMismatch {
    /// Expected request method
    expected: String,
    /// Actual request method
    actual: String
  },
  /// Request path mismatch
  PathMismatch {
    /// Expected request path
    expected: String,
    /// Actual request path
    actual: String,
    /// Description of the mismatch
    mismatch: String
  },
  /// Response status mismatch
  StatusMismatch {
    /// Expected response status
    expected: u16,
    /// Actual response status
    actual: u16
  },
  /// Request query mismatch
  QueryMismatch {
    /// Query parameter name
    parameter: String,
    /// Expected value
    expected: String,
    /// Actual value
    actual: String,
    /// Description of the mismatch
    mismatch: String
  },
  /// Header mismatch
  HeaderMismatch {
    /// Header name
    key: String,
    /// Expected value
    expected: String,
    /// Actual value
    actual: String,
    /// Description of the mismatch
    mismatch: String
  },
  /// Mismatch in the content type of the body
  BodyTypeMismatch {
    /// Expected content type
    expected: String,
    /// Actual content type
    actual: String,
    /// Description of the mismatch
    mismatch: String
  },
  /// Body element mismatch
  BodyMismatch {
    /// Path expression to where the mismatch occurred
    path: String,
    /// Expected value summary
    expected: Option<String>,
    /// Actual value summary, truncated if large
    actual: Option<String>,
    /// Description of the mismatch
    mismatch: String
  }
}

impl Mismatch {
  /// Returns the type of the mismatch as a string
  pub fn mismatch_type(&self) -> &'static str {
    match self {
      Mismatch::MethodMismatch { .. } => "MethodMismatch",
      Mismatch::PathMismatch { .. } => "PathMismatch",
      Mismatch::StatusMismatch { .. } => "StatusMismatch",
      Mismatch::QueryMismatch { .. } => "QueryMismatch",
      Mismatch::HeaderMismatch { .. } => "HeaderMismatch",
      Mismatch::BodyTypeMismatch { .. } => "BodyTypeMismatch",
      Mismatch::BodyMismatch { .. } => "BodyMismatch"
    }
  }

  /// Returns a formatted string for this mismatch
  pub fn description(&self) -> String {
    match self {
      Mismatch::MethodMismatch { expected, actual } =>
        format!("expected method {} but was {}", expected, actual),
      Mismatch::PathMismatch { mismatch, .. } => mismatch.clone(),
      Mismatch::StatusMismatch { expected, actual } =>
        format!("expected status {} but was {}", expected, actual),
      Mismatch::QueryMismatch { mismatch, .. } => mismatch.clone(),
      Mismatch::HeaderMismatch { mismatch, .. } => mismatch.clone(),
      Mismatch::BodyTypeMismatch { expected, actual, .. } =>
        format!("expected a body of '{}' but the actual content type was '{}'", expected, actual),
      Mismatch::BodyMismatch { path, mismatch, .. } => format!("{} -> {}", path, mismatch)
    }
  }

  /// Converts this mismatch to a `Value` struct
  pub fn to_json(&self) -> serde_json::Value {
    match self {
      Mismatch::MethodMismatch { expected, actual } => json!({
        "type": "MethodMismatch", "expected": expected, "actual": actual
      }),
      Mismatch::PathMismatch { expected, actual, mismatch } => json!({
        "type": "PathMismatch", "expected": expected, "actual": actual, "mismatch": mismatch
      }),
      Mismatch::StatusMismatch { expected, actual } => json!({
        "type": "StatusMismatch", "expected": expected, "actual": actual
      }),
      Mismatch::QueryMismatch { parameter, expected, actual, mismatch } => json!({
        "type": "QueryMismatch", "parameter": parameter, "expected": expected,
        "actual": actual, "mismatch": mismatch
      }),
      Mismatch::HeaderMismatch { key, expected, actual, mismatch } => json!({
        "type": "HeaderMismatch", "key": key, "expected": expected,
        "actual": actual, "mismatch": mismatch
      }),
      Mismatch::BodyTypeMismatch { expected, actual, mismatch } => json!({
        "type": "BodyTypeMismatch", "expected": expected, "actual": actual, "mismatch": mismatch
      }),
      Mismatch::BodyMismatch { path, expected, actual, mismatch } => json!({
        "type": "BodyMismatch", "path": path,
        "expected": expected.clone().map(serde_json::Value::String).unwrap_or(serde_json::Value::Null),
        "actual": actual.clone().map(serde_json::Value::String).unwrap_or(serde_json::Value::Null),
        "mismatch": mismatch
      })
    }
  }
}

// Equality ignores the mismatch description, so tests can compare against
// expected mismatches without repeating the exact wording
impl PartialEq for Mismatch {
  fn eq(&self, other: &Mismatch) -> bool {
    match (self, other) {
      (Mismatch::MethodMismatch { expected: e1, actual: a1 },
        Mismatch::MethodMismatch { expected: e2, actual: a2 }) => e1 == e2 && a1 == a2,
      (Mismatch::PathMismatch { expected: e1, actual: a1, .. },
        Mismatch::PathMismatch { expected: e2, actual: a2, .. }) => e1 == e2 && a1 == a2,
      (Mismatch::StatusMismatch { expected: e1, actual: a1 },
        Mismatch::StatusMismatch { expected: e2, actual: a2 }) => e1 == e2 && a1 == a2,
      (Mismatch::QueryMismatch { parameter: p1, expected: e1, actual: a1, .. },
        Mismatch::QueryMismatch { parameter: p2, expected: e2, actual: a2, .. }) =>
        p1 == p2 && e1 == e2 && a1 == a2,
      (Mismatch::HeaderMismatch { key: k1, expected: e1, actual: a1, .. },
        Mismatch::HeaderMismatch { key: k2, expected: e2, actual: a2, .. }) =>
        k1 == k2 && e1 == e2 && a1 == a2,
      (Mismatch::BodyTypeMismatch { expected: e1, actual: a1, .. },
        Mismatch::BodyTypeMismatch { expected: e2, actual: a2, .. }) => e1 == e2 && a1 == a2,
      (Mismatch::BodyMismatch { path: p1, expected: e1, actual: a1, .. },
        Mismatch::BodyMismatch { path: p2, expected: e2, actual: a2, .. }) =>
        p1 == p2 && e1 == e2 && a1 == a2,
      _ => false
    }
  }
}

impl Display for Mismatch {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    write!(f, "{}", self.description())
  }
}

/// Truncates a value summary so mismatch reports stay readable
pub(crate) fn truncate_summary(value: &str) -> String {
  if value.chars().count() > 80 {
    let truncated: String = value.chars().take(77).collect();
    format!("{}...", truncated)
  } else {
    value.to_string()
  }
}

/// Enum that defines the configuration options for performing a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffConfig {
  /// Unexpected keys in actual maps are allowed and ignored
  AllowUnexpectedKeys,
  /// Unexpected keys in actual maps cause a mismatch
  NoUnexpectedKeys
}

/// Context for a single matching pass: the rules for one category plus the
/// key-comparison configuration
#[derive(Debug, Clone)]
pub struct MatchingContext {
  /// Matching rules for the category being compared
  pub category: MatchingRuleCategory,
  /// How unexpected map keys are treated
  pub config: DiffConfig
}

impl MatchingContext {
  /// Creates a context with the given rules and configuration
  pub fn new(config: DiffConfig, category: &MatchingRuleCategory) -> MatchingContext {
    MatchingContext { category: category.clone(), config }
  }

  /// Creates a context with no rules
  pub fn with_config(config: DiffConfig) -> MatchingContext {
    MatchingContext { category: MatchingRuleCategory::default(), config }
  }

  /// If any rule applies at the given concrete path
  pub fn matcher_is_defined(&self, path: &[&str]) -> bool {
    self.category.matcher_is_defined(path)
  }

  /// Selects the best rule list for the path
  pub fn select_best_matcher(&self, path: &[&str]) -> RuleList {
    self.category.select_best_matcher(path)
  }

  /// If a field wildcard rule is registered exactly at the given path
  pub fn wildcard_matcher_is_defined(&self, path: &[&str]) -> bool {
    self.category.wildcard_matcher_is_defined(path)
  }
}

impl Default for MatchingContext {
  fn default() -> Self {
    MatchingContext::with_config(DiffConfig::AllowUnexpectedKeys)
  }
}

/// Merges two match results, accumulating any mismatches
pub fn merge_result(
  res1: Result<(), Vec<Mismatch>>,
  res2: Result<(), Vec<Mismatch>>
) -> Result<(), Vec<Mismatch>> {
  match (res1, res2) {
    (Ok(()), Ok(())) => Ok(()),
    (Err(m), Ok(())) | (Ok(()), Err(m)) => Err(m),
    (Err(mut m1), Err(m2)) => {
      m1.extend(m2);
      Err(m1)
    }
  }
}

fn rules_for(part: &dyn HttpPart, category: Category) -> MatchingRuleCategory {
  part.matching_rules().rules_for_category(category)
    .unwrap_or_else(|| MatchingRuleCategory::empty(category))
}

/// Matches the actual request method against the expected one. Methods are
/// compared case-insensitively.
pub fn match_method(expected: &str, actual: &str, mismatches: &mut Vec<Mismatch>) {
  if expected.to_uppercase() != actual.to_uppercase() {
    mismatches.push(Mismatch::MethodMismatch {
      expected: expected.to_string(),
      actual: actual.to_string()
    });
  }
}

/// Matches the actual request path against the expected one
pub fn match_path(
  expected: &str,
  actual: &str,
  mismatches: &mut Vec<Mismatch>,
  context: &MatchingContext
) {
  let path = ["$"];
  let result = if context.matcher_is_defined(&path) {
    match_values(&context.select_best_matcher(&path), expected, actual)
  } else {
    expected.matches_with(actual, &pactman_models::matchingrules::MatchingRule::Equality, false)
      .map_err(|err| vec![err.to_string()])
  };
  if let Err(messages) = result {
    for message in messages {
      mismatches.push(Mismatch::PathMismatch {
        expected: expected.to_string(),
        actual: actual.to_string(),
        mismatch: message
      });
    }
  }
}

/// Matches the actual response status against the expected one
pub fn match_status(expected: u16, actual: u16, mismatches: &mut Vec<Mismatch>) {
  if expected != actual {
    mismatches.push(Mismatch::StatusMismatch { expected, actual });
  }
}

fn match_form_urlencoded_body(
  expected: &dyn HttpPart,
  actual: &dyn HttpPart,
  context: &MatchingContext,
  mismatches: &mut Vec<Mismatch>
) {
  let expected_form = parse_query_string(&expected.body().str_value()).unwrap_or_default();
  let actual_form = parse_query_string(&actual.body().str_value()).unwrap_or_default();
  for mismatch in query::match_query(&Some(expected_form), &Some(actual_form), context) {
    // re-shape the query mismatches so they report against the body
    if let Mismatch::QueryMismatch { parameter, expected, actual, mismatch } = mismatch {
      mismatches.push(Mismatch::BodyMismatch {
        path: format!("$.body.{}", parameter),
        expected: Some(expected),
        actual: Some(actual),
        mismatch
      });
    }
  }
}

fn match_text_body(
  expected: &dyn HttpPart,
  actual: &dyn HttpPart,
  context: &MatchingContext,
  mismatches: &mut Vec<Mismatch>
) {
  let expected_text = expected.body().str_value();
  let actual_text = actual.body().str_value();
  let path = ["$"];
  let result = if context.matcher_is_defined(&path) {
    match_values(&context.select_best_matcher(&path), expected_text.as_str(), actual_text.as_str())
  } else if expected.body().value() != actual.body().value() {
    Err(vec![format!("Expected body '{}' to match '{}' by equality",
      truncate_summary(&actual_text), truncate_summary(&expected_text))])
  } else {
    Ok(())
  };
  if let Err(messages) = result {
    for message in messages {
      mismatches.push(Mismatch::BodyMismatch {
        path: "$.body".to_string(),
        expected: Some(truncate_summary(&expected_text)),
        actual: Some(truncate_summary(&actual_text)),
        mismatch: message
      });
    }
  }
}

fn match_body_content(
  content_type: &ContentType,
  expected: &dyn HttpPart,
  actual: &dyn HttpPart,
  context: &MatchingContext,
  mismatches: &mut Vec<Mismatch>
) {
  if content_type.is_json() {
    if let Err(json_mismatches) = json::match_json(expected, actual, context) {
      mismatches.extend(json_mismatches);
    }
  } else if content_type.is_form_urlencoded() {
    match_form_urlencoded_body(expected, actual, context, mismatches);
  } else {
    match_text_body(expected, actual, context, mismatches);
  }
}

/// Matches the actual body against the expected one, taking the content
/// types into account
pub fn match_body(
  expected: &dyn HttpPart,
  actual: &dyn HttpPart,
  config: DiffConfig,
  mismatches: &mut Vec<Mismatch>
) {
  use pactman_models::bodies::OptionalBody;

  let context = MatchingContext::new(config, &rules_for(expected, Category::BODY));
  let expected_content_type = expected.content_type().unwrap_or_default();
  let actual_content_type = actual.content_type().unwrap_or_default();
  debug!("expected content type = '{}', actual content type = '{}'",
    expected_content_type, actual_content_type);

  if expected.body().is_present() && !expected_content_type.is_unknown() &&
    !actual_content_type.is_unknown() && expected_content_type != actual_content_type {
    mismatches.push(Mismatch::BodyTypeMismatch {
      expected: expected_content_type.to_string(),
      actual: actual_content_type.to_string(),
      mismatch: format!("Expected a body with content type {} but was {}",
        expected_content_type, actual_content_type)
    });
    return;
  }

  match (expected.body(), actual.body()) {
    (OptionalBody::Missing, _) => (),
    (OptionalBody::Null, OptionalBody::Present(b, _)) |
    (OptionalBody::Empty, OptionalBody::Present(b, _)) => {
      mismatches.push(Mismatch::BodyMismatch {
        path: "$.body".to_string(),
        expected: None,
        actual: Some(truncate_summary(&String::from_utf8_lossy(b))),
        mismatch: format!("Expected an empty body but received '{}'",
          truncate_summary(&String::from_utf8_lossy(b)))
      });
    },
    (OptionalBody::Null, _) | (OptionalBody::Empty, _) => (),
    (e, OptionalBody::Missing) => {
      mismatches.push(Mismatch::BodyMismatch {
        path: "$.body".to_string(),
        expected: Some(truncate_summary(&String::from_utf8_lossy(&e.value()))),
        actual: None,
        mismatch: "Expected a body but was missing".to_string()
      });
    },
    (_, _) => match_body_content(&expected_content_type, expected, actual, &context, mismatches)
  }
}

/// Matches the expected and actual requests and returns all the mismatches
#[instrument(level = "debug", skip_all)]
pub fn match_request(expected: &Request, actual: &Request) -> Vec<Mismatch> {
  debug!("comparing to expected {}", expected);
  let mut mismatches = vec![];

  match_method(&expected.method, &actual.method, &mut mismatches);
  match_path(&expected.path, &actual.path, &mut mismatches,
    &MatchingContext::new(DiffConfig::NoUnexpectedKeys, &rules_for(expected, Category::PATH)));
  mismatches.extend(query::match_query(&expected.query, &actual.query,
    &MatchingContext::new(DiffConfig::NoUnexpectedKeys, &rules_for(expected, Category::QUERY))));
  mismatches.extend(headers::match_headers(&expected.headers, &actual.headers,
    &MatchingContext::new(DiffConfig::NoUnexpectedKeys, &rules_for(expected, Category::HEADER))));
  match_body(expected, actual, DiffConfig::NoUnexpectedKeys, &mut mismatches);

  debug!("--> Mismatches: {:?}", mismatches);
  mismatches
}

/// Matches the expected and actual responses and returns all the mismatches
#[instrument(level = "debug", skip_all)]
pub fn match_response(expected: &Response, actual: &Response) -> Vec<Mismatch> {
  debug!("comparing to expected {}", expected);
  let mut mismatches = vec![];

  match_status(expected.status, actual.status, &mut mismatches);
  mismatches.extend(headers::match_headers(&expected.headers, &actual.headers,
    &MatchingContext::new(DiffConfig::AllowUnexpectedKeys, &rules_for(expected, Category::HEADER))));
  match_body(expected, actual, DiffConfig::AllowUnexpectedKeys, &mut mismatches);

  debug!("--> Mismatches: {:?}", mismatches);
  mismatches
}

/// Renders a header or query value map for a mismatch report
pub(crate) fn display_values(values: &HashMap<String, Vec<String>>) -> String {
  format!("{:?}", values)
}

#[cfg(test)]
mod tests;
