//! Matching functions for query parameters

use std::collections::HashMap;

use pactman_models::matchingrules::MatchingRule;

use crate::{display_values, match_values, MatchingContext, Mismatch};
use crate::matchers::Matches;

fn compare_value(
  key: &str,
  expected: &str,
  actual: &str,
  index: usize,
  context: &MatchingContext,
  mismatches: &mut Vec<Mismatch>
) {
  let index_fragment = index.to_string();
  let indexed_path = ["$", key, index_fragment.as_str()];
  let result = if context.matcher_is_defined(&indexed_path) {
    match_values(&context.select_best_matcher(&indexed_path), expected, actual)
  } else {
    expected.matches_with(actual, &MatchingRule::Equality, false)
      .map_err(|err| vec![err.to_string()])
  };
  if let Err(messages) = result {
    for message in messages {
      mismatches.push(Mismatch::QueryMismatch {
        parameter: key.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
        mismatch: message
      });
    }
  }
}

fn compare_values(
  key: &str,
  expected: &[String],
  actual: &[String],
  context: &MatchingContext,
  mismatches: &mut Vec<Mismatch>
) {
  if expected.is_empty() && !actual.is_empty() {
    mismatches.push(Mismatch::QueryMismatch {
      parameter: key.to_string(),
      expected: format!("{:?}", expected),
      actual: format!("{:?}", actual),
      mismatch: format!("Expected an empty parameter list for '{}' but received {:?}", key, actual)
    });
    return;
  }
  if expected.len() != actual.len() {
    mismatches.push(Mismatch::QueryMismatch {
      parameter: key.to_string(),
      expected: format!("{:?}", expected),
      actual: format!("{:?}", actual),
      mismatch: format!("Expected query parameter '{}' with {} value(s) but received {} value(s)",
        key, expected.len(), actual.len())
    });
  }
  for (index, value) in expected.iter().enumerate() {
    match actual.get(index) {
      Some(actual_value) => compare_value(key, value, actual_value, index, context, mismatches),
      None => mismatches.push(Mismatch::QueryMismatch {
        parameter: key.to_string(),
        expected: format!("{:?}", expected),
        actual: format!("{:?}", actual),
        mismatch: format!("Expected query parameter '{}' value '{}' but was missing", key, value)
      })
    }
  }
}

/// Matches the actual query parameters against the expected ones. Every
/// declared parameter must be present with its declared values, and no
/// undeclared parameter names are permitted in the actual request.
pub fn match_query(
  expected: &Option<HashMap<String, Vec<String>>>,
  actual: &Option<HashMap<String, Vec<String>>>,
  context: &MatchingContext
) -> Vec<Mismatch> {
  let empty = HashMap::default();
  let expected = expected.as_ref().unwrap_or(&empty);
  let actual = actual.as_ref().unwrap_or(&empty);

  let mut mismatches = vec![];
  for (key, values) in expected {
    match actual.get(key) {
      Some(actual_values) => compare_values(key, values, actual_values, context, &mut mismatches),
      None => mismatches.push(Mismatch::QueryMismatch {
        parameter: key.clone(),
        expected: format!("{:?}", values),
        actual: String::default(),
        mismatch: format!("Expected query parameter '{}' but was missing", key)
      })
    }
  }
  for (key, values) in actual {
    if !expected.contains_key(key) {
      mismatches.push(Mismatch::QueryMismatch {
        parameter: key.clone(),
        expected: String::default(),
        actual: display_values(&HashMap::from([(key.clone(), values.clone())])),
        mismatch: format!("Unexpected query parameter '{}' received", key)
      });
    }
  }
  mismatches
}
