//! Matching functions for headers

use std::collections::HashMap;

use pactman_models::matchingrules::MatchingRule;

use crate::{match_values, MatchingContext, Mismatch};
use crate::matchers::Matches;

// Headers whose values carry parameters: the parameters are compared as a
// map rather than as part of the string
const PARAMETERISED_HEADERS: [&str; 2] = ["accept", "content-type"];

fn strip_whitespace(val: &str, split_by: char) -> String {
  val.split(split_by)
    .map(|v| v.trim())
    .filter(|v| !v.is_empty())
    .collect::<Vec<&str>>()
    .join(&split_by.to_string())
}

fn parse_parameters(parts: &[&str]) -> HashMap<String, String> {
  parts.iter()
    .filter_map(|part| part.split_once('=')
      .map(|(k, v)| (k.trim().to_string(), v.trim().to_string())))
    .collect()
}

fn match_parameter_header(expected: &str, actual: &str, header: &str) -> Result<(), Vec<String>> {
  let expected_values: Vec<&str> = expected.split(';').map(|v| v.trim()).collect();
  let actual_values: Vec<&str> = actual.split(';').map(|v| v.trim()).collect();

  let expected_parts = expected_values.split_first().unwrap_or((&"", &[]));
  let actual_parts = actual_values.split_first().unwrap_or((&"", &[]));
  let mismatch = format!("Expected header '{}' to have value '{}' but was '{}'",
    header, expected, actual);

  if expected_parts.0 != actual_parts.0 {
    return Err(vec![mismatch]);
  }
  let expected_parameters = parse_parameters(expected_parts.1);
  let actual_parameters = parse_parameters(actual_parts.1);
  for (name, value) in &expected_parameters {
    match actual_parameters.get(name) {
      Some(actual_value) if value.eq_ignore_ascii_case(actual_value) => (),
      _ => return Err(vec![mismatch])
    }
  }
  Ok(())
}

fn match_header_value(
  key: &str,
  expected: &str,
  actual: &str,
  context: &MatchingContext
) -> Result<(), Vec<String>> {
  let path = ["$", key];
  let expected = strip_whitespace(expected, ',');
  let actual = strip_whitespace(actual, ',');

  if context.matcher_is_defined(&path) {
    match_values(&context.select_best_matcher(&path), expected.as_str(), actual.as_str())
  } else if PARAMETERISED_HEADERS.contains(&key.to_lowercase().as_str()) {
    match_parameter_header(&expected, &actual, key)
  } else {
    expected.as_str().matches_with(actual.as_str(), &MatchingRule::Equality, false)
      .map_err(|err| vec![err.to_string()])
  }
}

fn find_entry<'a>(
  map: &'a HashMap<String, Vec<String>>,
  key: &str
) -> Option<(&'a String, &'a Vec<String>)> {
  map.iter().find(|(k, _)| k.to_lowercase() == key.to_lowercase())
}

/// Matches the actual headers against the expected ones. Header names are
/// case-insensitive, multiple values are compared as comma-joined strings,
/// and headers in the actual map that were not expected are ignored.
pub fn match_headers(
  expected: &Option<HashMap<String, Vec<String>>>,
  actual: &Option<HashMap<String, Vec<String>>>,
  context: &MatchingContext
) -> Vec<Mismatch> {
  let empty = HashMap::default();
  let expected = expected.as_ref().unwrap_or(&empty);
  let actual = actual.as_ref().unwrap_or(&empty);

  let mut mismatches = vec![];
  for (key, values) in expected {
    match find_entry(actual, key) {
      Some((_, actual_values)) => {
        let expected_value = values.join(", ");
        let actual_value = actual_values.join(", ");
        if let Err(messages) = match_header_value(key, &expected_value, &actual_value, context) {
          for message in messages {
            mismatches.push(Mismatch::HeaderMismatch {
              key: key.clone(),
              expected: expected_value.clone(),
              actual: actual_value.clone(),
              mismatch: format!("Mismatch with header '{}': {}", key, message)
            });
          }
        }
      },
      None => mismatches.push(Mismatch::HeaderMismatch {
        key: key.clone(),
        expected: values.join(", "),
        actual: String::default(),
        mismatch: format!("Expected a header '{}' but was missing", key)
      })
    }
  }
  mismatches
}

#[cfg(test)]
mod tests {
  use expectest::prelude::*;
  use maplit::hashmap;

  use pactman_models::matchingrules::{Category, MatchingRule, MatchingRuleCategory, RuleLogic};
  use pactman_models::path_exp::DocPath;

  use super::*;
  use crate::DiffConfig;

  fn context_with_rule(name: &str, rule: MatchingRule) -> MatchingContext {
    let mut category = MatchingRuleCategory::empty(Category::HEADER);
    category.add_rule(DocPath::new_unwrap(name), rule, RuleLogic::And);
    MatchingContext::new(DiffConfig::AllowUnexpectedKeys, &category)
  }

  #[test]
  fn equal_headers_match() {
    let expected = Some(hashmap!{ "X-Id".to_string() => vec!["42".to_string()] });
    let actual = Some(hashmap!{ "X-Id".to_string() => vec!["42".to_string()] });
    expect!(match_headers(&expected, &actual, &MatchingContext::default()).iter()).to(be_empty());
  }

  #[test]
  fn header_names_are_case_insensitive() {
    let expected = Some(hashmap!{ "x-id".to_string() => vec!["42".to_string()] });
    let actual = Some(hashmap!{ "X-ID".to_string() => vec!["42".to_string()] });
    expect!(match_headers(&expected, &actual, &MatchingContext::default()).iter()).to(be_empty());
  }

  #[test]
  fn a_missing_header_is_a_mismatch() {
    let expected = Some(hashmap!{ "X-Id".to_string() => vec!["42".to_string()] });
    let mismatches = match_headers(&expected, &None, &MatchingContext::default());
    expect!(mismatches.len()).to(be_equal_to(1));
    expect!(mismatches[0].description()).to(
      be_equal_to("Expected a header 'X-Id' but was missing"));
  }

  #[test]
  fn extra_actual_headers_are_ignored() {
    let expected = Some(hashmap!{ "X-Id".to_string() => vec!["42".to_string()] });
    let actual = Some(hashmap!{
      "X-Id".to_string() => vec!["42".to_string()],
      "X-Other".to_string() => vec!["value".to_string()]
    });
    expect!(match_headers(&expected, &actual, &MatchingContext::default()).iter()).to(be_empty());
  }

  #[test]
  fn multi_valued_headers_compare_as_joined_strings() {
    let expected = Some(hashmap!{
      "Accept-Encoding".to_string() => vec!["gzip".to_string(), "deflate".to_string()] });
    let actual = Some(hashmap!{
      "Accept-Encoding".to_string() => vec!["gzip, deflate".to_string()] });
    expect!(match_headers(&expected, &actual, &MatchingContext::default()).iter()).to(be_empty());
  }

  #[test]
  fn content_type_ignores_parameter_order_and_whitespace() {
    let expected = Some(hashmap!{
      "Content-Type".to_string() => vec!["application/json;charset=UTF-8".to_string()] });
    let actual = Some(hashmap!{
      "Content-Type".to_string() => vec!["application/json ; charset=utf-8".to_string()] });
    expect!(match_headers(&expected, &actual, &MatchingContext::default()).iter()).to(be_empty());
  }

  #[test]
  fn content_type_with_a_different_base_type_is_a_mismatch() {
    let expected = Some(hashmap!{
      "Content-Type".to_string() => vec!["application/json".to_string()] });
    let actual = Some(hashmap!{
      "Content-Type".to_string() => vec!["text/html".to_string()] });
    let mismatches = match_headers(&expected, &actual, &MatchingContext::default());
    expect!(mismatches.len()).to(be_equal_to(1));
  }

  #[test]
  fn a_regex_rule_overrides_equality() {
    let expected = Some(hashmap!{ "X-Id".to_string() => vec!["100".to_string()] });
    let actual = Some(hashmap!{ "X-Id".to_string() => vec!["42".to_string()] });
    let context = context_with_rule("X-Id", MatchingRule::Regex("\\d+".into()));
    expect!(match_headers(&expected, &actual, &context).iter()).to(be_empty());

    let actual = Some(hashmap!{ "X-Id".to_string() => vec!["abc".to_string()] });
    expect!(match_headers(&expected, &actual, &context).len()).to(be_equal_to(1));
  }
}
