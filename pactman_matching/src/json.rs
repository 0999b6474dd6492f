//! Comparison of JSON bodies under the matching rules

use serde_json::{json, Value};
use tracing::debug;

use pactman_models::http_parts::HttpPart;
use pactman_models::json_utils::json_to_string;
use pactman_models::matchingrules::{MatchingRule, MatchingRuleCategory, RuleList};

use crate::{DiffConfig, match_values, MatchingContext, merge_result, Mismatch, truncate_summary};
use crate::matchers::Matches;

fn type_of(json: &Value) -> String {
  match json {
    Value::Object(_) => "Map",
    Value::Array(_) => "List",
    Value::Null => "Null",
    Value::Bool(_) => "Boolean",
    Value::Number(_) => "Number",
    Value::String(_) => "String"
  }.to_string()
}

// Body mismatches are reported against the body section of the request or
// response, so the root fragment is rendered as "$.body"
fn display_path(path: &[&str]) -> String {
  let mut rendered = "$.body".to_string();
  for fragment in &path[1..] {
    rendered.push('.');
    rendered.push_str(fragment);
  }
  rendered
}

fn body_mismatch(path: &[&str], expected: &Value, actual: &Value, message: String) -> Mismatch {
  Mismatch::BodyMismatch {
    path: display_path(path),
    expected: Some(truncate_summary(&json_to_string(expected))),
    actual: Some(truncate_summary(&json_to_string(actual))),
    mismatch: message
  }
}

/// Matches the expected JSON body to the actual one, and returns any
/// differences found
pub fn match_json(
  expected: &dyn HttpPart,
  actual: &dyn HttpPart,
  context: &MatchingContext
) -> Result<(), Vec<Mismatch>> {
  let expected_json: Result<Value, _> = serde_json::from_slice(&expected.body().value());
  let actual_json: Result<Value, _> = serde_json::from_slice(&actual.body().value());

  match (expected_json, actual_json) {
    (Ok(expected_json), Ok(actual_json)) =>
      compare(&["$"], &expected_json, &actual_json, context),
    (expected_result, actual_result) => {
      let mut mismatches = vec![];
      if let Err(e) = expected_result {
        mismatches.push(Mismatch::BodyMismatch {
          path: "$.body".to_string(),
          expected: Some(truncate_summary(&expected.body().str_value())),
          actual: Some(truncate_summary(&actual.body().str_value())),
          mismatch: format!("Failed to parse the expected body: '{}'", e)
        });
      }
      if let Err(e) = actual_result {
        mismatches.push(Mismatch::BodyMismatch {
          path: "$.body".to_string(),
          expected: Some(truncate_summary(&expected.body().str_value())),
          actual: Some(truncate_summary(&actual.body().str_value())),
          mismatch: format!("Failed to parse the actual body: '{}'", e)
        });
      }
      Err(mismatches)
    }
  }
}

fn compare(
  path: &[&str],
  expected: &Value,
  actual: &Value,
  context: &MatchingContext
) -> Result<(), Vec<Mismatch>> {
  debug!("Comparing JSON values at path {}", path.join("."));
  match (expected, actual) {
    (Value::Object(emap), Value::Object(amap)) => compare_maps(path, emap, amap, context),
    (Value::Object(_), _) => Err(vec![body_mismatch(path, expected, actual,
      format!("Type mismatch: Expected {} {} but received {} {}",
        type_of(expected), json_to_string(expected), type_of(actual), json_to_string(actual)))]),
    (Value::Array(elist), Value::Array(alist)) => compare_lists(path, elist, alist, context),
    (Value::Array(_), _) => Err(vec![body_mismatch(path, expected, actual,
      format!("Type mismatch: Expected {} {} but received {} {}",
        type_of(expected), json_to_string(expected), type_of(actual), json_to_string(actual)))]),
    (_, _) => compare_values(path, expected, actual, context)
  }
}

fn compare_maps(
  path: &[&str],
  expected: &serde_json::Map<String, Value>,
  actual: &serde_json::Map<String, Value>,
  context: &MatchingContext
) -> Result<(), Vec<Mismatch>> {
  let mut result = Ok(());

  if context.matcher_is_defined(path) {
    let rules = context.select_best_matcher(path);
    let expected_value = Value::Object(expected.clone());
    let actual_value = Value::Object(actual.clone());
    result = merge_result(result,
      match_values(&rules, expected_value.clone(), &actual_value)
        .map_err(|messages| messages.into_iter()
          .map(|m| body_mismatch(path, &expected_value, &actual_value, m))
          .collect()));
    // an equality rule compares the whole subtree, so there is nothing
    // further to recurse into
    if !recurse_under(&rules) {
      return result;
    }
  } else {
    result = merge_result(result, match_keys(path, expected, actual, context));
  }

  for (key, value) in expected {
    let mut p = path.to_vec();
    p.push(key.as_str());
    if let Some(actual_value) = actual.get(key) {
      result = merge_result(result, compare(&p, value, actual_value, context));
    } else if !context.wildcard_matcher_is_defined(&p) {
      result = merge_result(result, Err(vec![body_mismatch(path,
        &json!(expected), &json!(actual),
        format!("Expected entry {}={} but was missing", key, json_to_string(value)))]));
    }
  }
  result
}

// Type and length rules assert the shape of a collection and require
// recursion into the entries; equality, regex and include rules compare the
// whole value in one go
fn recurse_under(rules: &RuleList) -> bool {
  rules.rules.iter().any(|rule| matches!(rule,
    MatchingRule::Type | MatchingRule::MinType(_) | MatchingRule::MaxType(_)))
}

fn match_keys(
  path: &[&str],
  expected: &serde_json::Map<String, Value>,
  actual: &serde_json::Map<String, Value>,
  context: &MatchingContext
) -> Result<(), Vec<Mismatch>> {
  if expected.is_empty() && !actual.is_empty() {
    return Err(vec![body_mismatch(path, &json!(expected), &json!(actual),
      format!("Expected an empty Map but received {}", json_to_string(&json!(actual))))]);
  }
  let mut expected_keys: Vec<&String> = expected.keys().collect();
  expected_keys.sort();
  let mut actual_keys: Vec<&String> = actual.keys().collect();
  actual_keys.sort();
  let unexpected: Vec<&str> = actual_keys.iter()
    .filter(|k| !expected.contains_key(k.as_str()))
    .map(|k| k.as_str())
    .collect();
  if context.config == DiffConfig::NoUnexpectedKeys && !unexpected.is_empty() {
    return Err(vec![body_mismatch(path, &json!(expected), &json!(actual),
      format!("Expected a Map with keys {} but received one with keys {}",
        expected_keys.iter().map(|k| k.as_str()).collect::<Vec<&str>>().join(", "),
        actual_keys.iter().map(|k| k.as_str()).collect::<Vec<&str>>().join(", ")))]);
  }
  Ok(())
}

fn compare_lists(
  path: &[&str],
  expected: &[Value],
  actual: &[Value],
  context: &MatchingContext
) -> Result<(), Vec<Mismatch>> {
  if context.matcher_is_defined(path) {
    let mut result = Ok(());
    let rules = context.select_best_matcher(path);
    for rule in &rules.rules {
      let rule_result = match rule {
        MatchingRule::ArrayContains(variants) =>
          compare_array_contains(path, expected, actual, variants, context),
        _ => {
          let expected_value = Value::Array(expected.to_vec());
          let actual_value = Value::Array(actual.to_vec());
          let single = RuleList { rules: vec![rule.clone()], .. rules.clone() };
          let value_result = match_values(&single, expected_value.clone(), &actual_value)
            .map_err(|messages| messages.into_iter()
              .map(|m| body_mismatch(path, &expected_value, &actual_value, m))
              .collect());
          if recurse_under(&single) {
            merge_result(value_result, compare_list_shape(path, expected, actual, context))
          } else {
            value_result
          }
        }
      };
      result = merge_result(result, rule_result);
    }
    result
  } else if expected.is_empty() && !actual.is_empty() {
    Err(vec![body_mismatch(path, &json!(expected), &json!(actual),
      format!("Expected an empty List but received {}", json_to_string(&json!(actual))))])
  } else {
    let result = compare_list_content(path, expected, actual, context);
    if expected.len() != actual.len() {
      merge_result(result, Err(vec![body_mismatch(path, &json!(expected), &json!(actual),
        format!("Expected a List with {} element(s) but received {} element(s)",
          expected.len(), actual.len()))]))
    } else {
      result
    }
  }
}

// Each actual element is validated against the example element at the same
// index, cycling back to the first example when the actual list is longer
fn compare_list_shape(
  path: &[&str],
  expected: &[Value],
  actual: &[Value],
  context: &MatchingContext
) -> Result<(), Vec<Mismatch>> {
  let mut result = Ok(());
  for (index, actual_value) in actual.iter().enumerate() {
    if let Some(expected_value) = expected.get(index).or_else(|| expected.first()) {
      let ps = index.to_string();
      let mut p = path.to_vec();
      p.push(ps.as_str());
      result = merge_result(result, compare(&p, expected_value, actual_value, context));
    }
  }
  result
}

fn compare_list_content(
  path: &[&str],
  expected: &[Value],
  actual: &[Value],
  context: &MatchingContext
) -> Result<(), Vec<Mismatch>> {
  let mut result = Ok(());
  for (index, value) in expected.iter().enumerate() {
    let ps = index.to_string();
    let mut p = path.to_vec();
    p.push(ps.as_str());
    if index < actual.len() {
      result = merge_result(result, compare(&p, value, &actual[index], context));
    } else if !context.matcher_is_defined(&p) {
      result = merge_result(result, Err(vec![body_mismatch(path,
        &json!(expected), &json!(actual),
        format!("Expected {} but was missing", json_to_string(value)))]));
    }
  }
  result
}

// For each variant there must be at least one actual element that matches
// the variant's example under the variant's rules. The search for an
// element short-circuits on the first match.
fn compare_array_contains(
  path: &[&str],
  expected: &[Value],
  actual: &[Value],
  variants: &[(usize, MatchingRuleCategory)],
  context: &MatchingContext
) -> Result<(), Vec<Mismatch>> {
  let mut result = Ok(());
  for (variant_index, variant_rules) in variants {
    let expected_value = match expected.get(*variant_index) {
      Some(value) => value,
      None => {
        result = merge_result(result, Err(vec![body_mismatch(path,
          &json!(expected), &json!(actual),
          format!("ArrayContains variant {} has no example value", variant_index))]));
        continue;
      }
    };
    let variant_context = MatchingContext::new(context.config, variant_rules);
    let found = actual.iter().enumerate().any(|(index, actual_value)| {
      let ps = index.to_string();
      let mut p = path.to_vec();
      p.push(ps.as_str());
      compare(&p, expected_value, actual_value, &variant_context).is_ok()
    });
    if !found {
      result = merge_result(result, Err(vec![body_mismatch(path,
        expected_value, &json!(actual),
        format!("Expected {} (variant {}) to be present in the list",
          json_to_string(expected_value), variant_index))]));
    }
  }
  result
}

fn compare_values(
  path: &[&str],
  expected: &Value,
  actual: &Value,
  context: &MatchingContext
) -> Result<(), Vec<Mismatch>> {
  let matcher_result = if context.matcher_is_defined(path) {
    debug!("Calling match_values for path {}", path.join("."));
    match_values(&context.select_best_matcher(path), expected.clone(), actual)
  } else {
    expected.matches_with(actual, &MatchingRule::Equality, false)
      .map_err(|err| vec![err.to_string()])
  };
  matcher_result.map_err(|messages| {
    messages.into_iter()
      .map(|message| body_mismatch(path, expected, actual, message))
      .collect()
  })
}
