//! Matching rule implementations for individual values

use anyhow::anyhow;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use pactman_models::json_utils::json_to_string;
use pactman_models::matchingrules::{MatchingRule, RuleList, RuleLogic};

/// Matches the actual string against the regular expression. The expression
/// is anchored, so it must match the whole string.
pub(crate) fn matches_anchored_regex(regex: &str, actual: &str) -> anyhow::Result<()> {
  let re = Regex::new(&format!("^(?:{})$", regex))
    .map_err(|err| anyhow!("'{}' is not a valid regular expression - {}", regex, err))?;
  if re.is_match(actual) {
    Ok(())
  } else {
    Err(anyhow!("Expected '{}' to match '{}'", actual, regex))
  }
}

/// Trait for matching rule implementations
pub trait Matches<A: Clone> {
  /// If the actual value matches self given the matching rule. The
  /// `cascaded` flag is set when the rule was registered at an ancestor of
  /// the value's path.
  fn matches_with(&self, actual: A, matcher: &MatchingRule, cascaded: bool) -> anyhow::Result<()>;
}

impl Matches<&str> for &str {
  fn matches_with(&self, actual: &str, matcher: &MatchingRule, cascaded: bool) -> anyhow::Result<()> {
    let result = match matcher {
      MatchingRule::Regex(regex) => matches_anchored_regex(regex, actual),
      MatchingRule::Equality => {
        if *self == actual {
          Ok(())
        } else {
          Err(anyhow!("Expected '{}' to be equal to '{}'", actual, self))
        }
      },
      MatchingRule::Type |
      MatchingRule::MinType(_) |
      MatchingRule::MaxType(_) => Ok(()),
      MatchingRule::Include(substr) => {
        if actual.contains(substr.as_str()) {
          Ok(())
        } else {
          Err(anyhow!("Expected '{}' to include '{}'", actual, substr))
        }
      },
      MatchingRule::ArrayContains(_) =>
        Err(anyhow!("Unable to match '{}' using {:?}", self, matcher))
    };
    debug!(cascaded, ?matcher, "String -> String: comparing '{}' to '{}' ==> {}",
      self, actual, result.is_ok());
    result
  }
}

impl Matches<&str> for String {
  fn matches_with(&self, actual: &str, matcher: &MatchingRule, cascaded: bool) -> anyhow::Result<()> {
    self.as_str().matches_with(actual, matcher, cascaded)
  }
}

impl Matches<&String> for String {
  fn matches_with(&self, actual: &String, matcher: &MatchingRule, cascaded: bool) -> anyhow::Result<()> {
    self.as_str().matches_with(actual.as_str(), matcher, cascaded)
  }
}

impl Matches<u16> for u16 {
  fn matches_with(&self, actual: u16, matcher: &MatchingRule, cascaded: bool) -> anyhow::Result<()> {
    self.to_string().matches_with(actual.to_string().as_str(), matcher, cascaded)
  }
}

fn json_type_of(json: &Value) -> &'static str {
  match json {
    Value::Object(_) => "Map",
    Value::Array(_) => "List",
    Value::Null => "Null",
    Value::Bool(_) => "Boolean",
    Value::Number(_) => "Number",
    Value::String(_) => "String"
  }
}

fn same_json_type(expected: &Value, actual: &Value) -> anyhow::Result<()> {
  if std::mem::discriminant(expected) == std::mem::discriminant(actual) {
    Ok(())
  } else {
    Err(anyhow!("Expected {} ({}) to be the same type as {} ({})",
      json_to_string(actual), json_type_of(actual),
      json_to_string(expected), json_type_of(expected)))
  }
}

impl Matches<&Value> for Value {
  fn matches_with(&self, actual: &Value, matcher: &MatchingRule, cascaded: bool) -> anyhow::Result<()> {
    let result = match matcher {
      MatchingRule::Regex(regex) => {
        let actual_str = match actual {
          Value::String(s) => s.clone(),
          _ => actual.to_string()
        };
        matches_anchored_regex(regex, &actual_str)
      },
      MatchingRule::Include(substr) => {
        let actual_str = match actual {
          Value::String(s) => s.clone(),
          _ => actual.to_string()
        };
        if actual_str.contains(substr.as_str()) {
          Ok(())
        } else {
          Err(anyhow!("Expected '{}' to include '{}'", json_to_string(actual), substr))
        }
      },
      MatchingRule::Type => same_json_type(self, actual),
      MatchingRule::MinType(min) => match (self, actual) {
        (Value::Array(_), Value::Array(actual_array)) => if actual_array.len() < *min {
          Err(anyhow!("Expected an array with at least {} item(s), but got {}",
            min, actual_array.len()))
        } else {
          Ok(())
        },
        _ => same_json_type(self, actual)
      },
      MatchingRule::MaxType(max) => match (self, actual) {
        (Value::Array(_), Value::Array(actual_array)) => if actual_array.len() > *max {
          Err(anyhow!("Expected an array with at most {} item(s), but got {}",
            max, actual_array.len()))
        } else {
          Ok(())
        },
        _ => same_json_type(self, actual)
      },
      MatchingRule::Equality => {
        if self == actual {
          Ok(())
        } else {
          Err(anyhow!("Expected '{}' to be equal to '{}'",
            json_to_string(actual), json_to_string(self)))
        }
      },
      MatchingRule::ArrayContains(_) =>
        Err(anyhow!("An arrayContains matcher can only be applied to an array"))
    };
    debug!(cascaded, ?matcher, "JSON -> JSON: comparing '{}' to '{}' ==> {}",
      self, actual, result.is_ok());
    result
  }
}

/// Matches the provided values using the given rule list. All of the rules
/// are applied and the results combined with the list's logic.
pub fn match_values<E, A>(matching_rules: &RuleList, expected: E, actual: A
) -> Result<(), Vec<String>>
  where E: Matches<A>, A: Clone {
  if matching_rules.is_empty() {
    return Err(vec!["No matcher found".to_string()]);
  }
  let results = matching_rules.rules.iter()
    .map(|rule| expected.matches_with(actual.clone(), rule, matching_rules.cascaded))
    .collect::<Vec<anyhow::Result<()>>>();
  let ok = match matching_rules.rule_logic {
    RuleLogic::And => results.iter().all(|result| result.is_ok()),
    RuleLogic::Or => results.iter().any(|result| result.is_ok())
  };
  if ok {
    Ok(())
  } else {
    Err(results.iter()
      .filter_map(|result| result.as_ref().err().map(|err| err.to_string()))
      .collect())
  }
}

#[cfg(test)]
mod tests {
  use expectest::prelude::*;
  use serde_json::json;

  use super::*;

  #[test]
  fn equality_matcher_test() {
    let matcher = MatchingRule::Equality;
    expect!("100".matches_with("100", &matcher, false)).to(be_ok());
    expect!("100".matches_with("101", &matcher, false)).to(be_err());
    expect!(json!(100).matches_with(&json!(100), &matcher, false)).to(be_ok());
    expect!(json!(100).matches_with(&json!(100.0), &matcher, false)).to(be_err());
    expect!(json!({"a": 1}).matches_with(&json!({"a": 1}), &matcher, false)).to(be_ok());
  }

  #[test]
  fn regex_matcher_is_anchored() {
    let matcher = MatchingRule::Regex("\\d{4}".into());
    expect!("1000".matches_with("2024", &matcher, false)).to(be_ok());
    expect!("1000".matches_with("in 2024 sometime", &matcher, false)).to(be_err());
    expect!("1000".matches_with("20245", &matcher, false)).to(be_err());
  }

  #[test]
  fn regex_matcher_handles_alternation() {
    let matcher = MatchingRule::Regex("Greater|GreaterOrEqual".into());
    expect!("Greater".matches_with("Greater", &matcher, false)).to(be_ok());
    expect!("Greater".matches_with("GreaterOrEqual", &matcher, false)).to(be_ok());
    expect!("Greater".matches_with("Lesser", &matcher, false)).to(be_err());
  }

  #[test]
  fn regex_matcher_applies_to_numbers() {
    let matcher = MatchingRule::Regex("\\d+".into());
    expect!(json!(1234).matches_with(&json!(5678), &matcher, false)).to(be_ok());
    expect!(json!(1234).matches_with(&json!("abc"), &matcher, false)).to(be_err());
  }

  #[test]
  fn invalid_regexes_report_an_error() {
    let matcher = MatchingRule::Regex("[".into());
    expect!("a".matches_with("a", &matcher, false)).to(be_err());
  }

  #[test]
  fn type_matcher_compares_json_categories() {
    let matcher = MatchingRule::Type;
    expect!(json!("100").matches_with(&json!("hello"), &matcher, false)).to(be_ok());
    expect!(json!("100").matches_with(&json!(100), &matcher, false)).to(be_err());
    expect!(json!(100).matches_with(&json!(100.2), &matcher, false)).to(be_ok());
    expect!(json!(true).matches_with(&json!(false), &matcher, false)).to(be_ok());
    expect!(json!(null).matches_with(&json!(null), &matcher, false)).to(be_ok());
    expect!(json!([1]).matches_with(&json!([2, 3]), &matcher, false)).to(be_ok());
    expect!(json!({"a": 1}).matches_with(&json!({"b": 2}), &matcher, false)).to(be_ok());
    expect!(json!({"a": 1}).matches_with(&json!([1]), &matcher, false)).to(be_err());
  }

  #[test]
  fn min_type_matcher_checks_the_length() {
    let matcher = MatchingRule::MinType(2);
    expect!(json!([1]).matches_with(&json!([1, 2]), &matcher, false)).to(be_ok());
    expect!(json!([1]).matches_with(&json!([1]), &matcher, false)).to(be_err());
    expect!(json!("s").matches_with(&json!("t"), &matcher, false)).to(be_ok());
  }

  #[test]
  fn max_type_matcher_checks_the_length() {
    let matcher = MatchingRule::MaxType(2);
    expect!(json!([1]).matches_with(&json!([1, 2]), &matcher, false)).to(be_ok());
    expect!(json!([1]).matches_with(&json!([1, 2, 3]), &matcher, false)).to(be_err());
  }

  #[test]
  fn include_matcher_test() {
    let matcher = MatchingRule::Include("10".into());
    expect!("100".matches_with("100", &matcher, false)).to(be_ok());
    expect!("100".matches_with("2102", &matcher, false)).to(be_ok());
    expect!("100".matches_with("200", &matcher, false)).to(be_err());
    expect!(json!(100).matches_with(&json!(210), &matcher, false)).to(be_ok());
  }

  #[test]
  fn match_values_combines_results_with_and_logic() {
    let rules = RuleList {
      rules: vec![MatchingRule::Type, MatchingRule::Include("1".into())],
      rule_logic: RuleLogic::And,
      cascaded: false
    };
    expect!(match_values(&rules, json!("a1"), &json!("b1"))).to(be_ok());
    expect!(match_values(&rules, json!("a1"), &json!("b2"))).to(be_err());
  }

  #[test]
  fn match_values_with_an_empty_list_is_an_error() {
    let rules = RuleList::empty(RuleLogic::And);
    expect!(match_values(&rules, json!("a"), &json!("a"))).to(be_err());
  }
}
