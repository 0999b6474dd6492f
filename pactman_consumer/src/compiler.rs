//! The rule compiler: walks a pattern tree and produces a plain example
//! value plus the matching rules for the spec version in play

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use pactman_models::matchingrules::{Category, MatchingRule, MatchingRuleCategory};
use pactman_models::PactSpecification;
use pactman_models::path_exp::DocPath;

use crate::patterns::{JsonPattern, Matcher};

/// Errors raised while compiling patterns into matching rules
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatternError {
  /// A matcher was used in a context its spec version does not permit
  #[error("The {matcher} matcher requires pact specification version {requires}, but the pact is being built for {version}")]
  SpecViolation {
    /// Name of the offending matcher
    matcher: String,
    /// The version the matcher needs
    requires: PactSpecification,
    /// The version the pact is being built for
    version: PactSpecification
  },
  /// A matcher was nested illegally or carries an invalid operand
  #[error("Could not compile matching rules: {0}")]
  RuleCompileError(String)
}

/// Compiles a pattern for one section of an interaction, producing the
/// example value and the section's matching rules. Body patterns are rooted
/// at `$`; header and query patterns at the name of their parameter.
pub fn compile_pattern(
  pattern: &JsonPattern,
  root: DocPath,
  category: Category,
  spec_version: PactSpecification
) -> Result<(Value, MatchingRuleCategory), PatternError> {
  let mut rules = MatchingRuleCategory::empty(category);
  let example = walk(pattern, &root, &mut rules, spec_version)?;
  Ok((example, rules))
}

fn walk(
  pattern: &JsonPattern,
  path: &DocPath,
  rules: &mut MatchingRuleCategory,
  spec_version: PactSpecification
) -> Result<Value, PatternError> {
  match pattern {
    JsonPattern::Value(value) => Ok(value.clone()),
    JsonPattern::Array(items) => {
      let examples = items.iter().enumerate()
        .map(|(index, item)| {
          let mut item_path = path.clone();
          item_path.push_index(index);
          walk(item, &item_path, rules, spec_version)
        })
        .collect::<Result<Vec<Value>, PatternError>>()?;
      Ok(Value::Array(examples))
    },
    JsonPattern::Object(entries) => {
      let examples = entries.iter()
        .map(|(key, value)| {
          let entry_path = path.join(key);
          walk(value, &entry_path, rules, spec_version)
            .map(|example| (key.clone(), example))
        })
        .collect::<Result<serde_json::Map<String, Value>, PatternError>>()?;
      Ok(Value::Object(examples))
    },
    JsonPattern::Matcher(matcher) => compile_matcher(matcher, path, rules, spec_version)
  }
}

fn compile_matcher(
  matcher: &Matcher,
  path: &DocPath,
  rules: &mut MatchingRuleCategory,
  spec_version: PactSpecification
) -> Result<Value, PatternError> {
  match matcher {
    Matcher::Like(example) => {
      if spec_version > PactSpecification::V1_1 {
        rules.set_rule(path.clone(), MatchingRule::Type);
      }
      // nested matchers still register at the same path and below
      walk(example, path, rules, spec_version)
    },
    Matcher::EachLike { example, min } => {
      let mut element_path = path.clone();
      element_path.push_star_index();
      if spec_version > PactSpecification::V1_1 {
        rules.set_rule(path.clone(), MatchingRule::MinType(*min));
        rules.set_rule(element_path.clone(), MatchingRule::Type);
      }
      let element = walk(example, &element_path, rules, spec_version)?;
      Ok(Value::Array(std::iter::repeat(element).take((*min).max(1)).collect()))
    },
    Matcher::Term { regex, example } => {
      Regex::new(regex).map_err(|err| PatternError::RuleCompileError(
        format!("'{}' is not a valid regular expression: {}", regex, err)))?;
      if spec_version > PactSpecification::V1_1 {
        rules.set_rule(path.clone(), MatchingRule::Regex(regex.clone()));
      }
      Ok(Value::String(example.clone()))
    },
    Matcher::Equals(value) => {
      if value.contains_matcher() {
        return Err(PatternError::RuleCompileError(
          "an equals matcher can not contain further matchers, as it compares its value literally".to_string()));
      }
      if spec_version > PactSpecification::V1_1 {
        rules.set_rule(path.clone(), MatchingRule::Equality);
      }
      Ok(value.sample_value())
    },
    Matcher::Includes { substring, example } => {
      if spec_version < PactSpecification::V3 {
        return Err(PatternError::SpecViolation {
          matcher: "includes".to_string(),
          requires: PactSpecification::V3,
          version: spec_version
        });
      }
      rules.set_rule(path.clone(), MatchingRule::Include(substring.clone()));
      Ok(Value::String(example.clone()))
    }
  }
}

#[cfg(test)]
mod tests {
  use expectest::prelude::*;
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use pactman_models::matchingrules::{matchers_to_json, MatchingRules, RuleList};

  use super::*;
  use crate::{each_like, equals, includes, json_pattern, like, term};

  fn compile_body(pattern: &JsonPattern, spec_version: PactSpecification
  ) -> (Value, MatchingRuleCategory) {
    compile_pattern(pattern, DocPath::root(), Category::BODY, spec_version).unwrap()
  }

  #[test]
  fn a_literal_pattern_compiles_to_itself_with_no_rules() {
    let pattern = json_pattern!({ "a": 1 });
    let (example, rules) = compile_body(&pattern, PactSpecification::V3);
    expect!(example).to(be_equal_to(json!({ "a": 1 })));
    expect!(rules.is_empty()).to(be_true());
  }

  #[test]
  fn like_compiles_to_a_type_rule_at_its_path() {
    let pattern = json_pattern!({ "id": like!(10) });
    let (example, rules) = compile_body(&pattern, PactSpecification::V3);
    expect!(example).to(be_equal_to(json!({ "id": 10 })));
    expect!(rules.select_best_matcher(&["$", "id"])).to(
      be_equal_to(RuleList::new(MatchingRule::Type)));
  }

  #[test]
  fn each_like_compiles_min_and_element_rules() {
    let pattern = json_pattern!({ "users": each_like!({ "name": "a" }, min = 2) });
    let (example, rules) = compile_body(&pattern, PactSpecification::V3);
    expect!(example).to(be_equal_to(json!({
      "users": [ { "name": "a" }, { "name": "a" } ]
    })));
    expect!(rules.select_best_matcher(&["$", "users"])).to(
      be_equal_to(RuleList::new(MatchingRule::MinType(2))));
    expect!(rules.select_best_matcher(&["$", "users", "0"])).to(
      be_equal_to(RuleList::new(MatchingRule::Type)));
  }

  #[test]
  fn nested_matchers_register_rules_below_their_parents() {
    let pattern = json_pattern!({
      "users": each_like!({ "id": (like!(1)), "role": (term!("admin|guest", "admin")) })
    });
    let (_, rules) = compile_body(&pattern, PactSpecification::V3);
    expect!(rules.select_best_matcher(&["$", "users", "0", "id"])).to(
      be_equal_to(RuleList::new(MatchingRule::Type)));
    expect!(rules.select_best_matcher(&["$", "users", "0", "role"])).to(
      be_equal_to(RuleList::new(MatchingRule::Regex("admin|guest".into()))));
  }

  #[test]
  fn equals_does_not_descend_into_its_value() {
    let pattern = json_pattern!({ "role": (equals!({ "name": "admin" })) });
    let (example, rules) = compile_body(&pattern, PactSpecification::V3);
    expect!(example).to(be_equal_to(json!({ "role": { "name": "admin" } })));
    expect!(rules.select_best_matcher(&["$", "role"])).to(
      be_equal_to(RuleList::new(MatchingRule::Equality)));
    expect!(rules.rules.len()).to(be_equal_to(1));
  }

  #[test]
  fn equals_rejects_nested_matchers() {
    let pattern: JsonPattern = Matcher::equals(json_pattern!({ "id": (like!(1)) })).into();
    let result = compile_pattern(&pattern, DocPath::root(), Category::BODY,
      PactSpecification::V3);
    expect!(result).to(be_err().value(PatternError::RuleCompileError(
      "an equals matcher can not contain further matchers, as it compares its value literally".to_string())));
  }

  #[test]
  fn includes_requires_v3() {
    let pattern: JsonPattern = includes!("world", "hello world").into();
    let result = compile_pattern(&pattern, DocPath::root(), Category::BODY,
      PactSpecification::V2);
    expect!(result).to(be_err().value(PatternError::SpecViolation {
      matcher: "includes".to_string(),
      requires: PactSpecification::V3,
      version: PactSpecification::V2
    }));

    let (example, rules) = compile_body(&pattern, PactSpecification::V3);
    expect!(example).to(be_equal_to(json!("hello world")));
    expect!(rules.select_best_matcher(&["$"])).to(
      be_equal_to(RuleList::new(MatchingRule::Include("world".into()))));
  }

  #[test]
  fn terms_with_invalid_regexes_are_rejected() {
    let pattern: JsonPattern = term!("[", "example").into();
    let result = compile_pattern(&pattern, DocPath::root(), Category::BODY,
      PactSpecification::V3);
    expect!(result).to(be_err());
  }

  #[test]
  fn v1_1_compiles_examples_but_no_rules() {
    let pattern = json_pattern!({
      "id": like!(10),
      "created": term!("\\d{4}", "2024")
    });
    let (example, rules) = compile_body(&pattern, PactSpecification::V1_1);
    expect!(example).to(be_equal_to(json!({ "id": 10, "created": "2024" })));
    expect!(rules.is_empty()).to(be_true());
  }

  #[test]
  fn later_rules_override_earlier_ones_at_the_same_path() {
    let pattern: JsonPattern = Matcher::like(
      JsonPattern::Matcher(Box::new(term!("\\d+", "42")))).into();
    let (example, rules) = compile_body(&pattern, PactSpecification::V3);
    expect!(example).to(be_equal_to(json!("42")));
    // the nested term registered after the like, so the regex rule wins
    expect!(rules.select_best_matcher(&["$"])).to(
      be_equal_to(RuleList::new(MatchingRule::Regex("\\d+".into()))));
  }

  #[test]
  fn the_v2_dialect_uses_flat_paths() {
    let pattern = json_pattern!({ "users": each_like!({ "id": 1 }) });
    let (_, rules) = compile_body(&pattern, PactSpecification::V2);
    let mut matching_rules = MatchingRules::default();
    matching_rules.add_rules(rules);
    assert_eq!(matchers_to_json(&matching_rules, PactSpecification::V2), json!({
      "$.body.users": { "match": "type", "min": 1 },
      "$.body.users[*]": { "match": "type" }
    }));
  }
}
