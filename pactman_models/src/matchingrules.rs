//! The matching-rule model: rule kinds, rule lists keyed by path, and the
//! V2/V3 serialisation dialects.

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::{anyhow, Context};
use maplit::hashmap;
use serde_json::{json, Map, Value};
use tracing::trace;

use crate::json_utils::{json_to_num, json_to_string};
use crate::PactSpecification;
use crate::path_exp::DocPath;

/// A single matching rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchingRule {
  /// Match by deep equality. Never cascades to descendants.
  Equality,
  /// Match the string rendering of the value against an anchored regular
  /// expression
  Regex(String),
  /// Match by the type of the value
  Type,
  /// Match by type, and for collections require at least this many items
  MinType(usize),
  /// Match by type, and for collections require at most this many items
  MaxType(usize),
  /// Match if the string rendering of the value contains the given string
  Include(String),
  /// Match an array against a list of variants, each of which must be
  /// matched by at least one element (V3)
  ArrayContains(Vec<(usize, MatchingRuleCategory)>)
}

impl MatchingRule {
  /// Builds a `MatchingRule` from a `Value` struct
  pub fn from_json(value: &Value) -> anyhow::Result<MatchingRule> {
    match value {
      Value::Object(m) => match m.get("match") {
        Some(match_val) => {
          let rule_type = json_to_string(match_val);
          MatchingRule::create(&rule_type, value)
        },
        None => if let Some(regex) = m.get("regex") {
          Ok(MatchingRule::Regex(json_to_string(regex)))
        } else if let Some(min) = json_to_num(m.get("min").cloned()) {
          Ok(MatchingRule::MinType(min))
        } else if let Some(max) = json_to_num(m.get("max").cloned()) {
          Ok(MatchingRule::MaxType(max))
        } else {
          Err(anyhow!("Matching rule missing 'match' field and unable to guess its type"))
        }
      },
      _ => Err(anyhow!("Matching rule JSON {} is not an Object", value))
    }
  }

  /// Creates a `MatchingRule` from a type name and a map of attributes
  pub fn create(rule_type: &str, attributes: &Value) -> anyhow::Result<MatchingRule> {
    let attributes = match attributes {
      Value::Object(values) => values,
      _ => return Err(anyhow!("Matching rule attributes {} are not valid", attributes))
    };
    match rule_type {
      "equality" => Ok(MatchingRule::Equality),
      "regex" => match attributes.get("regex") {
        Some(s) => Ok(MatchingRule::Regex(json_to_string(s))),
        None => Err(anyhow!("Regex matcher missing 'regex' field"))
      },
      "include" => match attributes.get("value") {
        Some(s) => Ok(MatchingRule::Include(json_to_string(s))),
        None => Err(anyhow!("Include matcher missing 'value' field"))
      },
      "type" => match (json_to_num(attributes.get("min").cloned()),
                       json_to_num(attributes.get("max").cloned())) {
        (Some(min), _) => Ok(MatchingRule::MinType(min)),
        (None, Some(max)) => Ok(MatchingRule::MaxType(max)),
        _ => Ok(MatchingRule::Type)
      },
      "min" => match json_to_num(attributes.get("min").cloned()) {
        Some(min) => Ok(MatchingRule::MinType(min)),
        None => Err(anyhow!("Min matcher missing 'min' field"))
      },
      "max" => match json_to_num(attributes.get("max").cloned()) {
        Some(max) => Ok(MatchingRule::MaxType(max)),
        None => Err(anyhow!("Max matcher missing 'max' field"))
      },
      "arrayContains" => match attributes.get("variants") {
        Some(Value::Array(variants)) => {
          let mut values = vec![];
          for variant in variants {
            let index = json_to_num(variant.get("index").cloned()).unwrap_or_default();
            let mut category = MatchingRuleCategory::empty(Category::BODY);
            if let Some(rules) = variant.get("rules") {
              category.add_rules_from_json(rules)
                .with_context(|| format!("Unable to parse matching rules: {:?}", rules))?;
            }
            values.push((index, category));
          }
          Ok(MatchingRule::ArrayContains(values))
        },
        Some(_) => Err(anyhow!("ArrayContains matcher 'variants' field is not an Array")),
        None => Err(anyhow!("ArrayContains matcher missing 'variants' field"))
      },
      _ => Err(anyhow!("{} is not a valid matching rule type", rule_type))
    }
  }

  /// Converts this `MatchingRule` to a `Value` struct
  pub fn to_json(&self) -> Value {
    match self {
      MatchingRule::Equality => json!({ "match": "equality" }),
      MatchingRule::Regex(r) => json!({ "match": "regex", "regex": r }),
      MatchingRule::Type => json!({ "match": "type" }),
      MatchingRule::MinType(min) => json!({ "match": "type", "min": min }),
      MatchingRule::MaxType(max) => json!({ "match": "type", "max": max }),
      MatchingRule::Include(s) => json!({ "match": "include", "value": s }),
      MatchingRule::ArrayContains(variants) => json!({
        "match": "arrayContains",
        "variants": variants.iter().map(|(index, rules)| json!({
          "index": index,
          "rules": rules.to_v3_json()
        })).collect::<Vec<Value>>()
      })
    }
  }

  /// If this rule applies to descendants of the path it is registered at.
  /// Only the type-based rules cascade.
  pub fn can_cascade(&self) -> bool {
    matches!(self, MatchingRule::Type | MatchingRule::MinType(_) | MatchingRule::MaxType(_))
  }
}

/// How multiple rules at the same path are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleLogic {
  /// All rules must match
  And,
  /// At least one rule must match
  Or
}

impl RuleLogic {
  fn to_json(self) -> Value {
    Value::String(match self {
      RuleLogic::And => "AND",
      RuleLogic::Or => "OR"
    }.into())
  }
}

/// The list of rules that apply at a single path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleList {
  /// Rules to apply
  pub rules: Vec<MatchingRule>,
  /// Logic used to combine them
  pub rule_logic: RuleLogic,
  /// Whether this list was selected for a descendant of the path it was
  /// registered at
  pub cascaded: bool
}

impl RuleList {
  /// An empty rule list
  pub fn empty(rule_logic: RuleLogic) -> RuleList {
    RuleList { rules: vec![], rule_logic, cascaded: false }
  }

  /// A list holding the single given rule
  pub fn new(rule: MatchingRule) -> RuleList {
    RuleList { rules: vec![rule], rule_logic: RuleLogic::And, cascaded: false }
  }

  /// If the list holds no rules
  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  /// Clones this list with the cascaded flag set, dropping any rules that
  /// do not apply to descendants
  pub fn as_cascaded(&self, cascaded: bool) -> RuleList {
    if cascaded {
      RuleList {
        rules: self.rules.iter().filter(|r| r.can_cascade()).cloned().collect(),
        rule_logic: self.rule_logic,
        cascaded: true
      }
    } else {
      self.clone()
    }
  }

  /// If any type-based rule is present
  pub fn type_matcher_defined(&self) -> bool {
    self.rules.iter().any(|rule| rule.can_cascade())
  }

  fn to_v3_json(&self) -> Value {
    json!({
      "combine": self.rule_logic.to_json(),
      "matchers": Value::Array(self.rules.iter().map(|rule| rule.to_json()).collect())
    })
  }

  fn to_v2_json(&self) -> Value {
    match self.rules.first() {
      Some(rule) => rule.to_json(),
      None => json!({})
    }
  }
}

impl Default for RuleList {
  fn default() -> Self {
    RuleList::empty(RuleLogic::And)
  }
}

/// Section of an HTTP part that a group of rules applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(clippy::upper_case_acronyms)]
pub enum Category {
  /// Request path
  PATH,
  /// Request or response headers
  HEADER,
  /// Request query parameters
  QUERY,
  /// Request or response body
  BODY
}

impl FromStr for Category {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "path" => Ok(Category::PATH),
      "header" => Ok(Category::HEADER),
      "query" => Ok(Category::QUERY),
      "body" => Ok(Category::BODY),
      _ => Err(format!("'{}' is not a valid matching rule category", s))
    }
  }
}

impl Display for Category {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    let s = match self {
      Category::PATH => "path",
      Category::HEADER => "header",
      Category::QUERY => "query",
      Category::BODY => "body"
    };
    write!(f, "{}", s)
  }
}

impl Default for Category {
  fn default() -> Self {
    Category::BODY
  }
}

/// All the rules for one category, keyed by path expression
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchingRuleCategory {
  /// Name of the category
  pub name: Category,
  /// Rules of the category
  pub rules: HashMap<DocPath, RuleList>
}

impl MatchingRuleCategory {
  /// Creates an empty category
  pub fn empty(name: Category) -> MatchingRuleCategory {
    MatchingRuleCategory { name, rules: hashmap!{} }
  }

  /// If there are no rules in the category
  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  /// Adds a rule to this category, appending to any list already at the path
  pub fn add_rule(&mut self, key: DocPath, rule: MatchingRule, rule_logic: RuleLogic) {
    let rules = self.rules.entry(key).or_insert_with(|| RuleList::empty(rule_logic));
    rules.rules.push(rule);
  }

  /// Replaces any rules at the path with the single given rule. Later
  /// compiled rules override earlier ones at the same path.
  pub fn set_rule(&mut self, key: DocPath, rule: MatchingRule) {
    self.rules.insert(key, RuleList::new(rule));
  }

  /// Adds a rule parsed from its JSON form
  pub fn rule_from_json(&mut self, key: DocPath, rule_json: &Value, rule_logic: RuleLogic
  ) -> anyhow::Result<()> {
    let rule = MatchingRule::from_json(rule_json)
      .with_context(|| format!("Could not parse matcher JSON {:?}", rule_json))?;
    self.add_rule(key, rule, rule_logic);
    Ok(())
  }

  /// Adds the rules from the V3 JSON form of this category: either a single
  /// `matchers` list (the path category) or a map of path expressions to
  /// `matchers` lists
  pub fn add_rules_from_json(&mut self, rules: &Value) -> anyhow::Result<()> {
    if let Value::Object(m) = rules {
      if m.contains_key("matchers") {
        self.add_rule_list(DocPath::root(), rules)
      } else {
        for (k, v) in m {
          self.add_rule_list(DocPath::new(k)?, v)?;
        }
        Ok(())
      }
    } else {
      Err(anyhow!("Matching rules for category '{}' are not an Object", self.name))
    }
  }

  fn add_rule_list(&mut self, key: DocPath, value: &Value) -> anyhow::Result<()> {
    let rule_logic = match value.get("combine") {
      Some(val) if json_to_string(val).to_uppercase() == "OR" => RuleLogic::Or,
      _ => RuleLogic::And
    };
    if let Some(Value::Array(matchers)) = value.get("matchers") {
      for matcher in matchers {
        self.rule_from_json(key.clone(), matcher, rule_logic)?;
      }
    }
    Ok(())
  }

  /// Selects the rule list whose path expression has the greatest weight for
  /// the given concrete path. For body rules, lists selected for a strict
  /// ancestor of the path come back with the cascaded flag set and
  /// non-cascading rules removed; header, query and path rules always apply
  /// to the values below their key.
  pub fn select_best_matcher(&self, path: &[&str]) -> RuleList {
    let cascade = self.name == Category::BODY;
    let result = self.rules.iter()
      .map(|(k, v)| (k, v, k.path_weight(path)))
      .filter(|(_, _, (weight, _))| *weight > 0)
      .max_by_key(|(_, _, (weight, tokens))| weight * tokens)
      .map(|(_, v, (_, tokens))| v.as_cascaded(cascade && tokens != path.len()))
      .unwrap_or_default();
    trace!("select_best_matcher for category {} and path {:?} -> {:?}", self.name, path, result);
    result
  }

  /// If any rule applies at the given concrete path
  pub fn matcher_is_defined(&self, path: &[&str]) -> bool {
    !self.select_best_matcher(path).is_empty()
  }

  /// If a field wildcard rule is registered exactly at the given path
  pub fn wildcard_matcher_is_defined(&self, path: &[&str]) -> bool {
    self.rules.keys().any(|k| k.is_wildcard() && k.matches_path_exactly(path))
  }

  /// If any type-based rule is defined anywhere in the category
  pub fn type_matcher_defined(&self) -> bool {
    self.rules.values().any(|list| list.type_matcher_defined())
  }

  /// Returns the V3 JSON form of this category
  pub fn to_v3_json(&self) -> Value {
    Value::Object(self.rules.iter().fold(Map::new(), |mut map, (path, list)| {
      map.insert(String::from(path), list.to_v3_json());
      map
    }))
  }

  /// Returns the flat-path V2 JSON entries for this category
  pub fn to_v2_json(&self) -> HashMap<String, Value> {
    let mut map = hashmap!{};
    match self.name {
      Category::PATH => for v in self.rules.values() {
        map.insert("$.path".to_string(), v.to_v2_json());
      },
      Category::BODY => for (k, v) in &self.rules {
        map.insert(String::from(k).replacen('$', "$.body", 1), v.to_v2_json());
      },
      Category::HEADER => for (k, v) in &self.rules {
        if let Some(name) = k.first_field() {
          map.insert(format!("$.headers.{}", name), v.to_v2_json());
        }
      },
      Category::QUERY => for (k, v) in &self.rules {
        if let Some(name) = k.first_field() {
          map.insert(format!("$.query.{}", name), v.to_v2_json());
        }
      }
    }
    map
  }
}

/// The full set of matching rules of a request or response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchingRules {
  /// Rules grouped by category
  pub rules: HashMap<Category, MatchingRuleCategory>
}

impl MatchingRules {
  /// If no category holds any rule
  pub fn is_empty(&self) -> bool {
    self.rules.values().all(|category| category.is_empty())
  }

  /// If at least one rule is present
  pub fn is_not_empty(&self) -> bool {
    !self.is_empty()
  }

  /// Adds (or fetches) the category with the given name
  pub fn add_category(&mut self, category: Category) -> &mut MatchingRuleCategory {
    self.rules.entry(category)
      .or_insert_with(|| MatchingRuleCategory::empty(category))
  }

  /// The names of the categories holding rules
  pub fn categories(&self) -> HashSet<Category> {
    self.rules.keys().cloned().collect()
  }

  /// Returns a clone of the rules for the category, if present
  pub fn rules_for_category(&self, category: Category) -> Option<MatchingRuleCategory> {
    self.rules.get(&category).cloned()
  }

  /// Merges a compiled category into this rule set
  pub fn add_rules(&mut self, category: MatchingRuleCategory) {
    let entry = self.add_category(category.name);
    for (path, list) in category.rules {
      entry.rules.insert(path, list);
    }
  }

  fn load_from_v2_map(&mut self, map: &Map<String, Value>) -> anyhow::Result<()> {
    for (key, v) in map {
      if key == "$.path" {
        self.add_v2_rule(Category::PATH, DocPath::root(), v)?;
      } else if let Some(rest) = key.strip_prefix("$.body") {
        let path = if rest.is_empty() { DocPath::root() } else { DocPath::new(format!("${}", rest))? };
        self.add_v2_rule(Category::BODY, path, v)?;
      } else if let Some(rest) = key.strip_prefix("$.headers.") {
        self.add_v2_rule(Category::HEADER, DocPath::new(rest)?, v)?;
      } else if let Some(rest) = key.strip_prefix("$.query.") {
        self.add_v2_rule(Category::QUERY, DocPath::new(rest)?, v)?;
      } else {
        return Err(anyhow!("'{}' is not a valid V2 matching rule key", key));
      }
    }
    Ok(())
  }

  fn add_v2_rule(&mut self, category: Category, key: DocPath, rule: &Value) -> anyhow::Result<()> {
    self.add_category(category).rule_from_json(key, rule, RuleLogic::And)
  }

  fn load_from_v3_map(&mut self, map: &Map<String, Value>) -> anyhow::Result<()> {
    for (name, rules) in map {
      let category = Category::from_str(name).map_err(|e| anyhow!(e))?;
      self.add_category(category).add_rules_from_json(rules)?;
    }
    Ok(())
  }

  fn to_v3_json(&self) -> Value {
    Value::Object(self.rules.iter()
      .filter(|(_, category)| !category.is_empty())
      .fold(Map::new(), |mut map, (name, category)| {
        match name {
          Category::PATH => if let Some(list) = category.rules.values().next() {
            map.insert(name.to_string(), list.to_v3_json());
          },
          _ => {
            map.insert(name.to_string(), category.to_v3_json());
          }
        }
        map
      }))
  }

  fn to_v2_json(&self) -> Value {
    Value::Object(self.rules.values().fold(Map::new(), |mut map, category| {
      for (key, value) in category.to_v2_json() {
        map.insert(key, value);
      }
      map
    }))
  }
}

/// Parses the `matchingRules` element of an HTTP part. Both the V2 flat-path
/// and the V3 category dialects are accepted.
pub fn matchers_from_json(part_json: &Value) -> anyhow::Result<MatchingRules> {
  let mut matching_rules = MatchingRules::default();
  if let Some(Value::Object(m)) = part_json.get("matchingRules") {
    if m.keys().next().map(|k| k.starts_with('$')).unwrap_or(false) {
      matching_rules.load_from_v2_map(m)?
    } else {
      matching_rules.load_from_v3_map(m)?
    }
  }
  Ok(matching_rules)
}

/// Generates the JSON form of the matching rules for the given spec version
pub fn matchers_to_json(matchers: &MatchingRules, spec_version: PactSpecification) -> Value {
  match spec_version {
    PactSpecification::V3 => matchers.to_v3_json(),
    _ => matchers.to_v2_json()
  }
}

/// Macro to ease constructing matching rules in tests.
/// Example usage:
/// ```ignore
/// matchingrules! {
///   "query" => { "user_id" => [ MatchingRule::Regex("^[0-9]+$".into()) ] }
/// }
/// ```
#[macro_export]
macro_rules! matchingrules {
  ( $( $name:expr => {
      $( $subname:expr => [ $( $matcher:expr ), * ] ),*
  }), * ) => {{
    let mut _rules = $crate::matchingrules::MatchingRules::default();
    $({
      let _category = _rules.add_category($name.parse().unwrap());
      $({
        $({
          _category.add_rule(
            $crate::path_exp::DocPath::new_unwrap($subname),
            $matcher,
            $crate::matchingrules::RuleLogic::And,
          );
        })*
      })*
    })*
    _rules
  }};
}

#[cfg(test)]
mod tests {
  use expectest::prelude::*;
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  #[test]
  fn select_best_matcher_picks_the_most_specific_entry() {
    let matchers = matchingrules! {
      "body" => {
        "$" => [ MatchingRule::Regex("1".into()) ],
        "$.item1" => [ MatchingRule::Regex("2".into()) ],
        "$.item1.level" => [ MatchingRule::Regex("3".into()) ],
        "$.item1.level[1]" => [ MatchingRule::Regex("4".into()) ],
        "$.item1.level[1].id" => [ MatchingRule::Regex("5".into()) ],
        "$.item1.level[*].id" => [ MatchingRule::Regex("6".into()) ],
        "$.*.level[*].id" => [ MatchingRule::Regex("7".into()) ]
      }
    };
    let body = matchers.rules_for_category(Category::BODY).unwrap();

    expect!(body.select_best_matcher(&["$", "item1"])).to(
      be_equal_to(RuleList::new(MatchingRule::Regex("2".into()))));
    expect!(body.select_best_matcher(&["$", "item1", "level", "1", "id"])).to(
      be_equal_to(RuleList::new(MatchingRule::Regex("5".into()))));
    expect!(body.select_best_matcher(&["$", "item1", "level", "3", "id"])).to(
      be_equal_to(RuleList::new(MatchingRule::Regex("6".into()))));
    expect!(body.select_best_matcher(&["$", "item2", "level", "3", "id"])).to(
      be_equal_to(RuleList::new(MatchingRule::Regex("7".into()))));
  }

  #[test]
  fn a_cascaded_equality_rule_is_dropped() {
    let matchers = matchingrules! {
      "body" => {
        "$.a" => [ MatchingRule::Equality ],
        "$.b" => [ MatchingRule::Type ]
      }
    };
    let body = matchers.rules_for_category(Category::BODY).unwrap();

    // the rule still applies at its own path
    expect!(body.matcher_is_defined(&["$", "a"])).to(be_true());
    // but not at descendants, while the type rule cascades
    expect!(body.matcher_is_defined(&["$", "a", "c"])).to(be_false());
    expect!(body.matcher_is_defined(&["$", "b", "c"])).to(be_true());
    let cascaded = body.select_best_matcher(&["$", "b", "c"]);
    expect!(cascaded.cascaded).to(be_true());
  }

  #[test]
  fn loads_the_v2_flat_path_dialect() {
    let json = json!({
      "matchingRules": {
        "$.path": { "match": "regex", "regex": "/users/\\d+" },
        "$.body.users[*].id": { "match": "type" },
        "$.headers.Content-Type": { "match": "regex", "regex": "application/.*" },
        "$.query.search": { "match": "regex", "regex": "\\w+" }
      }
    });
    let rules = matchers_from_json(&json).unwrap();

    let path = rules.rules_for_category(Category::PATH).unwrap();
    expect!(path.matcher_is_defined(&["$"])).to(be_true());
    let body = rules.rules_for_category(Category::BODY).unwrap();
    expect!(body.matcher_is_defined(&["$", "users", "0", "id"])).to(be_true());
    let header = rules.rules_for_category(Category::HEADER).unwrap();
    expect!(header.matcher_is_defined(&["$", "Content-Type"])).to(be_true());
    let query = rules.rules_for_category(Category::QUERY).unwrap();
    expect!(query.matcher_is_defined(&["$", "search", "0"])).to(be_true());
  }

  #[test]
  fn loads_the_v3_category_dialect() {
    let json = json!({
      "matchingRules": {
        "path": { "matchers": [ { "match": "regex", "regex": "/users/\\d+" } ] },
        "body": {
          "$.users": { "combine": "AND", "matchers": [ { "match": "type", "min": 2 } ] }
        },
        "header": {
          "X-Id": { "matchers": [ { "match": "regex", "regex": "\\d+" } ] }
        }
      }
    });
    let rules = matchers_from_json(&json).unwrap();

    let body = rules.rules_for_category(Category::BODY).unwrap();
    expect!(body.select_best_matcher(&["$", "users"])).to(
      be_equal_to(RuleList::new(MatchingRule::MinType(2))));
    let header = rules.rules_for_category(Category::HEADER).unwrap();
    expect!(header.matcher_is_defined(&["$", "X-Id"])).to(be_true());
  }

  #[test]
  fn serialises_both_dialects() {
    let rules = matchingrules! {
      "body" => { "$.id" => [ MatchingRule::Type ] },
      "header" => { "X-Id" => [ MatchingRule::Regex("\\d+".into()) ] },
      "path" => { "$" => [ MatchingRule::Regex("/users/\\d+".into()) ] }
    };

    assert_eq!(matchers_to_json(&rules, PactSpecification::V2), json!({
      "$.body.id": { "match": "type" },
      "$.headers.X-Id": { "match": "regex", "regex": "\\d+" },
      "$.path": { "match": "regex", "regex": "/users/\\d+" }
    }));

    assert_eq!(matchers_to_json(&rules, PactSpecification::V3), json!({
      "body": { "$.id": { "combine": "AND", "matchers": [ { "match": "type" } ] } },
      "header": { "X-Id": { "combine": "AND", "matchers": [ { "match": "regex", "regex": "\\d+" } ] } },
      "path": { "combine": "AND", "matchers": [ { "match": "regex", "regex": "/users/\\d+" } ] }
    }));
  }

  #[test]
  fn round_trips_array_contains_rules() {
    let mut variant_rules = MatchingRuleCategory::empty(Category::BODY);
    variant_rules.add_rule(DocPath::new_unwrap("$.id"), MatchingRule::Type, RuleLogic::And);
    let rule = MatchingRule::ArrayContains(vec![(0, variant_rules)]);
    let parsed = MatchingRule::from_json(&rule.to_json()).unwrap();
    expect!(parsed).to(be_equal_to(rule));
  }
}
