//! Functions for parsing and building query strings

use std::collections::HashMap;

use itertools::Itertools;
use serde_json::{Map, Value};
use tracing::warn;

use crate::json_utils::json_to_string;
use crate::PactSpecification;

/// Decodes a percent-encoded query component
pub fn decode_query(component: &str) -> String {
  let mut buffer = vec![];
  let mut chars = component.chars();
  while let Some(ch) = chars.next() {
    match ch {
      '%' => {
        let hex: String = chars.by_ref().take(2).collect();
        match u8::from_str_radix(&hex, 16) {
          Ok(b) if hex.len() == 2 => buffer.push(b),
          _ => {
            buffer.push(b'%');
            buffer.extend(hex.bytes());
          }
        }
      },
      '+' => buffer.push(b' '),
      _ => {
        let mut encoded = [0; 4];
        buffer.extend(ch.encode_utf8(&mut encoded).bytes());
      }
    }
  }
  String::from_utf8(buffer).unwrap_or_else(|_| component.to_string())
}

/// Percent-encodes a query component
pub fn encode_query(component: &str) -> String {
  component.chars().map(|ch| match ch {
    ' ' => "+".to_string(),
    'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => ch.to_string(),
    _ => {
      let mut encoded = [0; 4];
      ch.encode_utf8(&mut encoded).bytes()
        .map(|b| format!("%{:02X}", b))
        .collect()
    }
  }).collect()
}

/// Parses a query string into a map of names to ordered value lists.
/// Repeated names accumulate their values in order of appearance.
pub fn parse_query_string(query: &str) -> Option<HashMap<String, Vec<String>>> {
  if query.is_empty() {
    return None;
  }
  let mut map: HashMap<String, Vec<String>> = HashMap::new();
  for pair in query.split('&').filter(|p| !p.is_empty()) {
    let (name, value) = match pair.split_once('=') {
      Some((name, value)) => (decode_query(name), decode_query(value)),
      None => (decode_query(pair), String::default())
    };
    map.entry(name).or_default().push(value);
  }
  Some(map)
}

/// Converts a query map back into a query string, with names sorted so the
/// output is stable
pub fn build_query_string(query: &HashMap<String, Vec<String>>) -> String {
  query.iter()
    .sorted_by(|a, b| Ord::cmp(a.0, b.0))
    .flat_map(|(name, values)| values.iter()
      .map(|value| format!("{}={}", encode_query(name), encode_query(value)))
      .collect_vec())
    .join("&")
}

/// Parses the `query` element of a request. V2 documents hold a query
/// string; V3 documents hold a map of names to values.
pub fn query_from_json(query_json: &Value, spec_version: PactSpecification
) -> Option<HashMap<String, Vec<String>>> {
  match query_json {
    Value::String(s) => parse_query_string(s),
    Value::Object(map) if spec_version >= PactSpecification::V3 =>
      Some(map.iter().map(|(name, value)| {
        let values = match value {
          Value::String(s) => vec![s.clone()],
          Value::Array(array) => array.iter().map(json_to_string).collect(),
          _ => {
            warn!("Query parameter value '{}' is not valid, ignoring", value);
            vec![]
          }
        };
        (name.clone(), values)
      }).collect()),
    _ => {
      warn!("Only string query strings are supported with specification version {}, ignoring",
        spec_version);
      None
    }
  }
}

/// Converts a query map into its JSON form for the given spec version
pub fn query_to_json(query: &HashMap<String, Vec<String>>, spec_version: PactSpecification) -> Value {
  match spec_version {
    PactSpecification::V3 => Value::Object(query.iter().fold(Map::new(), |mut map, (name, values)| {
      map.insert(name.clone(), Value::Array(
        values.iter().map(|v| Value::String(v.clone())).collect()));
      map
    })),
    _ => Value::String(build_query_string(query))
  }
}

#[cfg(test)]
mod tests {
  use expectest::prelude::*;
  use maplit::hashmap;
  use serde_json::json;

  use super::*;

  #[test]
  fn parses_a_simple_query_string() {
    let expected = hashmap!{
      "a".to_string() => vec!["b".to_string()],
      "c".to_string() => vec!["d".to_string()]
    };
    expect!(parse_query_string("a=b&c=d")).to(be_some().value(expected));
  }

  #[test]
  fn repeated_names_keep_their_values_in_order() {
    let expected = hashmap!{
      "id".to_string() => vec!["1".to_string(), "2".to_string(), "3".to_string()]
    };
    expect!(parse_query_string("id=1&id=2&id=3")).to(be_some().value(expected));
  }

  #[test]
  fn decodes_percent_encoding_and_plus_signs() {
    let expected = hashmap!{
      "name".to_string() => vec!["a b c".to_string()],
      "file".to_string() => vec!["文件.txt".to_string()]
    };
    expect!(parse_query_string("name=a+b%20c&file=%E6%96%87%E4%BB%B6.txt"))
      .to(be_some().value(expected));
  }

  #[test]
  fn empty_query_strings_parse_to_none() {
    expect!(parse_query_string("")).to(be_none());
  }

  #[test]
  fn v2_documents_hold_query_strings() {
    let query = hashmap!{ "a".to_string() => vec!["b c".to_string()] };
    expect!(query_to_json(&query, PactSpecification::V2)).to(be_equal_to(json!("a=b+c")));
    expect!(query_from_json(&json!("a=b+c"), PactSpecification::V2))
      .to(be_some().value(query));
  }

  #[test]
  fn v3_documents_hold_query_maps() {
    let query = hashmap!{ "a".to_string() => vec!["b".to_string(), "c".to_string()] };
    let json = query_to_json(&query, PactSpecification::V3);
    expect!(&json).to(be_equal_to(&json!({ "a": ["b", "c"] })));
    expect!(query_from_json(&json, PactSpecification::V3)).to(be_some().value(query));
  }
}
