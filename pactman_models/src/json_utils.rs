//! Collection of utilities for working with JSON

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::bodies::OptionalBody;
use crate::content_types::{ContentType, detect_content_type};

/// Converts the JSON struct to a display string, dropping the quotes from
/// string values
pub fn json_to_string(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    _ => value.to_string()
  }
}

/// Converts an optional JSON struct to a usize, if possible
pub fn json_to_num(value: Option<Value>) -> Option<usize> {
  match value {
    Some(Value::Number(n)) => n.as_u64().map(|n| n as usize),
    Some(Value::String(s)) => s.parse::<usize>().ok(),
    _ => None
  }
}

/// Parses the `headers` element of an HTTP part. Values may be single
/// strings or arrays of strings; single comma-separated strings are split.
pub fn headers_from_json(part_json: &Value) -> Option<HashMap<String, Vec<String>>> {
  match part_json.get("headers") {
    Some(Value::Object(m)) => Some(m.iter().map(|(name, value)| {
      let values = match value {
        Value::String(s) => s.split(',').map(|v| v.trim().to_string()).collect(),
        Value::Array(values) => values.iter().map(json_to_string).collect(),
        _ => vec![json_to_string(value)]
      };
      (name.clone(), values)
    }).collect()),
    _ => None
  }
}

/// Converts a header map into its JSON form. Multiple values are joined
/// with a comma, which is how every supported spec version serialises them.
pub fn headers_to_json(headers: &HashMap<String, Vec<String>>) -> Value {
  Value::Object(headers.iter().fold(Map::new(), |mut map, (name, values)| {
    map.insert(name.clone(), Value::String(values.join(", ")));
    map
  }))
}

/// Looks up a header value by case-insensitive name
pub fn find_header<'a>(
  headers: &'a Option<HashMap<String, Vec<String>>>,
  name: &str
) -> Option<&'a Vec<String>> {
  headers.as_ref().and_then(|headers| {
    headers.iter()
      .find(|(k, _)| k.to_lowercase() == name.to_lowercase())
      .map(|(_, v)| v)
  })
}

/// Parses the body of an HTTP part, using the content-type header to decide
/// how to store it
pub fn body_from_json(
  part_json: &Value,
  headers: &Option<HashMap<String, Vec<String>>>
) -> OptionalBody {
  let content_type = find_header(headers, "content-type")
    .and_then(|values| values.first().cloned())
    .and_then(|value| ContentType::parse(&value).ok());

  match part_json.get("body") {
    Some(Value::Null) => OptionalBody::Null,
    Some(Value::String(s)) if s.is_empty() => OptionalBody::Empty,
    Some(Value::String(s)) => {
      let ct = content_type.or_else(|| detect_content_type(s.as_bytes()));
      OptionalBody::Present(s.clone().into(), ct)
    },
    Some(v) => OptionalBody::Present(v.to_string().into(),
      content_type.or(Some(ContentType::json()))),
    None => OptionalBody::Missing
  }
}

#[cfg(test)]
mod tests {
  use expectest::prelude::*;
  use maplit::hashmap;
  use serde_json::json;

  use super::*;

  #[test]
  fn headers_from_json_splits_comma_separated_values() {
    let part = json!({ "headers": { "Accept": "application/json, text/plain" } });
    let headers = headers_from_json(&part).unwrap();
    expect!(headers.get("Accept").unwrap().len()).to(be_equal_to(2));
  }

  #[test]
  fn body_from_json_uses_the_declared_content_type() {
    let headers = Some(hashmap!{ "Content-Type".to_string() => vec!["application/json".to_string()] });
    let body = body_from_json(&json!({ "body": { "a": 1 } }), &headers);
    expect!(body.content_type()).to(be_some().value(ContentType::json()));
  }

  #[test]
  fn body_from_json_handles_the_null_and_missing_states() {
    expect!(body_from_json(&json!({ "body": null }), &None)).to(be_equal_to(OptionalBody::Null));
    expect!(body_from_json(&json!({}), &None)).to(be_equal_to(OptionalBody::Missing));
    expect!(body_from_json(&json!({ "body": "" }), &None)).to(be_equal_to(OptionalBody::Empty));
  }

  #[test]
  fn find_header_is_case_insensitive() {
    let headers = Some(hashmap!{ "CONTENT-TYPE".to_string() => vec!["text/plain".to_string()] });
    expect!(find_header(&headers, "Content-Type")).to(be_some());
    expect!(find_header(&headers, "Accept")).to(be_none());
  }
}
