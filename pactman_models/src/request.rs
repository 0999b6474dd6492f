//! Structs to model an HTTP request

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use serde_json::{json, Value};
use tracing::warn;

use crate::bodies::OptionalBody;
use crate::http_parts::HttpPart;
use crate::json_utils::{body_from_json, headers_from_json, headers_to_json, json_to_string};
use crate::matchingrules::{matchers_from_json, matchers_to_json, MatchingRules};
use crate::PactSpecification;
use crate::query_strings::{query_from_json, query_to_json};

/// Struct that defines the request of an interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  /// Request method, stored upper-case
  pub method: String,
  /// Request path
  pub path: String,
  /// Request query string as a map of names to ordered value lists
  pub query: Option<HashMap<String, Vec<String>>>,
  /// Request headers
  pub headers: Option<HashMap<String, Vec<String>>>,
  /// Request body
  pub body: OptionalBody,
  /// Request matching rules
  pub matching_rules: MatchingRules
}

impl HttpPart for Request {
  fn headers(&self) -> &Option<HashMap<String, Vec<String>>> {
    &self.headers
  }

  fn body(&self) -> &OptionalBody {
    &self.body
  }

  fn matching_rules(&self) -> &MatchingRules {
    &self.matching_rules
  }
}

impl Display for Request {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    write!(f, "Request ( method: {}, path: {}, query: {:?}, headers: {:?}, body: {} )",
      self.method, self.path, self.query, self.headers, self.body)
  }
}

impl Default for Request {
  fn default() -> Self {
    Request {
      method: "GET".to_string(),
      path: "/".to_string(),
      query: None,
      headers: None,
      body: OptionalBody::Missing,
      matching_rules: MatchingRules::default()
    }
  }
}

impl Request {
  /// Builds a `Request` from the `Value` struct
  pub fn from_json(request_json: &Value, spec_version: PactSpecification) -> anyhow::Result<Request> {
    let method = match request_json.get("method") {
      Some(v) => json_to_string(v).to_uppercase(),
      None => "GET".to_string()
    };
    let path = match request_json.get("path") {
      Some(v) => json_to_string(v),
      None => "/".to_string()
    };
    let query = request_json.get("query")
      .and_then(|q| query_from_json(q, spec_version));
    let headers = headers_from_json(request_json);
    let body = body_from_json(request_json, &headers);
    Ok(Request {
      method,
      path,
      query,
      headers,
      body,
      matching_rules: matchers_from_json(request_json)?
    })
  }

  /// Converts this `Request` to a `Value` struct
  pub fn to_json(&self, spec_version: PactSpecification) -> Value {
    let mut json = json!({
      "method": Value::String(self.method.to_uppercase()),
      "path": Value::String(self.path.clone())
    });
    let map = json.as_object_mut().unwrap();
    if let Some(query) = &self.query {
      map.insert("query".to_string(), query_to_json(query, spec_version));
    }
    if let Some(headers) = &self.headers {
      map.insert("headers".to_string(), headers_to_json(headers));
    }
    body_to_json(&self.body, self.content_type_is_json(), map);
    if spec_version > PactSpecification::V1_1 && self.matching_rules.is_not_empty() {
      map.insert("matchingRules".to_string(),
        matchers_to_json(&self.matching_rules, spec_version));
    }
    json
  }

  fn content_type_is_json(&self) -> bool {
    self.content_type().map(|ct| ct.is_json()).unwrap_or(false)
  }
}

/// Inserts the body of an HTTP part into its JSON form. JSON bodies are
/// embedded as JSON; other bodies as strings.
pub(crate) fn body_to_json(
  body: &OptionalBody,
  json_content: bool,
  map: &mut serde_json::Map<String, Value>
) {
  match body {
    OptionalBody::Present(bytes, _) => if json_content {
      match serde_json::from_slice(bytes) {
        Ok(json_body) => { map.insert("body".to_string(), json_body); },
        Err(err) => {
          warn!("Failed to parse json body: {}", err);
          map.insert("body".to_string(),
            Value::String(String::from_utf8_lossy(bytes).to_string()));
        }
      }
    } else {
      map.insert("body".to_string(),
        Value::String(String::from_utf8_lossy(bytes).to_string()));
    },
    OptionalBody::Empty => { map.insert("body".to_string(), Value::String(String::default())); },
    OptionalBody::Null => { map.insert("body".to_string(), Value::Null); },
    OptionalBody::Missing => ()
  }
}
