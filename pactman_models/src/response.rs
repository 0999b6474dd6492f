//! Structs to model an HTTP response

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use serde_json::{json, Value};

use crate::bodies::OptionalBody;
use crate::http_parts::HttpPart;
use crate::json_utils::{body_from_json, headers_from_json, headers_to_json, json_to_num};
use crate::matchingrules::{matchers_from_json, matchers_to_json, MatchingRules};
use crate::PactSpecification;
use crate::request::body_to_json;

/// Struct that defines the response of an interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  /// Response status
  pub status: u16,
  /// Response headers
  pub headers: Option<HashMap<String, Vec<String>>>,
  /// Response body
  pub body: OptionalBody,
  /// Response matching rules
  pub matching_rules: MatchingRules
}

impl HttpPart for Response {
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

impl Display for Response {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    write!(f, "Response ( status: {}, headers: {:?}, body: {} )",
      self.status, self.headers, self.body)
  }
}

impl Default for Response {
  fn default() -> Self {
    Response {
      status: 200,
      headers: None,
      body: OptionalBody::Missing,
      matching_rules: MatchingRules::default()
    }
  }
}

impl Response {
  /// Builds a `Response` from the `Value` struct
  pub fn from_json(response_json: &Value, _spec_version: PactSpecification) -> anyhow::Result<Response> {
    let status = json_to_num(response_json.get("status").cloned()).unwrap_or(200) as u16;
    let headers = headers_from_json(response_json);
    let body = body_from_json(response_json, &headers);
    Ok(Response {
      status,
      headers,
      body,
      matching_rules: matchers_from_json(response_json)?
    })
  }

  /// Converts this `Response` to a `Value` struct
  pub fn to_json(&self, spec_version: PactSpecification) -> Value {
    let mut json = json!({
      "status": self.status
    });
    let map = json.as_object_mut().unwrap();
    if let Some(headers) = &self.headers {
      map.insert("headers".to_string(), headers_to_json(headers));
    }
    let json_content = self.content_type().map(|ct| ct.is_json()).unwrap_or(false);
    body_to_json(&self.body, json_content, map);
    if spec_version > PactSpecification::V1_1 && self.matching_rules.is_not_empty() {
      map.insert("matchingRules".to_string(),
        matchers_to_json(&self.matching_rules, spec_version));
    }
    json
  }
}
