use expectest::prelude::*;
use maplit::hashmap;
use serde_json::json;

use pactman_models::bodies::OptionalBody;
use pactman_models::matchingrules::MatchingRule;
use pactman_models::request::Request;
use pactman_models::response::Response;

use super::*;

fn json_request(body: serde_json::Value) -> Request {
  Request {
    headers: Some(hashmap!{ "Content-Type".to_string() => vec!["application/json".to_string()] }),
    body: OptionalBody::from(body),
    .. Request::default()
  }
}

fn json_response(body: serde_json::Value) -> Response {
  Response {
    headers: Some(hashmap!{ "Content-Type".to_string() => vec!["application/json".to_string()] }),
    body: OptionalBody::from(body),
    .. Response::default()
  }
}

#[test]
fn match_method_is_case_insensitive() {
  let mut mismatches = vec![];
  match_method("get", "GET", &mut mismatches);
  expect!(mismatches.iter()).to(be_empty());

  match_method("GET", "POST", &mut mismatches);
  expect!(mismatches.len()).to(be_equal_to(1));
}

#[test]
fn match_status_compares_integers() {
  let mut mismatches = vec![];
  match_status(200, 200, &mut mismatches);
  expect!(mismatches.iter()).to(be_empty());

  match_status(200, 404, &mut mismatches);
  expect!(mismatches).to(be_equal_to(vec![
    Mismatch::StatusMismatch { expected: 200, actual: 404 }]));
}

#[test]
fn match_path_with_a_regex_rule() {
  let rules = pactman_models::matchingrules! {
    "path" => { "$" => [ MatchingRule::Regex("/users/\\d+".into()) ] }
  };
  let context = MatchingContext::new(DiffConfig::NoUnexpectedKeys,
    &rules.rules_for_category(Category::PATH).unwrap());

  let mut mismatches = vec![];
  match_path("/users/1", "/users/42", &mut mismatches, &context);
  expect!(mismatches.iter()).to(be_empty());

  match_path("/users/1", "/users/fred", &mut mismatches, &context);
  expect!(mismatches.len()).to(be_equal_to(1));
}

#[test]
fn identical_requests_match() {
  let request = json_request(json!({ "id": 1 }));
  expect!(match_request(&request, &request.clone()).iter()).to(be_empty());
}

#[test]
fn like_accepts_extra_keys_in_the_actual_body() {
  let mut expected = json_response(json!({ "id": 1, "name": "a" }));
  expected.matching_rules = pactman_models::matchingrules! {
    "body" => { "$" => [ MatchingRule::Type ] }
  };
  let actual = json_response(json!({ "id": 9, "name": "b", "extra": true }));
  expect!(match_response(&expected, &actual).iter()).to(be_empty());
}

#[test]
fn like_reports_a_type_violation_with_the_full_path() {
  let mut expected = json_response(json!({ "id": 1, "name": "a" }));
  expected.matching_rules = pactman_models::matchingrules! {
    "body" => { "$" => [ MatchingRule::Type ] }
  };
  let actual = json_response(json!({ "id": "9", "name": "b" }));
  let mismatches = match_response(&expected, &actual);
  expect!(mismatches.len()).to(be_equal_to(1));
  match &mismatches[0] {
    Mismatch::BodyMismatch { path, mismatch, .. } => {
      expect!(path.as_str()).to(be_equal_to("$.body.id"));
      expect!(mismatch.contains("same type")).to(be_true());
    },
    m => panic!("Expected a body mismatch, got {:?}", m)
  }
}

#[test]
fn each_like_enforces_the_minimum_length() {
  let mut expected = json_response(json!([ { "x": 1 } ]));
  expected.matching_rules = pactman_models::matchingrules! {
    "body" => {
      "$" => [ MatchingRule::MinType(2) ],
      "$[*]" => [ MatchingRule::Type ]
    }
  };
  let actual = json_response(json!([ { "x": 7 } ]));
  let mismatches = match_response(&expected, &actual);
  expect!(mismatches.len()).to(be_equal_to(1));
  match &mismatches[0] {
    Mismatch::BodyMismatch { path, mismatch, .. } => {
      expect!(path.as_str()).to(be_equal_to("$.body"));
      expect!(mismatch.contains("at least 2")).to(be_true());
    },
    m => panic!("Expected a body mismatch, got {:?}", m)
  }
}

#[test]
fn each_like_validates_every_element_against_the_example() {
  let mut expected = json_response(json!([ { "x": 1 } ]));
  expected.matching_rules = pactman_models::matchingrules! {
    "body" => {
      "$" => [ MatchingRule::MinType(1) ],
      "$[*]" => [ MatchingRule::Type ]
    }
  };
  let actual = json_response(json!([ { "x": 7 }, { "x": 8 }, { "x": "nine" } ]));
  let mismatches = match_response(&expected, &actual);
  expect!(mismatches.len()).to(be_equal_to(1));
  match &mismatches[0] {
    Mismatch::BodyMismatch { path, .. } =>
      expect!(path.as_str()).to(be_equal_to("$.body.2.x")),
    m => panic!("Expected a body mismatch, got {:?}", m)
  };
}

#[test]
fn term_matches_the_whole_string() {
  let mut expected = json_response(json!({ "ts": "2020-01-01" }));
  expected.matching_rules = pactman_models::matchingrules! {
    "body" => { "$.ts" => [ MatchingRule::Regex("\\d{4}-\\d{2}-\\d{2}".into()) ] }
  };

  let actual = json_response(json!({ "ts": "2024-05-17" }));
  expect!(match_response(&expected, &actual).iter()).to(be_empty());

  let actual = json_response(json!({ "ts": "yesterday" }));
  let mismatches = match_response(&expected, &actual);
  expect!(mismatches.len()).to(be_equal_to(1));
  match &mismatches[0] {
    Mismatch::BodyMismatch { path, .. } =>
      expect!(path.as_str()).to(be_equal_to("$.body.ts")),
    m => panic!("Expected a body mismatch, got {:?}", m)
  };
}

#[test]
fn a_query_superset_is_rejected() {
  let expected = Request {
    query: Some(hashmap!{ "search".to_string() => vec!["x".to_string()] }),
    .. Request::default()
  };
  let actual = Request {
    query: Some(hashmap!{
      "search".to_string() => vec!["x".to_string()],
      "extra".to_string() => vec!["1".to_string()]
    }),
    .. Request::default()
  };
  let mismatches = match_request(&expected, &actual);
  expect!(mismatches.len()).to(be_equal_to(1));
  expect!(mismatches[0].description()).to(
    be_equal_to("Unexpected query parameter 'extra' received"));
}

#[test]
fn an_equality_rule_disables_an_inherited_type_rule() {
  let mut expected = json_response(json!({ "role": "admin", "name": "a" }));
  expected.matching_rules = pactman_models::matchingrules! {
    "body" => {
      "$" => [ MatchingRule::Type ],
      "$.role" => [ MatchingRule::Equality ]
    }
  };
  let actual = json_response(json!({ "role": "guest", "name": "b" }));
  let mismatches = match_response(&expected, &actual);
  expect!(mismatches.len()).to(be_equal_to(1));
  match &mismatches[0] {
    Mismatch::BodyMismatch { path, .. } =>
      expect!(path.as_str()).to(be_equal_to("$.body.role")),
    m => panic!("Expected a body mismatch, got {:?}", m)
  };
}

#[test]
fn an_empty_expected_object_with_a_type_rule_accepts_any_object() {
  let mut expected = json_response(json!({}));
  expected.matching_rules = pactman_models::matchingrules! {
    "body" => { "$" => [ MatchingRule::Type ] }
  };
  let actual = json_response(json!({ "anything": "goes" }));
  expect!(match_response(&expected, &actual).iter()).to(be_empty());
}

#[test]
fn an_empty_expected_object_without_rules_requires_an_empty_actual() {
  let expected = json_response(json!({}));
  let actual = json_response(json!({ "anything": "goes" }));
  expect!(match_response(&expected, &actual).len()).to(be_equal_to(1));
}

#[test]
fn request_bodies_reject_unexpected_keys() {
  let expected = json_request(json!({ "a": 1 }));
  let actual = json_request(json!({ "a": 1, "b": 2 }));
  expect!(match_request(&expected, &actual).len()).to(be_equal_to(1));
}

#[test]
fn response_bodies_allow_unexpected_keys() {
  let expected = json_response(json!({ "a": 1 }));
  let actual = json_response(json!({ "a": 1, "b": 2 }));
  expect!(match_response(&expected, &actual).iter()).to(be_empty());
}

#[test]
fn a_missing_expected_entry_is_reported_with_its_value() {
  let expected = json_response(json!({ "a": 1, "b": 2 }));
  let actual = json_response(json!({ "a": 1 }));
  let mismatches = match_response(&expected, &actual);
  expect!(mismatches.len()).to(be_equal_to(1));
  expect!(mismatches[0].description().contains("Expected entry b=2 but was missing"))
    .to(be_true());
}

#[test]
fn array_contains_finds_matching_variants() {
  use pactman_models::matchingrules::{Category, MatchingRuleCategory};

  let mut expected = json_response(json!([ "apple", "banana" ]));
  let variants = vec![
    (0, MatchingRuleCategory::empty(Category::BODY)),
    (1, MatchingRuleCategory::empty(Category::BODY))
  ];
  expected.matching_rules = pactman_models::matchingrules! {
    "body" => { "$" => [ MatchingRule::ArrayContains(variants) ] }
  };

  let actual = json_response(json!([ "cherry", "banana", "apple" ]));
  expect!(match_response(&expected, &actual).iter()).to(be_empty());

  let actual = json_response(json!([ "cherry", "banana" ]));
  let mismatches = match_response(&expected, &actual);
  expect!(mismatches.len()).to(be_equal_to(1));
  expect!(mismatches[0].description().contains("variant 0")).to(be_true());
}

#[test]
fn different_content_types_are_a_body_type_mismatch() {
  let expected = json_response(json!({ "a": 1 }));
  let actual = Response {
    headers: Some(hashmap!{ "Content-Type".to_string() => vec!["text/plain".to_string()] }),
    body: OptionalBody::from("a=1"),
    .. Response::default()
  };
  let mismatches = match_response(&expected, &actual);
  expect!(mismatches.iter().any(|m| m.mismatch_type() == "BodyTypeMismatch")).to(be_true());
}

#[test]
fn text_bodies_compare_by_equality() {
  let expected = Response {
    headers: Some(hashmap!{ "Content-Type".to_string() => vec!["text/plain".to_string()] }),
    body: OptionalBody::from("hello"),
    .. Response::default()
  };
  let matching = Response { body: OptionalBody::from("hello"), .. expected.clone() };
  expect!(match_response(&expected, &matching).iter()).to(be_empty());

  let different = Response { body: OptionalBody::from("goodbye"), .. expected.clone() };
  expect!(match_response(&expected, &different).len()).to(be_equal_to(1));
}

#[test]
fn form_urlencoded_bodies_compare_as_parameter_maps() {
  let content_type = hashmap!{
    "Content-Type".to_string() => vec!["application/x-www-form-urlencoded".to_string()] };
  let expected = Response {
    headers: Some(content_type.clone()),
    body: OptionalBody::from("a=1&b=2"),
    .. Response::default()
  };
  let matching = Response { body: OptionalBody::from("b=2&a=1"), .. expected.clone() };
  expect!(match_response(&expected, &matching).iter()).to(be_empty());

  let different = Response { body: OptionalBody::from("a=1&b=3"), .. expected.clone() };
  expect!(match_response(&expected, &different).len()).to(be_equal_to(1));
}

#[test]
fn a_missing_expected_body_matches_anything() {
  let expected = Response::default();
  let actual = json_response(json!({ "a": 1 }));
  expect!(match_response(&expected, &actual).iter()).to(be_empty());
}

#[test]
fn a_null_expected_body_rejects_a_present_actual() {
  let expected = Response { body: OptionalBody::Null, .. Response::default() };
  let actual = json_response(json!({ "a": 1 }));
  expect!(match_response(&expected, &actual).len()).to(be_equal_to(1));
}

#[test]
fn compiled_examples_match_themselves() {
  // any expected body must match its own example under its own rules
  let mut expected = json_response(json!({
    "id": 1,
    "name": "a",
    "tags": [ "x" ]
  }));
  expected.matching_rules = pactman_models::matchingrules! {
    "body" => {
      "$.id" => [ MatchingRule::Type ],
      "$.tags" => [ MatchingRule::MinType(1) ],
      "$.tags[*]" => [ MatchingRule::Type ]
    }
  };
  let actual = expected.clone();
  expect!(match_response(&expected, &actual).iter()).to(be_empty());
}
