//! Builders for constructing interactions and pacts from the consumer DSL

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;
use tracing::debug;

use pactman_models::bodies::OptionalBody;
use pactman_models::content_types::ContentType;
use pactman_models::interaction::Interaction;
use pactman_models::json_utils::json_to_string;
use pactman_models::matchingrules::{Category, MatchingRules};
use pactman_models::pact::{Pact, WriteMode};
use pactman_models::PactSpecification;
use pactman_models::path_exp::DocPath;
use pactman_models::provider_states::ProviderState;
use pactman_models::request::Request;
use pactman_models::response::Response;

use crate::compiler::{compile_pattern, PatternError};
use crate::patterns::JsonPattern;
use crate::session::MockSession;

/// Builder for the request half of an interaction
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
  method: String,
  path: Option<JsonPattern>,
  query: Vec<(String, JsonPattern)>,
  headers: Vec<(String, JsonPattern)>,
  body: Option<JsonPattern>,
  content_type: Option<String>
}

impl RequestBuilder {
  /// Sets the request method
  pub fn method(&mut self, method: impl Into<String>) -> &mut Self {
    self.method = method.into().to_uppercase();
    self
  }

  /// Sets the method to GET
  pub fn get(&mut self) -> &mut Self {
    self.method("GET")
  }

  /// Sets the method to POST
  pub fn post(&mut self) -> &mut Self {
    self.method("POST")
  }

  /// Sets the method to PUT
  pub fn put(&mut self) -> &mut Self {
    self.method("PUT")
  }

  /// Sets the method to DELETE
  pub fn delete(&mut self) -> &mut Self {
    self.method("DELETE")
  }

  /// Sets the request path. Accepts a pattern, so `term!` can be used to
  /// match a range of paths.
  pub fn path(&mut self, path: impl Into<JsonPattern>) -> &mut Self {
    self.path = Some(path.into());
    self
  }

  /// Adds a query parameter. A parameter given several times accumulates
  /// its values in order.
  pub fn query_param(&mut self, name: impl Into<String>, value: impl Into<JsonPattern>) -> &mut Self {
    self.query.push((name.into(), value.into()));
    self
  }

  /// Adds a header
  pub fn header(&mut self, name: impl Into<String>, value: impl Into<JsonPattern>) -> &mut Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  /// Sets the content type of the request
  pub fn content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
    self.content_type = Some(content_type.into());
    self
  }

  /// Shorthand for a UTF-8 JSON content type
  pub fn json_utf8(&mut self) -> &mut Self {
    self.content_type("application/json; charset=utf-8")
  }

  /// Sets a JSON body from a pattern
  pub fn json_body(&mut self, body: impl Into<JsonPattern>) -> &mut Self {
    self.body = Some(body.into());
    if self.content_type.is_none() {
      self.content_type = Some("application/json".to_string());
    }
    self
  }

  /// Sets a plain body from a string
  pub fn body(&mut self, body: impl Into<String>) -> &mut Self {
    self.body = Some(JsonPattern::Value(Value::String(body.into())));
    self
  }

  pub(crate) fn build(&self, spec_version: PactSpecification) -> Result<Request, PatternError> {
    let mut matching_rules = MatchingRules::default();

    let path = match &self.path {
      Some(pattern) => {
        let (example, rules) = compile_pattern(pattern, DocPath::root(),
          Category::PATH, spec_version)?;
        matching_rules.add_rules(rules);
        json_to_string(&example)
      },
      None => "/".to_string()
    };

    let query = build_param_map(&self.query, Category::QUERY, spec_version,
      &mut matching_rules)?;
    let headers = build_header_map(&self.headers, &self.content_type, spec_version,
      &mut matching_rules)?;
    let body = build_body(&self.body, &self.content_type, spec_version,
      &mut matching_rules)?;

    Ok(Request {
      method: if self.method.is_empty() { "GET".to_string() } else { self.method.clone() },
      path,
      query,
      headers,
      body,
      matching_rules
    })
  }
}

/// Builder for the response half of an interaction
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
  status: u16,
  headers: Vec<(String, JsonPattern)>,
  body: Option<JsonPattern>,
  content_type: Option<String>
}

impl Default for ResponseBuilder {
  fn default() -> Self {
    ResponseBuilder { status: 200, headers: vec![], body: None, content_type: None }
  }
}

impl ResponseBuilder {
  /// Sets the response status
  pub fn status(&mut self, status: u16) -> &mut Self {
    self.status = status;
    self
  }

  /// Shorthand for a 201 Created status
  pub fn created(&mut self) -> &mut Self {
    self.status(201)
  }

  /// Adds a header
  pub fn header(&mut self, name: impl Into<String>, value: impl Into<JsonPattern>) -> &mut Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  /// Sets the content type of the response
  pub fn content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
    self.content_type = Some(content_type.into());
    self
  }

  /// Shorthand for a UTF-8 JSON content type
  pub fn json_utf8(&mut self) -> &mut Self {
    self.content_type("application/json; charset=utf-8")
  }

  /// Sets a JSON body from a pattern
  pub fn json_body(&mut self, body: impl Into<JsonPattern>) -> &mut Self {
    self.body = Some(body.into());
    if self.content_type.is_none() {
      self.content_type = Some("application/json".to_string());
    }
    self
  }

  /// Sets a plain body from a string
  pub fn body(&mut self, body: impl Into<String>) -> &mut Self {
    self.body = Some(JsonPattern::Value(Value::String(body.into())));
    self
  }

  pub(crate) fn build(&self, spec_version: PactSpecification) -> Result<Response, PatternError> {
    let mut matching_rules = MatchingRules::default();
    let headers = build_header_map(&self.headers, &self.content_type, spec_version,
      &mut matching_rules)?;
    let body = build_body(&self.body, &self.content_type, spec_version,
      &mut matching_rules)?;
    Ok(Response { status: self.status, headers, body, matching_rules })
  }
}

fn build_param_map(
  params: &[(String, JsonPattern)],
  category: Category,
  spec_version: PactSpecification,
  matching_rules: &mut MatchingRules
) -> Result<Option<HashMap<String, Vec<String>>>, PatternError> {
  if params.is_empty() {
    return Ok(None);
  }
  let mut map: HashMap<String, Vec<String>> = HashMap::new();
  for (name, pattern) in params {
    let root = DocPath::new(name).map_err(|err| PatternError::RuleCompileError(
      format!("'{}' is not a valid parameter name: {}", name, err)))?;
    let (example, rules) = compile_pattern(pattern, root, category, spec_version)?;
    matching_rules.add_rules(rules);
    map.entry(name.clone()).or_default().push(json_to_string(&example));
  }
  Ok(Some(map))
}

fn build_header_map(
  headers: &[(String, JsonPattern)],
  content_type: &Option<String>,
  spec_version: PactSpecification,
  matching_rules: &mut MatchingRules
) -> Result<Option<HashMap<String, Vec<String>>>, PatternError> {
  let mut map: HashMap<String, Vec<String>> = HashMap::new();
  for (name, pattern) in headers {
    let root = DocPath::new(name).map_err(|err| PatternError::RuleCompileError(
      format!("'{}' is not a valid header name: {}", name, err)))?;
    let (example, rules) = compile_pattern(pattern, root, Category::HEADER, spec_version)?;
    matching_rules.add_rules(rules);
    map.entry(name.clone()).or_default().push(json_to_string(&example));
  }
  if let Some(content_type) = content_type {
    map.entry("Content-Type".to_string())
      .or_insert_with(|| vec![content_type.clone()]);
  }
  if map.is_empty() {
    Ok(None)
  } else {
    Ok(Some(map))
  }
}

fn build_body(
  body: &Option<JsonPattern>,
  content_type: &Option<String>,
  spec_version: PactSpecification,
  matching_rules: &mut MatchingRules
) -> Result<OptionalBody, PatternError> {
  match body {
    Some(pattern) => {
      let (example, rules) = compile_pattern(pattern, DocPath::root(), Category::BODY,
        spec_version)?;
      matching_rules.add_rules(rules);
      let ct = content_type.as_ref()
        .and_then(|value| ContentType::parse(value).ok());
      let body = match &example {
        Value::Null => OptionalBody::Null,
        Value::String(s) if !ct.as_ref().map(|ct| ct.is_json()).unwrap_or(false) =>
          OptionalBody::Present(s.clone().into(), ct),
        _ => OptionalBody::Present(example.to_string().into(),
          ct.or(Some(ContentType::json())))
      };
      Ok(body)
    },
    None => Ok(OptionalBody::Missing)
  }
}

/// Builder for a single interaction. Normally created through
/// `PactBuilder::interaction`.
#[derive(Debug, Clone)]
pub struct InteractionBuilder {
  description: String,
  provider_states: Vec<ProviderState>,

  /// A builder for this interaction's request
  pub request: RequestBuilder,

  /// A builder for this interaction's response
  pub response: ResponseBuilder
}

impl InteractionBuilder {
  /// Creates a new interaction builder with the given description
  pub fn new(description: impl Into<String>) -> InteractionBuilder {
    InteractionBuilder {
      description: description.into(),
      provider_states: vec![],
      request: RequestBuilder::default(),
      response: ResponseBuilder::default()
    }
  }

  /// Sets (or replaces) the primary provider state for this interaction
  pub fn given(&mut self, state: impl Into<String>) -> &mut Self {
    let state = ProviderState::named(state);
    if self.provider_states.is_empty() {
      self.provider_states.push(state);
    } else {
      self.provider_states[0] = state;
    }
    self
  }

  /// Sets the primary provider state with parameters. The parameters must
  /// be given as a JSON object.
  pub fn given_with_params(&mut self, state: impl Into<String>, params: &Value) -> &mut Self {
    let state = ProviderState {
      name: state.into(),
      params: params.as_object()
        .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
    };
    if self.provider_states.is_empty() {
      self.provider_states.push(state);
    } else {
      self.provider_states[0] = state;
    }
    self
  }

  /// Appends a further provider state. Multiple provider states are only
  /// representable from specification version V3.
  pub fn and_given(&mut self, state: impl Into<String>) -> &mut Self {
    self.provider_states.push(ProviderState::named(state));
    self
  }

  /// Replaces the description of this interaction
  pub fn upon_receiving(&mut self, description: impl Into<String>) -> &mut Self {
    self.description = description.into();
    self
  }

  /// Seals the interaction for the given spec version. The builder may be
  /// sealed several times, each call producing a distinct interaction.
  pub fn build(&self, spec_version: PactSpecification) -> Result<Interaction, PatternError> {
    if self.provider_states.len() > 1 && spec_version < PactSpecification::V3 {
      return Err(PatternError::SpecViolation {
        matcher: "and_given".to_string(),
        requires: PactSpecification::V3,
        version: spec_version
      });
    }
    debug!("Building interaction '{}'", self.description);
    Ok(Interaction {
      id: None,
      description: self.description.clone(),
      provider_states: self.provider_states.clone(),
      request: self.request.build(spec_version)?,
      response: self.response.build(spec_version)?,
      spec_version
    })
  }
}

/// Builder for a pact between a consumer and a provider. The entry point of
/// the consumer DSL.
///
/// ```
/// use pactman_consumer::prelude::*;
///
/// let mut builder = PactBuilder::new("quotes client", "quotes service");
/// builder.interaction("add a quote", |i| {
///   i.request
///     .post()
///     .path("/quotes")
///     .json_body(json_pattern!({ "quote": like!("Eureka!") }));
///   i.response
///     .created()
///     .header("Location", term!("^/quotes/[0-9]+$", "/quotes/12"));
/// });
/// ```
#[derive(Debug)]
pub struct PactBuilder {
  pact: Pact,
  spec_version: PactSpecification,
  output_dir: Option<PathBuf>,
  write_mode: WriteMode
}

impl PactBuilder {
  /// Creates a builder for a pact between the named consumer and provider,
  /// targeting specification version V3
  pub fn new(consumer: impl Into<String>, provider: impl Into<String>) -> PactBuilder {
    PactBuilder {
      pact: Pact::new(consumer, provider),
      spec_version: PactSpecification::V3,
      output_dir: None,
      write_mode: WriteMode::Merge
    }
  }

  /// Sets the specification version the pact is built for
  pub fn with_specification(mut self, spec_version: PactSpecification) -> Self {
    self.spec_version = spec_version;
    self
  }

  /// Sets the directory the pact file is written to. Defaults to the
  /// current directory.
  pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.output_dir = Some(dir.into());
    self
  }

  /// Sets how the pact file is written at the end of the session
  pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
    self.write_mode = mode;
    self
  }

  /// Adds an interaction to the pact through the given closure. Panics on
  /// an invalid matcher definition, which aborts the test that is building
  /// the pact.
  pub fn interaction<F>(&mut self, description: impl Into<String>, build_fn: F) -> &mut Self
    where F: FnOnce(&mut InteractionBuilder) {
    let mut interaction = InteractionBuilder::new(description);
    build_fn(&mut interaction);
    match interaction.build(self.spec_version) {
      Ok(interaction) => self.push_interaction(interaction),
      Err(err) => panic!("Could not build the interaction: {}", err)
    }
  }

  /// Adds a sealed interaction to the pact
  pub fn push_interaction(&mut self, interaction: Interaction) -> &mut Self {
    self.pact.interactions.push(interaction);
    self
  }

  /// The pact built so far
  pub fn build(&self) -> Pact {
    self.pact.clone()
  }

  /// Starts a mock session for the pact built so far. The session owns the
  /// registered interactions; `verify` (or dropping the session) checks
  /// that every one of them was consumed.
  pub fn start_mock_session(&self) -> MockSession {
    MockSession::start(self.build(), self.output_dir.clone(), self.write_mode)
  }

  /// Starts a mock session backed by a real HTTP server on an ephemeral
  /// localhost port
  pub fn start_mock_server(&self) -> MockSession {
    MockSession::start_with_http_server(self.build(), self.output_dir.clone(), self.write_mode)
  }
}

#[cfg(test)]
mod tests {
  use expectest::prelude::*;
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use pactman_models::matchingrules::MatchingRule;

  use super::*;
  use crate::{json_pattern, like, term};

  #[test]
  fn builds_a_request_with_patterns() {
    let mut builder = RequestBuilder::default();
    builder
      .post()
      .path(term!("^/users/\\d+$", "/users/1"))
      .query_param("search", like!("x"))
      .header("X-Id", term!("\\d+", "42"))
      .json_body(json_pattern!({ "name": like!("mallory") }));

    let request = builder.build(PactSpecification::V3).unwrap();
    expect!(request.method.as_str()).to(be_equal_to("POST"));
    expect!(request.path.as_str()).to(be_equal_to("/users/1"));
    expect!(request.query.as_ref().unwrap().get("search").unwrap().clone()).to(
      be_equal_to(vec!["x".to_string()]));
    assert_eq!(serde_json::from_slice::<serde_json::Value>(&request.body.value()).unwrap(),
      json!({ "name": "mallory" }));

    let path_rules = request.matching_rules.rules_for_category(Category::PATH).unwrap();
    expect!(path_rules.matcher_is_defined(&["$"])).to(be_true());
    let header_rules = request.matching_rules.rules_for_category(Category::HEADER).unwrap();
    expect!(header_rules.select_best_matcher(&["$", "X-Id"]).rules).to(
      be_equal_to(vec![MatchingRule::Regex("\\d+".into())]));
    let body_rules = request.matching_rules.rules_for_category(Category::BODY).unwrap();
    expect!(body_rules.matcher_is_defined(&["$", "name"])).to(be_true());
  }

  #[test]
  fn repeated_query_params_accumulate_values() {
    let mut builder = RequestBuilder::default();
    builder.query_param("id", "1").query_param("id", "2");
    let request = builder.build(PactSpecification::V3).unwrap();
    expect!(request.query.unwrap().get("id").unwrap().clone()).to(
      be_equal_to(vec!["1".to_string(), "2".to_string()]));
  }

  #[test]
  fn the_content_type_lands_in_the_headers() {
    let mut builder = ResponseBuilder::default();
    builder.json_utf8().json_body(json_pattern!({ "a": 1 }));
    let response = builder.build(PactSpecification::V3).unwrap();
    let headers = response.headers.unwrap();
    expect!(headers.get("Content-Type").unwrap().first().unwrap().as_str()).to(
      be_equal_to("application/json; charset=utf-8"));
  }

  #[test]
  fn given_replaces_and_and_given_appends() {
    let mut builder = InteractionBuilder::new("a request");
    builder.given("first").given("replaced").and_given("second");
    let interaction = builder.build(PactSpecification::V3).unwrap();
    let names: Vec<&str> = interaction.provider_states.iter()
      .map(|s| s.name.as_str()).collect();
    expect!(names).to(be_equal_to(vec!["replaced", "second"]));
  }

  #[test]
  fn multiple_provider_states_need_v3() {
    let mut builder = InteractionBuilder::new("a request");
    builder.given("first").and_given("second");
    let result = builder.build(PactSpecification::V2);
    expect!(result).to(be_err());
  }

  #[test]
  fn a_builder_can_be_sealed_multiple_times() {
    let mut builder = InteractionBuilder::new("first");
    builder.request.get().path("/a");
    let first = builder.build(PactSpecification::V3).unwrap();

    builder.upon_receiving("second");
    builder.request.path("/b");
    let second = builder.build(PactSpecification::V3).unwrap();

    expect!(first.description.as_str()).to(be_equal_to("first"));
    expect!(second.description.as_str()).to(be_equal_to("second"));
    expect!(first.request.path.as_str()).to(be_equal_to("/a"));
    expect!(second.request.path.as_str()).to(be_equal_to("/b"));
  }

  #[test]
  fn the_pact_builder_collects_interactions() {
    let mut builder = PactBuilder::new("Consumer", "Provider");
    builder
      .interaction("a request for users", |i| {
        i.given("users exist");
        i.request.get().path("/users");
        i.response.json_body(json_pattern!([{ "name": "a" }]));
      })
      .interaction("a request for a user", |i| {
        i.request.get().path("/users/1");
        i.response.status(404);
      });

    let pact = builder.build();
    expect!(pact.consumer.name.as_str()).to(be_equal_to("Consumer"));
    expect!(pact.interactions.len()).to(be_equal_to(2));
    expect!(pact.spec_version().unwrap()).to(be_equal_to(PactSpecification::V3));
  }
}
