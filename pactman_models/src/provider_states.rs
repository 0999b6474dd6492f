//! Provider states: named preconditions the provider must satisfy before an
//! interaction is replayed

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::json_utils::json_to_string;

/// A provider state with optional parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderState {
  /// Description of this provider state
  pub name: String,
  /// Provider state parameters, defaults to an empty map
  #[serde(default)]
  pub params: HashMap<String, Value>
}

impl ProviderState {
  /// Creates a state with the given description and no parameters
  pub fn named(name: impl Into<String>) -> ProviderState {
    ProviderState { name: name.into(), params: HashMap::default() }
  }

  /// Constructs the list of provider states from an interaction's JSON.
  /// V3 documents use a `providerStates` list; earlier versions a single
  /// `providerState` string.
  pub fn from_interaction_json(interaction_json: &Value) -> Vec<ProviderState> {
    match interaction_json.get("providerStates") {
      Some(Value::Array(states)) => states.iter().map(|state| ProviderState {
        name: state.get("name").map(json_to_string).unwrap_or_default(),
        params: match state.get("params") {
          Some(Value::Object(params)) => params.iter()
            .map(|(k, v)| (k.clone(), v.clone())).collect(),
          _ => HashMap::default()
        }
      }).collect(),
      _ => match interaction_json.get("providerState")
        .or_else(|| interaction_json.get("provider_state")) {
        Some(Value::String(s)) if !s.is_empty() => vec![ProviderState::named(s)],
        _ => vec![]
      }
    }
  }

  /// Converts this provider state to its V3 JSON form
  pub fn to_json(&self) -> Value {
    if self.params.is_empty() {
      json!({ "name": self.name })
    } else {
      json!({
        "name": self.name,
        "params": Value::Object(self.params.iter()
          .fold(Map::new(), |mut map, (k, v)| {
            map.insert(k.clone(), v.clone());
            map
          }))
      })
    }
  }
}
