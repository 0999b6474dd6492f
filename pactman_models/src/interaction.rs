//! Models for request/response interactions

use std::fmt::{Display, Formatter};

use serde_json::{json, Value};

use crate::json_utils::json_to_string;
use crate::PactSpecification;
use crate::provider_states::ProviderState;
use crate::request::Request;
use crate::response::Response;

/// A single request/response pair with a human description and optional
/// provider states. Once registered with a mock session or loaded for
/// verification the interaction is treated as immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
  /// Interaction ID, set when the interaction was fetched from a broker
  pub id: Option<String>,
  /// Description of this interaction. This needs to be unique in the pact.
  pub description: String,
  /// Ordered provider states for the interaction
  pub provider_states: Vec<ProviderState>,
  /// Request of the interaction
  pub request: Request,
  /// Response of the interaction
  pub response: Response,
  /// The specification version this interaction was authored against
  pub spec_version: PactSpecification
}

impl Interaction {
  /// Constructs an `Interaction` from its `Value` form
  pub fn from_json(index: usize, interaction_json: &Value, spec_version: PactSpecification
  ) -> anyhow::Result<Interaction> {
    let id = interaction_json.get("_id").map(json_to_string);
    let description = match interaction_json.get("description") {
      Some(v) => json_to_string(v),
      None => format!("Interaction {}", index)
    };
    let provider_states = ProviderState::from_interaction_json(interaction_json);
    let request = match interaction_json.get("request") {
      Some(v) => Request::from_json(v, spec_version)?,
      None => Request::default()
    };
    let response = match interaction_json.get("response") {
      Some(v) => Response::from_json(v, spec_version)?,
      None => Response::default()
    };
    Ok(Interaction {
      id,
      description,
      provider_states,
      request,
      response,
      spec_version
    })
  }

  /// Converts this interaction to its `Value` form for the given spec
  /// version. V3 documents carry the full `providerStates` list; earlier
  /// versions only the name of the first state.
  pub fn to_json(&self, spec_version: PactSpecification) -> Value {
    let mut value = json!({
      "description": Value::String(self.description.clone()),
      "request": self.request.to_json(spec_version),
      "response": self.response.to_json(spec_version)
    });
    if !self.provider_states.is_empty() {
      let map = value.as_object_mut().unwrap();
      match spec_version {
        PactSpecification::V3 => map.insert("providerStates".to_string(),
          Value::Array(self.provider_states.iter().map(|p| p.to_json()).collect())),
        _ => map.insert("providerState".to_string(),
          Value::String(self.provider_states.first().unwrap().name.clone()))
      };
    }
    value
  }
}

impl Default for Interaction {
  fn default() -> Self {
    Interaction {
      id: None,
      description: "Interaction".to_string(),
      provider_states: vec![],
      request: Request::default(),
      response: Response::default(),
      spec_version: PactSpecification::default()
    }
  }
}

impl Display for Interaction {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    write!(f, "Interaction ( description: \"{}\", provider states: {:?} )",
      self.description, self.provider_states.iter().map(|p| p.name.clone()).collect::<Vec<String>>())
  }
}

#[cfg(test)]
mod tests {
  use expectest::prelude::*;
  use serde_json::json;

  use super::*;

  #[test]
  fn from_json_defaults_the_description() {
    let interaction = Interaction::from_json(3, &json!({}), PactSpecification::V3).unwrap();
    expect!(interaction.description).to(be_equal_to("Interaction 3"));
  }

  #[test]
  fn provider_states_serialise_per_spec_version() {
    let interaction = Interaction {
      description: "a request".to_string(),
      provider_states: vec![
        ProviderState::named("user exists"),
        ProviderState::named("user is admin")
      ],
      .. Interaction::default()
    };

    let v3 = interaction.to_json(PactSpecification::V3);
    expect!(v3.get("providerStates").unwrap().as_array().unwrap().len()).to(be_equal_to(2));

    let v2 = interaction.to_json(PactSpecification::V2);
    expect!(v2.get("providerState")).to(be_some().value(&json!("user exists")));
    expect!(v2.get("providerStates")).to(be_none());
  }
}
