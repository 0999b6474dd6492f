//! The `pactman_models` crate provides the core models for dealing with Pact
//! documents: specification versions, requests and responses, interactions,
//! matching rules and the pact files that aggregate them. It supports the
//! V1.1, V2 and V3 formats of the Pact specification.

#![warn(missing_docs)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::json_utils::json_to_string;

pub mod bodies;
pub mod content_types;
pub mod file_utils;
pub mod http_parts;
pub mod interaction;
pub mod json_utils;
pub mod matchingrules;
pub mod pact;
pub mod path_exp;
pub mod provider_states;
pub mod query_strings;
pub mod request;
pub mod response;

/// Version of the Pact specification a document or interaction conforms to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PactSpecification {
  /// Unknown or unsupported specification version
  Unknown,
  /// Version 1.1 of the Pact specification
  V1_1,
  /// Version 2 of the Pact specification
  V2,
  /// Version 3 of the Pact specification
  V3
}

impl PactSpecification {
  /// Returns the semantic version string of the specification
  pub fn version_str(&self) -> String {
    match self {
      PactSpecification::V1_1 => "1.1.0",
      PactSpecification::V2 => "2.0.0",
      PactSpecification::V3 => "3.0.0",
      _ => "unknown"
    }.into()
  }

  /// Parses a version string into a specification version. Unsupported
  /// versions map to `Unknown`.
  pub fn parse_version(input: &str) -> PactSpecification {
    match lenient_semver::parse(input) {
      Ok(ver) => match (ver.major, ver.minor) {
        (1, 1) => PactSpecification::V1_1,
        (2, _) => PactSpecification::V2,
        (3, _) => PactSpecification::V3,
        _ => PactSpecification::Unknown
      },
      Err(_) => PactSpecification::Unknown
    }
  }
}

impl Default for PactSpecification {
  fn default() -> Self {
    PactSpecification::V3
  }
}

impl Display for PactSpecification {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    match self {
      PactSpecification::V1_1 => write!(f, "V1.1"),
      PactSpecification::V2 => write!(f, "V2"),
      PactSpecification::V3 => write!(f, "V3"),
      _ => write!(f, "unknown")
    }
  }
}

/// Struct that defines the consumer of a pact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
  /// Each consumer should have a unique name to identify it
  pub name: String
}

impl Consumer {
  /// Builds a `Consumer` from the `Value` struct
  pub fn from_json(pact_json: &Value) -> Consumer {
    let name = match pact_json.get("name") {
      Some(v) => json_to_string(v),
      None => "consumer".to_string()
    };
    Consumer { name }
  }

  /// Converts this `Consumer` to a `Value` struct
  pub fn to_json(&self) -> Value {
    json!({ "name": self.name })
  }
}

/// Struct that defines a provider of a pact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
  /// Each provider should have a unique name to identify it
  pub name: String
}

impl Provider {
  /// Builds a `Provider` from the `Value` struct
  pub fn from_json(pact_json: &Value) -> Provider {
    let name = match pact_json.get("name") {
      Some(v) => json_to_string(v),
      None => "provider".to_string()
    };
    Provider { name }
  }

  /// Converts this `Provider` to a `Value` struct
  pub fn to_json(&self) -> Value {
    json!({ "name": self.name })
  }
}

/// Errors raised when reading or writing pact documents
#[derive(Error, Debug)]
pub enum PactFileError {
  /// Malformed JSON or a schema violation in a pact document
  #[error("Invalid pact JSON from {source_name}: {detail}")]
  PactFormatError {
    /// Where the document came from (file path, URL or "<json>")
    source_name: String,
    /// What was wrong with it
    detail: String
  },
  /// The interactions of a pact declare more than one specification version
  #[error("Can not write pact file: interactions declare mixed specification versions {versions:?}")]
  SpecVersionMismatch {
    /// The distinct versions that were found
    versions: Vec<String>
  }
}
