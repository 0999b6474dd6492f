//! Module for handling interaction content (bodies)

use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::content_types::ContentType;

/// Enum that defines the four states of a body on a request or response
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub enum OptionalBody {
  /// No body was declared. Matches any actual body.
  Missing,
  /// An empty body was declared
  Empty,
  /// A JSON null body was declared
  Null,
  /// A body is present, with an optional content type override
  Present(Bytes, Option<ContentType>)
}

impl OptionalBody {
  /// If the body is present and has at least one byte
  pub fn is_present(&self) -> bool {
    matches!(self, OptionalBody::Present(_, _))
  }

  /// Returns the body bytes, or an empty buffer for the other states
  pub fn value(&self) -> Bytes {
    match self {
      OptionalBody::Present(b, _) => b.clone(),
      _ => Bytes::default()
    }
  }

  /// Returns the body as a UTF-8 string for display purposes
  pub fn str_value(&self) -> String {
    match self {
      OptionalBody::Present(b, _) => String::from_utf8_lossy(b).to_string(),
      _ => String::default()
    }
  }

  /// The content type carried with the body, if any
  pub fn content_type(&self) -> Option<ContentType> {
    match self {
      OptionalBody::Present(_, ct) => ct.clone(),
      _ => None
    }
  }
}

impl From<&str> for OptionalBody {
  fn from(s: &str) -> Self {
    if s.is_empty() {
      OptionalBody::Empty
    } else {
      OptionalBody::Present(Bytes::from(s.to_string()), None)
    }
  }
}

impl From<String> for OptionalBody {
  fn from(s: String) -> Self {
    if s.is_empty() {
      OptionalBody::Empty
    } else {
      OptionalBody::Present(Bytes::from(s), None)
    }
  }
}

impl From<serde_json::Value> for OptionalBody {
  fn from(json: serde_json::Value) -> Self {
    match json {
      serde_json::Value::Null => OptionalBody::Null,
      _ => OptionalBody::Present(Bytes::from(json.to_string()), Some(ContentType::json()))
    }
  }
}

impl Hash for OptionalBody {
  fn hash<H: Hasher>(&self, state: &mut H) {
    match self {
      OptionalBody::Present(b, _) => {
        1_u8.hash(state);
        b.hash(state);
      },
      OptionalBody::Missing => 2_u8.hash(state),
      OptionalBody::Empty => 3_u8.hash(state),
      OptionalBody::Null => 4_u8.hash(state)
    }
  }
}

impl PartialEq for OptionalBody {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (OptionalBody::Present(b1, _), OptionalBody::Present(b2, _)) => b1 == b2,
      (s, o) => std::mem::discriminant(s) == std::mem::discriminant(o)
    }
  }
}

impl Display for OptionalBody {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    match self {
      OptionalBody::Missing => write!(f, "Missing"),
      OptionalBody::Empty => write!(f, "Empty"),
      OptionalBody::Null => write!(f, "Null"),
      OptionalBody::Present(b, ct) => match ct {
        Some(ct) => write!(f, "Present({} bytes, {})", b.len(), ct),
        None => write!(f, "Present({} bytes)", b.len())
      }
    }
  }
}

impl Default for OptionalBody {
  fn default() -> Self {
    OptionalBody::Missing
  }
}
