//! Module for handling content types

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::anyhow;
use mime::Mime;
use serde::{Deserialize, Serialize};

/// Content type of a body, wrapping a parsed MIME type
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct ContentType {
  /// The original content type string
  pub content_type: String
}

impl ContentType {
  /// Parses a string into a `ContentType`
  pub fn parse(content_type: &str) -> anyhow::Result<ContentType> {
    let mime: Mime = content_type.parse()
      .map_err(|err| anyhow!("Failed to parse '{}' as a content type: {}", content_type, err))?;
    Ok(ContentType { content_type: mime.to_string() })
  }

  /// The JSON content type
  pub fn json() -> ContentType {
    ContentType { content_type: "application/json".into() }
  }

  /// The plain-text content type
  pub fn text() -> ContentType {
    ContentType { content_type: "text/plain".into() }
  }

  /// The base type without any parameters (e.g. `application/json` for
  /// `application/json;charset=utf-8`)
  pub fn base_type(&self) -> String {
    match self.content_type.split(';').next() {
      Some(base) => base.trim().to_lowercase(),
      None => self.content_type.to_lowercase()
    }
  }

  /// If this is a JSON content type (any `application/...json` variant)
  pub fn is_json(&self) -> bool {
    let base = self.base_type();
    base.starts_with("application/") && (base.ends_with("json") || base.ends_with("json-rpc"))
  }

  /// If this is a form-urlencoded content type
  pub fn is_form_urlencoded(&self) -> bool {
    self.base_type() == "application/x-www-form-urlencoded"
  }

  /// If this is a textual content type
  pub fn is_text(&self) -> bool {
    self.base_type().starts_with("text/") || self.is_json() || self.is_form_urlencoded()
  }

  /// If the content type could not be determined
  pub fn is_unknown(&self) -> bool {
    self.content_type.is_empty() || self.base_type() == "*/*"
  }
}

impl Default for ContentType {
  fn default() -> Self {
    ContentType { content_type: "*/*".into() }
  }
}

impl PartialEq for ContentType {
  fn eq(&self, other: &Self) -> bool {
    self.base_type() == other.base_type()
  }
}

impl std::hash::Hash for ContentType {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    self.base_type().hash(state);
  }
}

impl Display for ContentType {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    write!(f, "{}", self.content_type)
  }
}

impl FromStr for ContentType {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    ContentType::parse(s)
  }
}

impl TryFrom<String> for ContentType {
  type Error = anyhow::Error;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    ContentType::parse(&value)
  }
}

impl From<ContentType> for String {
  fn from(ct: ContentType) -> Self {
    ct.content_type
  }
}

/// Guesses the content type from the leading bytes of a body
pub fn detect_content_type(body: &[u8]) -> Option<ContentType> {
  let prefix: String = String::from_utf8_lossy(&body[..body.len().min(32)])
    .trim_start().chars().take(1).collect();
  match prefix.as_str() {
    "{" | "[" => Some(ContentType::json()),
    "" => None,
    _ => Some(ContentType::text())
  }
}
