//! Trait for the shared parts of requests and responses

use std::collections::HashMap;

use crate::bodies::OptionalBody;
use crate::content_types::{ContentType, detect_content_type};
use crate::json_utils::find_header;
use crate::matchingrules::MatchingRules;

/// Trait to specify an HTTP part of an interaction. It provides common
/// access to the headers, body and matching rules of a request or response.
pub trait HttpPart {
  /// The headers of the part
  fn headers(&self) -> &Option<HashMap<String, Vec<String>>>;

  /// The body of the part
  fn body(&self) -> &OptionalBody;

  /// The matching rules of the part
  fn matching_rules(&self) -> &MatchingRules;

  /// Determines the content type: an explicit content type on the body wins,
  /// then the content-type header, then inspection of the body itself
  fn content_type(&self) -> Option<ContentType> {
    self.body().content_type()
      .or_else(|| find_header(self.headers(), "content-type")
        .and_then(|values| values.first().cloned())
        .and_then(|value| ContentType::parse(&value).ok()))
      .or_else(|| detect_content_type(&self.body().value()))
  }
}
