//! The matcher DSL: sentinel values consumers embed in expected bodies.
//!
//! Matchers are data, not behaviour. The rule compiler walks a
//! [`JsonPattern`] tree, recognises the matcher tags, and produces a plain
//! example value plus the matching rules the mock and the verifier apply.

use std::collections::BTreeMap;

use serde_json::{json, Value};

/// A JSON value that may contain matcher sentinels anywhere inside it
#[derive(Debug, Clone, PartialEq)]
pub enum JsonPattern {
  /// A literal JSON value with no matchers inside
  Value(Value),
  /// An array of patterns
  Array(Vec<JsonPattern>),
  /// An object whose entry values are patterns
  Object(BTreeMap<String, JsonPattern>),
  /// A matcher sentinel
  Matcher(Box<Matcher>)
}

impl JsonPattern {
  /// The plain example value of this pattern, with every matcher replaced
  /// by its own sample
  pub fn sample_value(&self) -> Value {
    match self {
      JsonPattern::Value(value) => value.clone(),
      JsonPattern::Array(items) => Value::Array(
        items.iter().map(|item| item.sample_value()).collect()),
      JsonPattern::Object(entries) => Value::Object(
        entries.iter().map(|(key, value)| (key.clone(), value.sample_value())).collect()),
      JsonPattern::Matcher(matcher) => matcher.sample_value()
    }
  }

  /// If any matcher sentinel occurs anywhere in this pattern
  pub fn contains_matcher(&self) -> bool {
    match self {
      JsonPattern::Value(_) => false,
      JsonPattern::Array(items) => items.iter().any(|item| item.contains_matcher()),
      JsonPattern::Object(entries) => entries.values().any(|value| value.contains_matcher()),
      JsonPattern::Matcher(_) => true
    }
  }
}

/// A matcher sentinel, translated by the rule compiler into matching rules
/// plus an example value
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
  /// The actual value must have the same JSON type as the sample. For
  /// objects and arrays the comparison descends type-wise unless a more
  /// specific rule overrides it.
  Like(JsonPattern),
  /// The actual value must be an array with at least `min` elements, each
  /// of which matches the example as if wrapped in `Like`
  EachLike {
    /// Example element
    example: JsonPattern,
    /// Minimum number of elements
    min: usize
  },
  /// The actual value, rendered as a string, must fully match the regular
  /// expression; the mock returns the example
  Term {
    /// The regular expression to match with
    regex: String,
    /// The example value the mock generates
    example: String
  },
  /// The actual value must be deeply equal to the pattern's sample,
  /// regardless of any enclosing `Like`. The pattern must not contain
  /// further matchers.
  Equals(JsonPattern),
  /// The actual value, as a string, must contain the given string; the
  /// mock returns the example. Available from specification V3.
  Includes {
    /// The string the actual value must contain
    substring: String,
    /// The example value the mock generates
    example: String
  }
}

impl Matcher {
  /// A type matcher with the given sample
  pub fn like(example: impl Into<JsonPattern>) -> Matcher {
    Matcher::Like(example.into())
  }

  /// An array matcher with the given example element and minimum length
  pub fn each_like(example: impl Into<JsonPattern>, min: usize) -> Matcher {
    Matcher::EachLike { example: example.into(), min }
  }

  /// A regular expression matcher with the given example
  pub fn term(regex: impl Into<String>, example: impl Into<String>) -> Matcher {
    Matcher::Term { regex: regex.into(), example: example.into() }
  }

  /// An equality matcher for the given value
  pub fn equals(value: impl Into<JsonPattern>) -> Matcher {
    Matcher::Equals(value.into())
  }

  /// A substring matcher with the given example
  pub fn includes(substring: impl Into<String>, example: impl Into<String>) -> Matcher {
    Matcher::Includes { substring: substring.into(), example: example.into() }
  }

  /// The plain example value of this matcher, with nested matchers
  /// replaced by their own samples
  pub fn sample_value(&self) -> Value {
    match self {
      Matcher::Like(example) => example.sample_value(),
      Matcher::EachLike { example, min } => {
        let element = example.sample_value();
        Value::Array(std::iter::repeat(element).take((*min).max(1)).collect())
      },
      Matcher::Term { example, .. } => json!(example),
      Matcher::Equals(value) => value.sample_value(),
      Matcher::Includes { example, .. } => json!(example)
    }
  }
}

impl From<Value> for JsonPattern {
  fn from(value: Value) -> Self {
    JsonPattern::Value(value)
  }
}

impl From<Matcher> for JsonPattern {
  fn from(matcher: Matcher) -> Self {
    JsonPattern::Matcher(Box::new(matcher))
  }
}

impl From<&str> for JsonPattern {
  fn from(value: &str) -> Self {
    JsonPattern::Value(json!(value))
  }
}

impl From<String> for JsonPattern {
  fn from(value: String) -> Self {
    JsonPattern::Value(json!(value))
  }
}

macro_rules! impl_from_number_for_pattern {
  ($($from:ty),*) => {
    $(
      impl From<$from> for JsonPattern {
        fn from(value: $from) -> Self {
          JsonPattern::Value(json!(value))
        }
      }
    )*
  }
}

impl_from_number_for_pattern!(bool, i32, i64, u32, u64, f64);

impl From<Vec<JsonPattern>> for JsonPattern {
  fn from(items: Vec<JsonPattern>) -> Self {
    JsonPattern::Array(items)
  }
}

impl From<BTreeMap<String, JsonPattern>> for JsonPattern {
  fn from(entries: BTreeMap<String, JsonPattern>) -> Self {
    JsonPattern::Object(entries)
  }
}

/// Constructs a `JsonPattern` from JSON-like syntax. Matcher macros can be
/// embedded anywhere a value is expected:
///
/// ```
/// use pactman_consumer::prelude::*;
///
/// json_pattern!({
///   "id": like!(10),
///   "tags": each_like!("awesome"),
///   "created": term!("\\d{4}-\\d{2}-\\d{2}", "2024-05-17"),
/// });
/// ```
#[macro_export(local_inner_macros)]
macro_rules! json_pattern {
  ($($json:tt)+) => {
    json_pattern_internal!($($json)+)
  };
}

// The TT muncher below follows the implementation of `serde_json::json!`,
// adapted to build `JsonPattern` values so embedded matchers survive.
#[macro_export(local_inner_macros)]
#[doc(hidden)]
macro_rules! json_pattern_internal {
  // Array munching: the inside of [...].

  (@array [$($elems:expr,)*]) => {
    json_pattern_internal_vec![$($elems,)*]
  };

  (@array [$($elems:expr),*]) => {
    json_pattern_internal_vec![$($elems),*]
  };

  (@array [$($elems:expr,)*] null $($rest:tt)*) => {
    json_pattern_internal!(@array [$($elems,)* json_pattern_internal!(null)] $($rest)*)
  };

  (@array [$($elems:expr,)*] true $($rest:tt)*) => {
    json_pattern_internal!(@array [$($elems,)* json_pattern_internal!(true)] $($rest)*)
  };

  (@array [$($elems:expr,)*] false $($rest:tt)*) => {
    json_pattern_internal!(@array [$($elems,)* json_pattern_internal!(false)] $($rest)*)
  };

  (@array [$($elems:expr,)*] [$($array:tt)*] $($rest:tt)*) => {
    json_pattern_internal!(@array [$($elems,)* json_pattern_internal!([$($array)*])] $($rest)*)
  };

  (@array [$($elems:expr,)*] {$($map:tt)*} $($rest:tt)*) => {
    json_pattern_internal!(@array [$($elems,)* json_pattern_internal!({$($map)*})] $($rest)*)
  };

  (@array [$($elems:expr,)*] $next:expr, $($rest:tt)*) => {
    json_pattern_internal!(@array [$($elems,)* json_pattern_internal!($next),] $($rest)*)
  };

  (@array [$($elems:expr,)*] $last:expr) => {
    json_pattern_internal!(@array [$($elems,)* json_pattern_internal!($last)])
  };

  (@array [$($elems:expr),*] , $($rest:tt)*) => {
    json_pattern_internal!(@array [$($elems,)*] $($rest)*)
  };

  // Object munching: the inside of {...}.

  (@object $object:ident () () ()) => {};

  (@object $object:ident [$($key:tt)+] ($value:expr) , $($rest:tt)*) => {
    let _ = $object.insert(($($key)+).into(), $value);
    json_pattern_internal!(@object $object () ($($rest)*) ($($rest)*));
  };

  (@object $object:ident [$($key:tt)+] ($value:expr)) => {
    let _ = $object.insert(($($key)+).into(), $value);
  };

  (@object $object:ident ($($key:tt)+) (: null $($rest:tt)*) $copy:tt) => {
    json_pattern_internal!(@object $object [$($key)+] (json_pattern_internal!(null)) $($rest)*);
  };

  (@object $object:ident ($($key:tt)+) (: true $($rest:tt)*) $copy:tt) => {
    json_pattern_internal!(@object $object [$($key)+] (json_pattern_internal!(true)) $($rest)*);
  };

  (@object $object:ident ($($key:tt)+) (: false $($rest:tt)*) $copy:tt) => {
    json_pattern_internal!(@object $object [$($key)+] (json_pattern_internal!(false)) $($rest)*);
  };

  (@object $object:ident ($($key:tt)+) (: [$($array:tt)*] $($rest:tt)*) $copy:tt) => {
    json_pattern_internal!(@object $object [$($key)+] (json_pattern_internal!([$($array)*])) $($rest)*);
  };

  (@object $object:ident ($($key:tt)+) (: {$($map:tt)*} $($rest:tt)*) $copy:tt) => {
    json_pattern_internal!(@object $object [$($key)+] (json_pattern_internal!({$($map)*})) $($rest)*);
  };

  (@object $object:ident ($($key:tt)+) (: $value:expr , $($rest:tt)*) $copy:tt) => {
    json_pattern_internal!(@object $object [$($key)+] (json_pattern_internal!($value)) , $($rest)*);
  };

  (@object $object:ident ($($key:tt)+) (: $value:expr) $copy:tt) => {
    json_pattern_internal!(@object $object [$($key)+] (json_pattern_internal!($value)));
  };

  (@object $object:ident ($($key:tt)*) ($tt:tt $($rest:tt)*) $copy:tt) => {
    json_pattern_internal!(@object $object ($($key)* $tt) ($($rest)*) ($($rest)*));
  };

  // Main entry points.

  (null) => {
    $crate::patterns::JsonPattern::Value($crate::serde_json::Value::Null)
  };

  (true) => {
    $crate::patterns::JsonPattern::Value($crate::serde_json::Value::Bool(true))
  };

  (false) => {
    $crate::patterns::JsonPattern::Value($crate::serde_json::Value::Bool(false))
  };

  ([]) => {
    $crate::patterns::JsonPattern::Array(std::vec::Vec::new())
  };

  ([ $($tt:tt)+ ]) => {
    $crate::patterns::JsonPattern::Array(json_pattern_internal!(@array [] $($tt)+))
  };

  ({}) => {
    $crate::patterns::JsonPattern::Object(std::collections::BTreeMap::new())
  };

  ({ $($tt:tt)+ }) => {
    $crate::patterns::JsonPattern::Object({
      let mut object = std::collections::BTreeMap::<std::string::String, $crate::patterns::JsonPattern>::new();
      json_pattern_internal!(@object object () ($($tt)+) ($($tt)+));
      object
    })
  };

  ($other:expr) => {
    $crate::patterns::JsonPattern::from($other)
  };
}

#[macro_export]
#[doc(hidden)]
macro_rules! json_pattern_internal_vec {
  ($($content:tt)*) => {
    vec![$($content)*]
  };
}

/// Generates the given value, and matches any value of the same type. The
/// arguments are interpreted as a `json_pattern!`.
#[macro_export(local_inner_macros)]
macro_rules! like {
  ($($json_pattern:tt)+) => {
    $crate::patterns::Matcher::like(json_pattern!($($json_pattern)+))
  }
}

/// Matches an array in which every element is like the example. Use
/// `each_like!(pattern, min = n)` to require a minimum length other than 1.
#[macro_export(local_inner_macros)]
macro_rules! each_like {
  ($json_pattern:tt, min = $min:expr) => {
    $crate::patterns::Matcher::each_like(json_pattern!($json_pattern), $min)
  };
  ($($json_pattern:tt)+) => {
    $crate::patterns::Matcher::each_like(json_pattern!($($json_pattern)+), 1)
  };
}

/// Matches a string against the regular expression, and generates the given
/// example.
#[macro_export]
macro_rules! term {
  ($regex:expr, $example:expr) => {
    $crate::patterns::Matcher::term($regex, $example)
  }
}

/// Matches by deep equality, even inside an enclosing `like!`. The
/// arguments are interpreted as a `json_pattern!`, but must not contain
/// matchers.
#[macro_export(local_inner_macros)]
macro_rules! equals {
  ($($json_pattern:tt)+) => {
    $crate::patterns::Matcher::equals(json_pattern!($($json_pattern)+))
  }
}

/// Matches any string containing the given string, and generates the
/// example.
#[macro_export]
macro_rules! includes {
  ($substring:expr, $example:expr) => {
    $crate::patterns::Matcher::includes($substring, $example)
  }
}
