//! Support for the JSONPath subset used to address matching rules

use std::fmt::{Display, Formatter, Write};
use std::hash::{Hash, Hasher};

use anyhow::anyhow;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single token of a parsed path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathToken {
  /// Root token `$`
  Root,
  /// Named field token
  Field(String),
  /// Integer index token
  Index(usize),
  /// `*` token matching any field
  Star,
  /// `[*]` token matching any index
  StarIndex
}

/// Returns the weight a single token contributes when matched against a
/// concrete path fragment: 2 for a literal match, 1 for a wildcard, 0 for
/// a miss.
fn token_weight(fragment: &str, token: &PathToken) -> usize {
  match token {
    PathToken::Root if fragment == "$" => 2,
    PathToken::Field(name) if fragment == name => 2,
    PathToken::Index(index) => match fragment.parse::<usize>() {
      Ok(i) if *index == i => 2,
      _ => 0
    },
    PathToken::StarIndex => match fragment.parse::<usize>() {
      Ok(_) => 1,
      _ => 0
    },
    PathToken::Star => 1,
    _ => 0
  }
}

/// A parsed path expression addressing a value inside a document section
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct DocPath {
  tokens: Vec<PathToken>,
  expr: String
}

impl DocPath {
  /// Parses the given expression into a new path
  pub fn new(expr: impl Into<String>) -> anyhow::Result<Self> {
    let expr = expr.into();
    let tokens = parse_path_exp(&expr).map_err(|e| anyhow!(e))?;
    Ok(DocPath { tokens, expr })
  }

  /// Infallible construction for statically known expressions. Invalid
  /// expressions will panic.
  pub fn new_unwrap(expr: &str) -> Self {
    Self::new(expr).unwrap()
  }

  /// An empty path with no tokens
  pub fn empty() -> Self {
    DocPath { tokens: vec![], expr: String::default() }
  }

  /// The root path `$`
  pub fn root() -> Self {
    DocPath { tokens: vec![PathToken::Root], expr: "$".into() }
  }

  /// The parsed tokens of this path
  pub fn tokens(&self) -> &[PathToken] {
    &self.tokens
  }

  /// Length in parsed tokens
  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  /// If this path has no tokens
  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  /// If this path is just the root token
  pub fn is_root(&self) -> bool {
    self.tokens == [PathToken::Root]
  }

  /// If this path ends in a field wildcard
  pub fn is_wildcard(&self) -> bool {
    self.tokens.last() == Some(&PathToken::Star)
  }

  /// The first named field of the path, used for header and query lookups
  pub fn first_field(&self) -> Option<&str> {
    self.tokens.iter().find_map(|t| match t {
      PathToken::Field(name) => Some(name.as_str()),
      _ => None
    })
  }

  /// Calculates the weight of this path against a concrete path, as the
  /// product of the per-token weights. Returns the weight and the number
  /// of tokens consumed.
  pub fn path_weight(&self, path: &[&str]) -> (usize, usize) {
    if path.len() < self.len() {
      return (0, self.len());
    }
    let weight = self.tokens.iter().zip(path.iter())
      .fold(1, |acc, (token, fragment)| acc * token_weight(fragment, token));
    (weight, self.len())
  }

  /// If this expression applies to the given concrete path (weight > 0)
  pub fn matches_path(&self, path: &[&str]) -> bool {
    self.path_weight(path).0 > 0
  }

  /// If this expression applies to the given path and both have the same
  /// number of tokens
  pub fn matches_path_exactly(&self, path: &[&str]) -> bool {
    self.len() == path.len() && self.matches_path(path)
  }

  /// Clones this path with the field appended
  pub fn join(&self, field: impl Into<String>) -> Self {
    let mut path = self.clone();
    path.push_field(field);
    path
  }

  /// Pushes a named field onto the end of this path
  pub fn push_field(&mut self, field: impl Into<String>) -> &mut Self {
    let field = field.into();
    write_obj_key(&mut self.expr, &field);
    self.tokens.push(PathToken::Field(field));
    self
  }

  /// Pushes an array index onto the end of this path
  pub fn push_index(&mut self, index: usize) -> &mut Self {
    write!(self.expr, "[{}]", index).unwrap();
    self.tokens.push(PathToken::Index(index));
    self
  }

  /// Pushes an any-index wildcard onto the end of this path
  pub fn push_star_index(&mut self) -> &mut Self {
    self.expr.push_str("[*]");
    self.tokens.push(PathToken::StarIndex);
    self
  }
}

lazy_static! {
  // Only plain identifiers can use the dot syntax
  static ref IDENT: Regex = Regex::new(r"^[_A-Za-z][_A-Za-z0-9]*$").unwrap();
}

fn write_obj_key(out: &mut String, key: &str) {
  if IDENT.is_match(key) {
    write!(out, ".{}", key).unwrap();
  } else {
    write!(out, "['{}']", key.replace('\\', r"\\").replace('\'', r"\'")).unwrap();
  }
}

impl From<DocPath> for String {
  fn from(path: DocPath) -> String {
    path.expr
  }
}

impl From<&DocPath> for String {
  fn from(path: &DocPath) -> String {
    path.expr.clone()
  }
}

impl TryFrom<String> for DocPath {
  type Error = anyhow::Error;

  fn try_from(path: String) -> Result<Self, Self::Error> {
    DocPath::new(path)
  }
}

impl PartialEq for DocPath {
  fn eq(&self, other: &Self) -> bool {
    self.expr == other.expr
  }
}

impl Hash for DocPath {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.expr.hash(state);
  }
}

impl Display for DocPath {
  fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
    write!(f, "{}", self.expr)
  }
}

fn is_ident_char(ch: char) -> bool {
  ch.is_alphanumeric() || matches!(ch, '_' | '-' | ':' | '#' | '@')
}

struct Lexer<'a> {
  chars: std::iter::Peekable<std::iter::Enumerate<std::str::Chars<'a>>>,
  expr: &'a str
}

impl<'a> Lexer<'a> {
  fn new(expr: &'a str) -> Self {
    Lexer { chars: expr.chars().enumerate().peekable(), expr }
  }

  fn err(&self, index: usize, message: &str) -> String {
    format!("{} in path expression \"{}\" at index {}", message, self.expr, index)
  }

  // identifier after a "." separator, or a "*" wildcard
  fn dot_segment(&mut self, index: usize) -> Result<PathToken, String> {
    match self.chars.next() {
      Some((_, '*')) => Ok(PathToken::Star),
      Some((i, ch)) if is_ident_char(ch) => {
        let mut id = String::from(ch);
        while let Some((_, ch)) = self.chars.peek() {
          if is_ident_char(*ch) {
            id.push(*ch);
            self.chars.next();
          } else if matches!(*ch, '.' | '[') {
            break;
          } else {
            let msg = format!("\"{}\" is not allowed in an identifier", ch);
            return Err(self.err(i + id.len(), &msg));
          }
        }
        Ok(PathToken::Field(id))
      },
      Some((i, _)) => Err(self.err(i, "Expected either a \"*\" or path identifier")),
      None => Err(self.err(index, "Expected a path after \".\""))
    }
  }

  // quoted string, index or "*" inside brackets, consuming the closing "]"
  fn bracket_segment(&mut self, index: usize) -> Result<PathToken, String> {
    let token = match self.chars.peek().copied() {
      Some((i, '\'')) => {
        self.chars.next();
        let mut id = String::new();
        loop {
          match self.chars.next() {
            Some((_, '\'')) => break,
            Some((_, ch)) => id.push(ch),
            None => return Err(self.err(self.expr.len() - 1, "Unterminated string"))
          }
        }
        if id.is_empty() {
          return Err(self.err(i + 1, "Empty strings are not allowed"));
        }
        PathToken::Field(id)
      },
      Some((_, '*')) => {
        self.chars.next();
        PathToken::StarIndex
      },
      Some((i, ch)) if ch.is_ascii_digit() => {
        let mut digits = String::new();
        while let Some((_, ch)) = self.chars.peek() {
          if ch.is_ascii_digit() {
            digits.push(*ch);
            self.chars.next();
          } else {
            break;
          }
        }
        PathToken::Index(digits.parse().map_err(|_| self.err(i, "Invalid index"))?)
      },
      Some((i, ']')) => return Err(self.err(i, "Empty bracket expressions are not allowed")),
      Some((i, ch)) => {
        let msg = format!("Indexes can only consist of numbers or a \"*\", found \"{}\" instead", ch);
        return Err(self.err(i, &msg));
      },
      None => return Err(self.err(index, "Expected a \"'\" (single quote) or a digit"))
    };
    match self.chars.next() {
      Some((_, ']')) => Ok(token),
      Some((i, ch)) => {
        let msg = format!("Unterminated brackets, found \"{}\" instead of \"]\"", ch);
        Err(self.err(i, &msg))
      },
      None => Err(self.err(self.expr.len() - 1, "Unterminated brackets"))
    }
  }
}

/// Parses a path expression into its tokens. Expressions must start with the
/// root marker `$` (a bare leading identifier is tolerated and treated as if
/// it was rooted, which is how header and query rule keys are written).
pub fn parse_path_exp(expr: &str) -> Result<Vec<PathToken>, String> {
  let mut lexer = Lexer::new(expr);
  let mut tokens = vec![];
  match lexer.chars.next() {
    None => return Ok(tokens),
    Some((_, '$')) => tokens.push(PathToken::Root),
    Some((i, ch)) if is_ident_char(ch) => {
      tokens.push(PathToken::Root);
      // rewind not possible, so feed the first char back through the lexer
      let mut id = String::from(ch);
      while let Some((_, ch)) = lexer.chars.peek() {
        if is_ident_char(*ch) {
          id.push(*ch);
          lexer.chars.next();
        } else if matches!(*ch, '.' | '[') {
          break;
        } else {
          let msg = format!("\"{}\" is not allowed in an identifier", ch);
          return Err(lexer.err(i + id.len(), &msg));
        }
      }
      tokens.push(PathToken::Field(id));
    },
    Some((i, _)) => return Err(lexer.err(i, "Path expression does not start with a root marker \"$\""))
  }
  while let Some((i, ch)) = lexer.chars.next() {
    match ch {
      '.' => tokens.push(lexer.dot_segment(i)?),
      '[' => tokens.push(lexer.bracket_segment(i)?),
      _ => {
        let msg = format!("Expected a \".\" or \"[\" instead of \"{}\"", ch);
        return Err(lexer.err(i, &msg));
      }
    }
  }
  Ok(tokens)
}

#[cfg(test)]
mod tests {
  use expectest::prelude::*;

  use super::*;

  #[test]
  fn parses_the_root_and_empty_expressions() {
    expect!(parse_path_exp("")).to(be_ok().value(vec![]));
    expect!(parse_path_exp("$")).to(be_ok().value(vec![PathToken::Root]));
  }

  #[test]
  fn parses_dot_segments() {
    expect!(parse_path_exp("$.a.b")).to(be_ok().value(vec![
      PathToken::Root, PathToken::Field("a".into()), PathToken::Field("b".into())]));
    expect!(parse_path_exp("$.user_id.user-id")).to(be_ok().value(vec![
      PathToken::Root, PathToken::Field("user_id".into()), PathToken::Field("user-id".into())]));
    expect!(parse_path_exp("$.*")).to(be_ok().value(vec![PathToken::Root, PathToken::Star]));
  }

  #[test]
  fn parses_bracket_segments() {
    expect!(parse_path_exp("$['val@1.']")).to(be_ok().value(vec![
      PathToken::Root, PathToken::Field("val@1.".into())]));
    expect!(parse_path_exp("$.a[1].c")).to(be_ok().value(vec![
      PathToken::Root, PathToken::Field("a".into()), PathToken::Index(1), PathToken::Field("c".into())]));
    expect!(parse_path_exp("$.a[*]")).to(be_ok().value(vec![
      PathToken::Root, PathToken::Field("a".into()), PathToken::StarIndex]));
  }

  #[test]
  fn tolerates_a_bare_leading_identifier() {
    expect!(parse_path_exp("Content-Type")).to(be_ok().value(vec![
      PathToken::Root, PathToken::Field("Content-Type".into())]));
  }

  #[test]
  fn rejects_malformed_expressions() {
    expect!(parse_path_exp("$.")).to(be_err());
    expect!(parse_path_exp("$.a!")).to(be_err());
    expect!(parse_path_exp("$[")).to(be_err());
    expect!(parse_path_exp("$[]")).to(be_err());
    expect!(parse_path_exp("$['")).to(be_err());
    expect!(parse_path_exp("$[-1]")).to(be_err());
    expect!(parse_path_exp("$['a'b")).to(be_err());
    expect!(parse_path_exp("%$.a")).to(be_err());
  }

  #[test]
  fn weights_rank_literal_over_wildcard() {
    expect!(DocPath::new_unwrap("$.a").path_weight(&["$", "a"]).0).to(be_equal_to(4));
    expect!(DocPath::new_unwrap("$.*").path_weight(&["$", "a"]).0).to(be_equal_to(2));
    expect!(DocPath::new_unwrap("$[0]").path_weight(&["$", "0"]).0).to(be_equal_to(4));
    expect!(DocPath::new_unwrap("$[*]").path_weight(&["$", "0"]).0).to(be_equal_to(2));
    expect!(DocPath::new_unwrap("$[*]").path_weight(&["$", "a"]).0).to(be_equal_to(0));
    expect!(DocPath::new_unwrap("$.b").path_weight(&["$", "a"]).0).to(be_equal_to(0));
  }

  #[test]
  fn an_ancestor_rule_applies_to_longer_paths() {
    expect!(DocPath::new_unwrap("$.a").matches_path(&["$", "a", "b"])).to(be_true());
    expect!(DocPath::new_unwrap("$.a.b").matches_path(&["$", "a"])).to(be_false());
    expect!(DocPath::new_unwrap("$.a").matches_path_exactly(&["$", "a", "b"])).to(be_false());
  }

  #[test]
  fn join_quotes_awkward_keys() {
    let path = DocPath::root().join("a").join("b c");
    expect!(path.to_string()).to(be_equal_to("$.a['b c']"));
  }
}
