//! Command line arguments of the verifier

use clap::{Arg, ArgAction, command, Command};
use clap::builder::NonEmptyStringValueParser;

/// Validates a custom header in K:V form
fn header_value(v: &str) -> Result<(String, String), String> {
  let (name, value) = v.split_once(':')
    .ok_or_else(|| format!("'{}' is not a valid header, it must be in the form NAME:VALUE", v))?;
  if name.trim().is_empty() {
    return Err(format!("'{}' is not a valid header, the name part is empty", v));
  }
  Ok((name.trim().to_string(), value.trim().to_string()))
}

pub(crate) fn setup_app() -> Command {
  command!()
    .arg(Arg::new("provider-name")
      .required(true)
      .value_parser(NonEmptyStringValueParser::new())
      .help("Name of the provider being verified, as it appears in the pacts"))
    .arg(Arg::new("provider-url")
      .required(true)
      .value_parser(NonEmptyStringValueParser::new())
      .help("Base URL of the running provider to replay interactions against"))
    .arg(Arg::new("provider-setup-url")
      .required(true)
      .value_parser(NonEmptyStringValueParser::new())
      .help("URL provider states are posted to before each interaction"))
    .arg(Arg::new("broker-url")
      .short('b')
      .long("broker-url")
      .env("PACT_BROKER_URL")
      .action(ArgAction::Set)
      .value_parser(NonEmptyStringValueParser::new())
      .help("URL of the pact broker to fetch pacts from"))
    .arg(Arg::new("local-pact")
      .short('l')
      .long("local-pact")
      .action(ArgAction::Append)
      .value_parser(NonEmptyStringValueParser::new())
      .help("Local pact file to verify (can be repeated)"))
    .arg(Arg::new("custom-provider-header")
      .long("custom-provider-header")
      .action(ArgAction::Append)
      .value_parser(header_value)
      .help("Header to add to every request to the provider, in K:V form (can be repeated)"))
    .arg(Arg::new("consumer-name")
      .long("consumer-name")
      .action(ArgAction::Append)
      .value_parser(NonEmptyStringValueParser::new())
      .help("Only verify pacts for this consumer (can be repeated)"))
    .arg(Arg::new("publish-results")
      .long("publish-results")
      .action(ArgAction::SetTrue)
      .requires("broker-url")
      .requires("provider-version")
      .help("Publish the verification results back to the broker"))
    .arg(Arg::new("provider-version")
      .long("provider-version")
      .action(ArgAction::Set)
      .value_parser(NonEmptyStringValueParser::new())
      .help("The version of the provider, required when publishing results"))
    .arg(Arg::new("no-colour")
      .long("no-colour")
      .visible_alias("no-color")
      .action(ArgAction::SetTrue)
      .help("Disables ANSI escape codes in the output"))
    .arg(Arg::new("verbose")
      .short('v')
      .long("verbose")
      .action(ArgAction::Count)
      .help("Increases the log output (repeat for more)"))
}

#[cfg(test)]
mod tests {
  use expectest::prelude::*;

  use super::*;

  #[test]
  fn requires_the_three_positionals() {
    let result = setup_app().try_get_matches_from(["pactman-verifier", "provider"]);
    expect!(result).to(be_err());

    let result = setup_app().try_get_matches_from([
      "pactman-verifier", "provider", "http://localhost:8080", "http://localhost:8080/_setup",
      "--local-pact", "pact.json"
    ]);
    expect!(result).to(be_ok());
  }

  #[test]
  fn custom_headers_must_be_colon_separated() {
    expect!(header_value("X-Id: 42")).to(
      be_ok().value(("X-Id".to_string(), "42".to_string())));
    expect!(header_value("not-a-header")).to(be_err());
    expect!(header_value(": empty-name")).to(be_err());
  }

  #[test]
  fn publishing_requires_the_provider_version() {
    let result = setup_app().try_get_matches_from([
      "pactman-verifier", "provider", "http://localhost:8080", "http://localhost:8080/_setup",
      "--broker-url", "http://broker", "--publish-results"
    ]);
    expect!(result).to(be_err());

    let result = setup_app().try_get_matches_from([
      "pactman-verifier", "provider", "http://localhost:8080", "http://localhost:8080/_setup",
      "--broker-url", "http://broker", "--publish-results", "--provider-version", "1.2.3"
    ]);
    expect!(result).to(be_ok());
  }
}
