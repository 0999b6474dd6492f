//! The `pactman-verifier` binary: fetches pacts from files or a broker,
//! replays them against a running provider, and reports the outcome.
//!
//! Exits with 0 when every interaction passed (or was skipped), 1 on a
//! verification failure, and 2 on an operational error such as bad
//! arguments or an unreachable broker.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgMatches;
use tracing::error;
use tracing_subscriber::EnvFilter;

use pactman_verifier::{
  fetch_pacts,
  generate_summary,
  PactSource,
  ProviderInfo,
  PublishOptions,
  VerificationOptions,
  verify_provider
};
use pactman_verifier::callback_executors::HttpStateSetter;
use pactman_verifier::pact_broker::{BrokerClient, HalBrokerClient};

mod args;

fn setup_logging(verbosity: u8) {
  let filter = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace"
  };
  let env_filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(filter));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .try_init();
}

fn pact_sources(matches: &ArgMatches) -> Vec<PactSource> {
  let mut sources = vec![];
  if let Some(files) = matches.get_many::<String>("local-pact") {
    for file in files {
      sources.push(PactSource::File(PathBuf::from(file)));
    }
  }
  if let Some(url) = matches.get_one::<String>("broker-url") {
    sources.push(PactSource::Broker { url: url.clone(), auth: None });
  }
  sources
}

fn custom_headers(matches: &ArgMatches) -> HashMap<String, String> {
  let mut headers: HashMap<String, String> = matches
    .get_many::<(String, String)>("custom-provider-header")
    .map(|values| values.cloned().collect())
    .unwrap_or_default();
  if let Ok(value) = env::var("PROVIDER_EXTRA_HEADER") {
    if let Some((name, value)) = value.split_once(':') {
      headers.insert(name.trim().to_string(), value.trim().to_string());
    }
  }
  headers
}

async fn run(matches: &ArgMatches) -> ExitCode {
  let provider = ProviderInfo {
    name: matches.get_one::<String>("provider-name").cloned().unwrap_or_default(),
    base_url: matches.get_one::<String>("provider-url").cloned().unwrap_or_default()
  };
  let sources = pact_sources(matches);
  if sources.is_empty() {
    error!("No pacts to verify: give at least one --local-pact or a --broker-url");
    return ExitCode::from(2);
  }
  let consumers: Vec<String> = matches.get_many::<String>("consumer-name")
    .map(|values| values.cloned().collect())
    .unwrap_or_default();

  let pacts = match fetch_pacts(&sources, &provider.name, &consumers).await {
    Ok(pacts) if pacts.is_empty() => {
      error!("No pacts found for provider '{}'", provider.name);
      return ExitCode::from(2);
    },
    Ok(pacts) => pacts,
    Err(err) => {
      error!("Failed to load the pacts to verify: {}", err);
      return ExitCode::from(2);
    }
  };

  let options = VerificationOptions {
    custom_headers: custom_headers(matches),
    consumer_names: consumers,
    no_colour: matches.get_flag("no-colour"),
    .. VerificationOptions::default()
  };
  let state_setter = HttpStateSetter::new(
    matches.get_one::<String>("provider-setup-url").cloned().unwrap_or_default());

  let broker_client = matches.get_one::<String>("broker-url")
    .map(|url| HalBrokerClient::new(url.clone(), None));
  let publish_options = matches.get_one::<String>("provider-version")
    .map(|version| PublishOptions { provider_version: version.clone() });
  let publish = if matches.get_flag("publish-results") {
    match (&broker_client, &publish_options) {
      (Some(client), Some(options)) => Some((client as &dyn BrokerClient, options)),
      _ => None
    }
  } else {
    None
  };

  let result = match verify_provider(&provider, pacts, &state_setter, &options, publish).await {
    Ok(result) => result,
    Err(err) => {
      error!("Verification aborted: {}", err);
      return ExitCode::from(2);
    }
  };

  println!("{}", generate_summary(&result, !options.no_colour));
  if result.all_passed() && !result.cancelled {
    ExitCode::SUCCESS
  } else {
    ExitCode::from(1)
  }
}

fn main() -> ExitCode {
  let matches = args::setup_app().get_matches();
  setup_logging(*matches.get_one::<u8>("verbose").unwrap_or(&0));

  let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
    Ok(runtime) => runtime,
    Err(err) => {
      eprintln!("Could not start the tokio runtime: {}", err);
      return ExitCode::from(2);
    }
  };
  runtime.block_on(run(&matches))
}
