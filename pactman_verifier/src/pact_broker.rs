//! A client for fetching pacts from a pact broker and publishing
//! verification results back to it

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use pactman_models::json_utils::json_to_string;
use pactman_models::pact::Pact;

/// A network failure against the broker. Broker failures abort the whole
/// verification run.
#[derive(Error, Debug)]
#[error("Failed to communicate with the pact broker at {url}: {detail}")]
pub struct TransportError {
  /// The URL that failed
  pub url: String,
  /// What went wrong
  pub detail: String
}

/// Authentication scheme for the broker
#[derive(Debug, Clone)]
pub enum HttpAuth {
  /// Basic authentication with a username and optional password
  User(String, Option<String>),
  /// Bearer token authentication
  Token(String)
}

/// A reference to a pact fetched from a broker, carrying the links needed
/// to publish results for it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PactRef {
  /// Where the pact document was fetched from
  pub source: String,
  /// The link verification results are published to, when the broker
  /// advertises one
  pub publish_link: Option<String>
}

/// Trait for clients that can yield pact documents for a provider and
/// record verification outcomes
#[async_trait]
pub trait BrokerClient {
  /// Fetches the latest pacts for the provider, optionally restricted to
  /// the given consumer names
  async fn fetch_pacts(&self, provider: &str, consumers: &[String]
  ) -> Result<Vec<(Pact, PactRef)>, TransportError>;

  /// Publishes the verification outcome for a previously fetched pact
  async fn publish_result(&self, pact_ref: &PactRef, passed: bool, provider_version: &str
  ) -> Result<(), TransportError>;
}

/// A broker client speaking the broker's HAL-flavoured JSON API
pub struct HalBrokerClient {
  base_url: String,
  auth: Option<HttpAuth>,
  client: reqwest::Client
}

impl HalBrokerClient {
  /// Creates a client for the broker at the given base URL
  pub fn new(base_url: impl Into<String>, auth: Option<HttpAuth>) -> HalBrokerClient {
    HalBrokerClient {
      base_url: base_url.into().trim_end_matches('/').to_string(),
      auth,
      client: reqwest::Client::new()
    }
  }

  fn get(&self, url: &str) -> reqwest::RequestBuilder {
    self.with_auth(self.client.get(url))
  }

  fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match &self.auth {
      Some(HttpAuth::User(user, password)) => {
        let credentials = format!("{}:{}", user, password.clone().unwrap_or_default());
        builder.header("Authorization", format!("Basic {}",
          base64::engine::general_purpose::STANDARD.encode(credentials)))
      },
      Some(HttpAuth::Token(token)) =>
        builder.header("Authorization", format!("Bearer {}", token)),
      None => builder
    }
  }

  async fn fetch_json(&self, url: &str) -> Result<Value, TransportError> {
    debug!("Fetching {}", url);
    let response = self.get(url).send().await
      .map_err(|err| TransportError { url: url.to_string(), detail: err.to_string() })?;
    if !response.status().is_success() {
      return Err(TransportError {
        url: url.to_string(),
        detail: format!("request returned status {}", response.status())
      });
    }
    response.json().await
      .map_err(|err| TransportError { url: url.to_string(), detail: err.to_string() })
  }
}

// Returns the entries of a HAL link list, preferring the namespaced name
fn link_list<'a>(document: &'a Value, name: &str) -> Option<&'a Vec<Value>> {
  let links = document.get("_links")?;
  links.get(format!("pb:{}", name))
    .or_else(|| links.get(name))
    .and_then(|list| list.as_array())
}

fn link_href(document: &Value, name: &str) -> Option<String> {
  let links = document.get("_links")?;
  links.get(format!("pb:{}", name))
    .or_else(|| links.get(name))
    .and_then(|link| link.get("href"))
    .map(json_to_string)
}

#[async_trait]
impl BrokerClient for HalBrokerClient {
  async fn fetch_pacts(&self, provider: &str, consumers: &[String]
  ) -> Result<Vec<(Pact, PactRef)>, TransportError> {
    let index_url = format!("{}/pacts/provider/{}/latest", self.base_url, provider);
    let index = self.fetch_json(&index_url).await?;

    let links = link_list(&index, "pacts").ok_or_else(|| TransportError {
      url: index_url.clone(),
      detail: "the broker response has no pact links".to_string()
    })?;

    let mut pacts = vec![];
    for link in links {
      let name = link.get("name").or_else(|| link.get("title")).map(json_to_string);
      if !consumers.is_empty() {
        match &name {
          Some(name) if consumers.contains(name) => (),
          _ => {
            debug!("Skipping pact for consumer {:?}", name);
            continue;
          }
        }
      }
      let href = link.get("href").map(json_to_string).ok_or_else(|| TransportError {
        url: index_url.clone(),
        detail: "a pact link has no href".to_string()
      })?;
      let document = self.fetch_json(&href).await?;
      let pact = Pact::from_json(&href, &document).map_err(|err| TransportError {
        url: href.clone(),
        detail: err.to_string()
      })?;
      info!("Fetched pact for consumer '{}' from the broker", pact.consumer.name);
      pacts.push((pact, PactRef {
        source: href,
        publish_link: link_href(&document, "publish-verification-results")
      }));
    }
    Ok(pacts)
  }

  async fn publish_result(&self, pact_ref: &PactRef, passed: bool, provider_version: &str
  ) -> Result<(), TransportError> {
    let url = match &pact_ref.publish_link {
      Some(url) => url.clone(),
      None => {
        warn!("The broker did not advertise a publish link for {}, skipping", pact_ref.source);
        return Ok(());
      }
    };
    info!("Publishing verification result ({}) to {}",
      if passed { "passed" } else { "failed" }, url);
    let body = json!({
      "success": passed,
      "providerApplicationVersion": provider_version
    });
    let response = self.with_auth(self.client.post(&url).json(&body)).send().await
      .map_err(|err| TransportError { url: url.clone(), detail: err.to_string() })?;
    if response.status().is_success() {
      Ok(())
    } else {
      Err(TransportError {
        url,
        detail: format!("publishing returned status {}", response.status())
      })
    }
  }
}

#[cfg(test)]
mod tests {
  use expectest::prelude::*;
  use serde_json::json;

  use super::*;

  #[test]
  fn link_lookups_prefer_the_namespaced_name() {
    let document = json!({
      "_links": {
        "pb:publish-verification-results": { "href": "http://broker/publish" },
        "publish-verification-results": { "href": "http://broker/old-publish" }
      }
    });
    expect!(link_href(&document, "publish-verification-results")).to(
      be_some().value("http://broker/publish"));
  }

  #[test]
  fn link_lookups_fall_back_to_the_plain_name() {
    let document = json!({
      "_links": { "pacts": [ { "href": "http://broker/pact/1" } ] }
    });
    expect!(link_list(&document, "pacts").unwrap().len()).to(be_equal_to(1));
    expect!(link_href(&document, "missing")).to(be_none());
  }
}
