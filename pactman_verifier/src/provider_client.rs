//! The HTTP client used to replay interactions against the running provider

use std::collections::HashMap;

use anyhow::anyhow;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use itertools::Itertools;
use tracing::{debug, info, warn};

use pactman_models::bodies::OptionalBody;
use pactman_models::request::Request;
use pactman_models::response::Response;

/// Joins a base URL and a path, avoiding duplicate slashes
pub fn join_paths(base: &str, path: &str) -> String {
  if !path.is_empty() && path != "/" {
    let mut full_path = base.trim_end_matches('/').to_string();
    full_path.push('/');
    full_path.push_str(path.trim_start_matches('/'));
    full_path
  } else if !base.is_empty() && base != "/" {
    base.trim_end_matches('/').to_string()
  } else {
    "/".to_string()
  }
}

fn create_native_request(
  client: &reqwest::Client,
  base_url: &str,
  request: &Request,
  custom_headers: &HashMap<String, String>
) -> anyhow::Result<reqwest::RequestBuilder> {
  let url = join_paths(base_url, &request.path);
  let method = Method::from_bytes(request.method.as_bytes())
    .map_err(|err| anyhow!("'{}' is not a valid HTTP method: {}", request.method, err))?;
  let mut builder = client.request(method, &url);

  if let Some(query) = &request.query {
    builder = builder.query(&query.iter()
      .sorted_by(|a, b| Ord::cmp(&a.0, &b.0))
      .flat_map(|(name, values)| values.iter().map(|value| (name, value)).collect_vec())
      .collect_vec());
  }

  let mut header_map = HeaderMap::new();
  if let Some(headers) = &request.headers {
    for (name, values) in headers {
      for value in values {
        header_map.append(
          HeaderName::try_from(name)
            .map_err(|err| anyhow!("'{}' is not a valid header name: {}", name, err))?,
          HeaderValue::from_str(value)
            .map_err(|err| anyhow!("'{}' is not a valid header value: {}", value, err))?
        );
      }
    }
  }
  for (name, value) in custom_headers {
    header_map.insert(
      HeaderName::try_from(name)
        .map_err(|err| anyhow!("'{}' is not a valid header name: {}", name, err))?,
      HeaderValue::from_str(value)
        .map_err(|err| anyhow!("'{}' is not a valid header value: {}", value, err))?
    );
  }
  if !header_map.is_empty() {
    builder = builder.headers(header_map);
  }

  if let OptionalBody::Present(bytes, _) = &request.body {
    builder = builder.body(bytes.clone());
  }

  Ok(builder)
}

fn extract_headers(headers: &HeaderMap) -> Option<HashMap<String, Vec<String>>> {
  if headers.is_empty() {
    return None;
  }
  let map = headers.keys()
    .map(|name| {
      let values = headers.get_all(name).iter()
        .filter_map(|value| match value.to_str() {
          Ok(value) => Some(value),
          Err(err) => {
            warn!("Failed to parse HTTP header value: {}", err);
            None
          }
        })
        .flat_map(|value| value.split(',').map(|v| v.trim().to_string()))
        .collect();
      (name.as_str().to_string(), values)
    })
    .collect();
  Some(map)
}

async fn native_response_to_response(response: reqwest::Response) -> anyhow::Result<Response> {
  debug!("Received response: {:?}", response);
  let status = response.status().as_u16();
  let headers = extract_headers(response.headers());
  let body_bytes = response.bytes().await?;
  let body = if body_bytes.is_empty() {
    OptionalBody::Empty
  } else {
    OptionalBody::Present(body_bytes, None)
  };
  Ok(Response { status, headers, body, .. Response::default() })
}

/// Replays the interaction's request against the provider and returns the
/// observed response
pub async fn make_provider_request(
  base_url: &str,
  request: &Request,
  custom_headers: &HashMap<String, String>,
  client: &reqwest::Client
) -> anyhow::Result<Response> {
  info!("Sending request to provider at {}: {}", base_url, request);
  let native_request = create_native_request(client, base_url, request, custom_headers)?;
  let response = native_request.send().await
    .map_err(|err| anyhow!("Request to the provider failed: {}", err))?;
  let response = native_response_to_response(response).await?;
  info!("Received response: {}", response);
  Ok(response)
}
