//! Hyper-based HTTP transport serving requests through the dispatcher

use std::collections::HashMap;

use hyper::{Body, Server};
use hyper::http::header::{HeaderName, HeaderValue};
use hyper::http::response::Builder as ResponseBuilder;
use hyper::service::{make_service_fn, service_fn};
use serde_json::json;
use tracing::{debug, error, info};

use pactman_models::bodies::OptionalBody;
use pactman_models::query_strings::parse_query_string;
use pactman_models::request::Request;

use crate::dispatcher::MockDispatcher;

#[derive(Debug, Clone)]
enum InteractionError {
  RequestHeaderEncodingError,
  RequestBodyError,
  ResponseHeaderEncodingError,
  ResponseBodyError
}

fn extract_query_string(uri: &hyper::Uri) -> Option<HashMap<String, Vec<String>>> {
  uri.path_and_query()
    .and_then(|path_and_query| path_and_query.query())
    .and_then(parse_query_string)
}

fn extract_headers(headers: &hyper::HeaderMap) -> Result<Option<HashMap<String, Vec<String>>>, InteractionError> {
  if headers.is_empty() {
    return Ok(None);
  }
  let mut map: HashMap<String, Vec<String>> = HashMap::new();
  for name in headers.keys() {
    let mut values = vec![];
    for value in headers.get_all(name) {
      let value = value.to_str()
        .map_err(|_| InteractionError::RequestHeaderEncodingError)?;
      values.push(value.to_string());
    }
    map.insert(name.as_str().into(), values);
  }
  Ok(Some(map))
}

async fn hyper_request_to_request(req: hyper::Request<Body>) -> Result<Request, InteractionError> {
  let method = req.method().to_string().to_uppercase();
  let path = req.uri().path().to_string();
  let query = extract_query_string(req.uri());
  let headers = extract_headers(req.headers())?;

  let body_bytes = hyper::body::to_bytes(req.into_body())
    .await
    .map_err(|_| InteractionError::RequestBodyError)?;
  let body = if body_bytes.is_empty() {
    OptionalBody::Empty
  } else {
    OptionalBody::Present(body_bytes, None)
  };

  Ok(Request { method, path, query, headers, body, .. Request::default() })
}

fn set_hyper_headers(
  builder: &mut ResponseBuilder,
  headers: &Option<HashMap<String, Vec<String>>>
) -> Result<(), InteractionError> {
  if let Some(header_map) = headers {
    let hyper_headers = builder.headers_mut().unwrap();
    for (name, values) in header_map {
      for value in values {
        hyper_headers.append(
          HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
            error!("Invalid header name '{}' ({})", name, err);
            InteractionError::ResponseHeaderEncodingError
          })?,
          value.parse::<HeaderValue>().map_err(|err| {
            error!("Invalid header value '{}': '{}' ({})", name, value, err);
            InteractionError::ResponseHeaderEncodingError
          })?
        );
      }
    }
  }
  Ok(())
}

async fn handle_request(
  req: hyper::Request<Body>,
  dispatcher: MockDispatcher
) -> Result<hyper::Response<Body>, InteractionError> {
  debug!("Creating request model from hyper request");
  let request = hyper_request_to_request(req).await?;
  info!("Received request {}", request);

  let match_result = dispatcher.dispatch(request.clone());
  let response = dispatcher.response_for(&match_result);

  if match_result.matched() {
    info!("Request matched, sending response {}", response);
    let mut builder = hyper::Response::builder()
      .status(response.status)
      .header(hyper::header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");
    set_hyper_headers(&mut builder, &response.headers)?;
    builder.body(match &response.body {
      OptionalBody::Present(bytes, _) => Body::from(bytes.clone()),
      _ => Body::empty()
    }).map_err(|_| InteractionError::ResponseBodyError)
  } else {
    let error_body = json!({
      "error": format!("{}: {}", match_result.match_key(), match_result.description())
    });
    hyper::Response::builder()
      .status(500)
      .header(hyper::header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
      .header(hyper::header::CONTENT_TYPE, "application/json; charset=utf-8")
      .header("X-Pact", match_result.match_key())
      .body(Body::from(error_body.to_string()))
      .map_err(|_| InteractionError::ResponseBodyError)
  }
}

fn handle_request_error(
  result: Result<hyper::Response<Body>, InteractionError>
) -> Result<hyper::Response<Body>, hyper::Error> {
  match result {
    Ok(response) => Ok(response),
    Err(error) => {
      let response = match error {
        InteractionError::RequestHeaderEncodingError => hyper::Response::builder()
          .status(400)
          .body(Body::from("Found an invalid header encoding")),
        InteractionError::RequestBodyError => hyper::Response::builder()
          .status(500)
          .body(Body::from("Could not process request body")),
        InteractionError::ResponseBodyError => hyper::Response::builder()
          .status(500)
          .body(Body::from("Could not process response body")),
        InteractionError::ResponseHeaderEncodingError => hyper::Response::builder()
          .status(500)
          .body(Body::from("Could not set response header"))
      };
      Ok(response.unwrap())
    }
  }
}

// Create and bind the server, returning the future that drives it. The
// function is async because try_bind needs a tokio context.
pub(crate) async fn create_and_bind(
  dispatcher: MockDispatcher,
  addr: std::net::SocketAddr,
  shutdown: impl std::future::Future<Output = ()>
) -> Result<(impl std::future::Future<Output = ()>, std::net::SocketAddr), hyper::Error> {
  let server = Server::try_bind(&addr)?
    .serve(make_service_fn(move |_| {
      let dispatcher = dispatcher.clone();
      async {
        Ok::<_, hyper::Error>(service_fn(move |req| {
          let dispatcher = dispatcher.clone();
          async {
            handle_request_error(handle_request(req, dispatcher).await)
          }
        }))
      }
    }));

  let socket_addr = server.local_addr();

  Ok((
    async {
      let _ = server.with_graceful_shutdown(shutdown).await;
    },
    socket_addr
  ))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn can_start_and_shut_down_the_server() {
    let (shutdown_tx, shutdown_rx) = futures::channel::oneshot::channel();
    let dispatcher = MockDispatcher::new();

    let (future, addr) = create_and_bind(
      dispatcher.clone(),
      ([127, 0, 0, 1], 0_u16).into(),
      async { shutdown_rx.await.ok(); }
    ).await.unwrap();
    let join_handle = tokio::task::spawn(future);

    assert!(addr.port() > 0);

    shutdown_tx.send(()).unwrap();
    join_handle.await.unwrap();
    assert!(dispatcher.received_requests().is_empty());
  }
}
