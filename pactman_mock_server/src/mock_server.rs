//! The external interface for controlling one instance of a mock server

use std::net::SocketAddr;
use std::thread::JoinHandle;

use tracing::{debug, info};
use uuid::Uuid;

use pactman_models::interaction::Interaction;
use pactman_models::request::Request;

use crate::dispatcher::MockDispatcher;
use crate::hyper_server;
use crate::{MockServerError, MockTransport};

/// A mock server serving the registered interactions over real HTTP on an
/// ephemeral localhost port. The server runs on its own thread with a
/// single-threaded tokio runtime; the dispatcher state is shared with the
/// thread of the test through the dispatcher's mutex.
#[derive(Debug)]
pub struct MockServer {
  /// Unique ID for this mock server
  pub id: String,
  dispatcher: MockDispatcher,
  addr: Option<SocketAddr>,
  shutdown_tx: Option<futures::channel::oneshot::Sender<()>>,
  server_thread: Option<JoinHandle<()>>
}

impl MockServer {
  /// Creates a mock server around the given dispatcher. The server is not
  /// started until `start` is called.
  pub fn new(dispatcher: MockDispatcher) -> MockServer {
    MockServer {
      id: Uuid::new_v4().to_string(),
      dispatcher,
      addr: None,
      shutdown_tx: None,
      server_thread: None
    }
  }

  /// The dispatcher backing this server
  pub fn dispatcher(&self) -> &MockDispatcher {
    &self.dispatcher
  }

  /// The port the server is bound to, if it has been started
  pub fn port(&self) -> Option<u16> {
    self.addr.map(|addr| addr.port())
  }
}

impl MockTransport for MockServer {
  fn register(&self, interaction: Interaction) {
    self.dispatcher.register(interaction);
  }

  fn start(&mut self) -> Result<(), MockServerError> {
    if self.addr.is_some() {
      return Ok(());
    }
    let (shutdown_tx, shutdown_rx) = futures::channel::oneshot::channel();
    let (addr_tx, addr_rx) = std::sync::mpsc::channel();
    let dispatcher = self.dispatcher.clone();

    let server_thread = std::thread::Builder::new()
      .name(format!("mock-server-{}", self.id))
      .spawn(move || {
        match tokio::runtime::Builder::new_current_thread().enable_all().build() {
          Ok(runtime) => runtime.block_on(async move {
            match hyper_server::create_and_bind(
              dispatcher,
              ([127, 0, 0, 1], 0_u16).into(),
              async { shutdown_rx.await.ok(); }
            ).await {
              Ok((future, addr)) => {
                let _ = addr_tx.send(Ok(addr));
                future.await;
              },
              Err(err) => {
                let _ = addr_tx.send(Err(format!("Could not bind the mock server: {}", err)));
              }
            }
          }),
          Err(err) => {
            let _ = addr_tx.send(Err(format!("Could not start the tokio runtime: {}", err)));
          }
        }
      })
      .map_err(|err| MockServerError::TransportError(
        format!("Could not spawn the mock server thread: {}", err)))?;

    let addr = addr_rx.recv()
      .map_err(|_| MockServerError::TransportError(
        "The mock server thread terminated before reporting its address".to_string()))?
      .map_err(MockServerError::TransportError)?;

    info!("Mock server {} started on {}", self.id, addr);
    self.addr = Some(addr);
    self.shutdown_tx = Some(shutdown_tx);
    self.server_thread = Some(server_thread);
    Ok(())
  }

  fn stop(&mut self) -> Result<(), MockServerError> {
    if let Some(shutdown_tx) = self.shutdown_tx.take() {
      debug!("Shutting down mock server {}", self.id);
      shutdown_tx.send(())
        .map_err(|_| MockServerError::TransportError(
          "Problem sending the shutdown signal to the mock server".to_string()))?;
    }
    if let Some(server_thread) = self.server_thread.take() {
      server_thread.join()
        .map_err(|_| MockServerError::TransportError(
          "The mock server thread panicked".to_string()))?;
    }
    self.addr = None;
    Ok(())
  }

  fn base_url(&self) -> String {
    match self.addr {
      Some(addr) => format!("http://127.0.0.1:{}", addr.port()),
      None => "http://127.0.0.1:0".to_string()
    }
  }

  fn received_requests(&self) -> Vec<Request> {
    self.dispatcher.received_requests()
  }

  fn verify(&self) -> Result<(), Vec<MockServerError>> {
    self.dispatcher.verify()
  }
}

impl Drop for MockServer {
  fn drop(&mut self) {
    let _ = self.stop();
  }
}

/// A transport with no network at all: the test hands requests straight to
/// the dispatcher. This is the default transport, as it keeps the whole
/// exchange on the thread of the test.
#[derive(Debug, Default)]
pub struct InProcessTransport {
  dispatcher: MockDispatcher
}

impl InProcessTransport {
  /// Creates an in-process transport around the given dispatcher
  pub fn new(dispatcher: MockDispatcher) -> InProcessTransport {
    InProcessTransport { dispatcher }
  }

  /// Dispatches a request directly, returning the matched response (or the
  /// 500 response for an unmatched request)
  pub fn dispatch(&self, request: Request) -> pactman_models::response::Response {
    let result = self.dispatcher.dispatch(request);
    self.dispatcher.response_for(&result)
  }
}

impl MockTransport for InProcessTransport {
  fn register(&self, interaction: Interaction) {
    self.dispatcher.register(interaction);
  }

  fn start(&mut self) -> Result<(), MockServerError> {
    Ok(())
  }

  fn stop(&mut self) -> Result<(), MockServerError> {
    Ok(())
  }

  fn base_url(&self) -> String {
    "http://localhost".to_string()
  }

  fn received_requests(&self) -> Vec<Request> {
    self.dispatcher.received_requests()
  }

  fn verify(&self) -> Result<(), Vec<MockServerError>> {
    self.dispatcher.verify()
  }
}

#[cfg(test)]
mod tests {
  use expectest::prelude::*;
  use maplit::hashmap;

  use pactman_models::bodies::OptionalBody;
  use pactman_models::interaction::Interaction;
  use pactman_models::request::Request;
  use pactman_models::response::Response;

  use super::*;

  fn test_interaction() -> Interaction {
    Interaction {
      description: "a request for a greeting".to_string(),
      request: Request { path: "/greeting".to_string(), .. Request::default() },
      response: Response {
        status: 200,
        headers: Some(hashmap!{ "Content-Type".to_string() => vec!["text/plain".to_string()] }),
        body: OptionalBody::from("hello"),
        .. Response::default()
      },
      .. Interaction::default()
    }
  }

  #[test]
  fn serves_the_registered_interaction_over_http() {
    let mut server = MockServer::new(MockDispatcher::new());
    server.register(test_interaction());
    server.start().unwrap();

    let response = reqwest::blocking::get(format!("{}/greeting", server.base_url())).unwrap();
    expect!(response.status().as_u16()).to(be_equal_to(200));
    expect!(response.text().unwrap()).to(be_equal_to("hello"));

    expect!(server.verify()).to(be_ok());
    server.stop().unwrap();
  }

  #[test]
  fn answers_unknown_requests_with_a_500() {
    let mut server = MockServer::new(MockDispatcher::new());
    server.register(test_interaction());
    server.start().unwrap();

    let response = reqwest::blocking::get(format!("{}/other", server.base_url())).unwrap();
    expect!(response.status().as_u16()).to(be_equal_to(500));

    let errors = server.verify().unwrap_err();
    // the stray request and the unused interaction are both reported
    expect!(errors.len()).to(be_equal_to(2));
    server.stop().unwrap();
  }

  #[test]
  fn the_in_process_transport_needs_no_network() {
    let transport = InProcessTransport::default();
    transport.register(test_interaction());

    let response = transport.dispatch(
      Request { path: "/greeting".to_string(), .. Request::default() });
    expect!(response.status).to(be_equal_to(200));
    expect!(transport.verify()).to(be_ok());
  }
}
