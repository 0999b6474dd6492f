//! The mock session: scoped ownership of the mock transport with verification
//! and pact writing guaranteed on teardown

use std::env;
use std::path::PathBuf;

use tracing::{debug, error, info};

use pactman_mock_server::{InProcessTransport, MockDispatcher, MockServer, MockServerError, MockTransport};
use pactman_models::pact::{Pact, write_pact, WriteMode};
use pactman_models::request::Request;
use pactman_models::response::Response;

enum Transport {
  InProcess(InProcessTransport),
  HttpServer(MockServer)
}

impl Transport {
  fn as_mock_transport(&self) -> &dyn MockTransport {
    match self {
      Transport::InProcess(transport) => transport,
      Transport::HttpServer(server) => server
    }
  }
}

/// A running mock session. The session owns the registered interactions for
/// one test: it hands out the declared responses while the test runs, then
/// verifies on teardown that every interaction was consumed, and writes the
/// pact file when it was.
///
/// Dropping an unverified session verifies it and panics on failure, so a
/// test can not silently pass while its expectations were never exercised.
pub struct MockSession {
  pact: Pact,
  dispatcher: MockDispatcher,
  transport: Transport,
  output_dir: Option<PathBuf>,
  write_mode: WriteMode,
  verified: bool
}

impl MockSession {
  /// Starts a session for the pact. The transport is in-process unless the
  /// `PACT_USE_MOCKING_SERVER` environment variable is set to `true`, in
  /// which case a real HTTP server is started.
  pub fn start(pact: Pact, output_dir: Option<PathBuf>, write_mode: WriteMode) -> MockSession {
    if env::var("PACT_USE_MOCKING_SERVER").map(|v| v == "true").unwrap_or(false) {
      Self::start_with_http_server(pact, output_dir, write_mode)
    } else {
      Self::new(pact, output_dir, write_mode, false)
    }
  }

  /// Starts a session backed by a real HTTP server on an ephemeral
  /// localhost port
  pub fn start_with_http_server(
    pact: Pact,
    output_dir: Option<PathBuf>,
    write_mode: WriteMode
  ) -> MockSession {
    Self::new(pact, output_dir, write_mode, true)
  }

  fn new(pact: Pact, output_dir: Option<PathBuf>, write_mode: WriteMode, http: bool) -> MockSession {
    let dispatcher = MockDispatcher::new();
    for interaction in &pact.interactions {
      dispatcher.register(interaction.clone());
    }
    let transport = if http {
      let mut server = MockServer::new(dispatcher.clone());
      if let Err(err) = server.start() {
        panic!("Could not start the mock server: {}", err);
      }
      Transport::HttpServer(server)
    } else {
      Transport::InProcess(InProcessTransport::new(dispatcher.clone()))
    };
    info!("Mock session started for {} interactions at {}",
      pact.interactions.len(), transport.as_mock_transport().base_url());
    MockSession {
      pact,
      dispatcher,
      transport,
      output_dir,
      write_mode,
      verified: false
    }
  }

  /// The base URL consumer code should send its requests to
  pub fn base_url(&self) -> String {
    self.transport.as_mock_transport().base_url()
  }

  /// Builds a URL to the given path on the mock server
  pub fn path(&self, path: &str) -> String {
    format!("{}{}", self.base_url(), path)
  }

  /// Dispatches a request directly, without the network. Returns the
  /// response of the matched interaction, or the 500 response recorded for
  /// an unmatched request.
  pub fn dispatch(&self, request: Request) -> Response {
    let result = self.dispatcher.dispatch(request);
    self.dispatcher.response_for(&result)
  }

  /// All the requests received so far
  pub fn received_requests(&self) -> Vec<Request> {
    self.transport.as_mock_transport().received_requests()
  }

  /// Verifies the session and tears the transport down. Succeeds when
  /// every registered interaction was consumed and no mismatched requests
  /// were recorded; the pact file is then written according to the write
  /// mode. The composite list of failures is returned otherwise.
  pub fn verify(mut self) -> Result<(), Vec<MockServerError>> {
    self.verify_inner()
  }

  fn verify_inner(&mut self) -> Result<(), Vec<MockServerError>> {
    self.verified = true;
    let result = self.dispatcher.verify();
    self.shutdown();
    match result {
      Ok(()) => {
        self.write_pact_file().map_err(|err| vec![err])?;
        Ok(())
      },
      Err(errors) => Err(errors)
    }
  }

  fn write_pact_file(&self) -> Result<(), MockServerError> {
    let dir = self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let path = dir.join(self.pact.default_file_name());
    debug!("Writing pact file to {:?}", path);
    write_pact(&self.pact, &path, self.write_mode)
      .map_err(|err| MockServerError::TransportError(
        format!("Failed to write the pact file: {}", err)))
  }

  fn shutdown(&mut self) {
    if let Transport::HttpServer(server) = &mut self.transport {
      if let Err(err) = server.stop() {
        error!("Failed to stop the mock server: {}", err);
      }
    }
  }
}

impl Drop for MockSession {
  fn drop(&mut self) {
    if !self.verified {
      let result = self.verify_inner();
      if !std::thread::panicking() {
        if let Err(errors) = result {
          let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
          panic!("Mock session verification failed:\n  - {}", messages.join("\n  - "));
        }
      }
    } else {
      self.shutdown();
    }
  }
}

#[cfg(test)]
mod tests {
  use expectest::prelude::*;

  use pactman_models::pact::WriteMode;
  use pactman_models::request::Request;

  use crate::builders::PactBuilder;
  use crate::json_pattern;

  fn builder() -> PactBuilder {
    let mut builder = PactBuilder::new("session-consumer", "session-provider");
    builder.interaction("a request for a greeting", |i| {
      i.request.get().path("/greeting");
      i.response.json_body(json_pattern!({ "message": "hello" }));
    });
    builder.with_write_mode(WriteMode::Never)
  }

  #[test]
  fn a_consumed_session_verifies_cleanly() {
    let session = builder().start_mock_session();
    let response = session.dispatch(
      Request { path: "/greeting".to_string(), .. Request::default() });
    expect!(response.status).to(be_equal_to(200));
    expect!(session.verify()).to(be_ok());
  }

  #[test]
  fn an_unused_interaction_fails_verification() {
    let session = builder().start_mock_session();
    let errors = session.verify().unwrap_err();
    expect!(errors.len()).to(be_equal_to(1));
  }

  #[test]
  #[should_panic(expected = "verification failed")]
  fn dropping_an_unverified_session_panics_on_unused_interactions() {
    let _session = builder().start_mock_session();
  }
}
