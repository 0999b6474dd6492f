//! The `pactman_mock_server` crate provides the mock server side of consumer
//! contract tests: a dispatcher that holds the interactions registered for
//! the current test, matches incoming requests against them with single-use
//! semantics, and a hyper-based HTTP transport that serves requests through
//! the dispatcher.
//!
//! The dispatcher can be driven without any network at all through
//! [`MockDispatcher::dispatch`], which is what the in-process transport
//! does; the [`MockServer`] starts a real HTTP server on an ephemeral
//! localhost port for clients that insist on real sockets.

#![warn(missing_docs)]

use thiserror::Error;

use pactman_models::interaction::Interaction;
use pactman_models::request::Request;

mod dispatcher;
mod hyper_server;
pub mod matching;
mod mock_server;

pub use dispatcher::MockDispatcher;
pub use matching::MatchResult;
pub use mock_server::{InProcessTransport, MockServer};

/// Errors raised by a mock session at teardown or startup
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MockServerError {
  /// An actual request did not match any registered interaction
  #[error("Request did not match any registered interaction: {0}")]
  MockMismatch(String),
  /// A registered interaction was never consumed
  #[error("Interaction '{0}' was registered but never received")]
  InteractionUnused(String),
  /// The mock transport could not be started or stopped
  #[error("Mock server transport error: {0}")]
  TransportError(String)
}

/// The interface the mock dispatcher needs from a network backend: register
/// expected calls, receive actual calls, and drain the results.
pub trait MockTransport {
  /// Registers an expected interaction with the transport
  fn register(&self, interaction: Interaction);

  /// Starts the transport. After this call `base_url` must return the
  /// address consumer code should send its requests to.
  fn start(&mut self) -> Result<(), MockServerError>;

  /// Stops the transport, releasing any resources it holds. Stopping an
  /// already stopped transport is a no-op.
  fn stop(&mut self) -> Result<(), MockServerError>;

  /// The base URL requests should be sent to
  fn base_url(&self) -> String;

  /// All the requests received so far
  fn received_requests(&self) -> Vec<Request>;

  /// Verifies that every registered interaction was consumed and no
  /// failures were recorded, returning the composite list of errors
  /// otherwise
  fn verify(&self) -> Result<(), Vec<MockServerError>>;
}
