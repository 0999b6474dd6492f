//! The `pactman_consumer` crate provides tools for writing consumer pact
//! tests. It implements the consumer side of the Pact specification (V1.1,
//! V2 and V3): a builder DSL for declaring interactions, matcher sentinels
//! that relax the comparison the provider verification later applies, a
//! mock that answers the declared interactions, and the pact file writer.
//!
//! ## Writing a consumer test
//!
//! ```no_run
//! use pactman_consumer::prelude::*;
//!
//! let mut builder = PactBuilder::new("quotes client", "quotes service");
//! builder.interaction("add a new quote to the database", |i| {
//!   i.request
//!     .post()
//!     .path("/quotes")
//!     .json_utf8()
//!     .json_body(json_pattern!({
//!       // Allow the client to send any string as a quote. When testing
//!       // the provider, use "Eureka!".
//!       "quote": like!("Eureka!"),
//!       "by": like!("Archimedes"),
//!       "tags": each_like!("greek"),
//!     }));
//!   i.response
//!     .created()
//!     // Return "/quotes/12" to the client. When testing the provider,
//!     // allow it to return any numeric ID.
//!     .header("Location", term!("^/quotes/[0-9]+$", "/quotes/12"));
//! });
//!
//! // Start the mock server and point the client at it.
//! let server = builder.start_mock_server();
//! let client = reqwest::blocking::Client::new();
//! client.post(server.path("/quotes"))
//!   .header("Content-Type", "application/json; charset=utf-8")
//!   .body(r#"{"quote": "Quality!", "by": "Phil", "tags": ["software"]}"#)
//!   .send()
//!   .expect("could not reach the mock server");
//!
//! // Verification happens here: every declared interaction must have been
//! // exercised, and the pact file is written.
//! server.verify().expect("the pact was not honoured");
//! ```
//!
//! The same pact is used to test both sides: the mock accepts any request
//! matching the patterns, and the provider verification later accepts any
//! response matching them.

#![warn(missing_docs)]

pub mod builders;
pub mod compiler;
#[macro_use]
pub mod patterns;
pub mod session;

// The pattern macros expand to serde_json values, so re-export the crate
// they refer to through `$crate`
#[doc(hidden)]
pub use serde_json;

/// A default list of imports for consumer tests: the builders, the pattern
/// types and the matcher macros.
pub mod prelude {
  pub use crate::{each_like, equals, includes, json_pattern, like, term};
  pub use crate::builders::{InteractionBuilder, PactBuilder, RequestBuilder, ResponseBuilder};
  pub use crate::compiler::PatternError;
  pub use crate::patterns::{JsonPattern, Matcher};
  pub use crate::session::MockSession;
  pub use pactman_models::pact::WriteMode;
  pub use pactman_models::PactSpecification;
}
