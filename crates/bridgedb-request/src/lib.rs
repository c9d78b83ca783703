//! bridgedb-request — turning client requests into bridge filters.
//!
//! Every distribution channel ends up with a small bag of words: the
//! plain-text body of an email, or the query parameters of an HTTPS/moat
//! request. This crate normalizes those words into a [`BridgeRequest`].
//!
//! # Architecture
//!
//! ```text
//! raw email ──► email::plaintext_body ──┐
//!                                       ├─► Tokens ──► parser::parse ──► BridgeRequest
//! query pairs ──► Tokens::from_query ───┘                                  └─ filters
//! ```
//!
//! The grammar is fixed and tiny: `get`, `help`/`halp`, `key`, `ipv6`,
//! `transport TYPE...`, `unblocked CC...`. Anything else ends the command.

pub mod email;
pub mod error;
pub mod parser;
pub mod request;
pub mod tokens;

pub use email::{parse_email, plaintext_body};
pub use error::{RequestError, RequestResult};
pub use parser::parse;
pub use request::{BridgeRequest, Filter};
pub use tokens::Tokens;
