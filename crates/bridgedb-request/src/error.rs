//! Error types for request parsing.

use thiserror::Error;

/// Result type alias for request parsing.
pub type RequestResult<T> = Result<T, RequestError>;

/// Outcomes that end parsing early.
///
/// None of these are faults: each one tells the caller which canned reply
/// to send instead of bridges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("client requested help")]
    RequestedHelp,

    #[error("client requested our GnuPG key")]
    RequestedKey,

    #[error("request does not specify a transport protocol")]
    NoTransportSpecified,

    #[error("request does not specify a country code")]
    NoCountryCode,
}
