//! `bridgedbd parse` — run the request parser over stdin.

use clap::ValueEnum;
use serde_json::{Value, json};

use bridgedb_core::TransportRegistry;
use bridgedb_request::{Tokens, parse, parse_email};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputChannel {
    /// A raw RFC 822 message.
    Email,
    /// A URL query string, e.g. `transport=obfs4&ipv6=yes`.
    Https,
}

/// Parse `input` and describe the outcome as JSON: the request on success,
/// `{"error": ...}` when the client asked for help or the key, or sent a
/// malformed command.
pub fn parse_input(channel: InputChannel, input: &str, supported: &TransportRegistry) -> Value {
    let result = match channel {
        InputChannel::Email => parse_email(input, supported),
        InputChannel::Https => {
            let tokens = Tokens::from_query(query_pairs(input));
            parse(tokens.as_slice(), supported)
        }
    };

    match result {
        Ok(request) => json!({ "request": request }),
        Err(e) => json!({ "error": e.to_string() }),
    }
}

/// Split `a=b&c=d` into pairs. A leading `?` and surrounding whitespace are
/// ignored; keys without `=` get an empty value.
fn query_pairs(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .trim()
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn registry() -> TransportRegistry {
        TransportRegistry::new(HashMap::from([("obfs4".to_string(), true)]))
    }

    #[test]
    fn query_string_request() {
        let out = parse_input(InputChannel::Https, "?transport=obfs4&ipv6=yes\n", &registry());
        assert_eq!(out["request"]["valid"], true);
        assert_eq!(out["request"]["ip_version"], 6);
        assert_eq!(out["request"]["transports"][0], "obfs4");
    }

    #[test]
    fn email_help() {
        let out = parse_input(InputChannel::Email, "Subject: hi\n\nhelp\n", &registry());
        assert_eq!(out["error"], "client requested help");
    }

    #[test]
    fn bad_query_transport() {
        let out = parse_input(InputChannel::Https, "transport=whack", &registry());
        assert_eq!(out["error"], "request does not specify a transport protocol");
    }

    #[test]
    fn query_pair_splitting() {
        let pairs: Vec<_> = query_pairs("a=1&&b&c=").collect();
        assert_eq!(pairs, [("a", "1"), ("b", ""), ("c", "")]);
    }
}
