//! Bridge request command parser.
//!
//! A single left-to-right pass over the tokens. `transport` and `unblocked`
//! take one or more arguments; each consumes the run of following tokens
//! that fit its argument shape. The first token that is not a command ends
//! the request.

use tracing::debug;

use bridgedb_core::{TransportRegistry, is_known_transport};

use crate::error::{RequestError, RequestResult};
use crate::request::{BridgeRequest, is_country_code};

/// Parse request tokens into a [`BridgeRequest`] with its filters generated.
///
/// `help`/`halp` and `key` end parsing immediately with the matching error.
/// A request without `get` still parses, but [`BridgeRequest::is_valid`] is
/// false and the caller is expected to reject it.
pub fn parse<S: AsRef<str>>(
    tokens: &[S],
    supported: &TransportRegistry,
) -> RequestResult<BridgeRequest> {
    let mut request = BridgeRequest::new();
    let mut cursor = 0;

    while cursor < tokens.len() {
        let token = tokens[cursor].as_ref().trim().to_lowercase();
        cursor += 1;

        match token.as_str() {
            "get" => request.set_valid(true),
            "help" | "halp" => return Err(RequestError::RequestedHelp),
            "key" => {
                request.set_wants_key(true);
                return Err(RequestError::RequestedKey);
            }
            "ipv6" => request.with_ipv6(),
            "transport" => {
                let (args, next) = scan_while(tokens, cursor, is_known_transport);
                if args.is_empty() {
                    return Err(RequestError::NoTransportSpecified);
                }
                for transport in args {
                    request.add_transport(transport)?;
                }
                cursor = next;
            }
            "unblocked" => {
                let (args, next) = scan_while(tokens, cursor, is_country_code);
                if args.is_empty() {
                    return Err(RequestError::NoCountryCode);
                }
                for country in args {
                    request.add_not_blocked_in(country)?;
                }
                cursor = next;
            }
            _ => {
                debug!(%token, position = cursor - 1, "end of request commands");
                break;
            }
        }
    }

    debug!("generating hashring filters for request");
    request.generate_filters(supported);
    Ok(request)
}

/// Consume tokens from `start` while `accept` holds.
///
/// Returns the accepted run and the index of the first token not consumed.
fn scan_while<'a, S, F>(tokens: &'a [S], start: usize, accept: F) -> (Vec<&'a str>, usize)
where
    S: AsRef<str>,
    F: Fn(&str) -> bool,
{
    let run: Vec<&str> = tokens
        .get(start..)
        .unwrap_or_default()
        .iter()
        .map(|t| t.as_ref().trim())
        .take_while(|t| accept(t))
        .collect();
    let next = start + run.len();
    (run, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridgedb_core::IpVersion;
    use std::collections::HashMap;

    fn registry() -> TransportRegistry {
        TransportRegistry::new(HashMap::from([
            ("obfs3".to_string(), true),
            ("obfs4".to_string(), true),
            ("scramblesuit".to_string(), true),
        ]))
    }

    fn run(tokens: &[&str]) -> RequestResult<BridgeRequest> {
        parse(tokens, &registry())
    }

    #[test]
    fn get_is_valid() {
        let request = run(&["get"]).unwrap();
        assert!(request.is_valid());
        assert_eq!(request.ip_version(), IpVersion::V4);
        assert_eq!(request.filters().len(), 1);
    }

    #[test]
    fn empty_stream_is_not_valid() {
        let request = run(&[]).unwrap();
        assert!(!request.is_valid());
    }

    #[test]
    fn get_ipv6() {
        let request = run(&["get", "ipv6"]).unwrap();
        assert!(request.is_valid());
        assert_eq!(request.ip_version(), IpVersion::V6);
    }

    #[test]
    fn transport_without_get() {
        let request = run(&["transport", "obfs3"]).unwrap();
        assert_eq!(request.transports(), ["obfs3"]);
        assert!(!request.is_valid());
    }

    #[test]
    fn help_and_halp() {
        assert_eq!(run(&["get", "help"]), Err(RequestError::RequestedHelp));
        assert_eq!(run(&["halp"]), Err(RequestError::RequestedHelp));
        assert_eq!(
            run(&["get", "transport", "obfs4", "help"]),
            Err(RequestError::RequestedHelp)
        );
    }

    #[test]
    fn help_after_terminator_is_ignored() {
        let request = run(&["get", "bridges", "help"]).unwrap();
        assert!(request.is_valid());
    }

    #[test]
    fn key_request() {
        assert_eq!(run(&["get", "key"]), Err(RequestError::RequestedKey));
    }

    #[test]
    fn invalid_transport_argument() {
        assert_eq!(
            run(&["transport", "whack"]),
            Err(RequestError::NoTransportSpecified)
        );
    }

    #[test]
    fn dangling_transport() {
        assert_eq!(
            run(&["get", "transport"]),
            Err(RequestError::NoTransportSpecified)
        );
    }

    #[test]
    fn dangling_unblocked() {
        assert_eq!(run(&["get", "unblocked"]), Err(RequestError::NoCountryCode));
        assert_eq!(
            run(&["get", "unblocked", "china"]),
            Err(RequestError::NoCountryCode)
        );
    }

    #[test]
    fn transport_run_stops_at_non_transport() {
        let request = run(&["transport", "obfs3", "ipv6", "vanilla", "bridges"]).unwrap();
        assert!(!request.is_valid());
        assert!(!request.wants_key());
        assert_eq!(request.ip_version(), IpVersion::V6);
        assert_eq!(request.transports(), ["obfs3"]);
    }

    #[test]
    fn multiple_transports_and_countries() {
        let request = run(&[
            "get",
            "transport",
            "obfs3",
            "SCRAMBLESUIT",
            "unblocked",
            "ca",
            "ir",
            "get",
        ])
        .unwrap();
        assert!(request.is_valid());
        assert_eq!(request.transports(), ["obfs3", "scramblesuit"]);
        assert_eq!(request.not_blocked_in(), ["ca", "ir"]);
        assert_eq!(request.filters().len(), 2);
    }

    #[test]
    fn scan_while_reports_next_cursor() {
        let tokens = ["transport", "obfs3", "obfs4", "get"];
        let (run, next) = scan_while(&tokens, 1, is_known_transport);
        assert_eq!(run, ["obfs3", "obfs4"]);
        assert_eq!(next, 3);

        let (run, next) = scan_while(&tokens, 4, is_known_transport);
        assert!(run.is_empty());
        assert_eq!(next, 4);
    }
}
