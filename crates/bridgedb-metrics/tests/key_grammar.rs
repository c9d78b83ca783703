//! Every recorded key matches the published key grammar.

use std::collections::HashMap;

use regex::Regex;

use bridgedb_core::TransportRegistry;
use bridgedb_metrics::{MetricsRegistry, RequestEvent};
use bridgedb_request::{Tokens, parse};

fn channel_grammar() -> Regex {
    Regex::new(r"^[a-z0-9-]+\.[a-z0-9-]+\.[a-z0-9-]+\.(success|fail)\.[a-z0-9-]+$").unwrap()
}

fn internal_grammar() -> Regex {
    Regex::new(r"^internal\.[a-z0-9.-]+$").unwrap()
}

#[test]
fn recorded_keys_match_grammar() {
    let transports = TransportRegistry::new(HashMap::from([
        ("obfs4".to_string(), true),
        ("obfs3".to_string(), false),
    ]));
    let metrics = MetricsRegistry::new(transports.clone());

    let requests = [
        Tokens::from_body("get transport obfs4"),
        Tokens::from_body("get transport OBFS3 unblocked cn"),
        Tokens::from_body("get ipv6"),
        Tokens::from_query([("transport", "obfs4"), ("ipv6", "1")]),
    ];
    let senders = ["foo@gmail.com", "Foo Bar <foo@Riseup.NET>", "garbage", ""];
    let countries = [Some("DE"), Some("??"), None, Some("u s")];

    for ((tokens, sender), country) in requests.iter().zip(senders).zip(countries) {
        let request = parse(tokens.as_slice(), &transports).unwrap();
        metrics.https.record_valid(&RequestEvent::https(&request, country));
        metrics.moat.record_invalid(&RequestEvent::moat(&request, country).with_extra("Tor Exit"));
        metrics.email.record_valid(&RequestEvent::email(&request, sender));
        metrics.internal.record_handouts_per_bridge(Some(&request), &["$ABCD", "1.2.3.4:443"]);
    }
    metrics.internal.record_bridges_in_hashring("Email", "Unallocated Ring", 12);
    metrics.internal.record_empty_email_response();
    metrics.rotate();

    let grammar = channel_grammar();
    let internal = internal_grammar();
    let lines = metrics.metric_lines();
    assert!(!lines.is_empty());

    for line in lines {
        let (key, value) = line.split_once(' ').unwrap();
        assert!(value.parse::<u64>().unwrap() > 0, "zero exported: {line}");
        if key.starts_with("internal.") {
            assert!(internal.is_match(key), "bad internal key: {key}");
        } else {
            assert!(grammar.is_match(key), "bad channel key: {key}");
        }
    }
}
