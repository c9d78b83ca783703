//! Plain-text command extraction from raw email messages.
//!
//! Only as much MIME as a bridge request needs: unfold headers, find the
//! `boundary` of a `multipart/*` message, and pick the first `text/plain`
//! part. Transfer encodings are not decoded; command words are ASCII.

use tracing::debug;

use bridgedb_core::TransportRegistry;

use crate::error::RequestResult;
use crate::parser::parse;
use crate::request::BridgeRequest;
use crate::tokens::Tokens;

/// Parse the commands in a raw email message.
pub fn parse_email(raw: &str, supported: &TransportRegistry) -> RequestResult<BridgeRequest> {
    let body = plaintext_body(raw);
    let tokens = Tokens::from_body(&body);
    debug!(tokens = tokens.len(), "tokenized email body");
    parse(tokens.as_slice(), supported)
}

/// Deepest `multipart/*` nesting that is descended into.
const MAX_NESTING: usize = 8;

/// Return the plain-text body of a message.
///
/// Input without a header block is treated as a bare body. Messages nested
/// deeper than [`MAX_NESTING`] multipart levels yield an empty body.
pub fn plaintext_body(raw: &str) -> String {
    let raw = raw.replace("\r\n", "\n");
    let mut message = raw.as_str();

    for _ in 0..=MAX_NESTING {
        let (headers, body) = split_message(message);

        let content_type = header(&headers, "content-type").unwrap_or("text/plain");
        if !is_multipart(content_type) {
            return body.to_string();
        }
        let Some(boundary) = content_type_param(content_type, "boundary") else {
            return body.to_string();
        };

        let parts = split_parts(body, boundary);
        let chosen = parts
            .iter()
            .copied()
            .find(|part| {
                let (headers, _) = split_message(part);
                let ty = header(&headers, "content-type").unwrap_or("text/plain");
                is_plain(ty) || is_multipart(ty)
            })
            .or(parts.first().copied());

        match chosen {
            Some(part) => message = part,
            None => return String::new(),
        }
    }

    debug!(max = MAX_NESTING, "multipart nesting too deep, ignoring body");
    String::new()
}

type Headers = Vec<(String, String)>;

/// Split a message into unfolded headers and body.
fn split_message(raw: &str) -> (Headers, &str) {
    if !raw.lines().next().is_some_and(looks_like_header) {
        return (Vec::new(), raw.strip_prefix('\n').unwrap_or(raw));
    }

    let (head, body) = match raw.find("\n\n") {
        Some(i) => (&raw[..i], &raw[i + 2..]),
        None => (raw, ""),
    };

    let mut headers: Headers = Vec::new();
    for line in head.lines() {
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }
    (headers, body)
}

fn looks_like_header(line: &str) -> bool {
    match line.split_once(':') {
        Some((name, _)) => !name.is_empty() && !name.contains(char::is_whitespace),
        None => false,
    }
}

fn header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

fn is_multipart(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("multipart/")
}

fn is_plain(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("text/plain")
}

fn content_type_param<'a>(content_type: &'a str, name: &str) -> Option<&'a str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().trim_matches('"'))
    })
}

/// Split a multipart body on its boundary lines. Preamble and epilogue are
/// dropped; an unterminated last part is kept. The line break before a
/// boundary belongs to the boundary.
fn split_parts<'a>(body: &'a str, boundary: &str) -> Vec<&'a str> {
    let delimiter = format!("--{boundary}");
    let closing = format!("{delimiter}--");

    let mut parts = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        let trimmed = line.trim_end();
        if trimmed != delimiter && trimmed != closing {
            continue;
        }
        if let Some(start) = start.take() {
            let end = line_start.saturating_sub(1).max(start);
            parts.push(&body[start..end]);
        }
        if trimmed == closing {
            return parts;
        }
        start = Some(offset);
    }
    if let Some(start) = start {
        parts.push(body[start..].strip_suffix('\n').unwrap_or(&body[start..]));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_body() {
        assert_eq!(plaintext_body("get transport obfs4\n"), "get transport obfs4\n");
    }

    #[test]
    fn simple_message() {
        let raw = "From: foo@gmail.com\r\nSubject: hi\r\n\r\nget ipv6\r\n";
        assert_eq!(plaintext_body(raw), "get ipv6\n");
    }

    #[test]
    fn folded_headers() {
        let raw = "Content-Type: multipart/alternative;\n\tboundary=\"xyz\"\n\n--xyz\n\nget\n--xyz--\n";
        assert_eq!(plaintext_body(raw).trim(), "get");
    }

    #[test]
    fn picks_text_plain_part() {
        let raw = "\
MIME-Version: 1.0
Content-Type: multipart/alternative; boundary=\"b1\"

preamble
--b1
Content-Type: text/html; charset=\"UTF-8\"

<div>get transport obfs3</div>
--b1
Content-Type: text/plain; charset=\"UTF-8\"

get transport obfs4
--b1--
epilogue
";
        assert_eq!(plaintext_body(raw).trim(), "get transport obfs4");
    }

    #[test]
    fn nested_multipart() {
        let raw = "\
Content-Type: multipart/mixed; boundary=outer

--outer
Content-Type: multipart/alternative; boundary=inner

--inner
Content-Type: text/plain

get ipv6
--inner--
--outer--
";
        assert_eq!(plaintext_body(raw).trim(), "get ipv6");
    }

    /// `depth` multipart levels wrapped around a plain-text command.
    fn nested(depth: usize) -> String {
        let mut raw = String::new();
        for level in 0..depth {
            raw.push_str(&format!(
                "Content-Type: multipart/mixed; boundary=b{level}\r\n\r\n--b{level}\r\n"
            ));
        }
        raw.push_str("Content-Type: text/plain\r\n\r\nget ipv6\r\n");
        for level in (0..depth).rev() {
            raw.push_str(&format!("--b{level}--\r\n"));
        }
        raw
    }

    #[test]
    fn nesting_up_to_the_limit_is_followed() {
        assert_eq!(plaintext_body(&nested(MAX_NESTING)).trim(), "get ipv6");
    }

    #[test]
    fn nesting_past_the_limit_yields_empty_body() {
        assert_eq!(plaintext_body(&nested(MAX_NESTING + 1)), "");
    }

    #[test]
    fn deeply_nested_message_is_cut_off() {
        let raw = nested(20_000);
        assert!(raw.len() > 1_000_000);
        assert_eq!(plaintext_body(&raw), "");

        let request = parse_email(&raw, &TransportRegistry::default()).unwrap();
        assert_eq!(request.ip_version(), bridgedb_core::IpVersion::V4);
    }

    #[test]
    fn parts_borrow_without_boundary_newline() {
        let parts = split_parts("pre\n--x\na\nb\n--x\n--x\nc\n--x--\nepi\n", "x");
        assert_eq!(parts, vec!["a\nb", "", "c"]);
    }

    #[test]
    fn multipart_without_boundary_returns_body() {
        let raw = "Content-Type: multipart/mixed\n\nget\n";
        assert_eq!(plaintext_body(raw), "get\n");
    }
}
