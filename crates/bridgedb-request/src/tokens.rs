//! Request token stream.
//!
//! A [`Tokens`] value is the normalized, lowercase word sequence that the
//! parser consumes. It is built once per request and can be iterated any
//! number of times.

/// Ordered, lowercase request tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens(Vec<String>);

impl Tokens {
    /// Split a decoded request body on whitespace.
    pub fn from_body(body: &str) -> Self {
        Self(body.split_whitespace().map(str::to_lowercase).collect())
    }

    /// Build the equivalent command stream from HTTPS/moat query parameters.
    ///
    /// An HTTP bridge request is a `get` by construction, so the stream
    /// always starts with one. Recognized keys are `transport`, `unblocked`
    /// and `ipv6`; anything else is ignored.
    pub fn from_query<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut tokens = vec!["get".to_string()];
        for (key, value) in pairs {
            let value = value.trim().to_lowercase();
            match key.trim().to_lowercase().as_str() {
                "transport" | "unblocked" if !value.is_empty() => {
                    tokens.push(key.trim().to_lowercase());
                    tokens.push(value);
                }
                "ipv6" if is_truthy(&value) => tokens.push("ipv6".to_string()),
                _ => {}
            }
        }
        Self(tokens)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Tokens {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(|s| s.as_ref().to_lowercase()).collect())
    }
}

impl AsRef<[String]> for Tokens {
    fn as_ref(&self) -> &[String] {
        &self.0
    }
}

fn is_truthy(value: &str) -> bool {
    !matches!(value, "" | "0" | "false" | "no" | "off")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_is_split_and_lowercased() {
        let tokens = Tokens::from_body("  GET transport\tObfs3\n\nunblocked CA ");
        assert_eq!(
            tokens.as_slice(),
            ["get", "transport", "obfs3", "unblocked", "ca"]
        );
    }

    #[test]
    fn empty_body() {
        assert!(Tokens::from_body(" \n\t").is_empty());
    }

    #[test]
    fn iteration_is_restartable() {
        let tokens = Tokens::from_body("get ipv6");
        let first: Vec<_> = tokens.iter().collect();
        let second: Vec<_> = tokens.iter().collect();
        assert_eq!(first, second);
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn query_pairs_map_to_commands() {
        let tokens = Tokens::from_query([
            ("transport", "OBFS4"),
            ("ipv6", "yes"),
            ("unblocked", "cn"),
            ("captcha_response_field", "abc"),
        ]);
        assert_eq!(
            tokens.as_slice(),
            ["get", "transport", "obfs4", "ipv6", "unblocked", "cn"]
        );
    }

    #[test]
    fn falsy_ipv6_and_empty_values_dropped() {
        let tokens = Tokens::from_query([("ipv6", "false"), ("transport", "")]);
        assert_eq!(tokens.as_slice(), ["get"]);
    }

    #[test]
    fn collect_lowercases() {
        let tokens: Tokens = ["Get", "IPV6"].into_iter().collect();
        assert_eq!(tokens.as_slice(), ["get", "ipv6"]);
    }
}
