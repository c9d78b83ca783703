//! The parsed bridge request and its hashring filters.

use serde::Serialize;
use tracing::{debug, info};

use bridgedb_core::{IpVersion, TransportRegistry, is_known_transport};

use crate::error::{RequestError, RequestResult};

/// A predicate handed to the hashring to select matching bridges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum Filter {
    /// Any bridge with an address of this family.
    ByIpVersion { ip_version: IpVersion },
    /// Bridges offering `transport` over this address family.
    ByTransport {
        transport: String,
        ip_version: IpVersion,
    },
    /// Bridges not known to be blocked in `country`.
    ByNotBlockedIn {
        country: String,
        transport: Option<String>,
        ip_version: IpVersion,
    },
}

/// A client's request for bridges, after parsing.
///
/// Created once per incoming request and only mutated while it is being
/// parsed. Transport names are lowercase and whitelisted; country codes are
/// lowercase and exactly two characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BridgeRequest {
    valid: bool,
    wants_key: bool,
    ip_version: IpVersion,
    transports: Vec<String>,
    not_blocked_in: Vec<String>,
    filters: Vec<Filter>,
}

impl BridgeRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a `get` command was seen.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    /// Whether the client asked for our GnuPG key.
    pub fn wants_key(&self) -> bool {
        self.wants_key
    }

    pub fn set_wants_key(&mut self, wants_key: bool) {
        self.wants_key = wants_key;
    }

    pub fn ip_version(&self) -> IpVersion {
        self.ip_version
    }

    pub fn with_ipv4(&mut self) {
        self.ip_version = IpVersion::V4;
    }

    pub fn with_ipv6(&mut self) {
        self.ip_version = IpVersion::V6;
        debug!("request wants IPv6 bridges");
    }

    pub fn transports(&self) -> &[String] {
        &self.transports
    }

    pub fn not_blocked_in(&self) -> &[String] {
        &self.not_blocked_in
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Append a requested pluggable transport.
    ///
    /// Fails with [`RequestError::NoTransportSpecified`] unless `transport`
    /// is on the whitelist; nothing is appended in that case.
    pub fn add_transport(&mut self, transport: &str) -> RequestResult<()> {
        if !is_known_transport(transport) {
            return Err(RequestError::NoTransportSpecified);
        }
        let transport = transport.to_ascii_lowercase();
        info!(%transport, "request wants transport");
        self.transports.push(transport);
        Ok(())
    }

    /// Append a country the client wants unblocked bridges for.
    ///
    /// Fails with [`RequestError::NoCountryCode`] unless `country` is
    /// exactly two characters.
    pub fn add_not_blocked_in(&mut self, country: &str) -> RequestResult<()> {
        if !is_country_code(country) {
            return Err(RequestError::NoCountryCode);
        }
        let country = country.to_lowercase();
        info!(%country, "request wants bridges not blocked in country");
        self.not_blocked_in.push(country);
        Ok(())
    }

    /// The transport filters are built for: the most recently requested one
    /// that is currently supported.
    pub fn just_one_transport(&self, supported: &TransportRegistry) -> Option<&str> {
        self.transports
            .iter()
            .rev()
            .map(String::as_str)
            .find(|t| supported.is_supported(t))
    }

    /// Rebuild [`filters`](Self::filters) from the parsed fields.
    ///
    /// One `ByNotBlockedIn` filter per country if any were requested;
    /// otherwise `ByTransport` for a supported transport; otherwise
    /// `ByIpVersion`. Unsupported transports are skipped.
    pub fn generate_filters(&mut self, supported: &TransportRegistry) {
        for t in self.transports.iter().filter(|t| !supported.is_supported(t)) {
            info!(transport = %t, "requested transport is not supported; ignoring");
        }

        let transport = self.just_one_transport(supported).map(str::to_string);
        let ip_version = self.ip_version;

        self.filters = if !self.not_blocked_in.is_empty() {
            self.not_blocked_in
                .iter()
                .map(|country| Filter::ByNotBlockedIn {
                    country: country.clone(),
                    transport: transport.clone(),
                    ip_version,
                })
                .collect()
        } else if let Some(transport) = transport {
            vec![Filter::ByTransport {
                transport,
                ip_version,
            }]
        } else {
            vec![Filter::ByIpVersion { ip_version }]
        };

        debug!(filters = self.filters.len(), "generated hashring filters");
    }
}

/// A country code token: exactly two characters.
pub(crate) fn is_country_code(token: &str) -> bool {
    token.chars().count() == 2
}
