//! Shared types used across BridgeDB crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A distribution method through which clients obtain bridges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Https,
    Email,
    Moat,
    /// Operator-only statistics, never tied to a client-facing channel.
    Internal,
}

impl Channel {
    /// Channels that hand out bridges to clients.
    pub const DISTRIBUTORS: [Channel; 3] = [Channel::Https, Channel::Email, Channel::Moat];

    /// The prefix used for this channel's metric keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Https => "https",
            Channel::Email => "email",
            Channel::Moat => "moat",
            Channel::Internal => "internal",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IP address family requested by a client. Defaults to IPv4.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum IpVersion {
    #[default]
    V4,
    V6,
}

impl IpVersion {
    pub fn as_u8(&self) -> u8 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }

    /// Label used in metric keys (`ipv4` / `ipv6`).
    pub fn label(&self) -> &'static str {
        match self {
            IpVersion::V4 => "ipv4",
            IpVersion::V6 => "ipv6",
        }
    }
}

impl From<IpVersion> for u8 {
    fn from(v: IpVersion) -> Self {
        v.as_u8()
    }
}

impl TryFrom<u8> for IpVersion {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            4 => Ok(IpVersion::V4),
            6 => Ok(IpVersion::V6),
            other => Err(format!("invalid IP version: {other}")),
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_prefixes() {
        assert_eq!(Channel::Https.as_str(), "https");
        assert_eq!(Channel::Email.to_string(), "email");
        assert_eq!(Channel::DISTRIBUTORS.len(), 3);
    }

    #[test]
    fn ip_version_default_is_four() {
        assert_eq!(IpVersion::default(), IpVersion::V4);
        assert_eq!(IpVersion::V6.as_u8(), 6);
        assert!(IpVersion::try_from(5).is_err());
    }
}
