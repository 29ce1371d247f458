//! CIDR block parsing and containment checks.

use crate::error::RuleParseError;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An IPv4 or IPv6 network block.
///
/// Accepts `a.b.c.d/n`, `x::y/n`, and a bare address (treated as a host
/// block with a full-length prefix).
///
/// # Example Values
/// - `192.168.1.0/24`
/// - `10.0.0.0/8`
/// - `2001:db8::/32`
/// - `::1/128`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    network: IpAddr,
    prefix_len: u8,
}

impl Cidr {
    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Mixed address families never match.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (ip, &self.network) {
            (IpAddr::V4(ip4), IpAddr::V4(net4)) => is_ipv4_in_network(*ip4, *net4, self.prefix_len),
            (IpAddr::V6(ip6), IpAddr::V6(net6)) => is_ipv6_in_network(*ip6, *net6, self.prefix_len),
            _ => false,
        }
    }

    /// Containment test for a textual address; unparseable text is not contained.
    pub fn contains_str(&self, ip: &str) -> bool {
        IpAddr::from_str(ip.trim())
            .map(|ip| self.contains(&ip))
            .unwrap_or(false)
    }
}

impl FromStr for Cidr {
    type Err = RuleParseError;

    fn from_str(cidr_str: &str) -> Result<Self, Self::Err> {
        let invalid = || RuleParseError::new(format!("Invalid CIDR notation: {cidr_str}"));
        let trimmed = cidr_str.trim();

        let (address, prefix) = match trimmed.split_once('/') {
            Some((address, prefix)) => (address, Some(prefix)),
            None => (trimmed, None),
        };

        let network = IpAddr::from_str(address).map_err(|_| invalid())?;
        let max_prefix = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };

        let prefix_len = match prefix {
            Some(prefix) => prefix.parse::<u8>().map_err(|_| invalid())?,
            None => max_prefix,
        };

        if prefix_len > max_prefix {
            return Err(invalid());
        }

        Ok(Self {
            network,
            prefix_len,
        })
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

fn is_ipv4_in_network(ip: Ipv4Addr, network: Ipv4Addr, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }

    let mask = u32::MAX << (32 - u32::from(prefix_len));
    (u32::from(ip) & mask) == (u32::from(network) & mask)
}

fn is_ipv6_in_network(ip: Ipv6Addr, network: Ipv6Addr, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }

    let mask = u128::MAX << (128 - u32::from(prefix_len));
    (u128::from(ip) & mask) == (u128::from(network) & mask)
}
