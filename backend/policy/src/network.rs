//! CIDR network literals (`10.0.0.0/24`, `fd00::/8`).
//!
//! Parsing is non-strict: host bits set in the address are masked off,
//! so `10.0.0.7/24` denotes `10.0.0.0/24`. A bare address parses as a
//! single-host network (`/32` or `/128`).

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkParseError {
    #[error("invalid network address '{0}'")]
    Address(String),
    #[error("invalid prefix length '{0}'")]
    Prefix(String),
}

/// An IPv4 or IPv6 network: base address plus prefix length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpNetwork {
    base: IpAddr,
    prefix: u8,
}

impl IpNetwork {
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self, NetworkParseError> {
        let max = max_prefix(&addr);
        if prefix > max {
            return Err(NetworkParseError::Prefix(prefix.to_string()));
        }
        let base = match addr {
            IpAddr::V4(v4) => IpAddr::V4(Ipv4Addr::from(u32::from(v4) & v4_mask(prefix))),
            IpAddr::V6(v6) => IpAddr::V6(Ipv6Addr::from(u128::from(v6) & v6_mask(prefix))),
        };
        Ok(Self { base, prefix })
    }

    pub fn base(&self) -> IpAddr {
        self.base
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// True if `ip` falls inside this network. Mixed address families never match.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (self.base, ip) {
            (IpAddr::V4(base), IpAddr::V4(ip)) => {
                u32::from(*ip) & v4_mask(self.prefix) == u32::from(base)
            }
            (IpAddr::V6(base), IpAddr::V6(ip)) => {
                u128::from(*ip) & v6_mask(self.prefix) == u128::from(base)
            }
            _ => false,
        }
    }
}

impl FromStr for IpNetwork {
    type Err = NetworkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_part, prefix_part) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s, None),
        };
        let addr: IpAddr = addr_part
            .parse()
            .map_err(|_| NetworkParseError::Address(addr_part.to_string()))?;
        let prefix = match prefix_part {
            Some(p) => p
                .parse::<u8>()
                .map_err(|_| NetworkParseError::Prefix(p.to_string()))?,
            None => max_prefix(&addr),
        };
        IpNetwork::new(addr, prefix)
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix)
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn v4_mask(prefix: u8) -> u32 {
    if prefix == 0 { 0 } else { u32::MAX << (32 - u32::from(prefix)) }
}

fn v6_mask(prefix: u8) -> u128 {
    if prefix == 0 { 0 } else { u128::MAX << (128 - u32::from(prefix)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn contains_inside_and_outside() {
        let net: IpNetwork = "10.0.0.0/24".parse().unwrap();
        assert!(net.contains(&ip("10.0.0.5")));
        assert!(net.contains(&ip("10.0.0.255")));
        assert!(!net.contains(&ip("10.0.1.5")));
    }

    #[test]
    fn host_bits_are_masked() {
        let net: IpNetwork = "192.168.1.77/16".parse().unwrap();
        assert_eq!(net.to_string(), "192.168.0.0/16");
        assert!(net.contains(&ip("192.168.200.1")));
    }

    #[test]
    fn bare_address_is_single_host() {
        let net: IpNetwork = "10.0.0.9".parse().unwrap();
        assert_eq!(net.prefix(), 32);
        assert!(net.contains(&ip("10.0.0.9")));
        assert!(!net.contains(&ip("10.0.0.10")));
    }

    #[test]
    fn zero_prefix_matches_everything_in_family() {
        let net: IpNetwork = "0.0.0.0/0".parse().unwrap();
        assert!(net.contains(&ip("8.8.8.8")));
        assert!(!net.contains(&ip("::1")));
    }

    #[test]
    fn ipv6_networks() {
        let net: IpNetwork = "fd00::/8".parse().unwrap();
        assert!(net.contains(&ip("fd12:3456::1")));
        assert!(!net.contains(&ip("fe80::1")));
    }

    #[test]
    fn rejects_malformed() {
        assert!("10.0.0.0/33".parse::<IpNetwork>().is_err());
        assert!("10.0.0/24".parse::<IpNetwork>().is_err());
        assert!("lab.local/24".parse::<IpNetwork>().is_err());
        assert!("10.0.0.0/abc".parse::<IpNetwork>().is_err());
    }
}
