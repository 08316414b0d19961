// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint URL parsing.
//!
//! Grammar: `scheme "://" host ":" port` with scheme ∈ {tcp, tcps}; host is
//! an IPv4 literal, a bracketed IPv6 literal, or a DNS name; port is decimal
//! 1..=65535. Anything else is rejected with `BadAddress` before any
//! resolution work happens.

use crate::error::{Error, Result};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Endpoint scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plain TCP
    Tcp,
    /// TCP with TLS
    Tcps,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Tcps => "tcps",
        }
    }
}

/// A validated endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Url {
    scheme: Scheme,
    host: String,
    port: u16,
}

impl Url {
    /// Parse and validate an endpoint string.
    pub fn parse(input: &str) -> Result<Self> {
        let bad = || Error::BadAddress(input.to_string());

        let (scheme_str, rest) = input.split_once("://").ok_or_else(bad)?;
        let scheme = match scheme_str {
            "tcp" => Scheme::Tcp,
            "tcps" => Scheme::Tcps,
            _ => return Err(bad()),
        };

        // Bracketed IPv6 hosts contain colons, so split the port off the
        // closing bracket instead of the first colon.
        let (host, port_str) = if let Some(rest) = rest.strip_prefix('[') {
            let (host, after) = rest.split_once(']').ok_or_else(bad)?;
            let port = after.strip_prefix(':').ok_or_else(bad)?;
            (host, port)
        } else {
            rest.rsplit_once(':').ok_or_else(bad)?
        };

        if host.is_empty() {
            return Err(bad());
        }
        if !valid_host(host, rest.starts_with('[')) {
            return Err(bad());
        }

        let port: u16 = port_str.parse().map_err(|_| bad())?;
        if port == 0 {
            return Err(bad());
        }

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
        })
    }

    /// Parse a listening endpoint: same grammar, but port 0 is admitted as
    /// "pick a free port" for binds.
    pub fn parse_listen(input: &str) -> Result<Self> {
        match Self::parse(input) {
            Ok(url) => Ok(url),
            Err(e) => {
                if let Some((head, "0")) = input.rsplit_once(':') {
                    let mut url = Self::parse(&format!("{}:1", head))?;
                    url.port = 0;
                    return Ok(url);
                }
                Err(e)
            }
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether this endpoint requests TLS.
    pub fn is_ssl(&self) -> bool {
        self.scheme == Scheme::Tcps
    }
}

impl FromStr for Url {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.scheme.as_str(), self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.scheme.as_str(), self.host, self.port)
        }
    }
}

fn valid_host(host: &str, bracketed: bool) -> bool {
    if bracketed {
        return Ipv6Addr::from_str(host).is_ok();
    }
    if Ipv4Addr::from_str(host).is_ok() {
        return true;
    }
    // All-numeric hosts that are not valid IPv4 literals (too many or
    // out-of-range octets, e.g. `10.12.14.15.16`) are rejected rather than
    // treated as DNS names.
    if host.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return false;
    }
    valid_dns_name(host)
}

fn valid_dns_name(host: &str) -> bool {
    if host.len() > 253 {
        return false;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && !label.starts_with('-')
            && !label.ends_with('-')
    })
}
