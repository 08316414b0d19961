// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Asynchronous endpoint resolution.
//!
//! [`resolve_url_list`] turns a URL into the ordered entry list produced by
//! the resolution substrate; [`resolve_url`] additionally applies the IPv6
//! admission policy and picks a single entry. Invalid URLs fail with
//! `BadAddress` before any lookup runs.

use crate::error::{Error, Result};
use crate::net::{CancelToken, Url};
use std::future::Future;
use std::net::IpAddr;
use std::str::FromStr;

/// One result of name resolution: an address literal plus its family bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveEntry {
    /// Address literal, in the form the substrate produced it
    pub host: String,
    /// Address family bit
    pub is_ipv6: bool,
}

impl ResolveEntry {
    pub fn v4(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            is_ipv6: false,
        }
    }

    pub fn v6(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            is_ipv6: true,
        }
    }

    /// Parse the literal into an address for dialing.
    pub fn ip_addr(&self) -> Option<IpAddr> {
        IpAddr::from_str(&self.host).ok()
    }
}

/// Name resolution substrate.
///
/// The system implementation defers to the OS resolver; tests inject fixed
/// entry lists.
pub trait Resolve: Send + Sync {
    fn resolve(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Vec<ResolveEntry>>> + Send;
}

/// OS-backed resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolve for SystemResolver {
    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<ResolveEntry>> {
        // IP literals bypass the lookup entirely.
        if let Ok(ip) = IpAddr::from_str(host) {
            return Ok(vec![ResolveEntry {
                host: ip.to_string(),
                is_ipv6: ip.is_ipv6(),
            }]);
        }
        let addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| Error::HostNotFound(format!("{}: {}", host, e)))?;
        let entries: Vec<ResolveEntry> = addrs
            .map(|addr| ResolveEntry {
                host: addr.ip().to_string(),
                is_ipv6: addr.is_ipv6(),
            })
            .collect();
        if entries.is_empty() {
            return Err(Error::HostNotFound(host.to_string()));
        }
        Ok(entries)
    }
}

/// Resolve a URL to the full ordered entry list.
pub async fn resolve_url_list<R: Resolve>(
    resolver: &R,
    input: &str,
    cancel: &CancelToken,
) -> Result<Vec<ResolveEntry>> {
    let url = Url::parse(input)?;
    cancel.checkpoint()?;
    resolver.resolve(url.host(), url.port()).await
}

/// Resolve a URL and pick the first admissible entry under the policy.
///
/// `Ok(None)` means resolution succeeded but no entry passed the filter.
pub async fn resolve_url<R: Resolve>(
    resolver: &R,
    input: &str,
    ipv6_enabled: bool,
    cancel: &CancelToken,
) -> Result<Option<ResolveEntry>> {
    let entries = resolve_url_list(resolver, input, cancel).await?;
    cancel.checkpoint()?;
    Ok(find_first_valid_if_any(&entries, ipv6_enabled).cloned())
}

/// Scan entries in order and pick the preferred admissible one.
///
/// Any IPv4 entry is preferred over any IPv6 entry; with IPv6 disallowed
/// only IPv4 entries are admissible. Empty input yields `None`.
pub fn find_first_valid_if_any(
    entries: &[ResolveEntry],
    ipv6_enabled: bool,
) -> Option<&ResolveEntry> {
    let first_v4 = entries.iter().find(|e| !e.is_ipv6);
    if first_v4.is_some() {
        return first_v4;
    }
    if ipv6_enabled {
        return entries.iter().find(|e| e.is_ipv6);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) struct FixedResolver(pub Vec<ResolveEntry>);

    impl Resolve for FixedResolver {
        async fn resolve(&self, _host: &str, _port: u16) -> Result<Vec<ResolveEntry>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn first_valid_prefers_ipv4() {
        let v4_0 = ResolveEntry::v4("10.11.12.13");
        let v4_1 = ResolveEntry::v4("10.11.12.14");
        let v6_0 = ResolveEntry::v6("10.11.12.15");

        assert_eq!(find_first_valid_if_any(&[], false), None);
        assert_eq!(find_first_valid_if_any(&[], true), None);

        let front = [v4_0.clone(), v4_1.clone(), v6_0.clone()];
        assert_eq!(find_first_valid_if_any(&front, false), Some(&v4_0));
        assert_eq!(find_first_valid_if_any(&front, true), Some(&v4_0));

        let back = [v6_0.clone(), v4_0.clone(), v4_1.clone()];
        assert_eq!(find_first_valid_if_any(&back, false), Some(&v4_0));
        assert_eq!(find_first_valid_if_any(&back, true), Some(&v6_0));
    }

    #[test]
    fn first_valid_v6_only() {
        let v6 = ResolveEntry::v6("::1");
        assert_eq!(find_first_valid_if_any(&[v6.clone()], false), None);
        assert_eq!(find_first_valid_if_any(&[v6.clone()], true), Some(&v6));
    }

    #[tokio::test]
    async fn bad_urls_fail_before_lookup() {
        struct PanicResolver;
        impl Resolve for PanicResolver {
            async fn resolve(&self, _host: &str, _port: u16) -> Result<Vec<ResolveEntry>> {
                panic!("lookup must not run for invalid URLs");
            }
        }
        let cancel = CancelToken::new();
        for input in ["", "abcd", "10.12.14.15.16", "tcp://10.12.14.15", "tcp://10.12.14.15:0"] {
            let err = resolve_url_list(&PanicResolver, input, &cancel)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::BadAddress(_)), "for {:?}", input);
        }
    }

    #[tokio::test]
    async fn list_preserves_substrate_order() {
        let resolver = FixedResolver(vec![
            ResolveEntry::v4("10.11.12.13"),
            ResolveEntry::v6("10.11.12.13"),
        ]);
        let cancel = CancelToken::new();
        let entries = resolve_url_list(&resolver, "tcp://10.11.12.13:1234", &cancel)
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].is_ipv6);
        assert!(entries[1].is_ipv6);
    }

    #[tokio::test]
    async fn resolve_url_applies_policy() {
        let resolver = FixedResolver(vec![ResolveEntry::v6("::1")]);
        let cancel = CancelToken::new();

        let picked = resolve_url(&resolver, "tcp://host.local:1234", false, &cancel)
            .await
            .unwrap();
        assert!(picked.is_none());

        let picked = resolve_url(&resolver, "tcp://host.local:1234", true, &cancel)
            .await
            .unwrap();
        assert_eq!(picked, Some(ResolveEntry::v6("::1")));
    }

    #[tokio::test]
    async fn cancellation_wins_over_lookup() {
        let resolver = FixedResolver(vec![ResolveEntry::v4("10.0.0.1")]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = resolve_url_list(&resolver, "tcp://10.0.0.1:1", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn system_resolver_handles_literals() {
        let entries = SystemResolver.resolve("127.0.0.1", 80).await.unwrap();
        assert_eq!(entries, vec![ResolveEntry::v4("127.0.0.1")]);

        let entries = SystemResolver.resolve("::1", 80).await.unwrap();
        assert_eq!(entries, vec![ResolveEntry::v6("::1")]);
    }
}
