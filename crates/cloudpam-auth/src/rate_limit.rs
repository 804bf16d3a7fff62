//! Login attempt rate limiting: at most N failed logins per IP per
//! minute, where "per IP" resolves through `X-Forwarded-For` only when
//! the immediate peer is in a configured trusted-proxy allow-list.

use std::net::{IpAddr, Ipv4Addr};
use std::num::NonZeroU32;

use governor::{DefaultKeyedRateLimiter, Quota};

use cloudpam_cidr::Cidr;

/// CIDR allow-list of reverse proxies permitted to set `X-Forwarded-For`.
/// An untrusted peer's own address is used instead, so the header can't
/// be spoofed to dodge the limiter.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    allow_list: Vec<Cidr>,
}

impl TrustedProxies {
    #[must_use]
    pub fn new(allow_list: Vec<Cidr>) -> Self {
        Self { allow_list }
    }

    #[must_use]
    pub fn is_trusted(&self, peer: IpAddr) -> bool {
        match peer {
            IpAddr::V4(v4) => self.allow_list.iter().any(|c| c.contains_address(u32::from(v4))),
            IpAddr::V6(_) => false,
        }
    }

    /// The address the login limiter should key on: the first
    /// `X-Forwarded-For` entry when `peer` is a trusted proxy, else `peer`.
    #[must_use]
    pub fn resolve_client_ip(&self, peer: IpAddr, forwarded_for: Option<&str>) -> IpAddr {
        if !self.is_trusted(peer) {
            return peer;
        }
        forwarded_for
            .and_then(|header| header.split(',').next())
            .map(str::trim)
            .and_then(|s| s.parse::<IpAddr>().ok())
            .unwrap_or(peer)
    }
}

pub struct LoginRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
}

impl LoginRateLimiter {
    /// `max_per_minute` failed attempts before an IP is throttled.
    #[must_use]
    pub fn new(max_per_minute: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(max_per_minute.max(1)).expect("max(1) is never zero"));
        Self { limiter: DefaultKeyedRateLimiter::keyed(quota) }
    }

    /// Call on every failed login attempt. Returns `true` if this
    /// attempt is allowed (under the limit), `false` if throttled.
    #[must_use]
    pub fn record_failure(&self, ip: IpAddr) -> bool {
        self.limiter.check_key(&ip).is_ok()
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untrusted_peer_is_used_verbatim() {
        let proxies = TrustedProxies::new(vec![Cidr::parse("10.0.0.0/8", false).unwrap()]);
        let peer: IpAddr = "203.0.113.5".parse().unwrap();
        assert_eq!(proxies.resolve_client_ip(peer, Some("198.51.100.1")), peer);
    }

    #[test]
    fn trusted_proxy_header_is_honored() {
        let proxies = TrustedProxies::new(vec![Cidr::parse("10.0.0.0/8", false).unwrap()]);
        let peer: IpAddr = "10.0.0.1".parse().unwrap();
        let client: IpAddr = "198.51.100.1".parse().unwrap();
        assert_eq!(proxies.resolve_client_ip(peer, Some("198.51.100.1, 10.0.0.1")), client);
    }

    #[test]
    fn throttles_after_the_configured_count() {
        let limiter = LoginRateLimiter::new(2);
        let ip: IpAddr = Ipv4Addr::new(1, 2, 3, 4).into();
        assert!(limiter.record_failure(ip));
        assert!(limiter.record_failure(ip));
        assert!(!limiter.record_failure(ip));
    }
}
