//! Core data types for scraped proxies

use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Proxy protocol enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyType {
    Http,
    Socks4,
    Socks5,
}

impl ProxyType {
    /// All supported protocols, in the order they are reported and saved.
    pub const ALL: [ProxyType; 3] = [ProxyType::Http, ProxyType::Socks4, ProxyType::Socks5];
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyType::Http => write!(f, "http"),
            ProxyType::Socks4 => write!(f, "socks4"),
            ProxyType::Socks5 => write!(f, "socks5"),
        }
    }
}

/// Geolocation of a checked proxy.
///
/// Fields stay `"?"` until a successful check returns a lookup payload that
/// carries them. Rendered as the `|country|region|city` suffix in output files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLocation {
    pub country: String,
    pub region: String,
    pub city: String,
}

impl Default for GeoLocation {
    fn default() -> Self {
        Self {
            country: "?".to_string(),
            region: "?".to_string(),
            city: "?".to_string(),
        }
    }
}

impl fmt::Display for GeoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|{}|{}|{}", self.country, self.region, self.city)
    }
}

/// Payload returned by the IP lookup endpoint used during checking.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupPayload {
    /// The IP address the lookup service observed as the request origin.
    pub query: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "regionName")]
    pub region_name: Option<String>,
    pub city: Option<String>,
}

/// A single proxy candidate and the metadata measured for it.
///
/// Identity is the socket address alone, so a `HashSet<Proxy>` deduplicates
/// candidates by address regardless of where they were discovered.
#[derive(Debug, Clone)]
pub struct Proxy {
    /// `host:port`, the immutable identity key.
    pub socket_address: String,
    /// Host portion, compared against the lookup payload to detect
    /// transparent proxies.
    pub ip: String,
    /// `None` until a successful check returns a lookup payload.
    pub is_anonymous: Option<bool>,
    pub geolocation: GeoLocation,
    /// Measured round-trip latency. `None` means "not yet measured";
    /// candidates that fail the check are dropped rather than left unset.
    pub timeout: Option<Duration>,
}

impl Proxy {
    pub fn new(socket_address: String, ip: String) -> Self {
        Self {
            socket_address,
            ip,
            is_anonymous: None,
            geolocation: GeoLocation::default(),
            timeout: None,
        }
    }

    /// Apply the metadata from a successful lookup.
    ///
    /// A reported origin IP differing from the proxy's own IP means the
    /// caller's address was not passed through, i.e. the proxy is anonymous.
    pub fn update(&mut self, payload: &LookupPayload) {
        self.geolocation = GeoLocation {
            country: field_or_placeholder(payload.country.as_deref()),
            region: field_or_placeholder(payload.region_name.as_deref()),
            city: field_or_placeholder(payload.city.as_deref()),
        };
        self.is_anonymous = Some(payload.query.as_deref() != Some(self.ip.as_str()));
    }

    /// Numeric `([octets], port)` key for address sorting, so that
    /// `2.0.0.1:80` orders before `10.0.0.1:80`.
    pub fn address_key(&self) -> Option<([u8; 4], u16)> {
        let (host, port) = self.socket_address.split_once(':')?;
        let port: u16 = port.parse().ok()?;
        let mut octets = [0u8; 4];
        let mut parts = host.split('.');
        for octet in &mut octets {
            *octet = parts.next()?.parse().ok()?;
        }
        if parts.next().is_some() {
            return None;
        }
        Some((octets, port))
    }

    /// Render the line written to output files.
    pub fn output_line(&self, with_geolocation: bool) -> String {
        if with_geolocation {
            format!("{}{}", self.socket_address, self.geolocation)
        } else {
            self.socket_address.clone()
        }
    }
}

fn field_or_placeholder(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "?".to_string(),
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        self.socket_address == other.socket_address
    }
}

impl Eq for Proxy {}

impl Hash for Proxy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.socket_address.hash(state);
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_address)
    }
}

/// Result ordering policy for saved proxies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// Ascending measured latency, fastest first. Unmeasured proxies sort last.
    Speed,
    /// Numeric per-octet host order, then port.
    Address,
}

impl SortMode {
    pub fn compare(&self, a: &Proxy, b: &Proxy) -> Ordering {
        match self {
            SortMode::Speed => match (a.timeout, b.timeout) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortMode::Address => a.address_key().cmp(&b.address_key()),
        }
    }
}
