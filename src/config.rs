//! Typed run settings consumed by the pipeline

use crate::output::CategoryFlags;
use crate::proxy::models::{ProxyType, SortMode};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Built-in HTTP source lists used when no sources file is supplied.
const DEFAULT_HTTP_SOURCES: &[&str] = &[
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/http.txt",
    "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/http.txt",
    "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/http.txt",
    "https://api.proxyscrape.com/v2/?request=getproxies&protocol=http&timeout=10000",
];

const DEFAULT_SOCKS4_SOURCES: &[&str] = &[
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/socks4.txt",
    "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/socks4.txt",
    "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/socks4.txt",
    "https://api.proxyscrape.com/v2/?request=getproxies&protocol=socks4&timeout=10000",
];

const DEFAULT_SOCKS5_SOURCES: &[&str] = &[
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/socks5.txt",
    "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/socks5.txt",
    "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/socks5.txt",
    "https://api.proxyscrape.com/v2/?request=getproxies&protocol=socks5&timeout=10000",
];

/// Everything a run needs, already validated and typed.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Per-check timeout
    pub timeout: Duration,
    /// Cap on simultaneously in-flight checks
    pub max_connections: usize,
    pub sort_mode: SortMode,
    /// Base path the category folders are created under
    pub save_path: PathBuf,
    pub categories: CategoryFlags,
    /// Source URL lists, keyed by enabled protocol only
    pub sources: HashMap<ProxyType, Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_connections: 512,
            sort_mode: SortMode::Speed,
            save_path: PathBuf::from("proxies"),
            categories: CategoryFlags::default(),
            sources: ProxyType::ALL
                .iter()
                .map(|proto| (*proto, default_sources(*proto)))
                .collect(),
        }
    }
}

/// Built-in source list for a protocol.
pub fn default_sources(proxy_type: ProxyType) -> Vec<String> {
    let urls = match proxy_type {
        ProxyType::Http => DEFAULT_HTTP_SOURCES,
        ProxyType::Socks4 => DEFAULT_SOCKS4_SOURCES,
        ProxyType::Socks5 => DEFAULT_SOCKS5_SOURCES,
    };
    urls.iter().map(|url| url.to_string()).collect()
}

/// Parse a newline-separated source list, skipping blanks and `#` comments.
pub fn parse_sources(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
