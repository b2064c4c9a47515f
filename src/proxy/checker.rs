//! Bounded-concurrency proxy checking
//!
//! Every candidate gets exactly one probe: a real request routed through it
//! to an IP lookup endpoint. Candidates that fail are dropped permanently;
//! survivors are annotated with latency, anonymity and geolocation.

use crate::proxy::models::{LookupPayload, Proxy, ProxyType};
use crate::Result;
use anyhow::bail;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use rand::seq::SliceRandom;
use reqwest::{Client, Proxy as ReqwestProxy};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Default timeout for a single proxy check
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default cap on simultaneously open checks
const DEFAULT_MAX_CONNECTIONS: usize = 512;

/// Lookup endpoint reached through each candidate. The fields bitmask
/// selects country, regionName, city and query.
const DEFAULT_LOOKUP_URL: &str = "http://ip-api.com/json/?fields=8217";

/// Configuration for the proxy checker
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Timeout for each proxy check
    pub timeout: Duration,
    /// Maximum number of in-flight checks. Each check holds an open socket
    /// for its duration, so this bounds file descriptor usage.
    pub max_connections: usize,
    /// URL requested through each candidate
    pub lookup_url: String,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            lookup_url: DEFAULT_LOOKUP_URL.to_string(),
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_lookup_url(mut self, url: String) -> Self {
        self.lookup_url = url;
        self
    }
}

/// Checker that probes candidates under a global concurrency cap.
pub struct ProxyChecker {
    config: CheckerConfig,
    semaphore: Arc<Semaphore>,
    fd_warning_issued: Arc<AtomicBool>,
}

impl ProxyChecker {
    pub fn new() -> Self {
        Self::with_config(CheckerConfig::default())
    }

    pub fn with_config(config: CheckerConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_connections));
        Self {
            config,
            semaphore,
            fd_warning_issued: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Probe every candidate and return the surviving subset per protocol.
    ///
    /// Candidates from all protocols are merged into one shuffled work list
    /// before scheduling, so checks for one protocol do not systematically
    /// starve another under the shared cap. Shuffling affects scheduling
    /// order only. Each finished check advances its protocol's progress bar
    /// by one after the permit is released.
    pub async fn check_all(
        &self,
        proxies: HashMap<ProxyType, HashSet<Proxy>>,
        bars: &HashMap<ProxyType, ProgressBar>,
    ) -> HashMap<ProxyType, HashSet<Proxy>> {
        let mut work: Vec<(ProxyType, Proxy)> = proxies
            .into_iter()
            .flat_map(|(proto, set)| set.into_iter().map(move |proxy| (proto, proxy)))
            .collect();
        work.shuffle(&mut rand::thread_rng());

        let checked = stream::iter(work)
            .map(|(proto, mut proxy)| {
                let semaphore = Arc::clone(&self.semaphore);
                let fd_warning_issued = Arc::clone(&self.fd_warning_issued);
                let bar = bars[&proto].clone();
                async move {
                    let outcome = {
                        // Admission is gated before any socket is opened; the
                        // permit is released on every exit path when the
                        // guard drops.
                        let _permit = semaphore
                            .acquire()
                            .await
                            .expect("semaphore closed unexpectedly");
                        self.probe(proto, &mut proxy).await
                    };
                    if let Err(ref e) = outcome {
                        if is_fd_exhaustion(e)
                            && !fd_warning_issued.swap(true, Ordering::Relaxed)
                        {
                            bar.println(
                                "Too many open files; lower the max connections setting.",
                            );
                        }
                    }
                    bar.inc(1);
                    (proto, proxy, outcome)
                }
            })
            .buffer_unordered(self.config.max_connections)
            .collect::<Vec<_>>()
            .await;

        let mut survivors: HashMap<ProxyType, HashSet<Proxy>> =
            bars.keys().map(|proto| (*proto, HashSet::new())).collect();
        for (proto, proxy, outcome) in checked {
            if outcome.is_ok() {
                survivors.entry(proto).or_default().insert(proxy);
            }
        }
        survivors
    }

    /// Route one lookup request through the candidate and annotate it.
    async fn probe(&self, proxy_type: ProxyType, proxy: &mut Proxy) -> Result<()> {
        let tunnel = match proxy_type {
            ProxyType::Http => ReqwestProxy::http(format!("http://{}", proxy.socket_address))?,
            ProxyType::Socks4 => ReqwestProxy::all(format!("socks4://{}", proxy.socket_address))?,
            ProxyType::Socks5 => ReqwestProxy::all(format!("socks5://{}", proxy.socket_address))?,
        };

        let client = Client::builder()
            .proxy(tunnel)
            .timeout(self.config.timeout)
            .build()?;

        let start = Instant::now();
        let response = client.get(&self.config.lookup_url).send().await?;
        if !response.status().is_success() {
            bail!("lookup returned status {}", response.status());
        }
        let payload: LookupPayload = response.json().await?;

        proxy.timeout = Some(start.elapsed());
        proxy.update(&payload);
        Ok(())
    }
}

impl Default for ProxyChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// True when the error chain bottoms out in EMFILE (too many open files).
fn is_fd_exhaustion(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .map_or(false, |io| io.raw_os_error() == Some(24))
    })
}
