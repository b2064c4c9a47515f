//! Source scraping for proxy lists
//!
//! Fetches every configured source URL concurrently, extracts candidates
//! from the response bodies and collects them into per-protocol sets.
//! Individual source failures are reported and skipped; they never abort
//! the stage.

use crate::proxy::models::{Proxy, ProxyType};
use crate::proxy::parser::extract_candidates;
use crate::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::ProgressBar;
use reqwest::{Client, StatusCode};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Default timeout for a single source fetch.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Fixed identifying header sent with every source request.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; rv:102.0) Gecko/20100101 Firefox/102.0";

/// Configuration for the source scraper
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Timeout for each source fetch
    pub timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ScraperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Scraper that turns source URLs into deduplicated candidate sets.
pub struct SourceScraper {
    client: Client,
}

impl SourceScraper {
    pub fn new() -> Result<Self> {
        Self::with_config(ScraperConfig::default())
    }

    /// Build the shared client session used for all source fetches.
    pub fn with_config(config: ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch every source of every protocol concurrently and collect the
    /// extracted candidates into per-protocol sets.
    ///
    /// Runs to full completion before returning; the checker stage needs the
    /// complete candidate sets. Each finished source advances its protocol's
    /// progress bar by one, successful or not, and failures are printed as
    /// one-line advisories through the bar so they do not clobber it.
    pub async fn scrape_all(
        &self,
        sources: &HashMap<ProxyType, Vec<String>>,
        bars: &HashMap<ProxyType, ProgressBar>,
    ) -> HashMap<ProxyType, HashSet<Proxy>> {
        let mut proxies: HashMap<ProxyType, HashSet<Proxy>> = sources
            .keys()
            .map(|proto| (*proto, HashSet::new()))
            .collect();

        let mut fetches: FuturesUnordered<_> = sources
            .iter()
            .flat_map(|(proto, urls)| urls.iter().map(move |url| (*proto, url)))
            .map(|(proto, url)| {
                let url = url.trim().to_string();
                async move {
                    let outcome = self.fetch_source(&url).await;
                    (proto, url, outcome)
                }
            })
            .collect();

        // Fetches run concurrently; insertion happens serially as each one
        // resolves, so the sets need no locking.
        while let Some((proto, url, outcome)) = fetches.next().await {
            let bar = &bars[&proto];
            match outcome {
                Ok((status, text)) => {
                    let set = proxies.get_mut(&proto).expect("set exists per source protocol");
                    let mut found_any = false;
                    for candidate in extract_candidates(&text) {
                        found_any = true;
                        set.insert(Proxy::new(
                            candidate.socket_address.to_string(),
                            candidate.ip.to_string(),
                        ));
                    }
                    if !found_any {
                        let mut msg = format!("{url} | No proxies found");
                        if status != StatusCode::OK {
                            msg.push_str(&format!(" | Status code {}", status.as_u16()));
                        }
                        bar.println(msg);
                    }
                }
                Err(e) => {
                    bar.println(format!("{url} | Error: {e:#}"));
                }
            }
            bar.inc(1);
        }

        proxies
    }

    async fn fetch_source(&self, url: &str) -> Result<(StatusCode, String)> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scraper_config_default() {
        let config = ScraperConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_scraper_config_builder() {
        let config = ScraperConfig::new().with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_scraper_creation() {
        assert!(SourceScraper::new().is_ok());
    }
}
