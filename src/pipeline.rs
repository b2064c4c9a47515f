//! End-to-end scrape, check and save pipeline
//!
//! The scrape stage runs to full completion before the check stage begins;
//! the checker needs the complete candidate sets. Output is written only
//! after both stages finish.

use crate::config::Settings;
use crate::output::{enabled_folders, save_proxies, sorted_proxies, Folder};
use crate::proxy::checker::{CheckerConfig, ProxyChecker};
use crate::proxy::models::{Proxy, ProxyType};
use crate::proxy::scraper::{ScraperConfig, SourceScraper};
use crate::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;

/// Per-protocol result counts reported at the end of a run.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolSummary {
    pub proxy_type: ProxyType,
    /// Proxies that survived the check stage
    pub working: usize,
    /// Candidates discovered by the scrape stage
    pub total: usize,
}

impl ProtocolSummary {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.working as f64 / self.total as f64 * 100.0
        }
    }
}

/// Orchestrates scraping, checking and saving for one run.
pub struct ScrapeCheckPipeline {
    settings: Settings,
    folders: Vec<Folder>,
}

impl ScrapeCheckPipeline {
    /// Validate the settings and prepare the output folders.
    ///
    /// Fails when every output category is disabled, before any network
    /// activity happens.
    pub fn new(settings: Settings) -> Result<Self> {
        let folders = enabled_folders(&settings.save_path, settings.categories)?;
        Ok(Self { settings, folders })
    }

    /// Run both stages, save the results and return the summary counts.
    pub async fn run(&self) -> Result<Vec<ProtocolSummary>> {
        let multi = MultiProgress::new();

        let scraper = SourceScraper::with_config(ScraperConfig::new())?;
        let scrape_bars = self.stage_bars(&multi, "Scraping", |proto| {
            self.settings.sources[proto].len() as u64
        });
        let proxies = scraper.scrape_all(&self.settings.sources, &scrape_bars).await;
        finish_bars(&scrape_bars);

        // Pre-check totals, kept for the summary.
        let totals: HashMap<ProxyType, usize> = proxies
            .iter()
            .map(|(proto, set)| (*proto, set.len()))
            .collect();

        let checker = ProxyChecker::with_config(
            CheckerConfig::new()
                .with_timeout(self.settings.timeout)
                .with_max_connections(self.settings.max_connections),
        );
        let check_bars = self.stage_bars(&multi, "Checking", |proto| {
            proxies.get(proto).map_or(0, |set| set.len() as u64)
        });
        let survivors = checker.check_all(proxies, &check_bars).await;
        finish_bars(&check_bars);

        let summaries = ProxyType::ALL
            .iter()
            .filter(|proto| totals.contains_key(*proto))
            .map(|proto| ProtocolSummary {
                proxy_type: *proto,
                working: survivors.get(proto).map_or(0, |set| set.len()),
                total: totals[proto],
            })
            .collect();

        let survivors: HashMap<ProxyType, Vec<Proxy>> = survivors
            .into_iter()
            .map(|(proto, set)| (proto, set.into_iter().collect()))
            .collect();
        let sorted = sorted_proxies(&survivors, self.settings.sort_mode);
        save_proxies(&self.folders, &sorted)?;

        Ok(summaries)
    }

    /// Resolved base path the category folders live under.
    pub fn save_path(&self) -> &std::path::Path {
        &self.settings.save_path
    }

    fn stage_bars(
        &self,
        multi: &MultiProgress,
        stage: &str,
        len: impl Fn(&ProxyType) -> u64,
    ) -> HashMap<ProxyType, ProgressBar> {
        ProxyType::ALL
            .iter()
            .filter(|proto| self.settings.sources.contains_key(*proto))
            .map(|proto| {
                let bar = multi.add(
                    ProgressBar::new(len(proto)).with_style(
                        ProgressStyle::default_bar()
                            .template(
                                "[{msg}] {percent:>3}% [{wide_bar}] {pos}/{len} [{eta_precise}]",
                            )
                            .expect("valid progress template"),
                    ),
                );
                bar.set_message(format!("{stage} {proto}"));
                (*proto, bar)
            })
            .collect()
    }
}

fn finish_bars(bars: &HashMap<ProxyType, ProgressBar>) {
    for bar in bars.values() {
        bar.finish();
    }
}
