//! Proxy scraping and checking
//!
//! This module provides functionality for:
//! - Extracting `ip:port` candidates from scraped text
//! - Fetching proxy source lists concurrently
//! - Checking candidates under a bounded concurrency cap

pub mod checker;
pub mod models;
pub mod parser;
pub mod scraper;

pub use checker::{CheckerConfig, ProxyChecker};
pub use models::{GeoLocation, LookupPayload, Proxy, ProxyType, SortMode};
pub use parser::{extract_candidates, Candidate};
pub use scraper::{ScraperConfig, SourceScraper};
