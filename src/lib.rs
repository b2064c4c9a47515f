//! proxyscout - asynchronous proxy scraper and checker
//!
//! Scrapes plain-text proxy lists from remote sources, validates every
//! candidate by routing a real request through it, and writes the surviving
//! proxies into categorized result folders.

pub mod config;
pub mod output;
pub mod pipeline;
pub mod proxy;

pub use config::Settings;
pub use pipeline::{ProtocolSummary, ScrapeCheckPipeline};

/// Application result type
pub type Result<T> = anyhow::Result<T>;
