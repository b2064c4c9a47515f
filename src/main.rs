use anyhow::{anyhow, Context, Result};
use clap::Parser;
use proxyscout::config::{self, Settings};
use proxyscout::output::CategoryFlags;
use proxyscout::pipeline::ScrapeCheckPipeline;
use proxyscout::proxy::{ProxyType, SortMode};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tabled::builder::Builder;
use tabled::settings::{Alignment, Style};

/// An asynchronous proxy scraper and checker
#[derive(Parser)]
#[command(name = "proxyscout")]
#[command(about = "Scrapes, checks and categorizes HTTP/SOCKS4/SOCKS5 proxies")]
struct Cli {
    /// Per-check timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Maximum number of concurrent proxy checks
    #[arg(long, default_value_t = 512)]
    max_connections: usize,

    /// Sort saved proxies by "speed" or "address"
    #[arg(long, default_value = "speed")]
    sort_by: String,

    /// Folder the category folders are created under
    #[arg(short, long, default_value = "proxies")]
    output: PathBuf,

    /// Skip the unfiltered proxies folder
    #[arg(long)]
    no_all: bool,

    /// Skip the anonymous-only folder
    #[arg(long)]
    no_anonymous: bool,

    /// Skip the geolocation folder
    #[arg(long)]
    no_geolocation: bool,

    /// Skip the anonymous-with-geolocation folder
    #[arg(long)]
    no_geolocation_anonymous: bool,

    /// File with newline-separated HTTP source URLs
    #[arg(long)]
    http_sources: Option<PathBuf>,

    /// File with newline-separated SOCKS4 source URLs
    #[arg(long)]
    socks4_sources: Option<PathBuf>,

    /// File with newline-separated SOCKS5 source URLs
    #[arg(long)]
    socks5_sources: Option<PathBuf>,

    /// Do not scrape or check HTTP proxies
    #[arg(long)]
    no_http: bool,

    /// Do not scrape or check SOCKS4 proxies
    #[arg(long)]
    no_socks4: bool,

    /// Do not scrape or check SOCKS5 proxies
    #[arg(long)]
    no_socks5: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = build_settings(&cli)?;

    let pipeline = ScrapeCheckPipeline::new(settings)?;
    let summaries = pipeline.run().await?;

    let mut builder = Builder::default();
    builder.push_record(["Protocol", "Working", "Total"]);
    for summary in &summaries {
        builder.push_record([
            summary.proxy_type.to_string().to_uppercase(),
            format!("{} ({:.1}%)", summary.working, summary.percentage()),
            summary.total.to_string(),
        ]);
    }
    let mut table = builder.build();
    println!("{}", table.with(Style::modern()).with(Alignment::center()));

    println!(
        "Proxy folders have been created in {}.",
        pipeline.save_path().display()
    );
    Ok(())
}

fn build_settings(cli: &Cli) -> Result<Settings> {
    let mut sources = HashMap::new();
    let protocols = [
        (ProxyType::Http, cli.no_http, &cli.http_sources),
        (ProxyType::Socks4, cli.no_socks4, &cli.socks4_sources),
        (ProxyType::Socks5, cli.no_socks5, &cli.socks5_sources),
    ];
    for (proto, disabled, sources_file) in protocols {
        if disabled {
            continue;
        }
        let urls = match sources_file {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                config::parse_sources(&text)
            }
            None => config::default_sources(proto),
        };
        if !urls.is_empty() {
            sources.insert(proto, urls);
        }
    }

    Ok(Settings {
        timeout: Duration::from_secs(cli.timeout),
        max_connections: cli.max_connections,
        sort_mode: parse_sort_mode(&cli.sort_by)?,
        save_path: cli.output.clone(),
        categories: CategoryFlags {
            all: !cli.no_all,
            anonymous: !cli.no_anonymous,
            geolocation: !cli.no_geolocation,
            geolocation_anonymous: !cli.no_geolocation_anonymous,
        },
        sources,
    })
}

fn parse_sort_mode(s: &str) -> Result<SortMode> {
    match s.to_lowercase().as_str() {
        "speed" => Ok(SortMode::Speed),
        "address" => Ok(SortMode::Address),
        _ => Err(anyhow!("Invalid sort mode: {}. Use: speed, address", s)),
    }
}
