//! End-to-end flow from scraped text to categorized output files,
//! exercising everything except the live network probes.

use proxyscout::output::{enabled_folders, save_proxies, sorted_proxies, CategoryFlags};
use proxyscout::proxy::{extract_candidates, LookupPayload, Proxy, ProxyType, SortMode};
use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn scraped_text_to_anonymous_category_file() {
    // Only the in-range candidate survives extraction.
    let text = "foo 10.0.0.1:8080 bar 999.1.1.1:80 baz";
    let candidates: Vec<_> = extract_candidates(text).collect();
    assert_eq!(candidates.len(), 1);

    let mut proxy = Proxy::new(
        candidates[0].socket_address.to_string(),
        candidates[0].ip.to_string(),
    );

    // A successful check with this payload marks the proxy anonymous: its
    // own IP (10.0.0.1) differs from the observed one.
    let payload: LookupPayload =
        serde_json::from_str(r#"{"query": "1.2.3.4", "country": "US"}"#).unwrap();
    proxy.timeout = Some(Duration::from_millis(150));
    proxy.update(&payload);
    assert_eq!(proxy.is_anonymous, Some(true));

    let dir = TempDir::new().unwrap();
    let folders = enabled_folders(dir.path(), CategoryFlags::default()).unwrap();

    let mut survivors = HashMap::new();
    survivors.insert(ProxyType::Http, vec![proxy]);
    let sorted = sorted_proxies(&survivors, SortMode::Speed);
    save_proxies(&folders, &sorted).unwrap();

    let lines = fs::read_to_string(
        dir.path().join("proxies_geolocation_anonymous/http.txt"),
    )
    .unwrap();
    assert_eq!(lines, "10.0.0.1:8080|US|?|?\n");
}

#[test]
fn failed_candidate_appears_in_no_output_file() {
    // A candidate whose check failed is simply absent from the survivors,
    // so no category file can contain it.
    let dir = TempDir::new().unwrap();
    let folders = enabled_folders(dir.path(), CategoryFlags::default()).unwrap();

    let mut survivors: HashMap<ProxyType, Vec<Proxy>> = HashMap::new();
    survivors.insert(ProxyType::Http, Vec::new());
    let sorted = sorted_proxies(&survivors, SortMode::Speed);
    save_proxies(&folders, &sorted).unwrap();

    for category in [
        "proxies",
        "proxies_anonymous",
        "proxies_geolocation",
        "proxies_geolocation_anonymous",
    ] {
        let contents = fs::read_to_string(dir.path().join(category).join("http.txt")).unwrap();
        assert!(contents.is_empty(), "{category} should be empty");
    }
}

#[test]
fn rerun_overwrites_previous_results() {
    let dir = TempDir::new().unwrap();
    let folders = enabled_folders(dir.path(), CategoryFlags::default()).unwrap();

    let make_survivors = |addr: &str| {
        let ip = addr.split(':').next().unwrap().to_string();
        let mut proxy = Proxy::new(addr.to_string(), ip);
        proxy.timeout = Some(Duration::from_millis(10));
        let mut survivors = HashMap::new();
        survivors.insert(ProxyType::Http, vec![proxy]);
        survivors
    };

    let first = sorted_proxies(&make_survivors("10.0.0.1:80"), SortMode::Address);
    save_proxies(&folders, &first).unwrap();
    let second = sorted_proxies(&make_survivors("10.0.0.2:80"), SortMode::Address);
    save_proxies(&folders, &second).unwrap();

    let contents = fs::read_to_string(dir.path().join("proxies/http.txt")).unwrap();
    assert_eq!(contents, "10.0.0.2:80\n");
}
