//! Categorized output folders and result files
//!
//! Validated proxies are partitioned into category folders under the save
//! path, one text file per protocol, one proxy per line.

use crate::proxy::models::{Proxy, ProxyType, SortMode};
use crate::Result;
use anyhow::Context;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Static category name to (anonymous-only, geolocation-suffix) mapping.
const CATEGORIES: [(&str, bool, bool); 4] = [
    ("proxies", false, false),
    ("proxies_anonymous", true, false),
    ("proxies_geolocation", false, true),
    ("proxies_geolocation_anonymous", true, true),
];

/// Which output categories a run produces.
#[derive(Debug, Clone, Copy)]
pub struct CategoryFlags {
    pub all: bool,
    pub anonymous: bool,
    pub geolocation: bool,
    pub geolocation_anonymous: bool,
}

impl CategoryFlags {
    fn enabled(&self, name: &str) -> bool {
        match name {
            "proxies" => self.all,
            "proxies_anonymous" => self.anonymous,
            "proxies_geolocation" => self.geolocation,
            "proxies_geolocation_anonymous" => self.geolocation_anonymous,
            _ => false,
        }
    }
}

impl Default for CategoryFlags {
    fn default() -> Self {
        Self {
            all: true,
            anonymous: true,
            geolocation: true,
            geolocation_anonymous: true,
        }
    }
}

/// One destination directory for a proxy category.
#[derive(Debug, Clone)]
pub struct Folder {
    pub path: PathBuf,
    /// Only anonymous proxies are written into this folder.
    pub for_anonymous: bool,
    /// Lines carry the `|country|region|city` suffix.
    pub for_geolocation: bool,
}

impl Folder {
    pub fn new(base: &Path, name: &str, for_anonymous: bool, for_geolocation: bool) -> Self {
        Self {
            path: base.join(name),
            for_anonymous,
            for_geolocation,
        }
    }

    /// Remove the folder and its contents. An absent folder is not an error.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                Err(e).with_context(|| format!("failed to remove {}", self.path.display()))
            }
        }
    }

    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.path)
            .with_context(|| format!("failed to create {}", self.path.display()))
    }
}

/// Build the folders for the enabled categories.
///
/// Fails when every category is disabled; the pipeline must not start in
/// that configuration.
pub fn enabled_folders(base: &Path, flags: CategoryFlags) -> Result<Vec<Folder>> {
    let folders: Vec<Folder> = CATEGORIES
        .iter()
        .filter(|(name, _, _)| flags.enabled(name))
        .map(|(name, for_anonymous, for_geolocation)| {
            Folder::new(base, name, *for_anonymous, *for_geolocation)
        })
        .collect();

    if folders.is_empty() {
        anyhow::bail!("all output folders are disabled");
    }
    Ok(folders)
}

/// Sort each protocol's surviving proxies with the configured policy.
///
/// Pure read of the post-check state; the sort is stable, so ties keep
/// their input order.
pub fn sorted_proxies(
    proxies: &HashMap<ProxyType, Vec<Proxy>>,
    sort_mode: SortMode,
) -> Vec<(ProxyType, Vec<Proxy>)> {
    ProxyType::ALL
        .iter()
        .filter_map(|proto| {
            let mut list = proxies.get(proto)?.clone();
            list.sort_by(|a, b| sort_mode.compare(a, b));
            Some((*proto, list))
        })
        .collect()
}

/// Recreate every enabled folder and write its per-protocol files.
///
/// Each folder is removed and recreated immediately before writing. A
/// category with zero enabled protocols still gets an empty directory.
/// Any filesystem error besides removing an absent folder is fatal and
/// aborts before subsequent folders are processed.
pub fn save_proxies(folders: &[Folder], sorted: &[(ProxyType, Vec<Proxy>)]) -> Result<()> {
    for folder in folders {
        folder.remove()?;
        folder.create()?;
        for (proto, proxies) in sorted {
            let path = folder.path.join(format!("{proto}.txt"));
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            for proxy in proxies {
                if folder.for_anonymous && proxy.is_anonymous != Some(true) {
                    continue;
                }
                writeln!(writer, "{}", proxy.output_line(folder.for_geolocation))
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            writer
                .flush()
                .with_context(|| format!("failed to flush {}", path.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::LookupPayload;
    use std::time::Duration;
    use tempfile::TempDir;

    fn checked_proxy(addr: &str, anonymous: bool, country: &str) -> Proxy {
        let ip = addr.split(':').next().unwrap().to_string();
        let mut proxy = Proxy::new(addr.to_string(), ip.clone());
        proxy.timeout = Some(Duration::from_millis(100));
        proxy.update(&LookupPayload {
            query: Some(if anonymous { "1.2.3.4".to_string() } else { ip }),
            country: Some(country.to_string()),
            ..Default::default()
        });
        proxy
    }

    #[test]
    fn test_all_categories_disabled_is_an_error() {
        let flags = CategoryFlags {
            all: false,
            anonymous: false,
            geolocation: false,
            geolocation_anonymous: false,
        };
        assert!(enabled_folders(Path::new("out"), flags).is_err());
    }

    #[test]
    fn test_enabled_folders_respect_flags() {
        let flags = CategoryFlags {
            all: true,
            anonymous: false,
            geolocation: true,
            geolocation_anonymous: false,
        };
        let folders = enabled_folders(Path::new("out"), flags).unwrap();
        let names: Vec<_> = folders
            .iter()
            .map(|f| f.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["proxies", "proxies_geolocation"]);
    }

    #[test]
    fn test_remove_absent_folder_is_ok() {
        let dir = TempDir::new().unwrap();
        let folder = Folder::new(dir.path(), "does_not_exist", false, false);
        assert!(folder.remove().is_ok());
    }

    #[test]
    fn test_folder_is_recreated_empty() {
        let dir = TempDir::new().unwrap();
        let folder = Folder::new(dir.path(), "proxies", false, false);
        folder.create().unwrap();
        fs::write(folder.path.join("stale.txt"), "old").unwrap();

        save_proxies(std::slice::from_ref(&folder), &[]).unwrap();
        assert!(folder.path.exists());
        assert!(!folder.path.join("stale.txt").exists());
    }

    #[test]
    fn test_anonymous_category_filters_transparent_proxies() {
        let dir = TempDir::new().unwrap();
        let folders =
            enabled_folders(dir.path(), CategoryFlags::default()).unwrap();

        let mut proxies = HashMap::new();
        proxies.insert(
            ProxyType::Http,
            vec![
                checked_proxy("10.0.0.1:8080", true, "US"),
                checked_proxy("10.0.0.2:8080", false, "DE"),
            ],
        );
        let sorted = sorted_proxies(&proxies, SortMode::Address);
        save_proxies(&folders, &sorted).unwrap();

        let all = fs::read_to_string(dir.path().join("proxies/http.txt")).unwrap();
        assert_eq!(all, "10.0.0.1:8080\n10.0.0.2:8080\n");

        let anonymous =
            fs::read_to_string(dir.path().join("proxies_anonymous/http.txt")).unwrap();
        assert_eq!(anonymous, "10.0.0.1:8080\n");

        let geolocation =
            fs::read_to_string(dir.path().join("proxies_geolocation/http.txt")).unwrap();
        assert_eq!(geolocation, "10.0.0.1:8080|US|?|?\n10.0.0.2:8080|DE|?|?\n");

        let both = fs::read_to_string(
            dir.path().join("proxies_geolocation_anonymous/http.txt"),
        )
        .unwrap();
        assert_eq!(both, "10.0.0.1:8080|US|?|?\n");
    }

    #[test]
    fn test_disabled_category_is_never_touched() {
        let dir = TempDir::new().unwrap();
        let flags = CategoryFlags {
            all: true,
            anonymous: false,
            geolocation: false,
            geolocation_anonymous: false,
        };
        let folders = enabled_folders(dir.path(), flags).unwrap();
        save_proxies(&folders, &[]).unwrap();
        assert!(dir.path().join("proxies").exists());
        assert!(!dir.path().join("proxies_anonymous").exists());
    }

    #[test]
    fn test_sorted_proxies_by_speed() {
        let mut slow = checked_proxy("10.0.0.1:80", true, "US");
        slow.timeout = Some(Duration::from_millis(900));
        let mut fast = checked_proxy("10.0.0.2:80", true, "US");
        fast.timeout = Some(Duration::from_millis(10));

        let mut proxies = HashMap::new();
        proxies.insert(ProxyType::Http, vec![slow, fast]);
        let sorted = sorted_proxies(&proxies, SortMode::Speed);
        assert_eq!(sorted[0].1[0].socket_address, "10.0.0.2:80");
    }

    #[test]
    fn test_sorted_proxies_protocol_order_is_fixed() {
        let mut proxies = HashMap::new();
        proxies.insert(ProxyType::Socks5, Vec::new());
        proxies.insert(ProxyType::Http, Vec::new());
        let sorted = sorted_proxies(&proxies, SortMode::Address);
        let protos: Vec<_> = sorted.iter().map(|(p, _)| *p).collect();
        assert_eq!(protos, vec![ProxyType::Http, ProxyType::Socks5]);
    }
}
