//! Repository catalog: which repositories of an organization get cloned.
//!
//! The raw listing comes from `GET /orgs/<org>/repos` (all pages) or from the
//! `repodata.json` cache written by a previous run. Only public, non-forked
//! repositories survive, as `(lower-case name, size)` pairs in sorted order so
//! that every run clones in the same sequence.

use crate::config::REPODATA_NAME;
use crate::error::Result;
use orgsweep_github::{ApiContext, fetch_all_pages};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The fields of a GitHub repository object the catalog needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRecord {
    pub name: String,
    /// Size estimate in KB as reported by the API.
    pub size: u64,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub fork: bool,
}

/// A repository to clone. Orders by name, then size.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CatalogEntry {
    pub name: String,
    pub size_kb: u64,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, size_kb: u64) -> Self {
        Self {
            name: name.into(),
            size_kb,
        }
    }
}

pub fn repodata_path(cache_root: &Path, org: &str) -> PathBuf {
    cache_root.join(org).join(REPODATA_NAME)
}

pub fn listing_endpoint(org: &str) -> String {
    format!("/orgs/{}/repos?per_page=100", org.to_lowercase())
}

/// Reduce a raw listing to the sorted public, non-fork catalog.
pub fn catalog_from_listing(listing: &[Value]) -> Vec<CatalogEntry> {
    let mut catalog: Vec<CatalogEntry> = listing
        .iter()
        .filter_map(|value| match RepoRecord::deserialize(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping malformed repository record: {}", e);
                None
            }
        })
        .filter(|record| !record.private && !record.fork)
        .map(|record| CatalogEntry::new(record.name.to_lowercase(), record.size))
        .collect();

    catalog.sort();
    catalog
}

pub fn load_cached_listing(path: &Path) -> Result<Vec<Value>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Write a listing as pretty JSON with sorted keys, for stable diffs.
///
/// An empty listing writes nothing.
pub fn save_listing(path: &Path, listing: &[Value]) -> Result<()> {
    if listing.is_empty() {
        debug!("Empty listing, not writing {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let sorted = Value::Array(listing.iter().map(sort_keys).collect());
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    sorted.serialize(&mut serializer)?;

    fs::write(path, buf)?;
    Ok(())
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Catalog for one organization.
///
/// With `refresh` off and a cache file present the network is not touched;
/// otherwise every page is fetched and the raw listing replaces the cache.
pub async fn repo_list(
    ctx: &mut ApiContext,
    cache_root: &Path,
    org: &str,
    refresh: bool,
) -> Result<Vec<CatalogEntry>> {
    let cache_file = repodata_path(cache_root, org);

    let listing = if !refresh && cache_file.is_file() {
        debug!("Loading cached listing {}", cache_file.display());
        load_cached_listing(&cache_file)?
    } else {
        let listing: Vec<Value> = fetch_all_pages(ctx, &listing_endpoint(org), None).await?;
        save_listing(&cache_file, &listing)?;
        listing
    };

    let catalog = catalog_from_listing(&listing);
    info!(
        "{} - {} repos listed, {} public non-forked",
        org,
        listing.len(),
        catalog.len()
    );
    Ok(catalog)
}
