//! Clone orchestration: one local folder per catalog repository.
//!
//! Layout is `<cache_root>/<org>/<repo>`. Without `overwrite`, a repository
//! whose folder already exists and is non-empty is left alone, so an
//! interrupted batch can simply be re-run. An empty folder (left behind by a
//! failed clone) is cloned again. A folder holding a partial clone is
//! indistinguishable from a complete one and is skipped as well.

use crate::catalog::CatalogEntry;
use crate::config::{LOGFILE_NAME, REPODATA_NAME};
use crate::error::Result;
use crate::fsutil::{folder_size, force_remove_dir, is_non_empty_dir};
use crate::git::Cloner;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const LOGFILE_HEADER: &str = "datetime,org,repo,KB-estimate,KB-actual,seconds,KB/second";

pub fn clone_url(org: &str, repo: &str) -> String {
    format!("https://github.com/{}/{}.git", org, repo)
}

/// `org/repo` pairs that are never cloned. Matching is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct SkipList {
    entries: HashSet<String>,
}

impl SkipList {
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|line| !line.is_empty())
            .collect();
        Self { entries }
    }

    /// Read a skip-list file; a missing file is an empty list.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn contains(&self, org: &str, repo: &str) -> bool {
        self.entries
            .contains(&format!("{}/{}", org, repo).to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One line of `logfile.csv`, written once per successful clone.
#[derive(Debug, Clone, PartialEq)]
pub struct CloneMetrics {
    pub timestamp: String,
    pub org: String,
    pub repo: String,
    pub size_estimate_kb: u64,
    pub size_actual_kb: f64,
    pub elapsed_seconds: f64,
}

impl CloneMetrics {
    pub fn kb_per_second(&self) -> f64 {
        throughput(self.size_actual_kb, self.elapsed_seconds)
    }

    pub fn csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.timestamp,
            self.org,
            self.repo,
            self.size_estimate_kb,
            self.size_actual_kb.round() as u64,
            (self.elapsed_seconds * 100.0).round() / 100.0,
            self.kb_per_second().round() as u64
        )
    }
}

fn throughput(kb: f64, seconds: f64) -> f64 {
    if seconds > 0.0 { kb / seconds } else { 0.0 }
}

/// Running totals for one organization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloneTotals {
    pub cloned: usize,
    pub skipped: usize,
    pub size_estimate_kb: u64,
    pub size_actual_kb: f64,
    pub elapsed_seconds: f64,
}

impl CloneTotals {
    fn add(&mut self, metrics: &CloneMetrics) {
        self.cloned += 1;
        self.size_estimate_kb += metrics.size_estimate_kb;
        self.size_actual_kb += metrics.size_actual_kb;
        self.elapsed_seconds += metrics.elapsed_seconds;
    }

    pub fn kb_per_second(&self) -> f64 {
        throughput(self.size_actual_kb, self.elapsed_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SkipList,
    AlreadyCloned,
}

#[derive(Debug, Clone)]
pub enum CloneEvent {
    Cloning { org: String, repo: String },
    Cloned(CloneMetrics),
    Skipped { org: String, repo: String, reason: SkipReason },
}

pub type CloneProgressCallback = Arc<dyn Fn(&CloneEvent) + Send + Sync>;

pub struct CloneOptions {
    pub cache_root: PathBuf,
    pub overwrite: bool,
    pub skiplist: SkipList,
}

impl CloneOptions {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            overwrite: false,
            skiplist: SkipList::default(),
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_skiplist(mut self, skiplist: SkipList) -> Self {
        self.skiplist = skiplist;
        self
    }

    pub fn logfile(&self) -> PathBuf {
        self.cache_root.join(LOGFILE_NAME)
    }
}

pub struct CloneOrchestrator<C: Cloner> {
    options: CloneOptions,
    cloner: C,
    progress_callback: Option<CloneProgressCallback>,
}

impl<C: Cloner> CloneOrchestrator<C> {
    pub fn new(options: CloneOptions, cloner: C) -> Self {
        Self {
            options,
            cloner,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: CloneProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn options(&self) -> &CloneOptions {
        &self.options
    }

    fn emit(&self, event: CloneEvent) {
        if let Some(ref callback) = self.progress_callback {
            callback(&event);
        }
    }

    /// Create the organization folder. When overwriting, everything in it is
    /// removed except the `repodata.json` listing cache.
    pub fn prepare_org_folder(&self, org: &str) -> Result<PathBuf> {
        let org_folder = self.options.cache_root.join(org);

        if self.options.overwrite && org_folder.is_dir() {
            debug!("Clearing {}", org_folder.display());
            for entry in fs::read_dir(&org_folder)? {
                let path = entry?.path();
                if path.file_name().is_some_and(|name| name == REPODATA_NAME) {
                    continue;
                }
                if path.is_dir() {
                    force_remove_dir(&path);
                } else if let Err(e) = fs::remove_file(&path) {
                    warn!("Could not remove {}: {}", path.display(), e);
                }
            }
        }
        fs::create_dir_all(&org_folder)?;

        Ok(org_folder)
    }

    /// Clone every catalog entry of one organization.
    ///
    /// The first clone failure stops the batch and is returned; metrics of the
    /// repositories cloned before it are already in the log file.
    pub fn clone_org(&self, org: &str, catalog: &[CatalogEntry]) -> Result<CloneTotals> {
        ensure_logfile(&self.options.logfile())?;
        let org_folder = self.prepare_org_folder(org)?;
        let mut totals = CloneTotals::default();

        for entry in catalog {
            let repo = entry.name.as_str();

            if self.options.skiplist.contains(org, repo) {
                totals.skipped += 1;
                self.emit(CloneEvent::Skipped {
                    org: org.to_string(),
                    repo: repo.to_string(),
                    reason: SkipReason::SkipList,
                });
                continue;
            }

            let folder = org_folder.join(repo);
            if !self.options.overwrite && is_non_empty_dir(&folder) {
                totals.skipped += 1;
                self.emit(CloneEvent::Skipped {
                    org: org.to_string(),
                    repo: repo.to_string(),
                    reason: SkipReason::AlreadyCloned,
                });
                continue;
            }

            self.emit(CloneEvent::Cloning {
                org: org.to_string(),
                repo: repo.to_string(),
            });

            let start = Instant::now();
            self.cloner.clone_repo(&clone_url(org, repo), &folder)?;
            let size_actual_kb = folder_size(&folder) as f64 / 1024.0;
            let elapsed_seconds = start.elapsed().as_secs_f64();

            let metrics = CloneMetrics {
                timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                org: org.to_string(),
                repo: repo.to_string(),
                size_estimate_kb: entry.size_kb,
                size_actual_kb,
                elapsed_seconds,
            };

            append_metrics(&self.options.logfile(), &metrics)?;
            totals.add(&metrics);
            self.emit(CloneEvent::Cloned(metrics));
        }

        info!(
            "{}: {} cloned, {} skipped, {} KB estimated, {:.0} KB actual in {:.2}s",
            org,
            totals.cloned,
            totals.skipped,
            totals.size_estimate_kb,
            totals.size_actual_kb,
            totals.elapsed_seconds
        );
        Ok(totals)
    }
}

/// Create the metrics log with its header row if it does not exist yet.
pub fn ensure_logfile(path: &Path) -> Result<()> {
    if path.is_file() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{}\n", LOGFILE_HEADER))?;
    Ok(())
}

pub fn append_metrics(path: &Path, metrics: &CloneMetrics) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", metrics.csv_row())?;
    Ok(())
}
