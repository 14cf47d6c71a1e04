//! Keyword scanning over the clone cache.
//!
//! The cache has the fixed layout `<cache_root>/<org>/<repo>/...`. The walk
//! visits it depth-first in file-name order, so every file of a repository is
//! seen after its root folder and before the next repository's root. That lets
//! the aggregator keep exactly one repository open at a time and flush it as
//! soon as the next root shows up.

use crate::config::Settings;
use crate::error::Result;
use crate::git::latest_commit;
use crate::report::{ReportWriter, file_url};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Directory names never descended into inside a repository.
pub const EXCLUDED_DIRS: &[&str] = &[".git", ".github", "vendor"];

/// Keyword hits of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHits {
    pub filename: PathBuf,
    pub counts: BTreeMap<String, u64>,
    pub total: u64,
}

impl FileHits {
    pub fn scan(filename: impl Into<PathBuf>, content: &str, words: &[String]) -> Self {
        let (counts, total) = count_keywords(content, words);
        Self {
            filename: filename.into(),
            counts,
            total,
        }
    }

    pub fn count(&self, word: &str) -> u64 {
        self.counts.get(word).copied().unwrap_or(0)
    }
}

/// Case-insensitive, non-overlapping occurrence counts per keyword.
///
/// Counts are keyed by the keyword as given. Empty keywords are not counted.
pub fn count_keywords(content: &str, words: &[String]) -> (BTreeMap<String, u64>, u64) {
    let haystack = content.to_lowercase();
    let mut counts = BTreeMap::new();
    let mut total = 0;

    for word in words {
        if word.is_empty() {
            continue;
        }
        let hits = haystack.matches(word.to_lowercase().as_str()).count() as u64;
        counts.insert(word.clone(), hits);
        total += hits;
    }

    (counts, total)
}

/// Scan one file. Undecodable bytes are replaced, never an error.
pub fn search_file(path: &Path, words: &[String]) -> Result<FileHits> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(FileHits::scan(path, &content, words))
}

/// Keyword totals of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTotals {
    pub root_folder: PathBuf,
    pub counts: BTreeMap<String, u64>,
    pub total: u64,
}

impl RepoTotals {
    pub fn new(root_folder: impl Into<PathBuf>) -> Self {
        Self {
            root_folder: root_folder.into(),
            counts: BTreeMap::new(),
            total: 0,
        }
    }

    pub fn add(&mut self, hits: &FileHits) {
        for (word, count) in &hits.counts {
            *self.counts.entry(word.clone()).or_insert(0) += count;
        }
        self.total += hits.total;
    }

    pub fn count(&self, word: &str) -> u64 {
        self.counts.get(word).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AggregatorState {
    #[default]
    NoRepoOpen,
    RepoOpen(RepoTotals),
}

/// Holds the single open repository accumulator.
#[derive(Debug, Default)]
pub struct RepoAccumulator {
    state: AggregatorState,
}

impl RepoAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new repository root was reached: open it and return the one it replaces.
    pub fn open(&mut self, root: impl Into<PathBuf>) -> Option<RepoTotals> {
        let previous =
            std::mem::replace(&mut self.state, AggregatorState::RepoOpen(RepoTotals::new(root)));
        match previous {
            AggregatorState::RepoOpen(totals) => Some(totals),
            AggregatorState::NoRepoOpen => None,
        }
    }

    /// Add a file's hits to the open repository. Returns false when none is open.
    pub fn record(&mut self, hits: &FileHits) -> bool {
        match &mut self.state {
            AggregatorState::RepoOpen(totals) => {
                totals.add(hits);
                true
            }
            AggregatorState::NoRepoOpen => false,
        }
    }

    /// The walk ended: close the open repository, if any.
    pub fn finish(&mut self) -> Option<RepoTotals> {
        match std::mem::take(&mut self.state) {
            AggregatorState::RepoOpen(totals) => Some(totals),
            AggregatorState::NoRepoOpen => None,
        }
    }

    pub fn current_root(&self) -> Option<&Path> {
        match &self.state {
            AggregatorState::RepoOpen(totals) => Some(&totals.root_folder),
            AggregatorState::NoRepoOpen => None,
        }
    }

    pub fn state(&self) -> &AggregatorState {
        &self.state
    }
}

fn relative_parts<'a>(cache_root: &Path, path: &'a Path) -> Option<Vec<&'a std::ffi::OsStr>> {
    let relative = path.strip_prefix(cache_root).ok()?;
    Some(
        relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect(),
    )
}

/// True for `<cache_root>/<org>/<repo>` exactly.
pub fn is_repo_root(cache_root: &Path, dir: &Path) -> bool {
    relative_parts(cache_root, dir).is_some_and(|parts| parts.len() == 2)
}

/// Repository root owning a path strictly below it.
pub fn repo_root_of(cache_root: &Path, path: &Path) -> Option<PathBuf> {
    let parts = relative_parts(cache_root, path)?;
    if parts.len() < 3 {
        return None;
    }
    Some(cache_root.join(parts[0]).join(parts[1]))
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry.depth() >= 3
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
}

/// Walk settings for one search run.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub cache_root: PathBuf,
    pub words: Vec<String>,
    /// Extension allow-list as `.ext`, lower-case.
    pub filetypes: Vec<String>,
}

impl SearchOptions {
    pub fn new(cache_root: impl Into<PathBuf>, words: Vec<String>, filetypes: Vec<String>) -> Self {
        Self {
            cache_root: cache_root.into(),
            words,
            filetypes,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.folder.clone(),
            settings.words.clone(),
            settings.filetypes.clone(),
        )
    }

    pub fn should_scan(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        let ext = format!(".{}", ext.to_lowercase());
        self.filetypes.iter().any(|allowed| *allowed == ext)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSummary {
    pub repos_seen: usize,
    pub repos_with_hits: usize,
    pub files_scanned: usize,
    pub files_with_hits: usize,
    pub unreadable: usize,
}

pub type SearchProgressCallback = Arc<dyn Fn(&Path) + Send + Sync>;

/// Walks the cache and streams both report tables.
pub struct TreeAggregator {
    options: SearchOptions,
    progress_callback: Option<SearchProgressCallback>,
}

impl TreeAggregator {
    pub fn new(options: SearchOptions) -> Self {
        Self {
            options,
            progress_callback: None,
        }
    }

    /// Called with every file about to be scanned.
    pub fn with_progress_callback(mut self, callback: SearchProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn run<W: Write>(&self, writer: &mut ReportWriter<W>) -> Result<SearchSummary> {
        let root = self.options.cache_root.as_path();
        let mut accumulator = RepoAccumulator::new();
        let mut summary = SearchSummary::default();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_excluded(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable path: {}", e);
                    continue;
                }
            };
            let path = entry.path();

            if entry.file_type().is_dir() {
                if is_repo_root(root, path) {
                    debug!("Repository root {}", path.display());
                    summary.repos_seen += 1;
                    if let Some(done) = accumulator.open(path) {
                        self.flush_repo(writer, done, &mut summary)?;
                    }
                }
                continue;
            }

            if !entry.file_type().is_file() || !self.options.should_scan(path) {
                continue;
            }

            // Only files below the open repository are attributed.
            let Some(owner) = repo_root_of(root, path) else {
                continue;
            };
            if accumulator.current_root() != Some(owner.as_path()) {
                continue;
            }

            if let Some(ref callback) = self.progress_callback {
                callback(path);
            }

            let hits = match search_file(path, &self.options.words) {
                Ok(hits) => hits,
                Err(e) => {
                    warn!("Could not read {}: {}", path.display(), e);
                    summary.unreadable += 1;
                    continue;
                }
            };
            summary.files_scanned += 1;

            if hits.total > 0 {
                writer.write_match(&file_url(root, path), &hits)?;
                summary.files_with_hits += 1;
                accumulator.record(&hits);
            }
        }

        if let Some(done) = accumulator.finish() {
            self.flush_repo(writer, done, &mut summary)?;
        }
        writer.flush()?;

        info!(
            "Scanned {} files in {} repos: {} files and {} repos with hits",
            summary.files_scanned,
            summary.repos_seen,
            summary.files_with_hits,
            summary.repos_with_hits
        );
        Ok(summary)
    }

    fn flush_repo<W: Write>(
        &self,
        writer: &mut ReportWriter<W>,
        totals: RepoTotals,
        summary: &mut SearchSummary,
    ) -> Result<()> {
        if totals.total == 0 {
            return Ok(());
        }
        let head = latest_commit(&totals.root_folder);
        let url = file_url(&self.options.cache_root, &totals.root_folder);
        writer.write_repo(&url, &totals, &head)?;
        summary.repos_with_hits += 1;
        Ok(())
    }
}

/// Scan the whole cache into `writer`.
pub fn search_repos<W: Write>(
    options: SearchOptions,
    writer: &mut ReportWriter<W>,
) -> Result<SearchSummary> {
    TreeAggregator::new(options).run(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_count_is_case_insensitive() {
        let hits = FileHits::scan("a.go", "FooFooFoo", &words(&["foo"]));
        assert_eq!(hits.count("foo"), 3);
        assert_eq!(hits.total, 3);
    }

    #[test]
    fn test_empty_content() {
        let hits = FileHits::scan("a.go", "", &words(&["TODO", "FIXME"]));
        assert_eq!(hits.count("TODO"), 0);
        assert_eq!(hits.count("FIXME"), 0);
        assert_eq!(hits.total, 0);
    }

    #[test]
    fn test_non_overlapping() {
        let (counts, total) = count_keywords("aaaa", &words(&["aa"]));
        assert_eq!(counts["aa"], 2);
        assert_eq!(total, 2);
    }

    #[test]
    fn test_empty_keyword_is_ignored() {
        let (counts, total) = count_keywords("anything", &words(&["", "any"]));
        assert!(!counts.contains_key(""));
        assert_eq!(total, 1);
    }

    #[test]
    fn test_repo_root_detection() {
        let root = Path::new("/cache");
        assert!(is_repo_root(root, Path::new("/cache/orgA/repoX")));
        assert!(!is_repo_root(root, Path::new("/cache/orgA")));
        assert!(!is_repo_root(root, Path::new("/cache/orgA/repoX/src")));
        assert!(!is_repo_root(root, Path::new("/elsewhere/orgA/repoX")));
    }

    #[test]
    fn test_repo_root_of() {
        let root = Path::new("/cache");
        assert_eq!(
            repo_root_of(root, Path::new("/cache/orgA/repoX/src/main.go")),
            Some(PathBuf::from("/cache/orgA/repoX"))
        );
        assert_eq!(repo_root_of(root, Path::new("/cache/orgA/repodata.json")), None);
        assert_eq!(repo_root_of(root, Path::new("/cache/logfile.csv")), None);
    }

    #[test]
    fn test_accumulator_transitions() {
        let mut acc = RepoAccumulator::new();
        assert_eq!(acc.state(), &AggregatorState::NoRepoOpen);

        let hits = FileHits::scan("a.go", "todo todo", &words(&["todo"]));
        assert!(!acc.record(&hits));

        assert!(acc.open("/cache/o/r1").is_none());
        assert_eq!(acc.current_root(), Some(Path::new("/cache/o/r1")));
        assert!(acc.record(&hits));
        assert!(acc.record(&hits));

        let first = acc.open("/cache/o/r2").unwrap();
        assert_eq!(first.root_folder, PathBuf::from("/cache/o/r1"));
        assert_eq!(first.total, 4);
        assert_eq!(first.count("todo"), 4);

        let second = acc.finish().unwrap();
        assert_eq!(second.total, 0);
        assert_eq!(acc.state(), &AggregatorState::NoRepoOpen);
        assert!(acc.finish().is_none());
    }

    #[test]
    fn test_should_scan() {
        let options = SearchOptions::new("/cache", vec![], words(&[".go", ".py"]));
        assert!(options.should_scan(Path::new("main.go")));
        assert!(options.should_scan(Path::new("MAIN.GO")));
        assert!(options.should_scan(Path::new("x/y/setup.py")));
        assert!(!options.should_scan(Path::new("lib.rs")));
        assert!(!options.should_scan(Path::new("Makefile")));
    }
}
