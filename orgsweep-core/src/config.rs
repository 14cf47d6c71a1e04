//! Run settings, read from `config.json`.
//!
//! ```json
//! {
//!     "folder": "~/gh-cache",
//!     "overwrite": false,
//!     "organizations": ["acme", "acme-labs"],
//!     "username": "octocat",
//!     "PAT": "ghp_...",
//!     "words": ["TODO", "FIXME"],
//!     "filetypes": [".go", ".rs", ".py"]
//! }
//! ```

use crate::error::{Error, Result};
use orgsweep_github::{Credentials, GITHUB_API_BASE};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_SKIPLIST_FILE: &str = "skiplist.txt";
pub const LOGFILE_NAME: &str = "logfile.csv";
pub const REPODATA_NAME: &str = "repodata.json";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Cache root; every organization is cloned into a subfolder of it.
    pub folder: PathBuf,
    /// Delete and re-clone instead of resuming.
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub organizations: Vec<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default, rename = "PAT")]
    pub pat: String,
    /// Search keywords, in report column order.
    #[serde(default)]
    pub words: Vec<String>,
    /// Extensions to scan, normalized to `.ext` lower-case.
    #[serde(default)]
    pub filetypes: Vec<String>,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default = "default_skiplist")]
    pub skiplist: PathBuf,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_skiplist() -> PathBuf {
    PathBuf::from(DEFAULT_SKIPLIST_FILE)
}

fn default_api_base() -> String {
    GITHUB_API_BASE.to_string()
}

impl Settings {
    /// Load and normalize settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&text, path)
    }

    /// Parse settings from JSON text; `origin` only labels errors.
    pub fn from_json(text: &str, origin: &Path) -> Result<Self> {
        let settings: Settings = serde_json::from_str(text).map_err(|e| Error::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;

        if settings.folder.as_os_str().is_empty() {
            return Err(Error::Config {
                path: origin.to_path_buf(),
                message: "\"folder\" must not be empty".to_string(),
            });
        }

        Ok(settings.normalized())
    }

    fn normalized(mut self) -> Self {
        let folder = self.folder.to_string_lossy().into_owned();
        self.folder = PathBuf::from(shellexpand::tilde(&folder).as_ref());
        self.words = normalize_words(&self.words);
        self.filetypes = self
            .filetypes
            .iter()
            .filter_map(|ext| normalize_filetype(ext))
            .collect();
        self
    }

    /// Default API credentials, `None` when neither username nor PAT is set.
    pub fn credentials(&self) -> Option<Credentials> {
        let creds = Credentials::new(self.username.clone(), self.pat.clone());
        (!creds.is_empty()).then_some(creds)
    }

    pub fn org_folder(&self, org: &str) -> PathBuf {
        self.folder.join(org)
    }

    pub fn logfile(&self) -> PathBuf {
        self.folder.join(LOGFILE_NAME)
    }
}

/// Drop empty keywords and case-insensitive duplicates, keeping first occurrences.
pub fn normalize_words(words: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for word in words {
        if word.is_empty() {
            warn!("Ignoring empty search keyword");
            continue;
        }
        if !seen.insert(word.to_lowercase()) {
            warn!("Ignoring duplicate search keyword '{}'", word);
            continue;
        }
        result.push(word.clone());
    }

    result
}

/// `"GO"`, `".go"` and `" .Go "` all become `".go"`.
pub fn normalize_filetype(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.').to_lowercase();
    if ext.is_empty() {
        None
    } else {
        Some(format!(".{}", ext))
    }
}
