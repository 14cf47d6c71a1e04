//! Report filtering against a published repository allow-list.
//!
//! Rows of one organization are kept only when the allow-list names their
//! repository; rows of every other organization pass through untouched.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_FILTER_ORG: &str = "googleapis";
pub const DEFAULT_ALLOWLIST_URL: &str =
    "https://raw.githubusercontent.com/googleapis/sloth/master/repos.json";

#[derive(Debug, Deserialize)]
struct AllowListDocument {
    repos: Vec<AllowListRecord>,
}

#[derive(Debug, Deserialize)]
struct AllowListRecord {
    repo: String,
}

/// Allowed repository names of one organization, lower-case.
#[derive(Debug, Clone)]
pub struct AllowList {
    org: String,
    repos: HashSet<String>,
}

impl AllowList {
    pub fn new<I, S>(org: &str, repos: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            org: org.to_lowercase(),
            repos: repos
                .into_iter()
                .map(|repo| repo.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Parse `{"repos": [{"repo": "org/name"}, ...]}`, keeping `org`'s entries.
    pub fn parse(text: &str, org: &str) -> Result<Self> {
        let document: AllowListDocument = serde_json::from_str(text)?;
        let org = org.to_lowercase();

        let repos: Vec<String> = document
            .repos
            .iter()
            .filter_map(|record| record.repo.split_once('/'))
            .filter(|(owner, _)| owner.to_lowercase() == org)
            .map(|(_, name)| name.to_string())
            .collect();

        Ok(Self::new(&org, repos))
    }

    /// Load from an `http(s)` URL or a local file.
    pub async fn load(source: &str, org: &str, client: &reqwest::Client) -> Result<Self> {
        let text = if source.starts_with("http://") || source.starts_with("https://") {
            debug!("Fetching allow-list {}", source);
            client
                .get(source)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?
        } else {
            fs::read_to_string(source).map_err(|e| Error::Config {
                path: PathBuf::from(source),
                message: e.to_string(),
            })?
        };
        Self::parse(&text, org)
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Whether a report row for `org/repo` survives the filter.
    pub fn permits(&self, org: &str, repo: &str) -> bool {
        org.to_lowercase() != self.org || self.repos.contains(&repo.to_lowercase())
    }
}

/// First cell of a CSV line, unquoted.
pub fn first_csv_field(line: &str) -> String {
    let Some(rest) = line.strip_prefix('"') else {
        return line.split(',').next().unwrap_or_default().to_string();
    };

    let mut field = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                field.push('"');
                chars.next();
            } else {
                break;
            }
        } else {
            field.push(c);
        }
    }
    field
}

/// `https://github.com/<org>/<repo>/...` to `(org, repo)`.
pub fn org_repo_from_url(url: &str) -> Option<(&str, &str)> {
    let mut parts = url.split('/');
    let org = parts.nth(3)?;
    let repo = parts.next()?;
    if org.is_empty() || repo.is_empty() {
        return None;
    }
    Some((org, repo))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterSummary {
    pub kept: usize,
    pub dropped: usize,
}

/// Copy `input` to `output`, dropping rows the allow-list rejects.
///
/// The header row (first cell `url`) and rows whose URL is not a repository
/// URL are always copied. Kept lines are written byte-for-byte.
pub fn filter_lines<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    allow: &AllowList,
) -> Result<FilterSummary> {
    let mut summary = FilterSummary::default();

    for line in input.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        let url = first_csv_field(&line);
        let keep = if url == "url" {
            true
        } else {
            match org_repo_from_url(&url) {
                Some((org, repo)) => allow.permits(org, repo),
                None => {
                    warn!("Row without a repository URL kept: {}", url);
                    true
                }
            }
        };

        if keep {
            writeln!(output, "{}", line)?;
            summary.kept += 1;
        } else {
            summary.dropped += 1;
        }
    }

    output.flush()?;
    Ok(summary)
}

pub fn filter_report(input: &Path, output: &Path, allow: &AllowList) -> Result<FilterSummary> {
    let reader = BufReader::new(File::open(input)?);
    let writer = BufWriter::new(File::create(output)?);
    filter_lines(reader, writer, allow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_csv_field() {
        assert_eq!(first_csv_field("url,TODO,total"), "url");
        assert_eq!(first_csv_field("https://github.com/a/b,1,1"), "https://github.com/a/b");
        assert_eq!(first_csv_field("\"https://x/a,b\",1"), "https://x/a,b");
        assert_eq!(first_csv_field("\"say \"\"hi\"\"\",2"), "say \"hi\"");
        assert_eq!(first_csv_field(""), "");
    }

    #[test]
    fn test_org_repo_from_url() {
        assert_eq!(
            org_repo_from_url("https://github.com/acme/widgets/blob/master/a.go"),
            Some(("acme", "widgets"))
        );
        assert_eq!(
            org_repo_from_url("https://github.com/acme/widgets"),
            Some(("acme", "widgets"))
        );
        assert_eq!(org_repo_from_url("https://github.com/acme"), None);
        assert_eq!(org_repo_from_url("not a url"), None);
    }

    #[test]
    fn test_permits() {
        let allow = AllowList::new("GoogleAPIs", ["google-cloud-go"]);
        assert!(allow.permits("googleapis", "Google-Cloud-Go"));
        assert!(!allow.permits("googleapis", "secret-repo"));
        assert!(allow.permits("acme", "anything"));
    }
}
