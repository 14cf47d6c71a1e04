// Report generation: matches.csv and repos.csv

use crate::error::Result;
use crate::git::HeadInfo;
use crate::search::{FileHits, RepoTotals};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path};

pub const DEFAULT_MATCHES_FILE: &str = "matches.csv";
pub const DEFAULT_REPOS_FILE: &str = "repos.csv";

/// Quote a CSV cell when it holds a comma, quote or line break.
pub fn csv_escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

pub fn csv_line<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|field| csv_escape(field.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn matches_header(words: &[String]) -> String {
    csv_line(
        std::iter::once("url")
            .chain(words.iter().map(String::as_str))
            .chain(std::iter::once("total")),
    )
}

pub fn repos_header(words: &[String]) -> String {
    csv_line(
        std::iter::once("url")
            .chain(words.iter().map(String::as_str))
            .chain(["total", "branch", "last_commit"]),
    )
}

/// GitHub URL of a file (or repository folder) inside the cache.
///
/// `<cache>/acme/widgets/src/main.go` becomes
/// `https://github.com/acme/widgets/blob/master/src/main.go`; the repository
/// folder itself becomes `https://github.com/acme/widgets`.
pub fn file_url(cache_root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(cache_root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().replace('\\', "/")),
            _ => None,
        })
        .collect();

    let split = parts.len().min(2);
    let repo = parts[..split].join("/");
    let rest = parts[split..].join("/");

    if rest.is_empty() {
        format!("https://github.com/{}", repo)
    } else {
        format!("https://github.com/{}/blob/master/{}", repo, rest)
    }
}

/// Streams the two report tables.
///
/// Rows are written as they are produced; only the column order (the
/// configured keywords) is held.
pub struct ReportWriter<W: Write> {
    matches: W,
    repos: W,
    words: Vec<String>,
    match_rows: usize,
    repo_rows: usize,
}

impl ReportWriter<BufWriter<File>> {
    /// Create (truncating) both report files and write their headers.
    pub fn create(matches_path: &Path, repos_path: &Path, words: &[String]) -> Result<Self> {
        let matches = BufWriter::new(File::create(matches_path)?);
        let repos = BufWriter::new(File::create(repos_path)?);
        Self::new(matches, repos, words)
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(mut matches: W, mut repos: W, words: &[String]) -> Result<Self> {
        writeln!(matches, "{}", matches_header(words))?;
        writeln!(repos, "{}", repos_header(words))?;

        Ok(Self {
            matches,
            repos,
            words: words.to_vec(),
            match_rows: 0,
            repo_rows: 0,
        })
    }

    pub fn write_match(&mut self, url: &str, hits: &FileHits) -> Result<()> {
        let mut fields = vec![url.to_string()];
        fields.extend(self.words.iter().map(|word| hits.count(word).to_string()));
        fields.push(hits.total.to_string());

        writeln!(self.matches, "{}", csv_line(&fields))?;
        self.match_rows += 1;
        Ok(())
    }

    pub fn write_repo(&mut self, url: &str, totals: &RepoTotals, head: &HeadInfo) -> Result<()> {
        let mut fields = vec![url.to_string()];
        fields.extend(self.words.iter().map(|word| totals.count(word).to_string()));
        fields.push(totals.total.to_string());
        fields.push(head.branch().to_string());
        fields.push(head.sha().to_string());

        writeln!(self.repos, "{}", csv_line(&fields))?;
        self.repo_rows += 1;
        Ok(())
    }

    pub fn match_rows(&self) -> usize {
        self.match_rows
    }

    pub fn repo_rows(&self) -> usize {
        self.repo_rows
    }

    pub fn flush(&mut self) -> Result<()> {
        self.matches.flush()?;
        self.repos.flush()?;
        Ok(())
    }

    /// Flush and hand back the underlying writers.
    pub fn into_inner(mut self) -> Result<(W, W)> {
        self.flush()?;
        Ok((self.matches, self.repos))
    }
}
