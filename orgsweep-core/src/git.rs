// Local git metadata and the clone collaborator

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Default branch and tip commit of a cloned repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadInfo {
    Known { branch: String, sha: String },
    /// No `.git` metadata, or not exactly one local branch.
    Unknown,
}

impl HeadInfo {
    pub fn branch(&self) -> &str {
        match self {
            HeadInfo::Known { branch, .. } => branch,
            HeadInfo::Unknown => "",
        }
    }

    pub fn sha(&self) -> &str {
        match self {
            HeadInfo::Known { sha, .. } => sha,
            HeadInfo::Unknown => "",
        }
    }
}

/// Read the branch and latest commit of a fresh clone from `.git/refs/heads`.
///
/// A fresh clone has exactly one loose branch ref, the default branch. Any
/// other layout is reported as [`HeadInfo::Unknown`].
pub fn latest_commit(repo_folder: &Path) -> HeadInfo {
    let heads = repo_folder.join(".git").join("refs").join("heads");

    let Ok(entries) = fs::read_dir(&heads) else {
        return HeadInfo::Unknown;
    };

    let branches: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .collect();

    if branches.len() != 1 {
        debug!(
            "{} local branch refs in {}, head unknown",
            branches.len(),
            repo_folder.display()
        );
        return HeadInfo::Unknown;
    }

    let branch = branches[0].file_name().to_string_lossy().into_owned();
    match fs::read_to_string(branches[0].path()) {
        Ok(sha) => HeadInfo::Known {
            branch,
            sha: sha.trim().to_string(),
        },
        Err(_) => HeadInfo::Unknown,
    }
}

/// Branch and latest commit of every repository folder in an organization
/// folder, sorted by folder name.
pub fn repo_heads(org_folder: &Path) -> Result<Vec<(PathBuf, HeadInfo)>> {
    let mut folders: Vec<PathBuf> = fs::read_dir(org_folder)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    folders.sort();

    Ok(folders
        .into_iter()
        .map(|folder| {
            let head = latest_commit(&folder);
            (folder, head)
        })
        .collect())
}

/// Materializes a remote repository into a local folder.
pub trait Cloner {
    fn clone_repo(&self, url: &str, folder: &Path) -> Result<()>;
}

/// Clones with the `git` executable on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl Cloner for GitCli {
    fn clone_repo(&self, url: &str, folder: &Path) -> Result<()> {
        debug!("git clone {} {}", url, folder.display());

        let output = Command::new("git")
            .arg("clone")
            .arg("--quiet")
            .arg(url)
            .arg(folder)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::Clone {
                url: url.to_string(),
                message: format!("could not run git: {}", e),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::Clone {
                url: url.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
