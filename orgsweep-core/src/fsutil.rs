// Filesystem helpers for the clone cache

use std::fs;
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Total size in bytes of everything below `path`.
///
/// Symbolic links are counted by their own size and never followed.
pub fn folder_size(path: &Path) -> u64 {
    if !path.is_dir() {
        return 0;
    }

    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| !entry.file_type().is_dir())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

/// Whether `path` is a directory with at least one entry.
pub fn is_non_empty_dir(path: &Path) -> bool {
    path.is_dir()
        && fs::read_dir(path)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
}

/// Remove a folder and everything in it.
///
/// Read-only entries (git pack files on some platforms) make the first
/// attempt fail; they are made writable and removal is retried once after a
/// short pause. Whatever still fails is logged and swallowed.
pub fn force_remove_dir(path: &Path) {
    if !path.is_dir() {
        return;
    }

    if let Err(first) = fs::remove_dir_all(path) {
        debug!("Retrying removal of {}: {}", path.display(), first);
        clear_readonly(path);
        sleep(Duration::from_millis(100));

        if let Err(e) = fs::remove_dir_all(path) {
            warn!("Could not fully remove {}: {}", path.display(), e);
        }
    }
}

fn clear_readonly(path: &Path) {
    for entry in WalkDir::new(path).follow_links(false).into_iter().flatten() {
        if entry.path_is_symlink() {
            continue;
        }
        if let Err(e) = make_writable(entry.path()) {
            debug!("Could not clear read-only flag on {}: {}", entry.path().display(), e);
        }
    }
}

#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    if permissions.readonly() {
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_folder_size_sums_nested_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), vec![0u8; 100]).unwrap();
        fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        fs::write(dir.path().join("sub/b.txt"), vec![0u8; 50]).unwrap();
        fs::write(dir.path().join("sub/deeper/c.txt"), vec![0u8; 25]).unwrap();

        assert_eq!(folder_size(dir.path()), 175);
    }

    #[test]
    fn test_folder_size_missing_folder() {
        let dir = TempDir::new().unwrap();
        assert_eq!(folder_size(&dir.path().join("nope")), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_folder_size_does_not_follow_symlinks() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("big.bin"), vec![0u8; 10_000]).unwrap();
        fs::write(dir.path().join("small.txt"), vec![0u8; 10]).unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        // cycle back to the root
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

        let size = folder_size(dir.path());
        assert!(size >= 10);
        assert!(size < 10_000);
    }

    #[test]
    fn test_is_non_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(!is_non_empty_dir(&dir.path().join("missing")));
        assert!(!is_non_empty_dir(dir.path()));

        fs::write(dir.path().join("f"), "x").unwrap();
        assert!(is_non_empty_dir(dir.path()));
        assert!(!is_non_empty_dir(&dir.path().join("f")));
    }

    #[test]
    fn test_force_remove_dir_with_readonly_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("repo");
        fs::create_dir_all(target.join(".git/objects")).unwrap();
        let packed = target.join(".git/objects/pack.idx");
        fs::write(&packed, "data").unwrap();

        let mut permissions = fs::metadata(&packed).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&packed, permissions).unwrap();

        force_remove_dir(&target);
        assert!(!target.exists());
    }

    #[test]
    fn test_force_remove_dir_missing_is_noop() {
        let dir = TempDir::new().unwrap();
        force_remove_dir(&dir.path().join("missing"));
        assert!(dir.path().exists());
    }
}
