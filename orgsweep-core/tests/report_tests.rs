// Tests for the matches.csv / repos.csv writers

use orgsweep_core::git::HeadInfo;
use orgsweep_core::report::{ReportWriter, csv_line, file_url};
use orgsweep_core::search::{FileHits, RepoTotals};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

// ============================================================================
// URL Synthesis Tests
// ============================================================================

#[test]
fn test_file_url_deep_path() {
    let root = Path::new("/cache");
    assert_eq!(
        file_url(root, Path::new("/cache/acme/app/a/b/c.go")),
        "https://github.com/acme/app/blob/master/a/b/c.go"
    );
}

#[test]
fn test_file_url_repo_root() {
    assert_eq!(
        file_url(Path::new("/cache"), Path::new("/cache/acme/app")),
        "https://github.com/acme/app"
    );
}

// ============================================================================
// CSV Tests
// ============================================================================

#[test]
fn test_csv_line_quotes_only_when_needed() {
    assert_eq!(csv_line(["a", "b,c", "d\"e"]), "a,\"b,c\",\"d\"\"e\"");
}

#[test]
fn test_writer_rows_follow_keyword_order() {
    let list = words(&["FIXME", "TODO"]);
    let mut writer = ReportWriter::new(Vec::new(), Vec::new(), &list).unwrap();

    let hits = FileHits::scan("/cache/acme/app/x.go", "todo todo fixme", &list);
    writer
        .write_match("https://github.com/acme/app/blob/master/x.go", &hits)
        .unwrap();

    let mut totals = RepoTotals::new("/cache/acme/app");
    totals.add(&hits);
    let head = HeadInfo::Known {
        branch: "main".to_string(),
        sha: "deadbeef".to_string(),
    };
    writer
        .write_repo("https://github.com/acme/app", &totals, &head)
        .unwrap();

    let (matches, repos) = writer.into_inner().unwrap();
    assert_eq!(
        String::from_utf8(matches).unwrap(),
        "url,FIXME,TODO,total\nhttps://github.com/acme/app/blob/master/x.go,1,2,3\n"
    );
    assert_eq!(
        String::from_utf8(repos).unwrap(),
        "url,FIXME,TODO,total,branch,last_commit\nhttps://github.com/acme/app,1,2,3,main,deadbeef\n"
    );
}

#[test]
fn test_unknown_head_writes_empty_cells() {
    let list = words(&["TODO"]);
    let mut writer = ReportWriter::new(Vec::new(), Vec::new(), &list).unwrap();

    let mut totals = RepoTotals::new("/cache/acme/app");
    totals.add(&FileHits::scan("f.go", "todo", &list));
    writer
        .write_repo("https://github.com/acme/app", &totals, &HeadInfo::Unknown)
        .unwrap();

    let (_, repos) = writer.into_inner().unwrap();
    assert!(String::from_utf8(repos).unwrap().ends_with(",1,1,,\n"));
}

#[test]
fn test_create_truncates_existing_files() {
    let dir = TempDir::new().unwrap();
    let matches = dir.path().join("matches.csv");
    let repos = dir.path().join("repos.csv");
    fs::write(&matches, "old contents\nmore\n").unwrap();

    let mut writer = ReportWriter::create(&matches, &repos, &words(&["TODO"])).unwrap();
    writer.flush().unwrap();
    drop(writer);

    assert_eq!(fs::read_to_string(&matches).unwrap(), "url,TODO,total\n");
    assert_eq!(
        fs::read_to_string(&repos).unwrap(),
        "url,TODO,total,branch,last_commit\n"
    );
}
