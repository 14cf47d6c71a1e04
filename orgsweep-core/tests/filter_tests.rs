// Tests for filtering reports against a repository allow-list

use orgsweep_core::filter::{AllowList, DEFAULT_FILTER_ORG, filter_lines, filter_report};
use std::fs;
use std::io::Cursor;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ALLOWLIST: &str = r#"{
    "repos": [
        {"repo": "googleapis/google-cloud-go", "language": "go"},
        {"repo": "GoogleAPIs/Nodejs-Storage"},
        {"repo": "other-org/not-counted"},
        {"repo": "malformed"}
    ]
}"#;

const REPORT: &str = "\
url,TODO,total
https://github.com/googleapis/google-cloud-go/blob/master/a.go,1,1
https://github.com/googleapis/secret-tool/blob/master/b.go,2,2
https://github.com/googleapis/nodejs-storage,3,3
https://github.com/acme/widgets/blob/master/c.go,4,4
";

// ============================================================================
// Allow-list Tests
// ============================================================================

#[test]
fn test_parse_keeps_only_target_org() {
    let allow = AllowList::parse(ALLOWLIST, DEFAULT_FILTER_ORG).unwrap();
    assert_eq!(allow.org(), "googleapis");
    assert_eq!(allow.len(), 2);
    assert!(allow.permits("googleapis", "google-cloud-go"));
    assert!(allow.permits("googleapis", "nodejs-storage"));
    assert!(!allow.permits("googleapis", "not-counted"));
}

#[test]
fn test_parse_rejects_bad_document() {
    assert!(AllowList::parse("{\"nope\": []}", "googleapis").is_err());
}

#[tokio::test]
async fn test_load_from_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/googleapis/sloth/master/repos.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ALLOWLIST))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/googleapis/sloth/master/repos.json", server.uri());
    let allow = AllowList::load(&url, "googleapis", &reqwest::Client::new())
        .await
        .unwrap();
    assert_eq!(allow.len(), 2);
}

#[tokio::test]
async fn test_load_from_url_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/repos.json", server.uri());
    let result = AllowList::load(&url, "googleapis", &reqwest::Client::new()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("repos.json");
    fs::write(&file, ALLOWLIST).unwrap();

    let allow = AllowList::load(file.to_str().unwrap(), "googleapis", &reqwest::Client::new())
        .await
        .unwrap();
    assert_eq!(allow.len(), 2);
}

// ============================================================================
// Row Filtering Tests
// ============================================================================

#[test]
fn test_filter_lines() {
    let allow = AllowList::parse(ALLOWLIST, "googleapis").unwrap();
    let mut out = Vec::new();

    let summary = filter_lines(Cursor::new(REPORT), &mut out, &allow).unwrap();

    assert_eq!(summary.kept, 4);
    assert_eq!(summary.dropped, 1);
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("url,TODO,total\n"));
    assert!(!text.contains("secret-tool"));
    assert!(text.contains("nodejs-storage,3,3"));
    assert!(text.contains("acme/widgets"));
}

#[test]
fn test_filter_report_files() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("repos.csv");
    let output = dir.path().join("filtered.csv");
    fs::write(&input, REPORT).unwrap();

    let allow = AllowList::new("googleapis", Vec::<String>::new());
    let summary = filter_report(&input, &output, &allow).unwrap();

    assert_eq!(summary.kept, 2);
    assert_eq!(summary.dropped, 3);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "url,TODO,total\nhttps://github.com/acme/widgets/blob/master/c.go,4,4\n"
    );
}
