//! `Link` header parsing and exhaustive page collection.
//!
//! GitHub paginates listing endpoints and advertises the neighbouring pages in
//! an RFC 5988 style header:
//!
//! `<https://api.github.com/orgs/acme/repos?per_page=100&page=2>; rel="next", <...&page=5>; rel="last"`

use crate::client::ApiContext;
use crate::error::Result;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LINK};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// The four relations GitHub emits, in header order.
pub const STANDARD_RELATIONS: [&str; 4] = ["first", "prev", "next", "last"];

/// One decoded entry of a `Link` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub url: String,
    /// Value of the `page` query parameter, when present and numeric.
    pub page: Option<u32>,
}

impl PageLink {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let page = page_param(&url);
        Self { url, page }
    }
}

/// Page links decoded from a single response.
///
/// Built fresh for every response: a relation missing from the header is
/// `None`, never carried over from an earlier page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub first: Option<PageLink>,
    pub prev: Option<PageLink>,
    pub next: Option<PageLink>,
    pub last: Option<PageLink>,
    /// Relations outside the standard four, keyed by relation name.
    pub other: BTreeMap<String, PageLink>,
}

impl PageLinks {
    /// Parse the raw value of a `Link` header.
    pub fn parse(link_header: &str) -> Self {
        let mut links = PageLinks::default();

        for entry in link_header.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let segments: Vec<&str> = entry.split(';').collect();
            if segments.len() < 2 {
                debug!("Ignoring link entry without a relation: {}", entry);
                continue;
            }

            let url = segments[0]
                .trim()
                .trim_start_matches('<')
                .trim_end_matches('>');
            let rel = segments[segments.len() - 1]
                .rsplit('=')
                .next()
                .unwrap_or_default()
                .trim()
                .trim_matches('"');

            if rel.is_empty() {
                continue;
            }

            links.insert(rel, PageLink::new(url));
        }

        links
    }

    /// Parse the `Link` header of a response. No header means no links.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .map(Self::parse)
            .unwrap_or_default()
    }

    fn insert(&mut self, rel: &str, link: PageLink) {
        match rel {
            "first" => self.first = Some(link),
            "prev" => self.prev = Some(link),
            "next" => self.next = Some(link),
            "last" => self.last = Some(link),
            other => {
                self.other.insert(other.to_string(), link);
            }
        }
    }

    pub fn get(&self, rel: &str) -> Option<&PageLink> {
        match rel {
            "first" => self.first.as_ref(),
            "prev" => self.prev.as_ref(),
            "next" => self.next.as_ref(),
            "last" => self.last.as_ref(),
            other => self.other.get(other),
        }
    }

    pub fn next_url(&self) -> Option<&str> {
        self.next.as_ref().map(|link| link.url.as_str())
    }

    /// Total number of pages, as advertised by the `last` relation.
    pub fn total_pages(&self) -> Option<u32> {
        self.last.as_ref().and_then(|link| link.page)
    }

    /// Number of relations present in the header.
    pub fn populated(&self) -> usize {
        STANDARD_RELATIONS
            .iter()
            .filter(|rel| self.get(rel).is_some())
            .count()
            + self.other.len()
    }

    /// Flat `<rel>URL` / `<rel>page` view.
    ///
    /// Always carries the eight keys of the standard relations (empty strings
    /// when absent) plus two keys per extra relation.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        let extra = self.other.keys().map(String::as_str);

        for rel in STANDARD_RELATIONS.into_iter().chain(extra) {
            let (url, page) = match self.get(rel) {
                Some(link) => (
                    link.url.clone(),
                    link.page.map(|p| p.to_string()).unwrap_or_default(),
                ),
                None => (String::new(), String::new()),
            };
            map.insert(format!("{}URL", rel), url);
            map.insert(format!("{}page", rel), page);
        }

        map
    }
}

/// Extract the `page` query parameter from a URL.
fn page_param(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();

    query
        .split('&')
        .find_map(|param| param.strip_prefix("page="))
        .and_then(|value| value.trim().parse().ok())
}

/// Fetch every page of a listing endpoint and concatenate the elements.
///
/// Elements keep the server's order. A page that is not a success still has
/// its `Link` header followed, so a transient error in the middle of a chain
/// only loses that page. The loop ends when a response advertises no `next`
/// link; a server that never stops advertising one is followed forever.
pub async fn fetch_all_pages<T: DeserializeOwned>(
    ctx: &mut ApiContext,
    endpoint: &str,
    headers: Option<&HeaderMap>,
) -> Result<Vec<T>> {
    let mut payload: Vec<T> = Vec::new();
    let mut page_endpoint = Some(endpoint.to_string());
    let mut pages = 0usize;

    while let Some(current) = page_endpoint.take() {
        let Some(response) = ctx.get(Some(&current), None, headers).await? else {
            break;
        };
        pages += 1;

        if response.status != StatusCode::OK {
            warn!(
                "endpoint: {} status: {}, {} bytes returned",
                endpoint,
                response.status,
                response.len()
            );
        } else if ctx.verbose() {
            info!(
                "endpoint: {} status: {}, {} bytes returned",
                endpoint,
                response.status,
                response.len()
            );
        }

        if response.is_success() {
            match serde_json::from_str::<Vec<T>>(&response.body) {
                Ok(items) => {
                    debug!("Page {} of {} returned {} items", pages, endpoint, items.len());
                    payload.extend(items);
                }
                Err(e) => warn!("Unexpected page body from {}: {}", response.url, e),
            }
        }

        page_endpoint = PageLinks::from_headers(&response.headers)
            .next
            .map(|link| link.url);
    }

    debug!(
        "Collected {} items across {} pages from {}",
        payload.len(),
        pages,
        endpoint
    );
    Ok(payload)
}
