pub mod catalog;
pub mod clone;
pub mod config;
pub mod error;
pub mod filter;
pub mod fsutil;
pub mod git;
pub mod report;
pub mod search;

use colored::Colorize;

pub use catalog::{CatalogEntry, RepoRecord, catalog_from_listing, repo_list};
pub use clone::{
    CloneEvent, CloneMetrics, CloneOptions, CloneOrchestrator, CloneProgressCallback,
    CloneTotals, SkipList, SkipReason,
};
pub use config::Settings;
pub use error::{Error, Result};
pub use filter::{AllowList, FilterSummary, filter_report};
pub use git::{Cloner, GitCli, HeadInfo, latest_commit, repo_heads};
pub use report::ReportWriter;
pub use search::{
    AggregatorState, FileHits, RepoAccumulator, RepoTotals, SearchOptions,
    SearchProgressCallback, SearchSummary, TreeAggregator, search_repos,
};

pub fn print_banner() {
    let banner = r#"
  ___  _ __ __ _ _____      _____  ___ _ __
 / _ \| '__/ _` / __\ \ /\ / / _ \/ _ \ '_ \
| (_) | | | (_| \__ \\ V  V /  __/  __/ |_) |
 \___/|_|  \__, |___/ \_/\_/ \___|\___| .__/
           |___/                      |_|
"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "clone and search every repo of a GitHub org".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
