use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use orgsweep_core::catalog::repo_list;
use orgsweep_core::clone::{
    CloneEvent, CloneMetrics, CloneOptions, CloneOrchestrator, CloneTotals, SkipList, SkipReason,
};
use orgsweep_core::config::Settings;
use orgsweep_core::filter::{AllowList, filter_report};
use orgsweep_core::git::{GitCli, repo_heads};
use orgsweep_core::report::ReportWriter;
use orgsweep_core::search::{SearchOptions, SearchSummary, TreeAggregator};
use orgsweep_github::ApiContext;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

/// Options given before the subcommand.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: bool,
    pub config: PathBuf,
}

impl GlobalOptions {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            quiet: matches.get_flag("quiet"),
            verbose: matches.get_flag("verbose"),
            config: matches
                .get_one::<PathBuf>("config")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(orgsweep_core::config::DEFAULT_CONFIG_FILE)),
        }
    }
}

// Helper functions

pub fn tracing_level(verbose: bool) -> Level {
    if verbose { Level::DEBUG } else { Level::INFO }
}

pub fn init_tracing(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_level(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Load the config file and apply the global `--verbose` override.
pub fn load_settings(global: &GlobalOptions) -> Result<Settings> {
    let mut settings = Settings::load(&global.config)
        .with_context(|| format!("Could not load {}", global.config.display()))?;
    settings.verbose |= global.verbose;
    Ok(settings)
}

/// Organizations given on the command line replace the configured list.
pub fn resolve_orgs(cli: &[String], configured: &[String]) -> Vec<String> {
    let source = if cli.is_empty() { configured } else { cli };
    source
        .iter()
        .map(|org| org.trim().to_string())
        .filter(|org| !org.is_empty())
        .collect()
}

pub fn api_context(settings: &Settings) -> Result<ApiContext> {
    let ctx = ApiContext::new(settings.credentials())
        .context("Could not build the HTTP client")?
        .with_base_url(&settings.api_base)
        .with_context(|| format!("Invalid api_base {}", settings.api_base))?
        .with_verbose(settings.verbose);
    Ok(ctx)
}

fn spinner(quiet: bool, message: String) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message);
    pb
}

fn print_divider() {
    println!("{}", "═".repeat(78).bright_blue().bold());
}

pub fn clone_table_header() -> String {
    format!(
        "{:<40} {:>10} {:>10} {:>8} {:>8}",
        "repo", "KB-est", "KB-actual", "seconds", "KB/s"
    )
}

pub fn format_clone_row(metrics: &CloneMetrics) -> String {
    format!(
        "{:<40} {:>10} {:>10.0} {:>8.2} {:>8.0}",
        metrics.repo,
        metrics.size_estimate_kb,
        metrics.size_actual_kb,
        metrics.elapsed_seconds,
        metrics.kb_per_second()
    )
}

pub fn format_totals(org: &str, totals: &CloneTotals) -> String {
    format!(
        "{}: {} cloned, {} skipped, {} KB estimated, {:.0} KB actual in {:.2}s ({:.0} KB/s)",
        org,
        totals.cloned,
        totals.skipped,
        totals.size_estimate_kb,
        totals.size_actual_kb,
        totals.elapsed_seconds,
        totals.kb_per_second()
    )
}

fn print_clone_event(event: &CloneEvent) {
    match event {
        CloneEvent::Cloning { .. } => {}
        CloneEvent::Cloned(metrics) => println!("{}", format_clone_row(metrics)),
        CloneEvent::Skipped { repo, reason, .. } => {
            let why = match reason {
                SkipReason::SkipList => "skip-list",
                SkipReason::AlreadyCloned => "already cloned",
            };
            println!("{:<40} {}", repo, why.bright_black());
        }
    }
}

// Handlers

pub async fn handle_clone(args: &ArgMatches, global: &GlobalOptions) -> Result<()> {
    let settings = load_settings(global)?;
    init_tracing(settings.verbose);

    let cli_orgs: Vec<String> = args
        .get_many::<String>("org")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let orgs = resolve_orgs(&cli_orgs, &settings.organizations);
    if orgs.is_empty() {
        bail!("No organizations given: pass --org or set \"organizations\" in the config");
    }

    let overwrite = args.get_flag("overwrite") || settings.overwrite;
    let refresh = !args.get_flag("no-refresh");

    fs::create_dir_all(&settings.folder)
        .with_context(|| format!("Could not create {}", settings.folder.display()))?;
    let skiplist = SkipList::load(&settings.skiplist)
        .with_context(|| format!("Could not read {}", settings.skiplist.display()))?;
    let mut ctx = api_context(&settings)?;

    for org in orgs {
        let pb = spinner(global.quiet, format!("Listing repositories of {}", org));
        let catalog = repo_list(&mut ctx, &settings.folder, &org, refresh)
            .await
            .with_context(|| format!("Could not list repositories of {}", org))?;
        pb.finish_and_clear();

        println!();
        print_divider();
        println!(
            "  {} {} ({} repos)",
            "ORG".bright_white().bold(),
            org.bright_cyan().bold(),
            catalog.len()
        );
        print_divider();
        println!("{}", clone_table_header().bold());

        let options = CloneOptions::new(settings.folder.clone())
            .with_overwrite(overwrite)
            .with_skiplist(skiplist.clone());
        let orchestrator = CloneOrchestrator::new(options, GitCli)
            .with_progress_callback(Arc::new(print_clone_event));

        let org_name = org.clone();
        let totals = tokio::task::spawn_blocking(move || orchestrator.clone_org(&org_name, &catalog))
            .await
            .context("Clone task panicked")?
            .with_context(|| format!("Cloning {} stopped", org))?;

        println!("{} {}", "✓".green().bold(), format_totals(&org, &totals));
    }

    Ok(())
}

pub async fn handle_catalog(args: &ArgMatches, global: &GlobalOptions) -> Result<()> {
    let settings = load_settings(global)?;
    init_tracing(settings.verbose);

    let org = args
        .get_one::<String>("ORG")
        .context("Missing organization")?;
    let refresh = !args.get_flag("no-refresh");
    let mut ctx = api_context(&settings)?;

    let pb = spinner(global.quiet, format!("Listing repositories of {}", org));
    let catalog = repo_list(&mut ctx, &settings.folder, org, refresh)
        .await
        .with_context(|| format!("Could not list repositories of {}", org))?;
    pb.finish_and_clear();

    println!("{}", format!("{:<50} {:>10}", "repo", "KB").bold());
    for entry in &catalog {
        println!("{:<50} {:>10}", entry.name, entry.size_kb);
    }
    let total_kb: u64 = catalog.iter().map(|entry| entry.size_kb).sum();
    println!(
        "{} {} public non-fork repos, {} KB estimated",
        "✓".green().bold(),
        catalog.len(),
        total_kb
    );
    Ok(())
}

pub fn handle_search(args: &ArgMatches, global: &GlobalOptions) -> Result<()> {
    let settings = load_settings(global)?;
    init_tracing(settings.verbose);

    if settings.words.is_empty() {
        bail!("No search keywords: set \"words\" in the config");
    }
    if settings.filetypes.is_empty() {
        bail!("No file types to scan: set \"filetypes\" in the config");
    }

    let matches_path = args
        .get_one::<PathBuf>("matches")
        .context("Missing --matches")?;
    let repos_path = args.get_one::<PathBuf>("repos").context("Missing --repos")?;

    let summary = run_search(&settings, matches_path, repos_path, global.quiet)?;
    println!(
        "{} {} files in {} repos scanned: {} files and {} repos with hits",
        "✓".green().bold(),
        summary.files_scanned,
        summary.repos_seen,
        summary.files_with_hits,
        summary.repos_with_hits
    );
    println!(
        "{} {}, {}",
        "→".blue(),
        matches_path.display().to_string().bright_white(),
        repos_path.display().to_string().bright_white()
    );
    Ok(())
}

/// Scan the cache folder into the two report files.
pub fn run_search(
    settings: &Settings,
    matches_path: &Path,
    repos_path: &Path,
    quiet: bool,
) -> Result<SearchSummary> {
    let mut writer = ReportWriter::create(matches_path, repos_path, &settings.words)
        .context("Could not create the report files")?;

    let pb = spinner(quiet, format!("Scanning {}", settings.folder.display()));
    let progress_pb = pb.clone();
    let aggregator = TreeAggregator::new(SearchOptions::from_settings(settings))
        .with_progress_callback(Arc::new(move |path: &Path| {
            progress_pb.set_message(path.display().to_string());
        }));

    let summary = aggregator.run(&mut writer);
    pb.finish_and_clear();
    summary.context("Search failed")
}

pub fn handle_commits(global: &GlobalOptions) -> Result<()> {
    let settings = load_settings(global)?;
    init_tracing(settings.verbose);

    for org in &settings.organizations {
        let org_folder = settings.org_folder(org);
        if !org_folder.is_dir() {
            println!(
                "{} {} not cloned ({})",
                "⚠".yellow().bold(),
                org,
                org_folder.display()
            );
            continue;
        }

        println!("{}", org.bright_cyan().bold());
        let heads = repo_heads(&org_folder)
            .with_context(|| format!("Could not read {}", org_folder.display()))?;
        for (folder, head) in heads {
            println!("{}", format_commit_line(&folder, head.branch(), head.sha()));
        }
    }
    Ok(())
}

/// `<branch> <sha> <folder>`; an unknown head leaves both fields empty.
pub fn format_commit_line(folder: &Path, branch: &str, sha: &str) -> String {
    format!("{} {} {}", branch, sha, folder.display())
}

pub async fn handle_filter(args: &ArgMatches, global: &GlobalOptions) -> Result<()> {
    init_tracing(global.verbose);

    let input = args.get_one::<PathBuf>("INPUT").context("Missing INPUT")?;
    let output = args.get_one::<PathBuf>("OUTPUT").context("Missing OUTPUT")?;
    let org = args.get_one::<String>("org").context("Missing --org")?;
    let source = args
        .get_one::<String>("allowlist")
        .context("Missing --allowlist")?;

    let ctx = ApiContext::new(None).context("Could not build the HTTP client")?;
    let pb = spinner(global.quiet, format!("Loading allow-list {}", source));
    let allow = AllowList::load(source, org, ctx.client()).await;
    pb.finish_and_clear();
    let allow = allow.with_context(|| format!("Could not load allow-list {}", source))?;

    let summary = filter_report(input, output, &allow)
        .with_context(|| format!("Could not filter {}", input.display()))?;

    println!(
        "{} {} rows kept, {} {} rows dropped -> {}",
        "✓".green().bold(),
        summary.kept,
        summary.dropped,
        allow.org(),
        output.display().to_string().bright_white()
    );
    Ok(())
}
