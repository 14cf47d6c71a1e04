use crate::CLAP_STYLING;
use clap::{arg, command};
use orgsweep_core::config::DEFAULT_CONFIG_FILE;
use orgsweep_core::filter::{DEFAULT_ALLOWLIST_URL, DEFAULT_FILTER_ORG};
use orgsweep_core::report::{DEFAULT_MATCHES_FILE, DEFAULT_REPOS_FILE};
use std::path::PathBuf;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("orgsweep")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("orgsweep")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and progress spinners").required(false))
        .arg(arg!(-v --"verbose" "Log every API call and rate-limit headroom").required(false))
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .help("Path to the JSON configuration file")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value(DEFAULT_CONFIG_FILE),
        )
        .subcommand_required(true)
        .subcommand(
            command!("clone")
                .about(
                    "Clone every public, non-forked repository of the configured \
                organizations into the cache folder",
                )
                .arg(
                    arg!(-o --"org" <ORG>)
                        .required(false)
                        .help("Organization to clone (repeatable, replaces the configured list)")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(--"overwrite")
                        .required(false)
                        .help("Delete the cloned repositories of each organization and clone them again")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"no-refresh")
                        .required(false)
                        .help("Use the cached repodata.json listing instead of the API")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("catalog")
                .about("List the repositories that would be cloned for an organization")
                .arg(arg!(<ORG>).required(true).help("GitHub organization"))
                .arg(
                    arg!(--"no-refresh")
                        .required(false)
                        .help("Use the cached repodata.json listing instead of the API")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("search")
                .about("Scan the cloned repositories for the configured keywords")
                .arg(
                    arg!(-m --"matches" <PATH>)
                        .required(false)
                        .help("Per-file match report")
                        .value_parser(clap::value_parser!(PathBuf))
                        .default_value(DEFAULT_MATCHES_FILE),
                )
                .arg(
                    arg!(-r --"repos" <PATH>)
                        .required(false)
                        .help("Per-repository totals report")
                        .value_parser(clap::value_parser!(PathBuf))
                        .default_value(DEFAULT_REPOS_FILE),
                ),
        )
        .subcommand(
            command!("commits")
                .about("Show the branch and latest commit of every cloned repository"),
        )
        .subcommand(
            command!("filter")
                .about(
                    "Drop report rows of an organization whose repository is not on its \
                published allow-list",
                )
                .arg(
                    arg!(<INPUT>)
                        .required(true)
                        .help("Report CSV to filter")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(<OUTPUT>)
                        .required(true)
                        .help("Filtered CSV (overwritten)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"org" <ORG>)
                        .required(false)
                        .help("Organization the allow-list applies to")
                        .default_value(DEFAULT_FILTER_ORG),
                )
                .arg(
                    arg!(--"allowlist" <URL_OR_PATH>)
                        .required(false)
                        .help("Allow-list JSON, fetched when it is an http(s) URL")
                        .default_value(DEFAULT_ALLOWLIST_URL),
                ),
        )
}
