use colored::Colorize;
use commands::command_argument_builder;
use orgsweep::handlers::{
    GlobalOptions, handle_catalog, handle_clone, handle_commits, handle_filter, handle_search,
};
use orgsweep_core::print_banner;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let global = GlobalOptions::from_matches(&chosen_command);

    if !global.quiet {
        print_banner();
    }

    let result = match chosen_command.subcommand() {
        Some(("clone", primary_command)) => handle_clone(primary_command, &global).await,
        Some(("catalog", primary_command)) => handle_catalog(primary_command, &global).await,
        Some(("search", primary_command)) => handle_search(primary_command, &global),
        Some(("commits", _)) => handle_commits(&global),
        Some(("filter", primary_command)) => handle_filter(primary_command, &global).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
