pub mod handlers;

// Re-export the helpers the binary and its tests share
pub use handlers::{
    GlobalOptions, format_clone_row, format_commit_line, format_totals, init_tracing,
    load_settings, resolve_orgs, run_search, tracing_level,
};
