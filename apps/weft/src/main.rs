//! # weft - Workflow Template Tool
//!
//! The main binary for weft.
//!
//! ## Usage
//!
//! ```bash
//! weft init
//! weft import -i pipeline.json
//! weft show -u http://ex.org/wf/Align.owl#Align
//! weft copy -u http://ex.org/wf/Align.owl#Align --to http://ex.org/wf/Align2.owl#Align2
//! weft export -u http://ex.org/wf/Align.owl#Align -o align.weft -t canonical
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weft::cli;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // WEFT_LOG_FORMAT=json enables machine-parseable logs. Logs go to stderr
    // so command output stays clean.
    let log_format = std::env::var("WEFT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "weft=debug,weft_core=debug"
    } else {
        "weft=info,weft_core=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the weft startup banner.
fn print_banner() {
    println!(
        r#"
  weft v{}
  workflow templates, woven from triples
"#,
        env!("CARGO_PKG_VERSION")
    );
}
