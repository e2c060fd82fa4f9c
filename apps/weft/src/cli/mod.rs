//! # weft CLI Module
//!
//! This module implements the CLI interface for weft.
//!
//! ## Available Commands
//!
//! - `init` - Initialize a new, empty store
//! - `import` - Store a template document read from a file
//! - `export` - Write a stored document to a file
//! - `show` - Summarize a stored template
//! - `normalize` - Re-save a template at the latest schema version
//! - `copy` - Store a template under a new id
//! - `delete` - Remove a stored template
//! - `list` - List stored templates
//! - `hash` - Compute the BLAKE3 hash of a stored document

mod commands;

use crate::config::WeftConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use weft_core::WeftError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// weft - workflow template tool
///
/// Imports, inspects, normalizes, copies and exports workflow templates held
/// in a triple-based knowledge store.
#[derive(Parser, Debug)]
#[command(name = "weft")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a config file (default: weft.toml, if present)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the template store
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "file" (single encoded file) or "redb" (ACID database)
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new empty store
    Init {
        /// Force initialization even if the store exists
        #[arg(short, long)]
        force: bool,
    },

    /// Import a template document
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Template to import (default: the document's top-level template)
        #[arg(short, long)]
        uri: Option<String>,

        /// Input format (json, canonical)
        #[arg(short = 't', long, default_value = "json")]
        format: String,
    },

    /// Export a stored template document
    Export {
        /// Template id
        #[arg(short, long)]
        uri: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (json, canonical)
        #[arg(short = 't', long, default_value = "json")]
        format: String,
    },

    /// Show a stored template
    Show {
        /// Template id
        #[arg(short, long)]
        uri: String,
    },

    /// Re-save a template at the latest schema version
    Normalize {
        /// Template id
        #[arg(short, long)]
        uri: String,
    },

    /// Store a template under a new id
    Copy {
        /// Template id
        #[arg(short, long)]
        uri: String,

        /// New template id
        #[arg(long)]
        to: String,
    },

    /// Delete a stored template
    Delete {
        /// Template id
        #[arg(short, long)]
        uri: String,
    },

    /// List stored templates
    List,

    /// Compute BLAKE3 cryptographic hash of a stored document
    Hash {
        /// Template id
        #[arg(short, long)]
        uri: String,
    },
}

impl Cli {
    /// Config file, then environment, then flags.
    pub fn resolve_config(&self) -> Result<WeftConfig, WeftError> {
        let mut config = WeftConfig::load(self.config.as_deref())?;
        config.apply_process_env()?;
        if let Some(db) = &self.database {
            config.database.clone_from(db);
        }
        if let Some(backend) = &self.backend {
            config.backend = backend.parse()?;
        }
        Ok(config)
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), WeftError> {
    let config = cli.resolve_config()?;
    run(cli.command, &config, cli.json_mode)
}

/// Run one command against a resolved configuration.
pub fn run(command: Option<Commands>, config: &WeftConfig, json_mode: bool) -> Result<(), WeftError> {
    match command {
        Some(Commands::Init { force }) => cmd_init(config, force),
        Some(Commands::Import { input, uri, format }) => {
            cmd_import(config, json_mode, &input, uri.as_deref(), &format)
        }
        Some(Commands::Export {
            uri,
            output,
            format,
        }) => cmd_export(config, &uri, &output, &format),
        Some(Commands::Show { uri }) => cmd_show(config, json_mode, &uri),
        Some(Commands::Normalize { uri }) => cmd_normalize(config, json_mode, &uri),
        Some(Commands::Copy { uri, to }) => cmd_copy(config, json_mode, &uri, &to),
        Some(Commands::Delete { uri }) => cmd_delete(config, json_mode, &uri),
        Some(Commands::Hash { uri }) => cmd_hash(config, json_mode, &uri),
        Some(Commands::List) | None => cmd_list(config, json_mode),
    }
}
