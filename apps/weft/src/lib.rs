//! # weft
//!
//! Command-line front end for weft-core: configuration loading and the
//! `weft` subcommands. The binary in `main.rs` only parses arguments and
//! sets up logging.

pub mod cli;
pub mod config;
