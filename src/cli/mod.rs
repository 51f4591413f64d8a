//! CLI module - Command-line interface for ScriptVault
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ScriptVault - authenticated script catalog server
#[derive(Parser)]
#[command(name = "scriptvault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Explicit config file instead of the default search path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    #[command(alias = "daemon")]
    Serve,

    /// Read a secret from stdin and print an Argon2id hash for the accounts list
    HashPassword,

    /// Load and validate the config, then print a summary
    CheckConfig,
}

pub use commands::*;
