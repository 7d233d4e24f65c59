//! CLI module - Command-line interface for BizLookup
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// BizLookup - customer and material lookups against the business backend
#[derive(Parser)]
#[command(name = "bizlookup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single search against an endpoint
    #[command(alias = "s")]
    Search {
        /// Endpoint name (see `endpoints`)
        endpoint: String,
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,
        /// Zero-based page index
        #[arg(long, default_value = "0")]
        page: u32,
    },

    /// Interactive lookup: every stdin line is treated as the new input value
    #[command(alias = "l")]
    Lookup {
        /// Endpoint name (see `endpoints`)
        endpoint: String,
    },

    /// List configured lookup endpoints
    #[command(alias = "ls")]
    Endpoints,

    /// Create default config file
    #[command(alias = "--init")]
    InitConfig,
}

pub use commands::*;
