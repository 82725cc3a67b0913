use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "landlord", about = "Tenant-lifecycle control plane", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the reconciliation controller and HTTP API in-process.
    Run {
        /// Path to a TOML config file. Falls back to defaults + LANDLORD_*
        /// environment overrides when omitted.
        #[arg(long, env = "LANDLORD_CONFIG")]
        config: Option<PathBuf>,
    },

    /// List tenants known to a running landlord API server.
    Status {
        /// Base URL of the landlord API.
        #[arg(long, env = "LANDLORD_API_URL", default_value = "http://localhost:8080")]
        api_url: String,

        /// Only show tenants in this status.
        #[arg(long)]
        status: Option<String>,

        /// Include archived tenants.
        #[arg(long)]
        include_archived: bool,
    },
}
