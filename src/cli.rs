use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// obsq: query metrics, spans, services and dashboards from an observability backend
#[derive(Parser)]
#[command(name = "obsq", version, about)]
pub struct Cli {
    /// Snapshot document to serve queries from (overrides OBSQ_SNAPSHOT)
    #[arg(long, global = true, env = "OBSQ_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the available tools
    Tools,

    /// Invoke a tool with JSON arguments
    Call {
        /// Tool name, e.g. query_apm_stats
        tool: String,
        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
        /// Print the structured payload instead of the summary
        #[arg(long)]
        json: bool,
    },

    /// Resolve a time expression to an absolute instant
    Resolve {
        /// e.g. now, now-1h30m, 2024-01-01T12:00:00Z, 2024-01-01
        expr: String,
        /// Reference instant (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<String>,
    },

    /// Compute latency, error rate and throughput for a service
    Stats {
        #[arg(long)]
        service: String,
        #[arg(long)]
        operation: Option<String>,
        #[arg(long)]
        env: Option<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Whether the command talks to a backend and therefore needs configuration.
    pub fn needs_backend(&self) -> bool {
        matches!(self, Commands::Call { .. } | Commands::Stats { .. })
    }
}
