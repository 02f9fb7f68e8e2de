use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use obsquery::backend::SnapshotBackend;
use obsquery::config::{self, Config, LogFormat};
use obsquery::models::stats::StatSelector;
use obsquery::query::stats::StatsEngine;
use obsquery::query::time::{default_lookback, resolve, resolve_range};
use obsquery::tools::{self, ToolContext};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    // Offline commands run even when the environment is misconfigured.
    let cfg = if args.command.needs_backend() {
        Some(config::load()?)
    } else {
        None
    };
    init_tracing(cfg.as_ref().map_or(LogFormat::default(), |c| c.log_format));

    let result = run(cfg, args).await;

    if let Err(ref e) = result {
        tracing::error!(error = %e, "command failed");
    }
    result
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "obsquery=info".into()),
    );
    // stdout carries command output; logs go to stderr.
    let (json, text) = match format {
        LogFormat::Json => (
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Text => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

async fn run(cfg: Option<Config>, args: cli::Cli) -> anyhow::Result<()> {
    let cfg = cfg.map(|mut cfg| {
        if args.snapshot.is_some() {
            cfg.snapshot = args.snapshot;
        }
        cfg
    });

    match args.command {
        cli::Commands::Tools => {
            for tool in tools::CATALOG {
                println!("{:<18} {}", tool.name, tool.description);
            }
            Ok(())
        }
        cli::Commands::Resolve { expr, now } => {
            let now = match now {
                Some(raw) => DateTime::parse_from_rfc3339(&raw)
                    .with_context(|| format!("invalid --now '{}'", raw))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };
            let instant = resolve(&expr, now)?;
            println!("{}", instant.to_rfc3339());
            Ok(())
        }
        cli::Commands::Call { tool, args, json } => {
            let cfg = cfg.context("configuration not loaded")?;
            let backend = open_backend(&cfg)?;
            let args: serde_json::Value =
                serde_json::from_str(&args).context("--args must be a JSON object")?;
            let ctx = ToolContext::new(&backend, Utc::now()).with_settings(cfg.tool_settings());

            let output = tools::call_or_error(&ctx, &tool, args).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&output.structured)?);
            } else {
                println!("{}", output.render());
            }
            if output.is_error {
                anyhow::bail!("{} failed", tool);
            }
            Ok(())
        }
        cli::Commands::Stats {
            service,
            operation,
            env,
            from,
            to,
            json,
        } => {
            let cfg = cfg.context("configuration not loaded")?;
            let backend = open_backend(&cfg)?;
            let range = resolve_range(from.as_deref(), to.as_deref(), Utc::now(), default_lookback())?;
            let mut selector = StatSelector::new(service);
            if let Some(op) = operation {
                selector = selector.with_operation(op);
            }
            if let Some(env) = env {
                selector = selector.with_environment(env);
            }

            let interrupted = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            let stats = StatsEngine::new(&backend)
                .compute_until(&selector, range, interrupted)
                .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", tools::stats::render(&stats));
            }
            Ok(())
        }
    }
}

fn open_backend(cfg: &Config) -> anyhow::Result<SnapshotBackend> {
    if cfg.has_credentials() {
        tracing::info!(site = %cfg.site, "backend credentials present");
    }
    let path = cfg
        .snapshot
        .as_ref()
        .context("no backend configured: set OBSQ_SNAPSHOT or pass --snapshot")?;
    SnapshotBackend::load(path)
}
