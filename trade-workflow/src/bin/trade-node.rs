//! Trade Node Binary
//!
//! Opens the configured ledger and runs one workflow command against it.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ledger_core::{printable, KeyWrite};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trade_workflow::{Config, InvocationContext, TradeNode};

/// Trade settlement node
#[derive(Parser, Debug)]
#[command(name = "trade-node", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a TOML configuration file. Environment variables are used otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print workflow metrics in Prometheus text format after the command.
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record the role registry (no arguments, or all eight).
    Init {
        /// Exporter, Exporter's Bank, Exporter's Balance, Importer, Importer's Bank,
        /// Importer's Balance, Carrier, Regulatory Authority
        args: Vec<String>,
    },

    /// Invoke a workflow function as a member of an organization.
    Invoke {
        /// Caller's organization identifier
        #[arg(long)]
        org: String,

        /// Common name of the caller's certificate issuer
        #[arg(long)]
        issuer: String,

        /// Function name, e.g. requestTrade
        function: String,

        /// Function arguments
        args: Vec<String>,
    },

    /// Verify the commit chain and replay it against the world state.
    Verify,

    /// Show one commit record and the keys it wrote.
    Commit {
        /// Height in the commit log (0-based)
        height: u64,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading config from file");
            Config::from_file(path).with_context(|| format!("loading {}", path.display()))
        }
        None => {
            tracing::info!("Loading config from environment variables");
            Ok(Config::from_env()?)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_ref())?;
    let node = TradeNode::open(config).await.context("opening trade node")?;

    let result = match cli.command {
        Commands::Init { args } => node.init(args).await.map_err(anyhow::Error::from),
        Commands::Invoke {
            org,
            issuer,
            function,
            args,
        } => {
            let ctx = InvocationContext::for_member(&org, &issuer);
            match node.invoke(ctx, function.clone(), args).await {
                Ok(response) => {
                    if !response.payload.is_empty() {
                        println!("{}", String::from_utf8_lossy(&response.payload));
                    }
                    tracing::info!(outcome = response.outcome.as_str(), "Invocation succeeded");
                    Ok(())
                }
                Err(e) => {
                    let kind = e.kind().as_str();
                    Err(anyhow::Error::from(e).context(format!("{} rejected ({})", function, kind)))
                }
            }
        }
        Commands::Verify => match node.ledger().replay() {
            Ok(report) if report.matches => {
                println!("commits={} keys={} matches=true", report.commits, report.keys);
                Ok(())
            }
            Ok(report) => Err(anyhow::anyhow!(
                "replayed state diverges from world state after {} commits",
                report.commits
            )),
            Err(e) => Err(anyhow::Error::from(e).context("verifying commit chain")),
        },
        Commands::Commit { height } => match node.ledger().commit_at(height) {
            Ok(record) => {
                println!("{} tx={} at={}", record, record.tx_id, record.committed_at.to_rfc3339());
                for write in &record.writes {
                    let action = match write {
                        KeyWrite::Put { .. } => "put",
                        KeyWrite::Delete { .. } => "del",
                    };
                    println!("  {} {}", action, printable(write.key()));
                }
                Ok(())
            }
            Err(e) => Err(anyhow::Error::from(e).context(format!("reading commit {}", height))),
        },
    };

    if cli.metrics {
        match node.service().metrics().encode() {
            Ok(text) => print!("{}", text),
            Err(e) => tracing::warn!(error = %e, "Failed to encode metrics"),
        }
    }

    node.shutdown().await?;
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
