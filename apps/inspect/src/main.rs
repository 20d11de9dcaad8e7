use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use shroud_inspect::{InspectConfig, Inspector};
use shroud_kernel::config::load_config;
use std::io::Write;
use std::path::PathBuf;

/// Inspect a Shroud file store without revealing its secrets.
#[derive(Debug, Parser)]
#[command(name = "shroud-inspect", version)]
struct Cli {
    /// Settings file, layered under `SHROUD__*` environment overrides.
    #[arg(short, long, env = "SHROUD_INSPECT_CONFIG", default_value = "shroud")]
    config: PathBuf,

    /// Store root, overriding `data.root`.
    #[arg(long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Lists keys, sealed fields, versions and archive state.
    Report,
    /// Runs the startup migrations as one identity.
    Migrate {
        #[arg(long, env = "SHROUD_IDENTITY_SECRET", hide_env_values = true)]
        secret: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg: InspectConfig =
        load_config(Some(&cli.config)).context("Critical: Configuration is malformed")?;
    if let Some(root) = cli.root {
        cfg.data.root = root;
    }
    if cfg.log.name == "shroud" {
        env!("CARGO_PKG_NAME").clone_into(&mut cfg.log.name);
    }
    let _log = cfg.log.init()?;

    let inspector = Inspector::open(&cfg.data, cfg.store).await?;
    match cli.command {
        Command::Report => emit(&inspector.report().await?),
        Command::Migrate { secret } => emit(&inspector.migrate(secret).await?),
    }
}

fn emit<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
