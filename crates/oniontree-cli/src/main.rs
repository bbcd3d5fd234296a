//! OnionTree importer
//!
//! Reconciles a tree of tagged service descriptors into a SQLite database:
//!
//! ```text
//! oniontree-import --dirname ./data/tagged --db oniontree.db [--truncate]
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use oniontree_ingest::{import_directory, CancelToken, ImportConfig};
use oniontree_storage::{SqliteStore, Store};
use std::path::PathBuf;

mod logging;
mod summary;

#[derive(Parser, Debug)]
#[command(name = "oniontree-import")]
#[command(
    author,
    version,
    about = "Import tagged OnionTree service descriptors into a relational store"
)]
struct Cli {
    /// Directory with tagged onion YAML files (one subdirectory per tag).
    #[arg(short, long, default_value = "./data/tagged")]
    dirname: PathBuf,

    /// Truncate services, keys, URLs and tags before importing.
    #[arg(short, long)]
    truncate: bool,

    /// SQLite database file.
    #[arg(long, default_value = "oniontree.db")]
    db: PathBuf,

    /// Visit descriptors in file-name order.
    #[arg(long)]
    sorted: bool,

    /// Write the import report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Exit with an error if any descriptor failed to import.
    #[arg(long)]
    strict: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn import_config(&self) -> ImportConfig {
        ImportConfig {
            root: self.dirname.clone(),
            truncate: self.truncate,
            sorted: self.sorted,
            ..Default::default()
        }
    }
}

#[cfg(unix)]
fn install_signal_handlers(cancel: &CancelToken) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};

    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, cancel.flag())
            .map_err(|e| anyhow!("failed to register signal {signal}: {e}"))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn install_signal_handlers(_cancel: &CancelToken) -> Result<()> {
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let cancel = CancelToken::new();
    install_signal_handlers(&cancel)?;

    let mut store = SqliteStore::open(&cli.db)
        .with_context(|| format!("failed to open database {}", cli.db.display()))?;

    let config = cli.import_config();
    tracing::info!(
        root = %config.root.display(),
        db = %cli.db.display(),
        truncate = config.truncate,
        "starting import"
    );
    let report = import_directory(&mut store, config, cancel)
        .with_context(|| format!("import of {} failed", cli.dirname.display()))?;
    let counts = store.counts()?;

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report {}", path.display()))?;
    }
    summary::print(&report, &counts);

    if report.cancelled {
        return Err(anyhow!("import cancelled"));
    }
    if cli.strict && !report.failed.is_empty() {
        return Err(anyhow!(
            "{} descriptor(s) failed to import",
            report.failed.len()
        ));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = run(cli);
    if let Err(err) = &result {
        tracing::error!(error = %format!("{err:#}"), "oniontree-import failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_reference_command() {
        let cli = Cli::try_parse_from(["oniontree-import"]).unwrap();
        assert_eq!(cli.dirname, PathBuf::from("./data/tagged"));
        assert!(!cli.truncate);
        assert!(!cli.strict);
        assert_eq!(cli.db, PathBuf::from("oniontree.db"));
    }

    #[test]
    fn short_flags_are_accepted() {
        let cli = Cli::try_parse_from(["oniontree-import", "-d", "tree", "-t", "-vv"]).unwrap();
        let config = cli.import_config();
        assert_eq!(config.root, PathBuf::from("tree"));
        assert!(config.truncate);
        assert_eq!(cli.verbose, 2);
    }
}
