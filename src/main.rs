//! AppSleuth: launcher application discovery and icon resolution.
//!
//! Thin binary entry point. All logic lives in the `appsleuth-core` crate;
//! this file parses arguments, wires the engine together and prints results.

use anyhow::Context;
use appsleuth_core::catalog::Catalog;
use appsleuth_core::config::EngineConfig;
use appsleuth_core::icon::{default_extractor, IconCache, IconService};
use appsleuth_core::model::{Item, ItemFilter};
use appsleuth_core::scanner::progress::{ProgressSink, ScanProgress, ScanState};
use appsleuth_core::scanner::Scanner;
use appsleuth_core::store::{ItemStore, MemoryItemStore};
use appsleuth_core::CancelToken;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "appsleuth", version, about = "Discover launchable applications and their icons")]
struct Cli {
    /// Engine configuration file (JSON). Defaults to the data root.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan for launchable entries and extract their icons.
    Scan {
        /// Root to scan; repeatable. Overrides the configured roots.
        #[arg(long = "root")]
        roots: Vec<String>,

        /// Write the catalogue to this CSV file.
        #[arg(long)]
        export: Option<PathBuf>,

        /// Skip icon extraction.
        #[arg(long)]
        no_icons: bool,
    },
    /// Extract the icon for one file and print the cached PNG path.
    Icon {
        source: String,

        /// Re-render even if the icon is cached.
        #[arg(long)]
        force: bool,
    },
    /// Print the roots a scan would walk.
    Roots,
}

/// One CSV row per catalogue item.
#[derive(Serialize)]
struct ExportRow<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    item_type: &'a str,
    path: &'a str,
    target_name: &'a str,
    icon_path: &'a str,
}

impl<'a> From<&'a Item> for ExportRow<'a> {
    fn from(item: &'a Item) -> Self {
        Self {
            name: &item.name,
            item_type: item.item_type.as_str(),
            path: &item.path,
            target_name: item.target_name.as_deref().unwrap_or(""),
            icon_path: item.icon_path.as_deref().unwrap_or(""),
        }
    }
}

/// Logs root boundaries; mid-root progress only at debug level.
struct LogProgress;

impl ProgressSink for LogProgress {
    fn progress(&self, event: ScanProgress) {
        match event.percent {
            Some(percent) => tracing::info!(
                root = %event.root,
                scanned = event.scanned,
                "{percent}% ({}/{})",
                event.root_index,
                event.root_total
            ),
            None => tracing::debug!(path = %event.path, scanned = event.scanned, "scanning"),
        }
    }

    fn state_changed(&self, state: ScanState) {
        tracing::debug!(?state, "scan state");
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    tracing::debug!(data_root = %config.data_root.display(), "configuration loaded");

    match cli.command {
        Command::Scan {
            roots,
            export,
            no_icons,
        } => run_scan(&config, roots, export, no_icons),
        Command::Icon { source, force } => run_icon(&config, &source, force),
        Command::Roots => {
            for root in Scanner::from_config(&config).roots() {
                println!("{root}");
            }
            Ok(())
        }
    }
}

fn run_scan(
    config: &EngineConfig,
    roots: Vec<String>,
    export: Option<PathBuf>,
    no_icons: bool,
) -> anyhow::Result<()> {
    let scanner = if roots.is_empty() {
        Scanner::from_config(config)
    } else {
        Scanner::new(roots).with_progress_interval(config.progress_interval())
    };

    let store = Arc::new(MemoryItemStore::new());
    let mut catalog = Catalog::new(store.clone());
    if !no_icons {
        let cache = Arc::new(IconCache::new(config.icon_cache_dir(), default_extractor()));
        let icons = IconService::new(cache, store.clone()).with_workers(config.worker_count());
        catalog = catalog.with_icons(Arc::new(icons));
    }

    let result = catalog
        .scan(&scanner, &CancelToken::new(), &LogProgress)
        .context("scan failed")?;
    println!(
        "{} entries: {} new, {} skipped",
        result.total, result.inserted, result.skipped
    );

    let items = store.list(&ItemFilter::default())?;
    match export {
        Some(path) => {
            write_csv(&path, &items)?;
            println!("Catalogue written to {}", path.display());
        }
        None => {
            for item in &items {
                println!("{:<8} {}  ({})", item.item_type.label(), item.name, item.path);
            }
        }
    }
    Ok(())
}

fn write_csv(path: &std::path::Path, items: &[Item]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for item in items {
        writer.serialize(ExportRow::from(item))?;
    }
    writer.flush()?;
    Ok(())
}

fn run_icon(config: &EngineConfig, source: &str, force: bool) -> anyhow::Result<()> {
    let cache = IconCache::new(config.icon_cache_dir(), default_extractor());
    match cache
        .ensure(source, force)
        .with_context(|| format!("extracting icon for {source}"))?
    {
        Some(path) => println!("{}", path.display()),
        None => anyhow::bail!("icon source is required"),
    }
    Ok(())
}
