//! boxshadow - a private, offline Vagrant box catalog
//!
//! Indexes directories of `.box` files and answers the same questions a
//! box-hosting service does: which boxes exist, which versions and
//! providers they have, and where the file for each lives.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use boxshadow_core::catalog::Catalog;
use boxshadow_core::{CatalogStore, ChangeWatcher, FilenameLayout, Indexer, ShadowConfig};

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Filename field order
#[derive(Debug, Clone, ValueEnum)]
enum Layout {
    /// owner-VAGRANTSLASH-box__version__provider.box
    VersionProvider,
    /// owner-VAGRANTSLASH-box__provider__version.box
    ProviderVersion,
}

impl From<Layout> for FilenameLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::VersionProvider => FilenameLayout::VersionProvider,
            Layout::ProviderVersion => FilenameLayout::ProviderVersion,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "boxshadow",
    about = "Serve a directory of Vagrant boxes as a versioned catalog",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Configuration file (YAML); missing file means defaults
    #[clap(long, default_value = "boxshadow.yaml", global = true)]
    config: PathBuf,

    /// Set log level
    #[clap(long, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Emit logs as JSON
    #[clap(long, global = true)]
    log_json: bool,

    /// Directories containing .box files (repeatable, or ';'-separated)
    #[clap(short = 'd', long = "directory", value_delimiter = ';', global = true)]
    directories: Vec<PathBuf>,

    /// Hostname used in download URLs
    #[clap(short = 'H', long, global = true)]
    hostname: Option<String>,

    /// Port used in download URLs
    #[clap(short, long, global = true)]
    port: Option<u16>,

    /// Filename field order used by this deployment
    #[clap(long, value_enum, global = true)]
    layout: Option<Layout>,

    /// Index from filenames only, without opening archives
    #[clap(long, global = true)]
    no_inspect: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan once and print the catalog
    Index {
        /// Output the full catalog as JSON
        #[clap(long)]
        json: bool,
    },

    /// Print the catalog document for one box
    Show {
        /// Box in owner/name form
        name: String,
    },

    /// Print the local file backing a box version and provider
    Locate {
        owner: String,
        boxname: String,
        provider: String,
        version: String,
    },

    /// Index, then keep the catalog current as files change
    Watch,
}

/// Initialize tracing with CLI flags
fn initialize_tracing(log_level: &LogLevel, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Config file, then CLI overrides, then directories made absolute
fn resolve_config(cli: &Cli) -> Result<ShadowConfig> {
    let mut config = ShadowConfig::load_from_path(&cli.config)?;

    let directories: Vec<PathBuf> = cli
        .directories
        .iter()
        .filter(|d| !d.as_os_str().is_empty())
        .cloned()
        .collect();
    if !directories.is_empty() {
        config.directories = directories;
    }
    if let Some(hostname) = &cli.hostname {
        config.hostname = hostname.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(layout) = &cli.layout {
        config.filename_layout = layout.clone().into();
    }
    if cli.no_inspect {
        config.inspect_archives = false;
    }
    config.validate()?;

    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    config.resolve_directories(&cwd);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(&cli.log_level, cli.log_json);

    let config = resolve_config(&cli)?;
    info!("Responding on host: {}", config.download_base());

    let store = Arc::new(CatalogStore::new());
    let indexer = Indexer::new(config, store.clone());

    match cli.command {
        Command::Index { json } => {
            initial_index(&indexer).await?;
            index_command(&store.current_catalog(), json)
        }
        Command::Show { name } => {
            initial_index(&indexer).await?;
            show_command(&store, &name)
        }
        Command::Locate {
            owner,
            boxname,
            provider,
            version,
        } => {
            initial_index(&indexer).await?;
            locate_command(&store, &owner, &boxname, &provider, &version)
        }
        // Watches go up before the first index so nothing slips in between
        Command::Watch => watch_command(indexer).await,
    }
}

async fn initial_index(indexer: &Indexer) -> Result<()> {
    indexer.rebuild().await.context("Initial index failed")?;
    Ok(())
}

#[derive(Tabled)]
struct BoxRow {
    #[tabled(rename = "Box")]
    name: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Versions")]
    versions: String,
    #[tabled(rename = "Providers")]
    providers: String,
}

fn index_command(catalog: &Catalog, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(catalog)?);
        return Ok(());
    }

    if catalog.is_empty() {
        println!("No boxes found.");
        return Ok(());
    }

    let rows: Vec<BoxRow> = catalog
        .boxes()
        .map(|entry| {
            let current = entry.current_version();
            BoxRow {
                name: entry.name.clone(),
                current: current.map(|v| v.version.clone()).unwrap_or_default(),
                versions: entry
                    .versions
                    .iter()
                    .map(|v| v.version.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                providers: current
                    .map(|v| {
                        v.providers
                            .iter()
                            .map(|p| p.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default(),
            }
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));
    println!("{table}");

    let summary = catalog.summary();
    println!(
        "\n{} boxes, {} versions, {} provider files",
        summary.boxes, summary.versions, summary.providers
    );
    Ok(())
}

fn show_command(store: &CatalogStore, name: &str) -> Result<()> {
    let (owner, boxname) = name
        .split_once('/')
        .with_context(|| format!("Expected owner/name, got '{name}'"))?;

    match store.get_box(owner, boxname) {
        Some(entry) => {
            println!("{}", entry.to_json()?);
            Ok(())
        }
        None => {
            eprintln!("Box not found: {owner}/{boxname}");
            std::process::exit(1);
        }
    }
}

fn locate_command(
    store: &CatalogStore,
    owner: &str,
    boxname: &str,
    provider: &str,
    version: &str,
) -> Result<()> {
    match store.get_box_file_location(owner, boxname, provider, version) {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => {
            eprintln!("No {provider} box for {owner}/{boxname} at version {version}");
            std::process::exit(1);
        }
    }
}

async fn watch_command(indexer: Indexer) -> Result<()> {
    let handle = match ChangeWatcher::new(Arc::new(indexer)).start() {
        Ok(handle) => handle,
        Err(e) => {
            error!("Fatal: could not watch box directories: {:#}", anyhow::Error::from(e));
            std::process::exit(1);
        }
    };

    info!("Indexing and watching for changes; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Shutting down");
    handle.shutdown().await;
    Ok(())
}
