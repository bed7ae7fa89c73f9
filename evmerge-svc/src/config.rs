//! Service configuration
//!
//! Every setting resolves as command line, then environment variable, then
//! TOML config file, then compiled default. Relative paths are taken against
//! the root folder.

use clap::Parser;
use evmerge_common::config::{load_config_file, resolve_in_root, resolve_root_folder, TomlConfig};
use evmerge_common::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "EVMERGE_ROOT_FOLDER";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DATABASE: &str = "tasks.db";
pub const DEFAULT_DOCUMENT_SOURCE: &str = "source_a.json";
pub const DEFAULT_TABLE_SOURCE: &str = "source_b.csv";

/// Command-line arguments for evmerge-svc
#[derive(Parser, Debug, Default)]
#[command(name = "evmerge-svc")]
#[command(about = "Asynchronous merge service for EV specification data")]
#[command(version)]
pub struct Args {
    /// Root folder holding the database and data sources
    ///
    /// Falls back to EVMERGE_ROOT_FOLDER, then the config file.
    #[arg(short, long)]
    pub root_folder: Option<PathBuf>,

    /// Interface to bind
    #[arg(long, env = "EVMERGE_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "EVMERGE_PORT")]
    pub port: Option<u16>,

    /// Task database file
    #[arg(long, env = "EVMERGE_DATABASE")]
    pub database: Option<PathBuf>,

    /// Document source (JSON array of records)
    #[arg(long, env = "EVMERGE_DOCUMENT_SOURCE")]
    pub document_source: Option<PathBuf>,

    /// Table source (CSV with a header row)
    #[arg(long, env = "EVMERGE_TABLE_SOURCE")]
    pub table_source: Option<PathBuf>,

    /// TOML config file; must exist when given
    #[arg(short, long, env = "EVMERGE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub document_source: PathBuf,
    pub table_source: PathBuf,
}

impl ServiceConfig {
    /// Load the config file the arguments point at (or the default location) and resolve
    pub fn from_args(args: &Args) -> Result<Self> {
        let toml_config = load_config_file(args.config.as_deref())?;
        let config = Self::resolve(args, &toml_config);

        info!(
            root_folder = %config.root_folder.display(),
            database = %config.database_path.display(),
            document_source = %config.document_source.display(),
            table_source = %config.table_source.display(),
            "Configuration resolved"
        );

        Ok(config)
    }

    pub fn resolve(args: &Args, toml_config: &TomlConfig) -> Self {
        let root_folder =
            resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, toml_config);

        let host = args
            .host
            .clone()
            .or_else(|| toml_config.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);

        let in_root = |cli: &Option<PathBuf>, toml: &Option<PathBuf>, default: &str| {
            let chosen = cli
                .as_deref()
                .or(toml.as_deref())
                .unwrap_or_else(|| Path::new(default));
            resolve_in_root(&root_folder, chosen)
        };

        let database_path = in_root(&args.database, &toml_config.database, DEFAULT_DATABASE);
        let document_source = in_root(
            &args.document_source,
            &toml_config.document_source,
            DEFAULT_DOCUMENT_SOURCE,
        );
        let table_source = in_root(
            &args.table_source,
            &toml_config.table_source,
            DEFAULT_TABLE_SOURCE,
        );

        Self {
            root_folder,
            host,
            port,
            database_path,
            document_source,
            table_source,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
