#![forbid(unsafe_code)]

mod config;
mod entry;
mod handlers;
mod support;

pub(crate) use support::*;

use config::{LOG_ENV, ServerConfig};
use pm_core::schema::SubtypeRegistry;
use pm_storage::SqliteStore;
use tracing_subscriber::EnvFilter;

const SERVER_NAME: &str = "pm_server";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Owns the store for the lifetime of the process; requests are served one at a time.
pub(crate) struct PlanoServer {
    store: SqliteStore,
}

impl PlanoServer {
    pub(crate) fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

fn usage() -> &'static str {
    "pm_server - floor-plan device and connection store (newline JSON over stdio)\n\n\
USAGE:\n\
  pm_server [--config FILE] [--storage-dir DIR]\n\
\n\
FLAGS:\n\
  -h, --help       Print this help and exit\n\
  -V, --version    Print version and exit\n\
\n\
ENVIRONMENT:\n\
  PLANOMAP_CONFIG        YAML config file (same as --config)\n\
  PLANOMAP_STORAGE_DIR   Directory holding planomap.db (default .planomap)\n\
  PLANOMAP_LOG           Log filter, e.g. info or pm_storage=debug (logs go to stderr)\n"
}

fn version_line() -> String {
    format!("{SERVER_NAME} {SERVER_VERSION}")
}

fn init_tracing(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|err| {
        eprintln!("{SERVER_NAME}: invalid {LOG_ENV} filter {directive:?}: {err}; using info");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print!("{}", usage());
        return Ok(());
    }
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        println!("{}", version_line());
        return Ok(());
    }

    let config = match ServerConfig::load(&args, |key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{SERVER_NAME}: {err}");
            return Err(err.into());
        }
    };
    init_tracing(&config.log);

    let registry = SubtypeRegistry::builtin()?;
    let store = SqliteStore::open(&config.storage_dir, registry)?
        .with_options(config.store_options());
    tracing::info!(
        storage_dir = %config.storage_dir.display(),
        types = store.registry().len(),
        unknown_fields = ?config.unknown_fields,
        plano_match = ?config.connections.plano_match,
        "{SERVER_NAME} {SERVER_VERSION} ready"
    );

    let mut server = PlanoServer::new(store);
    let result = entry::run_stdio(&mut server);
    match &result {
        Ok(served) => tracing::info!(requests = served, "stdin closed; shutting down"),
        Err(err) => tracing::error!(error = %err, "stdio loop failed"),
    }
    result.map(|_| ())
}
