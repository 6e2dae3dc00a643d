//! Log setup for the terminal binary.
//!
//! The terminal belongs to the UI, so events go to a file. The filter comes
//! from `RUST_LOG` and defaults to `apidesk=info`.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "apidesk=info";

/// `<data dir>/apidesk/apidesk.log`.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("apidesk").join("apidesk.log"))
}

/// Where logs should go: the configured file, or the default file when
/// `RUST_LOG` is set. `None` disables logging.
pub fn resolve_log_path(configured: Option<&Path>, rust_log_set: bool) -> Option<PathBuf> {
    match configured {
        Some(path) => Some(path.to_path_buf()),
        None if rust_log_set => default_log_path(),
        None => None,
    }
}

fn open(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Installs the global subscriber writing to `path`.
///
/// # Errors
///
/// Fails if the file cannot be opened or a subscriber is already installed.
pub fn init(path: &Path) -> io::Result<()> {
    let file = open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(io::Error::other)?;

    tracing::info!(path = %path.display(), "logging initialized");
    Ok(())
}
