pub mod build_info;
pub mod persistence;

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Once,
};

use dirs::home_dir;

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIR_NAME: &str = ".ops_ledger";
const DEFAULT_FILTER: &str = "ops_ledger=info";

/// Initializes the global tracing subscriber; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        // Another subscriber may already be installed by an embedding binary or test harness.
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// Application directory, `OPS_LEDGER_HOME` or `~/.ops_ledger`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os("OPS_LEDGER_HOME") {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
