use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sends `tracing` output to `log_file`, appending. The terminal belongs to the
/// UI, so nothing is written to stdout or stderr. `RUST_LOG` overrides the
/// default `info` filter.
pub fn init(log_file: &Path) -> std::io::Result<()> {
    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = %log_file.display(),
        "journal starting"
    );
    Ok(())
}
