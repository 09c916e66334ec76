//! File and stdout logging for binaries and test harnesses embedding the
//! pathfinder. The library itself only emits `tracing` events.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_PREFIX: &str = "voxel_hpa";

/// Install a global subscriber writing to a fresh timestamped file in `dir`
/// and to stdout. At most `keep` older log files are left in `dir`.
///
/// `RUST_LOG` overrides the default filter. Returns the path of the new file.
pub fn setup_file_logging(dir: impl AsRef<Path>, keep: usize) -> io::Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    cleanup_old_logs(dir, keep);

    let now = chrono::Local::now();
    let filename = format!("{}_{}.log", LOG_PREFIX, now.format("%Y%m%d_%H%M%S"));
    let path = dir.join(&filename);

    // One file per run
    let file_appender = RollingFileAppender::new(Rotation::NEVER, dir, &filename);

    let file_layer = fmt::layer().with_writer(file_appender).with_ansi(false);
    let stdout_layer = fmt::layer().with_writer(io::stdout).with_target(false);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voxel_hpa=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))?;

    Ok(path)
}

/// Delete the oldest `voxel_hpa*.log` files in `dir` until `keep` remain.
fn cleanup_old_logs(dir: &Path, keep: usize) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let mut log_files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(LOG_PREFIX) && name.ends_with(".log"))
        })
        .collect();

    // Oldest first
    log_files.sort_by_key(|e| e.metadata().ok().and_then(|m| m.modified().ok()));

    if log_files.len() > keep {
        for file in log_files.iter().take(log_files.len() - keep) {
            let _ = fs::remove_file(file.path());
        }
    }
}
