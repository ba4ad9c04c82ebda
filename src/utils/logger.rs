use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget<'a> {
    /// Standard error, for one-shot commands
    Stderr,
    /// An append-only file, so the TUI isn't overwritten by log output
    File(&'a Path),
}

/// Pick the default filter directive for the given verbosity and target
///
/// Stderr stays quiet unless asked, since it shares the terminal with
/// command output.
fn default_directive(verbose: bool, target: LogTarget<'_>) -> &'static str {
    match (verbose, target) {
        (true, _) => "solace=debug,info",
        (false, LogTarget::File(_)) => "info",
        (false, LogTarget::Stderr) => "warn",
    }
}

/// Initialize the logging system
///
/// `RUST_LOG` wins over the verbosity flag when set.
pub fn init_logger(verbose: bool, target: LogTarget<'_>) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, target)));

    let layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .compact();

    // try_init so a second call (tests, repeated runs) is harmless
    match target {
        LogTarget::Stderr => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(layer.with_writer(io::stderr))
                .try_init();
        }
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(layer.with_ansi(false).with_writer(Mutex::new(file)))
                .try_init();
        }
    }

    Ok(())
}

/// Progress indicator for startup sequence
pub fn log_progress(step: usize, total: usize, message: impl std::fmt::Display) {
    eprintln!("[{}/{}] -> {}", step, total, message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        let path = Path::new("solace.log");
        assert_eq!(default_directive(false, LogTarget::File(path)), "info");
        assert_eq!(default_directive(false, LogTarget::Stderr), "warn");
        assert!(default_directive(true, LogTarget::Stderr).contains("solace=debug"));
    }

    #[test]
    fn test_file_target_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("solace.log");
        init_logger(false, LogTarget::File(&path)).unwrap();
        assert!(path.exists());
    }
}
