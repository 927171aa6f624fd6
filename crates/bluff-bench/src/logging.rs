use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::Level;
use tracing::subscriber::DefaultGuard;
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LoggingConfig, ResolvedOutputs};

pub const TELEMETRY_FILE: &str = "telemetry.jsonl";

/// Keeps the bench subscriber installed on the running thread.
///
/// Events carry the enclosing `session` span, so every telemetry line names
/// the run id and session index it came from.
pub struct LoggingGuard {
    // dropped before the worker so no event races the final flush
    _default: DefaultGuard,
    worker: WorkerGuard,
    telemetry_path: PathBuf,
}

impl LoggingGuard {
    pub fn telemetry_path(&self) -> &Path {
        &self.telemetry_path
    }

    /// Uninstall the subscriber and block until every buffered line is on disk.
    pub fn finish(self) -> PathBuf {
        let LoggingGuard {
            _default: default,
            worker,
            telemetry_path,
        } = self;
        drop(default);
        drop(worker);
        telemetry_path
    }
}

/// Install a JSON subscriber writing `telemetry.jsonl` beside the summary.
/// Returns `None` when structured logging is disabled.
pub fn init_logging(
    logging: &LoggingConfig,
    outputs: &ResolvedOutputs,
) -> Result<Option<LoggingGuard>> {
    if !logging.enable_structured {
        return Ok(None);
    }

    let telemetry_dir = outputs.telemetry_dir();
    fs::create_dir_all(&telemetry_dir).with_context(|| {
        format!(
            "creating telemetry directory at {}",
            telemetry_dir.display()
        )
    })?;

    let telemetry_path = telemetry_dir.join(TELEMETRY_FILE);
    let file = File::create(&telemetry_path)
        .with_context(|| format!("creating telemetry file at {}", telemetry_path.display()))?;

    let (writer, worker) = non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .thread_name("bluff-bench-telemetry")
        .finish(file);

    let level = logging.level().unwrap_or(Level::INFO);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .finish();

    // thread-scoped so repeated runs in one process each get their own file
    let default = tracing::subscriber::set_default(subscriber);

    Ok(Some(LoggingGuard {
        _default: default,
        worker,
        telemetry_path,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs(dir: &Path) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: dir.join("actions.jsonl"),
            summary_md: dir.join("summary.md"),
        }
    }

    #[test]
    fn disabled_logging_installs_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logging = LoggingConfig {
            enable_structured: false,
            ..LoggingConfig::default()
        };
        let guard = init_logging(&logging, &outputs(dir.path())).expect("init");
        assert!(guard.is_none());
        assert!(!dir.path().join(TELEMETRY_FILE).exists());
    }

    #[test]
    fn events_inside_session_span_carry_run_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logging = LoggingConfig {
            enable_structured: true,
            ..LoggingConfig::default()
        };
        let guard = init_logging(&logging, &outputs(dir.path()))
            .expect("init")
            .expect("guard");
        assert_eq!(guard.telemetry_path(), dir.path().join(TELEMETRY_FILE));

        {
            let span = tracing::info_span!("session", run_id = "unit", session = 3usize);
            let _entered = span.enter();
            tracing::info!(target: "bluff_bot::decision", acted = true, "decision");
            tracing::debug!(target: "bluff_bot::decision", acted = false, "filtered");
        }

        let path = guard.finish();
        let contents = std::fs::read_to_string(path).expect("telemetry written");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1, "{contents}");
        let row: serde_json::Value = serde_json::from_str(lines[0]).expect("json line");
        assert_eq!(row["target"], "bluff_bot::decision");
        assert_eq!(row["span"]["run_id"], "unit");
        assert_eq!(row["span"]["session"], 3);
    }
}
