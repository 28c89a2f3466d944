use crate::{
    config::LoggerSettings,
    error::LogError,
    journal::log_row::{LogRow, LOG_HEADER},
    pipeline::services::stats::StatsStore,
};
use chrono::Local;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Appends a CSV snapshot of the live stats every `interval` for
/// `duration`, at most one session at a time.
///
/// Rows land at T+interval, T+2*interval, ... up to and including
/// T+duration, where T is the moment the session started.
#[derive(Debug)]
pub struct SnapshotLogger {
    stats: Arc<StatsStore>,
    path: PathBuf,
    interval: Duration,
    duration: Duration,
    running: AtomicBool,
}

/// Clears the running flag when a session ends, however it ends.
struct SessionGuard(Arc<SnapshotLogger>);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::Release);
    }
}

impl SnapshotLogger {
    pub fn new(stats: Arc<StatsStore>, path: impl Into<PathBuf>, interval: Duration, duration: Duration) -> Self {
        Self {
            stats,
            path: path.into(),
            interval,
            duration,
            running: AtomicBool::new(false),
        }
    }

    pub fn from_settings(stats: Arc<StatsStore>, settings: &LoggerSettings) -> Self {
        Self::new(stats, settings.path.clone(), settings.interval(), settings.duration())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts a logging session unless one is already active. Returns the
    /// session task, or `None` when the call was a no-op.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Snapshot logger already running, ignoring start");
            return None;
        }

        let guard = SessionGuard(Arc::clone(self));
        Some(tokio::spawn(async move {
            guard.0.run_session().await;
            drop(guard);
        }))
    }

    async fn run_session(&self) {
        let session_id = Uuid::new_v4();
        info!("Logging session {} started, writing to {}", session_id, self.path.display());

        let mut header_ready = self.prepare_file().await;
        let started = Instant::now();
        let deadline = started + self.duration;
        let mut next_tick = started + self.interval;
        let mut rows = 0usize;

        while next_tick <= deadline {
            tokio::time::sleep_until(next_tick).await;
            next_tick += self.interval;

            if !header_ready {
                header_ready = self.prepare_file().await;
                if !header_ready {
                    continue;
                }
            }

            let row = LogRow::capture(Local::now(), self.stats.snapshot());
            match self.append(row).await {
                Ok(()) => rows += 1,
                Err(e) => {
                    error!("Failed to append log row to {}: {}", self.path.display(), e);
                    // A vanished file gets recreated with its header next tick.
                    header_ready = tokio::fs::try_exists(&self.path).await.unwrap_or(false);
                }
            }
        }

        info!("Logging session {} finished, {} rows saved in {}", session_id, rows, self.path.display());
    }

    async fn prepare_file(&self) -> bool {
        let path = self.path.clone();
        let created = tokio::task::spawn_blocking(move || write_header(&path))
            .await
            .map_err(LogError::from)
            .and_then(|result| result);
        match created {
            Ok(created) => {
                if created {
                    debug!("Created log file {}", self.path.display());
                }
                true
            }
            Err(e) => {
                error!("Failed to prepare log file {}: {}", self.path.display(), e);
                false
            }
        }
    }

    async fn append(&self, row: LogRow) -> Result<(), LogError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || append_row(&path, &row)).await?
    }
}

/// Creates the file with its header row. Returns `false` when the file
/// already existed and was left alone.
fn write_header(path: &Path) -> Result<bool, LogError> {
    let file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(LogError::Open(e)),
    };
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(LOG_HEADER)?;
    writer.flush().map_err(LogError::Flush)?;
    Ok(true)
}

fn append_row(path: &Path, row: &LogRow) -> Result<(), LogError> {
    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(LogError::Open)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    writer.serialize(row)?;
    writer.flush().map_err(LogError::Flush)
}
