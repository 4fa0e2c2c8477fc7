use crate::core::types::{Event, LockId, ThreadId};
use anyhow::{Context, Result};
use chrono::Utc;
use crossbeam_channel::Sender;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

/// Structure for a single trace entry
#[derive(Debug, Serialize)]
pub struct TraceEntry {
    /// Thread that performed the action
    pub thread_id: ThreadId,
    /// Lock that was involved (`MULTI_LOCK_ID` for multi-lock rounds)
    pub lock_id: LockId,
    /// Type of event that occurred
    pub event: Event,
    /// Seconds since Unix epoch with microsecond precision
    pub timestamp: f64,
}

/// Determines how the trace logger should operate
enum TraceMode {
    /// Tracing is disabled entirely
    Disabled,
    /// Entries are handed to the background writer thread
    ToWriter(Sender<TraceEntry>),
}

/// Logger for recording lock events
pub struct TraceLogger {
    mode: TraceMode,
    /// Writer thread handle, joined on replacement so pending entries
    /// reach the file before init_trace returns
    writer: Option<JoinHandle<()>>,
}

impl Default for TraceLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceLogger {
    /// Create a new logger with tracing disabled
    pub fn new() -> Self {
        TraceLogger {
            mode: TraceMode::Disabled,
            writer: None,
        }
    }

    /// Create a new logger that appends JSON lines to the specified file
    ///
    /// Spawns the writer thread; it drains the channel and exits once
    /// the logger is dropped.
    pub fn with_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .context("Failed to open trace file")?;

        let (tx, rx) = crossbeam_channel::unbounded::<TraceEntry>();
        let writer = std::thread::spawn(move || {
            while let Ok(entry) = rx.recv() {
                if let Ok(json) = serde_json::to_string(&entry) {
                    let _ = writeln!(file, "{}", json);
                    let _ = file.flush();
                }
            }
        });

        Ok(TraceLogger {
            mode: TraceMode::ToWriter(tx),
            writer: Some(writer),
        })
    }

    /// Record a lock event based on the configured mode
    pub fn record(&self, thread_id: ThreadId, lock_id: LockId, event: Event) {
        if let TraceMode::ToWriter(tx) = &self.mode {
            // Absolute timestamp as f64: seconds with microsecond precision
            let now = Utc::now();
            let timestamp =
                now.timestamp() as f64 + now.timestamp_subsec_micros() as f64 / 1_000_000.0;

            let _ = tx.send(TraceEntry {
                thread_id,
                lock_id,
                event,
                timestamp,
            });
        }
    }

    /// Check if tracing is enabled
    pub fn is_enabled(&self) -> bool {
        matches!(self.mode, TraceMode::ToWriter(_))
    }
}

impl Drop for TraceLogger {
    fn drop(&mut self) {
        // Close the channel first so the writer drains and exits
        self.mode = TraceMode::Disabled;
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}

// Fast path check so disabled tracing costs one relaxed load per event
static TRACE_ENABLED: AtomicBool = AtomicBool::new(false);

// Global trace logger instance
lazy_static::lazy_static! {
    static ref GLOBAL_TRACE: Mutex<TraceLogger> = Mutex::new(TraceLogger::new());
}

/// Set the global trace logger to append to the specified file, or
/// disable tracing if None
///
/// Replacing an active logger joins its writer thread, so every entry
/// recorded before the call is on disk when this returns.
///
/// # Errors
/// Returns an error if the trace file cannot be opened.
pub fn init_trace<P: AsRef<Path>>(path: Option<P>) -> Result<()> {
    if let Ok(mut global) = GLOBAL_TRACE.lock() {
        match path {
            Some(path) => {
                let logger =
                    TraceLogger::with_file(path).context("Failed to create trace logger")?;
                TRACE_ENABLED.store(true, Ordering::SeqCst);
                *global = logger;
            }
            None => {
                TRACE_ENABLED.store(false, Ordering::SeqCst);
                *global = TraceLogger::new(); // Disabled mode
            }
        }
    } else {
        anyhow::bail!("Failed to acquire lock on global trace logger");
    }
    Ok(())
}

/// Record an event with the global trace logger (if enabled)
pub fn emit(thread_id: ThreadId, lock_id: LockId, event: Event) {
    if !TRACE_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    if let Ok(logger) = GLOBAL_TRACE.lock() {
        logger.record(thread_id, lock_id, event);
    }
}

/// Check if the global trace logger is enabled
pub fn is_trace_enabled() -> bool {
    TRACE_ENABLED.load(Ordering::Relaxed)
}
