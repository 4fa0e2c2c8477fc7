// Core types
pub mod types;
pub use types::*;

// Shared guarded values
pub mod shared;
pub use shared::{RawSharedLock, Shared, SharedGuard};

// Deadlock-free multi-lock acquisition
pub mod multi_lock;
pub use multi_lock::{MultiLockGuard, RawLock, synchronized};

// Lock event tracing
pub mod trace;
pub use trace::{init_trace, is_trace_enabled};

// Stress hooks
pub mod stress;
pub use stress::StressConfig;
#[cfg(feature = "stress")]
pub use stress::{apply_delay, set_stress_config};

use anyhow::{Context, Result};

/// Interlock configuration struct
pub struct Interlock {
    trace_path: Option<String>,
    #[cfg(feature = "stress")]
    stress_config: Option<StressConfig>,
}

impl Default for Interlock {
    fn default() -> Self {
        Self::new()
    }
}

impl Interlock {
    /// Create a new Interlock configuration with default settings
    ///
    /// By default tracing is disabled and, with the `stress` feature,
    /// the stress hooks keep their default configuration.
    pub fn new() -> Self {
        Interlock {
            trace_path: None,
            #[cfg(feature = "stress")]
            stress_config: None,
        }
    }

    /// Activate tracing and set the path for the trace file
    ///
    /// # Arguments
    /// * `path` - Path to the trace file
    ///
    /// # Returns
    /// The builder for method chaining
    pub fn with_trace<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.trace_path = Some(path.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Set the stress configuration to install
    ///
    /// # Arguments
    /// * `config` - Stress configuration for multi-lock acquisition rounds
    ///
    /// # Returns
    /// The builder for method chaining
    #[cfg(feature = "stress")]
    pub fn with_stress(mut self, config: StressConfig) -> Self {
        self.stress_config = Some(config);
        self
    }

    /// Apply the configured settings process-wide
    ///
    /// # Errors
    /// Returns an error if trace logger initialization fails
    pub fn start(self) -> Result<()> {
        if let Some(trace_path) = self.trace_path {
            init_trace(Some(trace_path)).context("Failed to initialize trace logger")?;
        }

        #[cfg(feature = "stress")]
        if let Some(config) = self.stress_config {
            set_stress_config(config);
        }

        Ok(())
    }
}
