//! Error type for resource and configuration failures.
//!
//! Tracking itself never fails: degenerate boxes and unknown classes fall back
//! to safe values. Only resources the caller hands us (capture sources, config
//! files, the worker thread) can produce an [`Error`].

use std::io;

/// Errors surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The capture source could not be opened. Fatal at startup.
    #[error("failed to open frame source `{source_name}`: {reason}")]
    SourceOpen { source_name: String, reason: String },

    /// Reading from an already opened capture source failed.
    #[error("frame capture failed: {0}")]
    Capture(String),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration file could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The worker thread could not be spawned.
    #[error("failed to spawn pipeline worker: {0}")]
    WorkerSpawn(io::Error),

    /// The worker thread terminated by panicking outside a frame iteration.
    #[error("pipeline worker panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, Error>;
