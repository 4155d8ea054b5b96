//! # Error Module
//!
//! This module provides the error types for the serial monitor.
//! It uses the `thiserror` crate for ergonomic error handling.

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Main error type for the serial monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No interactive terminal is attached, or raw input mode could not
    /// be entered. Fatal at startup; never retried.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Serial-port-layer failure (open, input flush). The supervisor
    /// reports it and re-runs discovery.
    #[error("Serial port error: {0}")]
    Transport(#[from] tokio_serial::Error),

    /// I/O failure while reading from or writing to an open device. The
    /// supervisor reports it and re-runs discovery.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input relay thread terminated while input was still needed.
    #[error("Input relay closed: {0}")]
    RelayClosed(String),
}

impl MonitorError {
    /// Creates a new terminal error.
    #[must_use]
    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }

    /// Creates a new relay-closed error.
    #[must_use]
    pub fn relay_closed(msg: impl Into<String>) -> Self {
        Self::RelayClosed(msg.into())
    }

    /// Whether the supervisor recovers from this error by re-running
    /// port discovery.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Io(_))
    }
}
