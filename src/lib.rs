//! # Serialmon
//!
//! A terminal monitor for line-oriented serial devices.
//!
//! The program takes over the terminal, finds a serial device by probing
//! the usual device paths, and then relays between the two: every
//! keystroke goes to the device as typed, every line the device sends is
//! printed to the screen. Devices that vanish are rediscovered for as
//! long as the operator keeps the monitor running.
//!
//! ## Features
//!
//! - **Raw keystroke relay**: Single keypresses reach the device without
//!   waiting for enter, read by a dedicated background thread.
//! - **Port discovery**: Probes the common USB-serial device paths until
//!   one opens, with an operator prompt between sweeps.
//! - **Session supervision**: Silent or disconnected devices send the
//!   monitor back to discovery, with no backoff and no attempt limit.
//! - **Terminal safety**: The terminal mode is restored on every exit
//!   path the process can take, panics included.
//!
//! ## Architecture
//!
//! The project is organized into the following modules:
//!
//! - [`term`]: Terminal mode switching and raw keystroke sources
//! - [`relay`]: The background input thread and its control channel
//! - [`serial`]: Settings, device traits, sessions and port discovery
//! - [`monitor`]: The per-session relay loop
//! - [`supervisor`]: The outer retry loop and operator exits
//! - [`error`]: Custom error types for the application

pub mod error;
pub mod monitor;
pub mod relay;
pub mod serial;
pub mod supervisor;
pub mod term;

/// Re-exports for convenience
pub mod prelude {
    pub use crate::error::*;
    pub use crate::monitor::{Monitor, MonitorState};
    pub use crate::relay::{ControlSignal, InputRelay, Keystroke};
    pub use crate::serial::{MonitorSettings, SerialOpener};
    pub use crate::supervisor::Supervisor;
}
