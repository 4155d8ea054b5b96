//! # Serial Module
//!
//! Everything that touches the wire: session settings, the device traits
//! and their hardware implementation, and port discovery.

pub mod discovery;
pub mod session;

pub use discovery::acquire_device;
pub use session::{MonitorSettings, PortOpener, SerialDevice, SerialOpener, Session};
