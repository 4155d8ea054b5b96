//! # Port Discovery Module
//!
//! Sweeps the candidate device paths until one opens, asking the operator
//! between sweeps whether to keep trying.

use log::debug;

use crate::error::{MonitorError, Result};
use crate::relay::InputRelay;
use crate::serial::session::{MonitorSettings, PortOpener, SerialDevice};
use crate::supervisor::operator_exit;
use crate::term::RestoreHandle;

/// Scans until a candidate port opens.
///
/// After each failed sweep the operator is prompted: escape ends the
/// process, any other key starts the next sweep. The returned device has
/// its driver input discarded and is ready for the monitor.
pub async fn acquire_device(
    opener: &dyn PortOpener,
    settings: &MonitorSettings,
    relay: &mut InputRelay,
    term: &RestoreHandle,
) -> Result<Box<dyn SerialDevice>> {
    loop {
        if let Some(mut device) = sweep(opener, settings).await {
            device.flush_input()?;
            return Ok(device);
        }
        println!("Monitor: Couldn't open a serial port.");
        println!("Monitor: Press 'enter' to try again or 'esc' to exit.");
        match relay.next_key().await {
            Some(key) if key.is_escape() => operator_exit(relay, term),
            // Any key other than escape retries.
            Some(_) => {}
            None => {
                return Err(MonitorError::relay_closed(
                    "no input can arrive to answer the retry prompt",
                ));
            }
        }
    }
}

/// One pass over every candidate path, in settings order. First success
/// wins; individual open failures are expected and only logged.
async fn sweep(
    opener: &dyn PortOpener,
    settings: &MonitorSettings,
) -> Option<Box<dyn SerialDevice>> {
    for path in settings.candidates() {
        match opener.open(&path, settings).await {
            Ok(device) => {
                println!("Monitor: Opened {path}\r");
                return Some(device);
            }
            Err(err) => debug!("cannot open {path}: {err}"),
        }
    }
    None
}
