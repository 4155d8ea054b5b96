//! # Monitor Module
//!
//! The session loop for one open port: pending keystrokes go out to the
//! device, device lines come back to the screen, until the device goes
//! silent or the connection fails.

use log::info;

use crate::error::Result;
use crate::relay::InputRelay;
use crate::serial::session::SerialDevice;
use crate::supervisor::operator_exit;
use crate::term::RestoreHandle;

/// Lifecycle of a single monitor session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MonitorState {
    /// Actively relaying between operator and device.
    #[default]
    Monitoring,
    /// The device produced nothing for a full read window.
    DeviceSilent,
    /// The operator pressed escape.
    ExitRequested,
    /// The connection failed mid-session.
    TransportError,
}

impl MonitorState {
    #[must_use]
    pub fn is_monitoring(self) -> bool {
        self == Self::Monitoring
    }

    #[must_use]
    pub fn is_device_silent(self) -> bool {
        self == Self::DeviceSilent
    }

    #[must_use]
    pub fn is_exit_requested(self) -> bool {
        self == Self::ExitRequested
    }

    #[must_use]
    pub fn is_transport_error(self) -> bool {
        self == Self::TransportError
    }
}

/// Relay-to-device bridge for one open port.
pub struct Monitor {
    device: Box<dyn SerialDevice>,
    state: MonitorState,
}

impl Monitor {
    #[must_use]
    pub fn new(device: Box<dyn SerialDevice>) -> Self {
        Self {
            device,
            state: MonitorState::Monitoring,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Drives the session until the device goes silent or the connection
    /// fails. Silence returns cleanly; a failed connection comes back as
    /// an error once the state is marked. Escape does not return at all.
    pub async fn run(&mut self, relay: &mut InputRelay, term: &RestoreHandle) -> Result<()> {
        self.state = MonitorState::Monitoring;
        let mut line = Vec::new();
        loop {
            let escape = match self.forward_input(relay).await {
                Ok(escape) => escape,
                Err(err) => {
                    self.state = MonitorState::TransportError;
                    return Err(err);
                }
            };
            if escape {
                operator_exit(relay, term);
            }

            line.clear();
            let read = match self.device.read_line(&mut line).await {
                Ok(read) => read,
                Err(err) => {
                    self.state = MonitorState::TransportError;
                    return Err(err);
                }
            };
            if read == 0 {
                info!("{} went silent", self.device.path());
                println!("Device Not Responding");
                self.state = MonitorState::DeviceSilent;
                // TODO: trigger a power cycle when the device goes silent.
                return Ok(());
            }
            println!("{}", String::from_utf8_lossy(&line).trim_end());
        }
    }

    /// Forwards at most one pending keystroke to the device. `true` means
    /// the operator pressed escape; that byte still went out first.
    async fn forward_input(&mut self, relay: &mut InputRelay) -> Result<bool> {
        let Some(key) = relay.try_next() else {
            return Ok(false);
        };
        // Write before looking at the byte. The device sees every
        // keystroke, the escape included.
        self.device.write_bytes(&[key.0]).await?;
        if key.is_escape() {
            self.state = MonitorState::ExitRequested;
            return Ok(true);
        }
        Ok(false)
    }
}
