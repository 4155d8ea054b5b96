//! # Input Relay Module
//!
//! A background thread reads keystrokes from the terminal one byte at a
//! time and feeds them to the main loop over a FIFO channel. The main side
//! steers the relay with [`ControlSignal`]s, which the relay samples only
//! between reads: a byte typed before a pending `Stop` is observed is
//! still read and enqueued.

use std::thread;

use log::{debug, error, info};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::Result;
use crate::term::CharSource;

/// Byte value of the escape key, which terminates the monitor.
pub const ESCAPE: u8 = 0x1b;

/// One keystroke captured from the terminal, as its raw byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Keystroke(pub u8);

impl Keystroke {
    /// Whether this keystroke is the escape key.
    #[must_use]
    pub fn is_escape(self) -> bool {
        self.0 == ESCAPE
    }
}

/// Relay lifecycle directive, consumed between character reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlSignal {
    /// Halt enqueuing until `Resume` arrives.
    Pause,
    /// Leave the paused state.
    Resume,
    /// Terminate the relay permanently.
    Stop,
}

/// Main-side handle to the background input reader.
///
/// One relay serves the whole process: it is spawned once at startup,
/// outlives every monitor session, and is never restarted. Its thread is
/// detached; after `Stop` (or a read failure) it simply runs out.
pub struct InputRelay {
    events: UnboundedReceiver<Keystroke>,
    control: UnboundedSender<ControlSignal>,
}

impl InputRelay {
    /// Spawns the reader thread over the given character source.
    pub fn spawn(source: Box<dyn CharSource>) -> Result<Self> {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (control, control_rx) = mpsc::unbounded_channel();
        thread::Builder::new()
            .name("input-relay".into())
            .spawn(move || relay_loop(source, event_tx, control_rx))?;
        Ok(Self { events, control })
    }

    /// Non-blocking check for the next queued keystroke.
    pub fn try_next(&mut self) -> Option<Keystroke> {
        self.events.try_recv().ok()
    }

    /// Waits for the next keystroke. `None` means the relay is gone and no
    /// further input can ever arrive.
    pub async fn next_key(&mut self) -> Option<Keystroke> {
        self.events.recv().await
    }

    /// Halts enqueuing after the relay's in-flight read, until [`resume`].
    ///
    /// [`resume`]: InputRelay::resume
    pub fn pause(&self) {
        self.signal(ControlSignal::Pause);
    }

    /// Lifts a pause.
    pub fn resume(&self) {
        self.signal(ControlSignal::Resume);
    }

    /// Permanently stops the relay once its in-flight read returns.
    pub fn stop(&self) {
        self.signal(ControlSignal::Stop);
    }

    fn signal(&self, signal: ControlSignal) {
        // A relay that already terminated cannot observe signals.
        let _ = self.control.send(signal);
    }

    /// Wires a relay directly to caller-held channels, with no thread.
    #[cfg(test)]
    pub(crate) fn from_parts(
        events: UnboundedReceiver<Keystroke>,
        control: UnboundedSender<ControlSignal>,
    ) -> Self {
        Self { events, control }
    }
}

fn relay_loop(
    mut source: Box<dyn CharSource>,
    events: UnboundedSender<Keystroke>,
    mut control: UnboundedReceiver<ControlSignal>,
) {
    info!("input relay started");
    loop {
        // The relay's only suspension point. There is no recovery from a
        // failed read; the thread ends and the event channel closes.
        let byte = match source.read_byte() {
            Ok(byte) => byte,
            Err(err) => {
                error!("input read failed, relay terminating: {err}");
                return;
            }
        };
        if events.send(Keystroke(byte)).is_err() {
            debug!("event channel closed, relay terminating");
            return;
        }
        match control.try_recv() {
            Ok(ControlSignal::Pause) => {
                debug!("input relay paused");
                if !wait_for_resume(&mut control) {
                    info!("input relay stopped");
                    return;
                }
                debug!("input relay resumed");
            }
            Ok(ControlSignal::Stop) => {
                info!("input relay stopped");
                return;
            }
            Ok(ControlSignal::Resume) | Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => return,
        }
    }
}

/// Blocks on the control channel until `Resume`. Returns `false` when a
/// `Stop` arrives instead, or when the main side is gone.
fn wait_for_resume(control: &mut UnboundedReceiver<ControlSignal>) -> bool {
    loop {
        match control.blocking_recv() {
            Some(ControlSignal::Resume) => return true,
            Some(ControlSignal::Stop) | None => return false,
            Some(ControlSignal::Pause) => {}
        }
    }
}
