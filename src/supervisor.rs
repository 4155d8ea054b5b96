//! # Supervisor Module
//!
//! The outer retry loop. Sessions end, the supervisor does not: a silent
//! or disconnected device sends the process back to discovery, with no
//! backoff and no attempt limit. Only the operator or an unanswerable
//! retry prompt ends the process.

use std::io;
use std::process;

use log::{error, info, warn};

use crate::error::{MonitorError, Result};
use crate::monitor::Monitor;
use crate::relay::InputRelay;
use crate::serial::discovery;
use crate::serial::session::{MonitorSettings, PortOpener};
use crate::term::RestoreHandle;

/// Outer retry loop around discovery and monitoring.
pub struct Supervisor {
    settings: MonitorSettings,
    opener: Box<dyn PortOpener>,
}

impl Supervisor {
    #[must_use]
    pub fn new(settings: MonitorSettings, opener: Box<dyn PortOpener>) -> Self {
        Self { settings, opener }
    }

    /// Runs sessions forever. A disconnect is reported to the operator and
    /// rolled into the next discovery round; only fatal errors return.
    pub async fn run(&self, relay: &mut InputRelay, term: &RestoreHandle) -> Result<()> {
        loop {
            match self.session(relay, term).await {
                Ok(()) => {}
                Err(MonitorError::Transport(err)) => {
                    println!("Monitor: Disconnected (Serial exception)");
                    warn!("serial failure: {err}");
                }
                Err(MonitorError::Io(err)) => {
                    println!("Monitor: Disconnected (I/O Error)");
                    warn!("i/o failure: {err}");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One full session: discovery, then monitoring until the session ends.
    async fn session(&self, relay: &mut InputRelay, term: &RestoreHandle) -> Result<()> {
        let device =
            discovery::acquire_device(self.opener.as_ref(), &self.settings, relay, term).await?;
        let mut monitor = Monitor::new(device);
        monitor.run(relay, term).await
    }
}

/// Watches for Ctrl-C and ends the process on the operator's behalf:
/// farewell line, terminal restored, exit status 1.
///
/// A failed watch is fatal too. With no handler registered, SIGINT would
/// kill the process while the terminal is still raw.
pub fn spawn_interrupt_watcher(term: RestoreHandle) {
    tokio::spawn(async move {
        let outcome = tokio::signal::ctrl_c().await;
        interrupt_farewell(outcome, &term);
        process::exit(1);
    });
}

/// Reports how the interrupt watch ended, then restores the terminal. The
/// caller exits the process afterwards.
fn interrupt_farewell(outcome: io::Result<()>, term: &RestoreHandle) {
    match outcome {
        Ok(()) => println!("Monitor: Keyboard Interrupt. Exiting Now..."),
        Err(err) => {
            error!("cannot watch for interrupt: {err}");
            eprintln!("Monitor: cannot watch for interrupt: {err}");
        }
    }
    term.restore();
}

/// Ends the process at the operator's request. The relay is told to stop,
/// the terminal restored, and the process exits with status 1.
pub(crate) fn operator_exit(relay: &InputRelay, term: &RestoreHandle) -> ! {
    info!("operator requested exit");
    relay.stop();
    term.restore();
    process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::Keystroke;
    use crate::serial::session::{MockPortOpener, MockSerialDevice, SerialDevice};
    use crate::term::ModeGuard;
    use mockall::Sequence;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn test_relay() -> (mpsc::UnboundedSender<Keystroke>, InputRelay) {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (control, _) = mpsc::unbounded_channel();
        (event_tx, InputRelay::from_parts(events, control))
    }

    fn idle_handle() -> RestoreHandle {
        ModeGuard::new(Box::new(|| {})).handle()
    }

    fn small_settings() -> MonitorSettings {
        MonitorSettings {
            prefixes: vec!["X".into()],
            suffix_span: 1,
            ..MonitorSettings::default()
        }
    }

    fn no_device() -> MonitorError {
        tokio_serial::Error::new(tokio_serial::ErrorKind::NoDevice, "no such device").into()
    }

    fn silent_device() -> Box<dyn SerialDevice> {
        let mut device = MockSerialDevice::new();
        device.expect_flush_input().times(1).returning(|| Ok(()));
        device.expect_read_line().times(1).returning(|_| Ok(0));
        device.expect_path().return_const("X0".to_string());
        Box::new(device)
    }

    fn failing_device() -> Box<dyn SerialDevice> {
        let mut device = MockSerialDevice::new();
        device.expect_flush_input().times(1).returning(|| Ok(()));
        device.expect_read_line().times(1).returning(|_| {
            Err(tokio_serial::Error::new(tokio_serial::ErrorKind::Unknown, "wire gone").into())
        });
        Box::new(device)
    }

    fn io_failing_device() -> Box<dyn SerialDevice> {
        let mut device = MockSerialDevice::new();
        device.expect_flush_input().times(1).returning(|| Ok(()));
        device
            .expect_read_line()
            .times(1)
            .returning(|_| Err(io::Error::new(io::ErrorKind::BrokenPipe, "wire gone").into()));
        Box::new(device)
    }

    fn counting_guard() -> (Arc<AtomicUsize>, ModeGuard) {
        let counter = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&counter);
        let guard = ModeGuard::new(Box::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        }));
        (counter, guard)
    }

    #[tokio::test]
    async fn test_silent_session_restarts_discovery() {
        let mut seq = Sequence::new();
        let mut opener = MockPortOpener::new();
        for _ in 0..2 {
            opener
                .expect_open()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(silent_device()));
        }
        // The third sweep finds nothing and parks at the retry prompt.
        opener
            .expect_open()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(no_device()));

        let supervisor = Supervisor::new(small_settings(), Box::new(opener));
        let (_keys, mut relay) = test_relay();
        let term = idle_handle();
        let outcome = timeout(
            Duration::from_millis(100),
            supervisor.run(&mut relay, &term),
        )
        .await;
        assert!(outcome.is_err(), "supervisor must keep retrying, not return");
    }

    #[tokio::test]
    async fn test_disconnect_is_contained() {
        let mut seq = Sequence::new();
        let mut opener = MockPortOpener::new();
        opener
            .expect_open()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(failing_device()));
        opener
            .expect_open()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(no_device()));

        let supervisor = Supervisor::new(small_settings(), Box::new(opener));
        let (_keys, mut relay) = test_relay();
        let term = idle_handle();
        let outcome = timeout(
            Duration::from_millis(100),
            supervisor.run(&mut relay, &term),
        )
        .await;
        assert!(
            outcome.is_err(),
            "a session failure must restart discovery, not propagate"
        );
    }

    #[tokio::test]
    async fn test_io_disconnect_is_contained() {
        let mut seq = Sequence::new();
        let mut opener = MockPortOpener::new();
        opener
            .expect_open()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(io_failing_device()));
        opener
            .expect_open()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(no_device()));

        let supervisor = Supervisor::new(small_settings(), Box::new(opener));
        let (_keys, mut relay) = test_relay();
        let term = idle_handle();
        let outcome = timeout(
            Duration::from_millis(100),
            supervisor.run(&mut relay, &term),
        )
        .await;
        assert!(
            outcome.is_err(),
            "an i/o failure must restart discovery, not propagate"
        );
    }

    #[test]
    fn test_interrupt_farewell_always_restores() {
        let (restored, guard) = counting_guard();
        interrupt_farewell(Ok(()), &guard.handle());
        assert_eq!(restored.load(Ordering::SeqCst), 1);

        let (restored, guard) = counting_guard();
        interrupt_farewell(
            Err(io::Error::new(io::ErrorKind::Unsupported, "signals unavailable")),
            &guard.handle(),
        );
        assert_eq!(restored.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fatal_error_propagates() {
        let mut opener = MockPortOpener::new();
        opener.expect_open().times(1).returning(|_, _| Err(no_device()));

        let supervisor = Supervisor::new(small_settings(), Box::new(opener));
        let (keys, mut relay) = test_relay();
        drop(keys);
        let term = idle_handle();
        let err = supervisor
            .run(&mut relay, &term)
            .await
            .expect_err("dead relay is fatal");
        assert!(matches!(err, MonitorError::RelayClosed(_)));
    }
}
