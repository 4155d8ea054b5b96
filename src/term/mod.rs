//! # Terminal Mode Module
//!
//! Puts the controlling terminal into character-at-a-time input mode and
//! guarantees the original mode comes back on every exit path.
//!
//! Two strategies sit behind the same interface, selected once at startup:
//! on POSIX systems the termios attributes are saved and cbreak is applied
//! (unechoed single bytes, interrupt key left active); elsewhere the
//! console's own raw mode is enabled and key events are decoded directly.

pub mod input;

pub use input::{CharSource, ConsoleKeys};
#[cfg(unix)]
pub use input::PosixKeys;

use std::sync::{Arc, Mutex};

use crate::error::{MonitorError, Result};

type Restore = Box<dyn FnOnce() + Send + 'static>;

/// Owner of the saved terminal mode.
///
/// Restoration runs at most once, whether triggered explicitly, by drop,
/// by a panic, or through any number of [`RestoreHandle`] clones.
pub struct ModeGuard {
    restore: Arc<Mutex<Option<Restore>>>,
}

impl ModeGuard {
    pub(crate) fn new(restore: Restore) -> Self {
        Self {
            restore: Arc::new(Mutex::new(Some(restore))),
        }
    }

    /// Reapplies the saved terminal mode. Idempotent; safe from any exit
    /// path.
    pub fn restore(&self) {
        restore_once(&self.restore);
    }

    /// Lightweight cloneable handle for tasks that may need to restore the
    /// terminal (interrupt watcher, panic hook).
    #[must_use]
    pub fn handle(&self) -> RestoreHandle {
        RestoreHandle {
            restore: Arc::clone(&self.restore),
        }
    }

    /// Restores the terminal before the panic message prints, so the
    /// backtrace is readable and the shell is left usable.
    fn install_panic_hook(&self) {
        let handle = self.handle();
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            handle.restore();
            default_hook(info);
        }));
    }
}

impl Drop for ModeGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Cloneable restore handle without drop semantics.
#[derive(Clone)]
pub struct RestoreHandle {
    restore: Arc<Mutex<Option<Restore>>>,
}

impl RestoreHandle {
    /// Reapplies the saved terminal mode. Idempotent.
    pub fn restore(&self) {
        restore_once(&self.restore);
    }
}

fn restore_once(slot: &Mutex<Option<Restore>>) {
    if let Ok(mut slot) = slot.lock() {
        if let Some(restore) = slot.take() {
            restore();
        }
    }
}

/// Enters raw input mode and returns the restore guard together with the
/// character source for the platform's strategy.
///
/// Fails with [`MonitorError::Terminal`] when no interactive terminal is
/// attached.
pub fn acquire() -> Result<(ModeGuard, Box<dyn CharSource>)> {
    #[cfg(unix)]
    {
        acquire_posix()
    }
    #[cfg(not(unix))]
    {
        acquire_console()
    }
}

#[cfg(unix)]
fn acquire_posix() -> Result<(ModeGuard, Box<dyn CharSource>)> {
    use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices};

    let stdin = std::io::stdin();
    let saved = termios::tcgetattr(&stdin)
        .map_err(|err| MonitorError::terminal(format!("stdin is not a terminal: {err}")))?;

    // cbreak, not full raw: ECHO and ICANON off, one byte at a time, ISIG
    // untouched so Ctrl-C still delivers SIGINT to the supervisor.
    let mut cbreak = saved.clone();
    cbreak
        .local_flags
        .remove(LocalFlags::ICANON | LocalFlags::ECHO);
    cbreak.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
    cbreak.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
    termios::tcsetattr(&stdin, SetArg::TCSAFLUSH, &cbreak)
        .map_err(|err| MonitorError::terminal(format!("cannot enter cbreak mode: {err}")))?;

    let guard = ModeGuard::new(Box::new(move || {
        let stdin = std::io::stdin();
        let _ = termios::tcsetattr(&stdin, SetArg::TCSADRAIN, &saved);
    }));
    guard.install_panic_hook();
    Ok((guard, Box::new(PosixKeys::new())))
}

#[cfg(not(unix))]
fn acquire_console() -> Result<(ModeGuard, Box<dyn CharSource>)> {
    crossterm::terminal::enable_raw_mode()
        .map_err(|err| MonitorError::terminal(format!("cannot enter raw console mode: {err}")))?;

    let guard = ModeGuard::new(Box::new(|| {
        let _ = crossterm::terminal::disable_raw_mode();
    }));
    guard.install_panic_hook();
    Ok((guard, Box::new(ConsoleKeys::new())))
}
