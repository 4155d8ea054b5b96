//! Blocking single-character input sources.

use std::collections::VecDeque;
use std::io;
#[cfg(unix)]
use std::io::Read;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Blocking single-character input.
///
/// Implementations suspend until the operator presses a key and hand back
/// one byte per call; a multi-byte character is delivered as its UTF-8
/// bytes in order.
pub trait CharSource: Send {
    /// Reads the next input byte, blocking until one is available.
    fn read_byte(&mut self) -> io::Result<u8>;
}

/// Raw bytes straight from stdin; relies on cbreak mode being active.
#[cfg(unix)]
pub struct PosixKeys {
    stdin: io::Stdin,
}

#[cfg(unix)]
impl PosixKeys {
    pub fn new() -> Self {
        Self { stdin: io::stdin() }
    }
}

#[cfg(unix)]
impl Default for PosixKeys {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
impl CharSource for PosixKeys {
    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.stdin.read_exact(&mut byte)?;
        Ok(byte[0])
    }
}

/// Console key events decoded to their conventional bytes.
///
/// Used where POSIX terminal semantics are unavailable. Requires the
/// console's raw mode so events arrive unprocessed. Keys without a
/// single-byte convention (function keys, arrows) are skipped.
pub struct ConsoleKeys {
    pending: VecDeque<u8>,
}

impl ConsoleKeys {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }
}

impl Default for ConsoleKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl CharSource for ConsoleKeys {
    fn read_byte(&mut self) -> io::Result<u8> {
        loop {
            if let Some(byte) = self.pending.pop_front() {
                return Ok(byte);
            }
            match crossterm::event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    self.pending.extend(decode_key(&key));
                }
                // Resize, focus and paste events are not keystrokes.
                _ => {}
            }
        }
    }
}

/// Decodes one key event to the byte sequence a cbreak terminal would
/// produce for it.
fn decode_key(key: &KeyEvent) -> Vec<u8> {
    match key.code {
        KeyCode::Char(ch) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                ctrl_byte(ch).map(|byte| vec![byte]).unwrap_or_default()
            } else {
                let mut buf = [0u8; 4];
                ch.encode_utf8(&mut buf).as_bytes().to_vec()
            }
        }
        KeyCode::Enter => vec![b'\r'],
        KeyCode::Esc => vec![0x1b],
        KeyCode::Tab => vec![b'\t'],
        KeyCode::Backspace => vec![0x08],
        _ => Vec::new(),
    }
}

/// Control byte for Ctrl-letter combinations, e.g. Ctrl-C -> 0x03.
fn ctrl_byte(ch: char) -> Option<u8> {
    let ch = ch.to_ascii_lowercase();
    if ch.is_ascii_lowercase() {
        Some((ch as u8) & 0x1f)
    } else {
        None
    }
}
