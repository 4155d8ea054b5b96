//! # Serial Session Module
//!
//! Monitor settings, the device traits, and the concrete serial session.
//! The traits are the seam everything above the wire is tested through.

use std::time::Duration;

use async_trait::async_trait;
use log::info;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};

use crate::error::Result;

/// Baud rate used for every candidate port.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Upper bound on a single line read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Device-path prefixes probed during discovery, in order.
pub const DEFAULT_PREFIXES: [&str; 4] = [
    "/dev/ttyUSB",
    "/dev/ttyACM",
    "COM",
    "/dev/tty.usbmodem1234",
];

/// Numeric suffixes `0..DEFAULT_SUFFIX_SPAN` are appended to each prefix.
pub const DEFAULT_SUFFIX_SPAN: u32 = 64;

/// Tunables for discovery and the monitor session.
#[derive(Clone, Debug)]
pub struct MonitorSettings {
    pub baud_rate: u32,
    pub read_timeout: Duration,
    /// Device-path prefixes probed during discovery, in order.
    pub prefixes: Vec<String>,
    /// Numeric suffixes `0..suffix_span` appended to each prefix.
    pub suffix_span: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            prefixes: DEFAULT_PREFIXES.iter().map(ToString::to_string).collect(),
            suffix_span: DEFAULT_SUFFIX_SPAN,
        }
    }
}

impl MonitorSettings {
    /// All candidate device paths, prefix-major: every suffix of the first
    /// prefix before any suffix of the second.
    #[must_use]
    pub fn candidates(&self) -> Vec<String> {
        let mut paths = Vec::with_capacity(self.prefixes.len() * self.suffix_span as usize);
        for prefix in &self.prefixes {
            for suffix in 0..self.suffix_span {
                paths.push(format!("{prefix}{suffix}"));
            }
        }
        paths
    }
}

/// An open serial connection the monitor can drive.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SerialDevice: Send {
    /// Writes raw bytes to the device.
    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Appends bytes to `buf` until a newline arrives or the read timeout
    /// elapses, returning how many bytes were appended. Zero means the
    /// device sent nothing at all within the window.
    async fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<usize>;

    /// Discards bytes already buffered by the driver.
    fn flush_input(&mut self) -> Result<()>;

    /// Device path this connection is attached to.
    fn path(&self) -> &str;
}

/// Opens candidate ports during discovery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PortOpener: Send + Sync {
    /// Attempts to open `path`, yielding a ready-to-use device.
    async fn open(
        &self,
        path: &str,
        settings: &MonitorSettings,
    ) -> Result<Box<dyn SerialDevice>>;
}

/// A live serial connection, line-buffered on the read side.
pub struct Session {
    path: String,
    stream: BufReader<SerialStream>,
    read_timeout: Duration,
}

impl Session {
    /// Opens `path` with the given settings.
    pub async fn open(path: &str, settings: &MonitorSettings) -> Result<Self> {
        let stream = tokio_serial::new(path, settings.baud_rate)
            .timeout(settings.read_timeout)
            .open_native_async()?;
        info!("opened {path} at {} baud", settings.baud_rate);
        Ok(Self {
            path: path.to_string(),
            stream: BufReader::new(stream),
            read_timeout: settings.read_timeout,
        })
    }
}

#[async_trait]
impl SerialDevice for Session {
    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        let start = buf.len();
        match timeout(self.read_timeout, self.stream.read_until(b'\n', buf)).await {
            Ok(read) => Ok(read?),
            // Cancelled mid-line: whatever already arrived stays in `buf`
            // and counts as the line.
            Err(_) => Ok(buf.len() - start),
        }
    }

    fn flush_input(&mut self) -> Result<()> {
        self.stream.get_ref().clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn path(&self) -> &str {
        &self.path
    }
}

/// [`PortOpener`] backed by real hardware.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialOpener;

#[async_trait]
impl PortOpener for SerialOpener {
    async fn open(
        &self,
        path: &str,
        settings: &MonitorSettings,
    ) -> Result<Box<dyn SerialDevice>> {
        Ok(Box::new(Session::open(path, settings).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = MonitorSettings::default();
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.read_timeout, Duration::from_secs(5));
        assert_eq!(settings.prefixes.len(), 4);
        assert_eq!(settings.suffix_span, 64);
    }

    #[test]
    fn test_candidates_are_prefix_major() {
        let settings = MonitorSettings {
            prefixes: vec!["A".into(), "B".into()],
            suffix_span: 2,
            ..MonitorSettings::default()
        };
        assert_eq!(settings.candidates(), ["A0", "A1", "B0", "B1"]);
    }

    #[test]
    fn test_candidates_cover_full_span() {
        let candidates = MonitorSettings::default().candidates();
        assert_eq!(candidates.len(), 4 * 64);
        assert_eq!(candidates.first().map(String::as_str), Some("/dev/ttyUSB0"));
        assert_eq!(
            candidates.last().map(String::as_str),
            Some("/dev/tty.usbmodem123463")
        );
    }
}
