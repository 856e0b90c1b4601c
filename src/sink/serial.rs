use crate::sink::Sink;
use anyhow::Context;
use log::{info, trace};
use serialport::SerialPort;
use std::{io::Write, time::Duration};

/// Mirror frames over a serial link. Frames are written as raw UTF-8 bytes,
/// it's up to the other end to make sense of them.
pub struct SerialSink<W: Write = Box<dyn SerialPort>> {
    name: String,
    port: W,
}

impl SerialSink {
    /// Biggest frame we expect to push through the link in one go
    const MAX_FRAME_BYTES: u32 = 4096;
    /// Start bit + 8 data bits + stop bit
    const BITS_PER_BYTE: u32 = 10;
    const MIN_TIMEOUT: Duration = Duration::from_secs(1);

    pub fn open(port: &str, baud_rate: u32) -> anyhow::Result<Self> {
        let timeout = Self::write_timeout(baud_rate);
        let serial = serialport::new(port, baud_rate)
            .timeout(timeout)
            .open()
            .with_context(|| {
                format!("Error opening serial port {port} at {baud_rate} baud")
            })?;
        info!("Opened serial port {port} (write timeout {timeout:?})");
        Ok(Self::new(format!("serial port {port}"), serial))
    }

    /// How long a write may wait for the output buffer to drain. Long enough
    /// to push a whole frame through the link at its baud rate.
    fn write_timeout(baud_rate: u32) -> Duration {
        let millis = u64::from(Self::MAX_FRAME_BYTES * Self::BITS_PER_BYTE)
            * 1000
            / u64::from(baud_rate.max(1));
        Duration::from_millis(millis).max(Self::MIN_TIMEOUT)
    }
}

impl<W: Write> SerialSink<W> {
    fn new(name: String, port: W) -> Self {
        Self { name, port }
    }
}

impl<W: Write> Sink for SerialSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, frame: &str) -> anyhow::Result<()> {
        trace!("Writing {} bytes to {}", frame.len(), self.name);
        self.port
            .write_all(frame.as_bytes())
            .and_then(|()| self.port.flush())
            .with_context(|| format!("Error writing to {}", self.name))
    }
}

impl<W: Write> Drop for SerialSink<W> {
    fn drop(&mut self) {
        info!("Closing {}", self.name);
    }
}
