//! A "sink" is a destination for rendered frames. The terminal is always
//! written to. At most one mirror (SSH or serial) gets a copy of each frame.

pub mod serial;
pub mod ssh;
pub mod terminal;

use crate::{
    config::MirrorConfig,
    sink::{serial::SerialSink, ssh::SshSink},
};
use log::{error, info};

pub trait Sink {
    /// Get a descriptive name for this sink, for logging
    fn name(&self) -> &str;

    /// Width available for a frame, in columns. `None` if the sink doesn't
    /// care, in which case the caller picks.
    fn width(&self) -> Option<usize> {
        None
    }

    /// Write one complete frame, replacing whatever was there before
    fn send(&mut self, frame: &str) -> anyhow::Result<()>;
}

/// Open the configured mirror, if any. A mirror that can't be reached at
/// startup is logged and left disabled; it never stops the display.
pub fn open_mirror(config: &MirrorConfig) -> Option<Box<dyn Sink>> {
    let result: anyhow::Result<Box<dyn Sink>> = match config {
        MirrorConfig::None => return None,
        MirrorConfig::Ssh { remote_path } => {
            SshSink::connect(ssh::SshParams::from_env(), remote_path)
                .map(|sink| Box::new(sink) as Box<dyn Sink>)
        }
        MirrorConfig::Serial { port, baud_rate } => {
            SerialSink::open(port, *baud_rate)
                .map(|sink| Box::new(sink) as Box<dyn Sink>)
        }
    };

    match result {
        Ok(sink) => {
            info!("Mirroring display to {}", sink.name());
            Some(sink)
        }
        Err(err) => {
            error!("Error opening mirror, continuing without it: {err:?}");
            None
        }
    }
}
