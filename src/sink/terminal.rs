use crate::sink::Sink;
use anyhow::Context;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::Print,
    terminal::{
        self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use log::{info, warn};
use std::io::{self, Stdout, Write};

/// The local terminal. Takes over the screen for as long as it lives and
/// puts everything back when dropped.
pub struct TerminalSink {
    stdout: Stdout,
    /// Extra line shown below every frame, not part of the frame itself
    footer: &'static str,
}

impl TerminalSink {
    pub fn new(footer: &'static str) -> anyhow::Result<Self> {
        // Raw mode lets us see arrow keys without waiting for enter
        terminal::enable_raw_mode().context("Error enabling raw mode")?;
        // Build first, so a failure below still restores raw mode on drop
        let mut sink = Self {
            stdout: io::stdout(),
            footer,
        };
        execute!(sink.stdout, EnterAlternateScreen, Hide)
            .context("Error initializing terminal")?;
        Ok(sink)
    }
}

impl Sink for TerminalSink {
    fn name(&self) -> &str {
        "terminal"
    }

    fn width(&self) -> Option<usize> {
        // Checked on every frame, so resizes are picked up
        terminal::size().ok().map(|(columns, _)| columns as usize)
    }

    fn send(&mut self, frame: &str) -> anyhow::Result<()> {
        queue!(self.stdout, Clear(ClearType::All))?;
        // Raw mode doesn't translate \n to \r\n, so position each line
        // explicitly
        let lines = frame.split('\n').chain(["", self.footer]);
        for (y, line) in lines.enumerate() {
            let y = u16::try_from(y).unwrap_or(u16::MAX);
            queue!(self.stdout, MoveTo(0, y), Print(line))?;
        }
        self.stdout.flush().context("Error writing to terminal")
    }
}

impl Drop for TerminalSink {
    fn drop(&mut self) {
        info!("Restoring terminal");
        if let Err(err) = execute!(self.stdout, Show, LeaveAlternateScreen) {
            warn!("Error restoring terminal: {err}");
        }
        if let Err(err) = terminal::disable_raw_mode() {
            warn!("Error disabling raw mode: {err}");
        }
    }
}
