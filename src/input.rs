//! Keyboard input. Keys are read on a background thread and delivered to the
//! main loop as [Command]s over a channel, so the loop is the only thing that
//! ever touches view state.

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
};
use log::{debug, error, info};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// Something the user wants the main loop to do
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Command {
    NextView,
    PreviousView,
    Quit,
}

impl Command {
    /// Map a key press to a command. Most keys don't do anything
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        // Some platforms report releases too, we only want presses
        if key.kind != KeyEventKind::Press {
            return None;
        }
        match key.code {
            KeyCode::Right => Some(Self::NextView),
            KeyCode::Left => Some(Self::PreviousView),
            KeyCode::Char('q' | 'Q') | KeyCode::Esc => Some(Self::Quit),
            // Raw mode swallows the signal, so handle it ourselves
            KeyCode::Char('c')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                Some(Self::Quit)
            }
            _ => None,
        }
    }
}

/// Subscription to keyboard input. Listening stops when this is dropped.
pub struct InputListener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InputListener {
    /// How long to block waiting for an event before checking the stop flag
    const POLL_INTERVAL: Duration = Duration::from_millis(50);

    pub fn spawn(sender: Sender<Command>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            info!("Listening for input");
            if let Err(err) = listen(&sender, &thread_stop) {
                error!("Error reading input: {err:?}");
                // Without input there's no way to quit, so bail out
                let _ = sender.send(Command::Quit);
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }
}

/// Forward key presses until told to stop, or the receiver goes away
fn listen(sender: &Sender<Command>, stop: &AtomicBool) -> anyhow::Result<()> {
    while !stop.load(Ordering::Relaxed) {
        if !event::poll(InputListener::POLL_INTERVAL)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if let Some(command) = Command::from_key(key) {
                debug!("Received {command:?}");
                if sender.send(command).is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}

impl Drop for InputListener {
    fn drop(&mut self) {
        info!("Stopping input listener");
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Input listener panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_arrows() {
        assert_eq!(
            Command::from_key(press(KeyCode::Right)),
            Some(Command::NextView)
        );
        assert_eq!(
            Command::from_key(press(KeyCode::Left)),
            Some(Command::PreviousView)
        );
    }

    #[test]
    fn test_quit_keys() {
        for code in [KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc] {
            assert_eq!(Command::from_key(press(code)), Some(Command::Quit));
        }
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(Command::from_key(ctrl_c), Some(Command::Quit));
        // Plain c is nothing
        assert_eq!(Command::from_key(press(KeyCode::Char('c'))), None);
    }

    #[test]
    fn test_ignore_release() {
        let release = KeyEvent::new_with_kind(
            KeyCode::Right,
            KeyModifiers::NONE,
            KeyEventKind::Release,
        );
        assert_eq!(Command::from_key(release), None);
        assert_eq!(Command::from_key(press(KeyCode::Up)), None);
    }
}
