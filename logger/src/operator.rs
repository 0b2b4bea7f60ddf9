//! The person at the console.
//!
//! The workflow only talks to an [`Operator`], so it can be driven by a scripted one in tests.

use console::{Key, Term};
use log::*;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

/// Line oriented console interaction.
pub trait Operator {
    /// Print one line of status text.
    fn say(&mut self, text: &str) -> anyhow::Result<()>;

    /// Print `prompt` without a line break and read one line of input.
    fn ask(&mut self, prompt: &str) -> anyhow::Result<String>;

    /// Start collecting key presses in the background for [`Operator::poll_key`].
    fn begin_key_watch(&mut self) -> anyhow::Result<()>;

    /// Next collected key press, if any. Never blocks.
    fn poll_key(&mut self) -> Option<Key>;

    /// Block until a key is pressed.
    fn wait_key(&mut self) -> anyhow::Result<Key>;
}

/// An [`Operator`] on the process' terminal.
pub struct Terminal {
    term: Term,
    keys: Option<Receiver<Key>>,
}

impl Terminal {
    /// Constructor
    pub fn new() -> Self {
        Terminal {
            term: Term::stdout(),
            keys: None,
        }
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Operator for Terminal {
    fn say(&mut self, text: &str) -> anyhow::Result<()> {
        self.term.write_line(text)?;
        Ok(())
    }

    fn ask(&mut self, prompt: &str) -> anyhow::Result<String> {
        self.term.write_str(prompt)?;
        self.term.flush()?;
        Ok(self.term.read_line()?)
    }

    fn begin_key_watch(&mut self) -> anyhow::Result<()> {
        if self.keys.is_some() {
            return Ok(());
        }
        if !self.term.is_term() {
            warn!("stdout is not a terminal, Escape cannot be detected; stop with Ctrl+C");
            return Ok(());
        }

        let (tx, rx) = mpsc::channel();
        let term = self.term.clone();
        // Not joined. `read_key` holds the tty in raw mode, so the thread must not outlive Escape.
        thread::Builder::new()
            .name("key-watch".into())
            .spawn(move || watch_keys(|| term.read_key(), tx))?;

        self.keys = Some(rx);
        Ok(())
    }

    fn poll_key(&mut self) -> Option<Key> {
        let keys = self.keys.as_ref()?;
        match keys.try_recv() {
            Ok(key) => Some(key),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.keys = None;
                None
            }
        }
    }

    fn wait_key(&mut self) -> anyhow::Result<Key> {
        if let Some(keys) = &self.keys {
            if let Ok(key) = keys.recv() {
                return Ok(key);
            }
            self.keys = None;
        }
        Ok(self.term.read_key()?)
    }
}

/// Forward key presses until Escape has been forwarded or nobody listens anymore.
fn watch_keys<F>(mut read_key: F, keys: Sender<Key>)
where
    F: FnMut() -> std::io::Result<Key>,
{
    loop {
        match read_key() {
            Ok(key) => {
                trace!("Key pressed: {:?}", key);
                let last = key == Key::Escape;
                if keys.send(key).is_err() || last {
                    return;
                }
            }
            Err(e) => {
                warn!("Stopped watching the keyboard: {}", e);
                return;
            }
        }
    }
}
