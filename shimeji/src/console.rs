//! Line-oriented console front-end.
//!
//! A reader thread forwards stdin lines over a channel; the owner thread
//! drains it between ticks. Replies go to stdout, diagnostics to stderr.

use std::fs;
use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::core::types::ImageSetId;
use crate::error::TrayError;
use crate::io::paths::Layout;
use crate::shell::Shell;

/// What the owner thread got while waiting for input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Idle,
    Closed,
}

pub struct ConsoleShell {
    lines: Receiver<String>,
}

impl ConsoleShell {
    pub fn new(lines: Receiver<String>) -> Self {
        Self { lines }
    }

    /// Spawn a reader thread over stdin and wrap its channel.
    pub fn from_stdin() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
            debug!("stdin closed");
        });
        Self::new(rx)
    }

    /// Wait up to `timeout` for the next line.
    pub fn poll(&self, timeout: Duration) -> Input {
        match self.lines.recv_timeout(timeout) {
            Ok(line) => Input::Line(line),
            Err(RecvTimeoutError::Timeout) => Input::Idle,
            Err(RecvTimeoutError::Disconnected) => Input::Closed,
        }
    }
}

impl Shell for ConsoleShell {
    fn choose_image_sets(&mut self, available: &[ImageSetId]) -> Option<Vec<ImageSetId>> {
        if available.is_empty() {
            println!("no image sets found");
            return None;
        }
        println!("available image sets:");
        for (idx, image_set) in available.iter().enumerate() {
            println!("  {}. {image_set}", idx + 1);
        }
        println!("choose names or numbers separated by '/' (empty line cancels):");

        let line = self.lines.recv().ok()?;
        let chosen = pick(available, &line);
        if chosen.is_empty() { None } else { Some(chosen) }
    }

    fn show_error(&mut self, message: &str) {
        println!("error: {message}");
    }

    /// A console has no tray; only the icon asset is checked.
    fn install_tray(&mut self, layout: &Layout) -> Result<(), TrayError> {
        fs::read(&layout.icon_path).map_err(|source| TrayError::Icon {
            path: layout.icon_path.clone(),
            source,
        })?;
        Err(TrayError::Unsupported)
    }
}

/// Resolve a selection line against `available`. Unknown entries are skipped.
fn pick(available: &[ImageSetId], line: &str) -> Vec<ImageSetId> {
    let mut chosen: Vec<ImageSetId> = Vec::new();
    for token in line.split('/').map(str::trim).filter(|t| !t.is_empty()) {
        let found = match token.parse::<usize>() {
            Ok(n) if n >= 1 => available.get(n - 1),
            _ => available.iter().find(|id| id.as_str() == token),
        };
        match found {
            Some(id) if !chosen.contains(id) => chosen.push(id.clone()),
            Some(_) => {}
            None => warn!(entry = token, "ignoring unknown image set"),
        }
    }
    chosen
}
