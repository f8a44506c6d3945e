use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use tracing::{debug, warn};

const STDIN_THREAD_NAME: &str = "stdin-commands";
const MAX_LINES_PER_DRAIN: usize = 32;

/// Line-oriented operator input polled once per frame.
pub(crate) trait CommandSource {
    fn drain_pending_lines(&mut self, out: &mut Vec<String>);
}

/// Reads stdin on a background thread. Lines queue until drained.
pub(crate) struct StdinCommands {
    lines: Option<Receiver<String>>,
}

impl StdinCommands {
    pub(crate) fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name(STDIN_THREAD_NAME.to_string())
            .spawn(move || {
                let stdin = io::stdin();
                for line in stdin.lock().lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(error) => {
                            warn!(error = %error, "stdin_read_failed");
                            break;
                        }
                    }
                }
                debug!("stdin_closed");
            });

        match spawned {
            Ok(_) => Self { lines: Some(rx) },
            Err(error) => {
                warn!(error = %error, "stdin_commands_unavailable");
                Self { lines: None }
            }
        }
    }
}

impl CommandSource for StdinCommands {
    fn drain_pending_lines(&mut self, out: &mut Vec<String>) {
        let Some(lines) = &self.lines else {
            return;
        };
        let mut disconnected = false;
        for _ in 0..MAX_LINES_PER_DRAIN {
            match lines.try_recv() {
                Ok(line) => out.push(line),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }
        if disconnected {
            self.lines = None;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostCommand {
    Help,
    Status,
    /// Free text handed to the environment controller.
    GlobalEvent(String),
    Chat { agent_name: String, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandParseError {
    pub(crate) reason: String,
    pub(crate) usage: &'static str,
}

pub(crate) const HELP_LINES: [&str; 4] = [
    "help - list commands",
    "status - log clock, weather and activity",
    "@<name> <text...> - say something to one villager",
    "event <text...> (or any other text) - change the world",
];

/// Parses one operator line. Blank lines yield `Ok(None)`.
pub(crate) fn parse_command(raw: &str) -> Result<Option<HostCommand>, CommandParseError> {
    let line = raw.trim();
    if line.is_empty() {
        return Ok(None);
    }

    if let Some(addressed) = line.strip_prefix('@') {
        let (name, text) = match addressed.split_once(char::is_whitespace) {
            Some((name, text)) => (name, text.trim()),
            None => (addressed, ""),
        };
        if name.is_empty() {
            return Err(CommandParseError {
                reason: "missing villager name".to_string(),
                usage: "@<name> <text...>",
            });
        }
        if text.is_empty() {
            return Err(CommandParseError {
                reason: format!("nothing to say to {name}"),
                usage: "@<name> <text...>",
            });
        }
        return Ok(Some(HostCommand::Chat {
            agent_name: name.to_string(),
            text: text.to_string(),
        }));
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    match head.to_ascii_lowercase().as_str() {
        "help" if rest.is_empty() => Ok(Some(HostCommand::Help)),
        "status" if rest.is_empty() => Ok(Some(HostCommand::Status)),
        "event" if rest.is_empty() => Err(CommandParseError {
            reason: "missing event description".to_string(),
            usage: "event <text...>",
        }),
        "event" => Ok(Some(HostCommand::GlobalEvent(rest.to_string()))),
        _ => Ok(Some(HostCommand::GlobalEvent(line.to_string()))),
    }
}
