use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::mpsc;

/// Operator input applied at a tick boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    SetActuator { id: String, on: bool },
    ManualTrip { id: String },
    ManualReset { id: String },
    /// Simulates the field condition behind an interlock going away.
    ClearCondition { id: String },
    AcknowledgeFault,
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::SetActuator { .. } => "set_actuator",
            Command::ManualTrip { .. } => "manual_trip",
            Command::ManualReset { .. } => "manual_reset",
            Command::ClearCondition { .. } => "clear_condition",
            Command::AcknowledgeFault => "acknowledge_fault",
        }
    }

    /// The interlock or actuator the command refers to, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Command::SetActuator { id, .. }
            | Command::ManualTrip { id }
            | Command::ManualReset { id }
            | Command::ClearCondition { id } => Some(id.as_str()),
            Command::AcknowledgeFault => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetActuator { id, on } => {
                write!(f, "set_actuator {id} {}", if *on { "on" } else { "off" })
            }
            Command::AcknowledgeFault => f.write_str("acknowledge_fault"),
            other => write!(f, "{} {}", other.kind(), other.target().unwrap_or_default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Inbox
// ---------------------------------------------------------------------------

/// Create a connected sender/inbox pair.
///
/// The engine is synchronous and drains with `try_iter` at a tick boundary,
/// so a std channel serves both the blocking CLI and the async server.
pub fn channel() -> (CommandSender, CommandInbox) {
    let (tx, rx) = mpsc::channel();
    (CommandSender { tx }, CommandInbox { rx })
}

/// Producer side, cloned into every operator-facing surface.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<Command>,
}

impl CommandSender {
    /// Queue a command for the next tick. Returns false once the engine is gone.
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }
}

/// Consumer side, owned by the engine and drained once per tick.
#[derive(Debug)]
pub struct CommandInbox {
    rx: mpsc::Receiver<Command>,
}

impl CommandInbox {
    /// Everything queued so far, in arrival order. Never blocks.
    pub fn drain(&self) -> Vec<Command> {
        self.rx.try_iter().collect()
    }
}
