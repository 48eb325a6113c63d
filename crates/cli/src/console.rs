//! A room on the local terminal: stdin is the participant, stdout shows what
//! the agent says.

use std::io::{BufRead, BufReader};
use std::thread;

use chrono::{DateTime, Local};
use conversation::{Role, Turn};
use runtime::{Participant, Room, RoomError, RoomEvent, RoomRef, RoomTransport};
use tokio::sync::mpsc;

pub struct ConsoleTransport {
    identity: String,
}

impl ConsoleTransport {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
        }
    }
}

impl RoomTransport for ConsoleTransport {
    type Room = ConsoleRoom;

    async fn connect(&self, room: &RoomRef) -> Result<ConsoleRoom, RoomError> {
        let console = ConsoleRoom::reading(&self.identity, BufReader::new(std::io::stdin()))?;
        println!(
            "Joined room {room} as {}. Type 'quit' or Ctrl+D to leave.\n",
            self.identity
        );
        Ok(console)
    }
}

/// Forward lines from `input` until it ends or the room is dropped.
///
/// Runs on its own thread: a blocking read can't be cancelled, and a thread
/// left blocked here does not hold up runtime shutdown.
fn read_lines(input: impl BufRead, lines: mpsc::Sender<String>) {
    for line in input.lines() {
        match line {
            Ok(line) => {
                if lines.blocking_send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stdin");
                break;
            }
        }
    }
}

pub struct ConsoleRoom {
    identity: String,
    lines: mpsc::Receiver<String>,
}

impl ConsoleRoom {
    fn reading(
        identity: &str,
        input: impl BufRead + Send + 'static,
    ) -> Result<Self, RoomError> {
        let (tx, rx) = mpsc::channel(16);
        thread::Builder::new()
            .name("console-stdin".to_string())
            .spawn(move || read_lines(input, tx))
            .map_err(|e| RoomError::Transport(format!("failed to spawn stdin reader: {e}")))?;
        Ok(Self {
            identity: identity.to_string(),
            lines: rx,
        })
    }

    fn left(&self) -> RoomEvent {
        RoomEvent::ParticipantLeft {
            identity: self.identity.clone(),
        }
    }
}

impl Room for ConsoleRoom {
    async fn wait_for_participant(&mut self) -> Result<Participant, RoomError> {
        Ok(Participant::new(&self.identity))
    }

    async fn next_event(&mut self) -> RoomEvent {
        loop {
            let Some(line) = self.lines.recv().await else {
                return self.left();
            };
            match line.trim() {
                "" => continue,
                "quit" | "exit" => return self.left(),
                text => {
                    return RoomEvent::ParticipantText {
                        identity: self.identity.clone(),
                        text: text.to_string(),
                    };
                }
            }
        }
    }

    async fn publish(&mut self, turn: &Turn) -> Result<(), RoomError> {
        // The participant already sees what they typed.
        if let Some(line) = render(turn) {
            println!("{line}");
        }
        Ok(())
    }

    async fn disconnect(self) {}
}

fn render(turn: &Turn) -> Option<String> {
    let who = match turn.role {
        Role::User => return None,
        Role::Assistant => "agent",
        Role::Tool => "tool",
    };
    let time = DateTime::<Local>::from(turn.created_at).format("%H:%M:%S");
    Some(format!("[{time}] {who}: {}", turn.text()))
}
