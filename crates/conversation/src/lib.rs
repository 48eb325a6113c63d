//! Conversation data model shared by the parley worker crates.
//!
//! A [`Transcript`] is the ordered record of one model session. Each entry is
//! a [`Turn`] authored by the assistant, the user, or a tool, carrying either
//! plain text or a structured JSON value ([`Content`]).
//!
//! Ordering is the only invariant this crate enforces: turns are stored in
//! the order they were pushed and are never reordered or removed.
//!
//! # Example
//!
//! ```
//! use conversation::{Role, SessionId, Transcript, Turn};
//!
//! let mut transcript = Transcript::new(SessionId::new());
//! transcript.push(Turn::assistant("How can I help you today?"));
//! transcript.push(Turn::user("What's the weather in Boston?"));
//!
//! assert_eq!(transcript.len(), 2);
//! assert_eq!(transcript.last().map(|t| t.role), Some(Role::User));
//! ```

mod transcript;
mod turn;

pub use transcript::{SessionId, Transcript};
pub use turn::{Content, Role, Turn};
