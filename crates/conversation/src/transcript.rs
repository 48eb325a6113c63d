//! Ordered transcript of a session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Turn;

/// A unique identifier for a model session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Append-only list of turns, kept in receipt order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub session_id: SessionId,
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            turns: Vec::new(),
        }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    #[test]
    fn preserves_push_order() {
        let mut transcript = Transcript::new(SessionId::new());
        for i in 0..5 {
            transcript.push(Turn::assistant(format!("t{i}")));
        }
        let texts: Vec<_> = transcript.iter().map(Turn::text).collect();
        assert_eq!(texts, ["t0", "t1", "t2", "t3", "t4"]);
    }

    #[test]
    fn empty_transcript() {
        let transcript = Transcript::new(SessionId::default());
        assert!(transcript.is_empty());
        assert!(transcript.last().is_none());
    }

    #[test]
    fn last_returns_most_recent() {
        let mut transcript = Transcript::new(SessionId::new());
        transcript.push(Turn::assistant("hello"));
        transcript.push(Turn::user("hi"));
        assert_eq!(transcript.last().map(|t| t.role), Some(Role::User));
    }

    #[test]
    fn session_id_display_is_uuid() {
        let id = SessionId::new();
        assert_eq!(id.to_string(), id.0.to_string());
    }
}
