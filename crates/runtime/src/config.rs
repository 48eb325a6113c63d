//! Worker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_INSTRUCTIONS: &str =
    "You are a helpful voice assistant. Keep your answers short and conversational.";

pub const DEFAULT_GREETING: &str = r#"Say "How can I help you today?""#;

/// Static configuration, loaded once before any job starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub agent: AgentSettings,
    pub timeouts: Timeouts,
    /// Jobs run at the same time by one worker.
    pub max_concurrent_jobs: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            agent: AgentSettings::default(),
            timeouts: Timeouts::default(),
            max_concurrent_jobs: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// System prompt for the model.
    pub instructions: String,
    /// Assistant-authored turn seeded before the model first speaks.
    pub greeting: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

/// Timeouts in seconds. Unset optional values mean "wait forever".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub participant_wait_secs: Option<u64>,
    pub tool_call_secs: Option<u64>,
    pub session_connect_secs: u64,
    pub close_drain_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            participant_wait_secs: None,
            tool_call_secs: None,
            session_connect_secs: 15,
            close_drain_secs: 10,
        }
    }
}

impl Timeouts {
    pub fn participant_wait(&self) -> Option<Duration> {
        self.participant_wait_secs.map(Duration::from_secs)
    }

    pub fn tool_call(&self) -> Option<Duration> {
        self.tool_call_secs.map(Duration::from_secs)
    }

    pub fn session_connect(&self) -> Duration {
        Duration::from_secs(self.session_connect_secs)
    }

    pub fn close_drain(&self) -> Duration {
        Duration::from_secs(self.close_drain_secs)
    }
}
