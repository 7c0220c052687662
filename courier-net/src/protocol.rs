//! Wire protocol for controller/agent communication.
//!
//! A controller opens a connection, identifies itself with `Hello`, and
//! submits write jobs one at a time. The agent answers every `Submit`
//! with exactly one `Done` or `Failed`, so a dispatch call maps to one
//! request/response pair on the wire.

use serde::{Deserialize, Serialize};

use courier_core::Payload;

/// Unique identifier for a connected controller, assigned by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub u64);

impl ClientId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Classification of a failed job, as reported by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The write failed on the agent's filesystem.
    Io,
}

/// Messages sent from a controller to an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ControllerMessage {
    /// Initial handshake carrying the controller's name.
    Hello { controller_name: String },
    /// A write job to execute on the agent's filesystem.
    Submit { payload: Payload },
    /// Keepalive ping.
    Ping,
    /// Clean disconnection.
    Goodbye,
}

/// Messages sent from an agent to a controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentMessage {
    /// Handshake response identifying the agent.
    Welcome {
        /// Name this agent goes by in logs and error messages.
        agent_name: String,
        /// Directory relative target paths resolve against.
        workdir: String,
    },
    /// The job completed; `path` is the resolved path that was written.
    Done { path: String },
    /// The job ran and failed on the agent side.
    Failed {
        kind: FailureKind,
        /// Resolved path the agent was writing to.
        path: String,
        message: String,
    },
    /// The message was refused before any job ran (protocol misuse).
    Rejected { reason: String },
    /// Response to Ping.
    Pong,
    /// Agent is shutting down.
    Shutdown,
}
