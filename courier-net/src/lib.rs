//! Network layer for courier remote dispatch.
//!
//! This crate provides the agent server and the controller-side client
//! for shipping write jobs to a named remote execution context over TCP.
//! One job per dispatch call, executed at most once on the agent, with
//! the outcome relayed back to the blocking caller.

pub mod client;
pub mod framing;
pub mod protocol;
pub mod server;

pub use client::RemoteContext;
pub use protocol::{AgentMessage, ClientId, ControllerMessage, FailureKind};
pub use server::AgentServer;
