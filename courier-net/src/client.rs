//! Controller-side handle to a remote agent.
//!
//! Connects over TCP, completes the handshake, and dispatches write jobs
//! synchronously: each call blocks until the agent reports the outcome.

use std::io;
use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::time::Duration;

use log::info;

use courier_core::{Delivery, DispatchError, ExecutionContext, Payload};

use crate::framing::{read_frame, write_frame};
use crate::protocol::{AgentMessage, ControllerMessage, FailureKind};

/// A handle to a named remote execution context.
///
/// Obtained by [`RemoteContext::connect`], which performs the
/// `Hello`/`Welcome` handshake. Dropping the handle closes the
/// connection; call [`RemoteContext::disconnect`] for a clean goodbye.
#[derive(Debug)]
pub struct RemoteContext {
    agent_name: String,
    workdir: String,
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl RemoteContext {
    /// Connect to the agent at `addr` and complete the handshake.
    ///
    /// Any failure here, from the TCP connect to an unexpected handshake
    /// reply, is a channel error: no job has been sent yet.
    pub fn connect(addr: &str, controller_name: &str) -> Result<Self, DispatchError> {
        info!("Connecting to agent at {}", addr);

        let stream = TcpStream::connect(addr)
            .map_err(|e| DispatchError::channel(addr, format!("connect failed: {}", e)))?;
        let read_stream = stream
            .try_clone()
            .map_err(|e| DispatchError::channel(addr, format!("stream clone failed: {}", e)))?;

        let mut writer = BufWriter::new(stream);
        let mut reader = BufReader::new(read_stream);

        write_frame(
            &mut writer,
            &ControllerMessage::Hello {
                controller_name: controller_name.to_string(),
            },
        )
        .map_err(|e| DispatchError::channel(addr, format!("handshake send failed: {}", e)))?;

        let welcome: AgentMessage = read_frame(&mut reader)
            .map_err(|e| DispatchError::channel(addr, format!("handshake read failed: {}", e)))?;

        let (agent_name, workdir) = match welcome {
            AgentMessage::Welcome { agent_name, workdir } => (agent_name, workdir),
            AgentMessage::Rejected { reason } => {
                return Err(DispatchError::channel(addr, format!("refused: {}", reason)));
            }
            other => {
                return Err(DispatchError::channel(
                    addr,
                    format!("expected Welcome, got {:?}", other),
                ));
            }
        };

        info!("Connected to agent '{}' (workdir {})", agent_name, workdir);

        Ok(Self {
            agent_name,
            workdir,
            reader,
            writer,
        })
    }

    /// Name the agent introduced itself with.
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Directory the agent resolves relative target paths against.
    pub fn workdir(&self) -> &str {
        &self.workdir
    }

    /// Set a read timeout on the underlying socket.
    ///
    /// Dispatch blocks indefinitely by default; a timeout is an opt-in
    /// extension for callers that cannot afford to hang on a dead agent.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)
    }

    /// Send a keepalive ping and wait for the pong.
    pub fn ping(&mut self) -> Result<(), DispatchError> {
        write_frame(&mut self.writer, &ControllerMessage::Ping)
            .map_err(|e| self.channel_err(format!("ping send failed: {}", e)))?;

        let reply: AgentMessage = read_frame(&mut self.reader)
            .map_err(|e| self.channel_err(format!("ping read failed: {}", e)))?;

        match reply {
            AgentMessage::Pong => Ok(()),
            other => Err(self.channel_err(format!("expected Pong, got {:?}", other))),
        }
    }

    /// Send goodbye and drop the connection.
    pub fn disconnect(mut self) -> Result<(), DispatchError> {
        write_frame(&mut self.writer, &ControllerMessage::Goodbye)
            .map_err(|e| DispatchError::channel(&self.agent_name, format!("goodbye failed: {}", e)))
    }

    fn channel_err(&self, detail: String) -> DispatchError {
        DispatchError::channel(&self.agent_name, detail)
    }
}

impl ExecutionContext for RemoteContext {
    fn name(&self) -> &str {
        &self.agent_name
    }

    /// Ship the payload to the agent and block for the outcome.
    ///
    /// Exactly one `Submit` goes out per call and exactly one reply is
    /// awaited. A transport failure after the submit is reported as a
    /// channel error rather than retried, so the remote write runs at
    /// most once per call.
    fn dispatch(&mut self, payload: &Payload) -> Result<Delivery, DispatchError> {
        write_frame(
            &mut self.writer,
            &ControllerMessage::Submit {
                payload: payload.clone(),
            },
        )
        .map_err(|e| self.channel_err(format!("submit failed: {}", e)))?;

        let reply: AgentMessage = read_frame(&mut self.reader)
            .map_err(|e| self.channel_err(format!("lost connection awaiting result: {}", e)))?;

        match reply {
            AgentMessage::Done { path } => {
                info!("Agent '{}' wrote {}", self.agent_name, path);
                Ok(Delivery { path })
            }
            AgentMessage::Failed {
                kind: FailureKind::Io,
                path,
                message,
            } => Err(DispatchError::io_in(&self.agent_name, &path, message)),
            AgentMessage::Rejected { reason } => {
                Err(self.channel_err(format!("job refused: {}", reason)))
            }
            AgentMessage::Shutdown => {
                Err(self.channel_err("agent shut down before the job ran".to_string()))
            }
            other => Err(self.channel_err(format!("unexpected reply: {:?}", other))),
        }
    }
}
