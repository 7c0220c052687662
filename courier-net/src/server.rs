//! Agent server: accepts controller connections and executes write jobs.
//!
//! The agent owns its filesystem namespace. Relative target paths resolve
//! against the agent's working directory and every write happens on the
//! agent's side of the channel, which is the whole point of dispatching
//! the job instead of writing locally.

use std::collections::HashMap;
use std::io::{self, BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use log::{error, info, warn};

use courier_core::io::write_to_file;
use courier_core::Payload;

use crate::framing::{read_frame, write_frame};
use crate::protocol::{AgentMessage, ClientId, ControllerMessage, FailureKind};

/// A connected controller with its write half.
struct Connection {
    name: String,
    writer: BufWriter<TcpStream>,
}

impl Connection {
    fn send(&mut self, msg: &AgentMessage) -> io::Result<()> {
        write_frame(&mut self.writer, msg)
    }
}

/// A connection awaiting its Hello.
struct PendingConnection {
    writer: BufWriter<TcpStream>,
}

/// Agent server that executes write jobs submitted by controllers.
pub struct AgentServer {
    name: String,
    workdir: PathBuf,
    listener: TcpListener,
    /// Controllers that completed the Hello handshake.
    clients: HashMap<ClientId, Connection>,
    /// Connections awaiting Hello.
    pending: HashMap<ClientId, PendingConnection>,
    msg_rx: Receiver<(ClientId, ControllerMessage)>,
    msg_tx: Sender<(ClientId, ControllerMessage)>,
    next_client_id: u64,
}

impl AgentServer {
    /// Bind the agent to an address.
    ///
    /// Relative job paths will resolve against the process working
    /// directory at bind time.
    pub fn bind(addr: &str, name: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let workdir = std::env::current_dir()?;

        let (msg_tx, msg_rx) = mpsc::channel();

        info!(
            "Agent '{}' listening on {} (workdir {})",
            name,
            addr,
            workdir.display()
        );

        Ok(Self {
            name: name.to_string(),
            workdir,
            listener,
            clients: HashMap::new(),
            pending: HashMap::new(),
            msg_rx,
            msg_tx,
            next_client_id: 0,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of controllers that completed the handshake.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Accept any pending TCP connections (they become full clients after
    /// the Hello handshake).
    pub fn accept_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    let client_id = ClientId::new(self.next_client_id);
                    self.next_client_id += 1;

                    let read_stream = match stream.try_clone() {
                        Ok(s) => s,
                        Err(e) => {
                            error!("Failed to clone stream: {}", e);
                            continue;
                        }
                    };

                    let writer = BufWriter::new(stream);

                    let msg_tx = self.msg_tx.clone();
                    thread::spawn(move || {
                        controller_reader_thread(client_id, read_stream, msg_tx);
                    });

                    self.pending.insert(client_id, PendingConnection { writer });

                    info!(
                        "Controller {:?} connected from {}, awaiting Hello",
                        client_id, addr
                    );
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    break;
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                    break;
                }
            }
        }
    }

    /// Drain controller messages, executing any submitted jobs.
    ///
    /// Each received Submit is executed once, right here on the poll
    /// thread, and answered with exactly one Done or Failed. Returns the
    /// number of jobs executed.
    pub fn poll_messages(&mut self) -> usize {
        let mut executed = 0;

        while let Ok((client_id, msg)) = self.msg_rx.try_recv() {
            match msg {
                ControllerMessage::Hello { controller_name } => {
                    self.handle_hello(client_id, controller_name);
                }
                ControllerMessage::Submit { payload } => {
                    if !self.clients.contains_key(&client_id) {
                        // Job from a connection that never said Hello.
                        warn!("Controller {:?} submitted before Hello", client_id);
                        if let Some(pending) = self.pending.get_mut(&client_id) {
                            let reject = AgentMessage::Rejected {
                                reason: "submit before hello".to_string(),
                            };
                            let _ = write_frame(&mut pending.writer, &reject);
                        }
                        continue;
                    }

                    let reply = self.execute(&payload);
                    executed += 1;

                    if let Some(client) = self.clients.get_mut(&client_id) {
                        if let Err(e) = client.send(&reply) {
                            warn!("Failed to send result to {:?}: {}", client_id, e);
                            self.clients.remove(&client_id);
                        }
                    }
                }
                ControllerMessage::Ping => {
                    if let Some(client) = self.clients.get_mut(&client_id) {
                        if let Err(e) = client.send(&AgentMessage::Pong) {
                            warn!("Failed to send pong to {:?}: {}", client_id, e);
                        }
                    }
                }
                ControllerMessage::Goodbye => {
                    self.pending.remove(&client_id);
                    if let Some(client) = self.clients.remove(&client_id) {
                        info!("Controller {:?} '{}' disconnected", client_id, client.name);
                    }
                }
            }
        }

        executed
    }

    /// Drive the agent until the process exits: accept, poll, sleep.
    pub fn run(&mut self) {
        loop {
            self.accept_connections();
            self.poll_messages();
            thread::sleep(Duration::from_millis(2));
        }
    }

    /// Tell every connected controller the agent is going away.
    pub fn broadcast_shutdown(&mut self) {
        let mut disconnected = Vec::new();

        for (id, client) in &mut self.clients {
            if let Err(e) = client.send(&AgentMessage::Shutdown) {
                warn!("Failed to send shutdown to {:?}: {}", id, e);
                disconnected.push(*id);
            }
        }

        for id in disconnected {
            self.clients.remove(&id);
        }
    }

    fn handle_hello(&mut self, client_id: ClientId, controller_name: String) {
        if let Some(mut pending) = self.pending.remove(&client_id) {
            let welcome = AgentMessage::Welcome {
                agent_name: self.name.clone(),
                workdir: self.workdir.display().to_string(),
            };
            if let Err(e) = write_frame(&mut pending.writer, &welcome) {
                error!("Failed to send welcome to {:?}: {}", client_id, e);
                return;
            }

            info!(
                "Controller {:?} '{}' completed handshake",
                client_id, controller_name
            );

            self.clients.insert(
                client_id,
                Connection {
                    name: controller_name,
                    writer: pending.writer,
                },
            );
        } else if let Some(client) = self.clients.get_mut(&client_id) {
            warn!("Controller {:?} sent Hello after already connected", client_id);
            client.name = controller_name;
        }
    }

    /// Run one job. The write happens here, on the agent's filesystem.
    fn execute(&self, payload: &Payload) -> AgentMessage {
        let path = resolve_target(&self.workdir, payload.target_path());
        let body = render_delivery(&path, payload.message());

        info!("Writing {} bytes to {}", body.len(), path.display());

        match write_to_file(&path, &body) {
            Ok(()) => AgentMessage::Done {
                path: path.display().to_string(),
            },
            Err(e) => {
                warn!("Write to {} failed: {}", path.display(), e);
                AgentMessage::Failed {
                    kind: FailureKind::Io,
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Resolve a job's target path within an agent's namespace.
fn resolve_target(workdir: &Path, target: &str) -> PathBuf {
    let path = Path::new(target);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workdir.join(path)
    }
}

/// Body of a remotely delivered file: preamble, resolved path, message.
///
/// The path line lets whoever finds the file confirm it landed on the
/// agent that was meant to receive it.
fn render_delivery(path: &Path, message: &str) -> String {
    format!(
        "Delivered by courier. Check that this landed on the agent you meant.\nPath: {}\nMessage:\n{}\n",
        path.display(),
        message
    )
}

/// Background thread that reads frames from one controller connection.
fn controller_reader_thread(
    client_id: ClientId,
    stream: TcpStream,
    msg_tx: Sender<(ClientId, ControllerMessage)>,
) {
    let mut reader = BufReader::new(stream);

    loop {
        match read_frame::<_, ControllerMessage>(&mut reader) {
            Ok(msg) => {
                let is_goodbye = matches!(msg, ControllerMessage::Goodbye);
                if msg_tx.send((client_id, msg)).is_err() {
                    // Receiver dropped, agent is shutting down.
                    break;
                }
                if is_goodbye {
                    break;
                }
            }
            Err(e) => {
                if e.kind() != io::ErrorKind::UnexpectedEof {
                    warn!("Controller {:?} read error: {}", client_id, e);
                }
                // Treat a dropped connection as an implicit goodbye.
                let _ = msg_tx.send((client_id, ControllerMessage::Goodbye));
                break;
            }
        }
    }

    info!("Controller {:?} reader thread exiting", client_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_targets_resolve_against_workdir() {
        let workdir = Path::new("/srv/agent");
        assert_eq!(
            resolve_target(workdir, "remoteOutput.out"),
            PathBuf::from("/srv/agent/remoteOutput.out")
        );
        assert_eq!(
            resolve_target(workdir, "/tmp/out.txt"),
            PathBuf::from("/tmp/out.txt")
        );
    }

    #[test]
    fn rendered_delivery_names_path_and_message() {
        let body = render_delivery(Path::new("/tmp/out.txt"), "hi \n");
        assert!(body.contains("/tmp/out.txt"));
        assert!(body.contains("hi \n"));
        assert!(body.ends_with('\n'));
    }
}
