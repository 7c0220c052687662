#![allow(dead_code)]
//! Test harness utilities for courier-net integration tests.

use std::io::{BufReader, BufWriter};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use courier_net::framing::{read_frame, write_frame};
use courier_net::protocol::{AgentMessage, ControllerMessage};
use courier_net::server::AgentServer;

/// Bind an agent on an ephemeral port and drive it on a background
/// thread. Returns the address to connect to.
pub fn spawn_agent(name: &str) -> String {
    let mut agent = AgentServer::bind("127.0.0.1:0", name).expect("bind agent");
    let addr = agent.local_addr().expect("agent addr").to_string();
    thread::spawn(move || agent.run());
    addr
}

/// An address nothing is listening on (bind, read the port, drop).
pub fn unreachable_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let addr = listener.local_addr().expect("probe addr").to_string();
    drop(listener);
    addr
}

/// Drive the server (accept + poll) until the expected client count is
/// reached, or timeout.
pub fn drive_until_clients(server: &mut AgentServer, expected: usize, timeout: Duration) {
    let start = Instant::now();
    while Instant::now().duration_since(start) < timeout {
        server.accept_connections();
        server.poll_messages();
        if server.client_count() >= expected {
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }
    panic!(
        "Timed out waiting for {} clients (have {})",
        expected,
        server.client_count()
    );
}

/// Drive the server for a fixed period, processing whatever arrives.
pub fn drive_for(server: &mut AgentServer, period: Duration) {
    let start = Instant::now();
    while Instant::now().duration_since(start) < period {
        server.accept_connections();
        server.poll_messages();
        thread::sleep(Duration::from_millis(5));
    }
}

/// A raw TCP controller for protocol-level tests.
///
/// Because these tests are single-threaded, exchanges are split:
/// 1. `send_hello()` sends the Hello (non-blocking)
/// 2. the server is driven with `drive_until_clients()`
/// 3. `recv()` picks up the Welcome
pub struct RawController {
    pub reader: BufReader<TcpStream>,
    pub writer: BufWriter<TcpStream>,
}

impl RawController {
    pub fn connect(addr: &str) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    pub fn send(&mut self, msg: &ControllerMessage) -> std::io::Result<()> {
        write_frame(&mut self.writer, msg)
    }

    pub fn recv(&mut self) -> std::io::Result<AgentMessage> {
        read_frame(&mut self.reader)
    }

    pub fn send_hello(&mut self, name: &str) -> std::io::Result<()> {
        self.send(&ControllerMessage::Hello {
            controller_name: name.to_string(),
        })
    }
}
