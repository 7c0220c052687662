mod common;

use std::time::Duration;

use courier_core::Payload;
use courier_net::protocol::{AgentMessage, ControllerMessage};
use courier_net::server::AgentServer;

#[test]
fn test_connect_and_receive_welcome() {
    let mut server = AgentServer::bind("127.0.0.1:0", "test-agent").unwrap();
    let addr = server.local_addr().unwrap().to_string();

    let mut client = common::RawController::connect(&addr).unwrap();
    client.send_hello("alice").unwrap();

    common::drive_until_clients(&mut server, 1, Duration::from_secs(2));

    let welcome = client.recv().unwrap();
    match welcome {
        AgentMessage::Welcome { agent_name, workdir } => {
            assert_eq!(agent_name, "test-agent");
            assert!(!workdir.is_empty());
        }
        other => panic!("Expected Welcome, got {:?}", other),
    }
}

#[test]
fn test_submit_before_hello_is_rejected() {
    let mut server = AgentServer::bind("127.0.0.1:0", "test-agent").unwrap();
    let addr = server.local_addr().unwrap().to_string();

    let mut client = common::RawController::connect(&addr).unwrap();
    client
        .send(&ControllerMessage::Submit {
            payload: Payload::new("hi\n", "out.txt"),
        })
        .unwrap();

    common::drive_for(&mut server, Duration::from_millis(200));
    assert_eq!(server.client_count(), 0);

    let reply = client.recv().unwrap();
    match reply {
        AgentMessage::Rejected { reason } => {
            assert!(reason.contains("hello"));
        }
        other => panic!("Expected Rejected, got {:?}", other),
    }
}

#[test]
fn test_ping_pong() {
    let mut server = AgentServer::bind("127.0.0.1:0", "test-agent").unwrap();
    let addr = server.local_addr().unwrap().to_string();

    let mut client = common::RawController::connect(&addr).unwrap();
    client.send_hello("alice").unwrap();
    common::drive_until_clients(&mut server, 1, Duration::from_secs(2));
    let _welcome = client.recv().unwrap();

    client.send(&ControllerMessage::Ping).unwrap();
    common::drive_for(&mut server, Duration::from_millis(200));

    match client.recv().unwrap() {
        AgentMessage::Pong => {}
        other => panic!("Expected Pong, got {:?}", other),
    }
}

#[test]
fn test_shutdown_is_broadcast_to_connected_clients() {
    let mut server = AgentServer::bind("127.0.0.1:0", "test-agent").unwrap();
    let addr = server.local_addr().unwrap().to_string();

    let mut client = common::RawController::connect(&addr).unwrap();
    client.send_hello("alice").unwrap();
    common::drive_until_clients(&mut server, 1, Duration::from_secs(2));
    let _welcome = client.recv().unwrap();

    server.broadcast_shutdown();

    match client.recv().unwrap() {
        AgentMessage::Shutdown => {}
        other => panic!("Expected Shutdown, got {:?}", other),
    }
}

#[test]
fn test_goodbye_removes_client() {
    let mut server = AgentServer::bind("127.0.0.1:0", "test-agent").unwrap();
    let addr = server.local_addr().unwrap().to_string();

    let mut client = common::RawController::connect(&addr).unwrap();
    client.send_hello("alice").unwrap();
    common::drive_until_clients(&mut server, 1, Duration::from_secs(2));
    let _welcome = client.recv().unwrap();

    client.send(&ControllerMessage::Goodbye).unwrap();
    common::drive_for(&mut server, Duration::from_millis(200));

    assert_eq!(server.client_count(), 0);
}
