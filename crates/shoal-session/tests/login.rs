mod support;

use shoal_core::{Credentials, ItemType};
use shoal_session::{ops, ConnectionState, Session, SessionConfig, SessionError};
use support::{authenticated_session, echo_reply, FakeServer};
use tokio::net::TcpListener;

fn item_args() -> ops::GetItem {
    ops::GetItem {
        item_type: ItemType::Gallery,
        item_id: shoal_core::ItemId(1),
        fields: None,
    }
}

#[tokio::test]
async fn login_performs_the_two_step_handshake_and_flips_status() {
    let server = FakeServer::spawn(echo_reply).await;
    let session = Session::new(SessionConfig {
        endpoint: server.endpoint.clone(),
        ..SessionConfig::default()
    });

    let before = session.status();
    assert!(!before.logged_in);
    assert!(!before.connected);

    session
        .login(Credentials::new("alice", "secret"), None)
        .await
        .expect("login should succeed");

    let after = session.status();
    assert!(after.logged_in);
    assert!(after.connected);
    assert_eq!(session.state(), ConnectionState::Authenticated);
}

#[tokio::test]
async fn changing_endpoint_while_connected_moves_the_connection() {
    let server_a = FakeServer::spawn(echo_reply).await;
    let server_b = FakeServer::spawn(echo_reply).await;

    let session = authenticated_session(&server_a).await;
    session.item(item_args()).await.expect("call via a");
    assert_eq!(server_a.batch_count(), 1);

    // Same credentials, new endpoint: the old connection is closed and
    // the handshake repeats against the new server.
    session
        .login(Credentials::guest(), Some(server_b.endpoint.clone()))
        .await
        .expect("relogin should succeed");
    assert_eq!(session.endpoint().await, server_b.endpoint);

    session.cache().invalidate_all();
    session.item(item_args()).await.expect("call via b");
    assert_eq!(server_a.batch_count(), 1, "old server sees no more traffic");
    assert_eq!(server_b.batch_count(), 1);
}

#[tokio::test]
async fn failed_connect_retains_the_new_endpoint() {
    // Grab a port that nothing is listening on.
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind should succeed");
    let dead = shoal_core::Endpoint {
        host: "127.0.0.1".to_string(),
        port: listener.local_addr().expect("local addr").port(),
    };
    drop(listener);

    let session = Session::new(SessionConfig::default());
    let err = session
        .login(Credentials::guest(), Some(dead.clone()))
        .await
        .expect_err("connect must fail");
    assert!(matches!(err, SessionError::Transport(_)));

    // State rolls back to disconnected but the endpoint sticks, so a
    // retry targets the same server.
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert_eq!(session.endpoint().await, dead);
}

#[tokio::test]
async fn calls_without_login_fail_fast() {
    let server = FakeServer::spawn(echo_reply).await;
    let session = Session::new(SessionConfig {
        endpoint: server.endpoint.clone(),
        ..SessionConfig::default()
    });

    let err = session.item(item_args()).await.expect_err("must fail");
    assert!(matches!(err, SessionError::NotAuthenticated));
    assert_eq!(server.batch_count(), 0, "nothing may reach the wire");
}

#[tokio::test]
async fn reset_disconnects_and_clears_the_cache() {
    let server = FakeServer::spawn(echo_reply).await;
    let session = authenticated_session(&server).await;

    session.item(item_args()).await.expect("first call");
    session.item(item_args()).await.expect("cached call");
    assert_eq!(server.batch_count(), 1);

    session.reset().await;
    assert!(!session.status().connected);
    assert!(session.cache().is_empty());

    // Fresh lifecycle against the same endpoint.
    session
        .login(Credentials::guest(), None)
        .await
        .expect("relogin");
    session.item(item_args()).await.expect("refetched call");
    assert_eq!(server.batch_count(), 2);
}
