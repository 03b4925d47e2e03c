use std::time::Duration;

use tokio::net::TcpListener;
use tower_adapters::dial::DialPolicy;
use tower_adapters::service::{ServiceCore, TcpConnection, TcpConnector, TcpSettings};
use tower_adapters::{AdapterError, CloseEvent};

use super::support::settings;

#[tokio::test]
async fn dials_loopback_listener() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accept = tokio::spawn(async move { listener.accept().await.map(|(_, peer)| peer) });

    let core = ServiceCore::builder(TcpConnector::new(), TcpSettings::new(addr.to_string()))
        .name("tcp")
        .build();

    core.dial().await.unwrap();
    let peer = core
        .with_connection(|conn: &mut TcpConnection| conn.peer_addr())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(peer, addr);
    accept.await.unwrap().unwrap();

    let closed = core.listen();
    core.close().await;
    assert_eq!(closed.await, CloseEvent::Closed);
}

#[tokio::test]
async fn timeout_change_resets_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let core = ServiceCore::builder(TcpConnector::new(), TcpSettings::new(addr.to_string()))
        .build();
    core.dial().await.unwrap();
    let reset = core.listen();

    assert!(core.config(&settings(&[("connTimeout", "5")])).await.unwrap());
    assert_eq!(reset.await, CloseEvent::Reset);
    drop(listener);
}

#[tokio::test]
async fn refused_dial_exhausts() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let core = ServiceCore::builder(TcpConnector::new(), TcpSettings::new(addr.to_string()))
        .dial_policy(DialPolicy::periodic(1, Duration::from_millis(1)))
        .build();

    match core.dial().await {
        Err(AdapterError::DialExhausted { attempts, .. }) => assert_eq!(attempts, 2),
        other => panic!("expected exhaustion, got {other:?}"),
    }
}
