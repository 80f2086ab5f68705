//! Loopback UDP tests for the transport adapter.

use std::net::SocketAddr;
use std::time::Duration;

use slumber_core::ControlMessage;
use slumber_osc::{bind, OscSink, TransportError};
use tokio::net::UdpSocket;
use tokio::time::timeout;

fn loopback() -> SocketAddr {
    "127.0.0.1:0".parse().expect("addr")
}

#[tokio::test]
async fn sent_message_arrives_decoded() {
    let (sender, _own_rx) = bind(loopback()).await.expect("bind sender");
    let (_peer_tx, mut receiver) = bind(loopback()).await.expect("bind receiver");
    let target = receiver.local_addr().expect("receiver addr");

    let message = ControlMessage::bool("/avatar/parameters/Oyasumi/SleepMode", true);
    sender.to(target).send(&message).expect("send");

    let received = timeout(Duration::from_secs(2), receiver.next())
        .await
        .expect("receive within timeout")
        .expect("receive");
    assert_eq!(received, message);
}

#[tokio::test]
async fn undecodable_datagram_is_skipped_not_fatal() {
    let (_tx, mut receiver) = bind(loopback()).await.expect("bind receiver");
    let target = receiver.local_addr().expect("receiver addr");

    let raw = UdpSocket::bind(loopback()).await.expect("raw socket");
    raw.send_to(b"/x\0\0,q\0\0", target).await.expect("send garbage");
    raw.send_to(b"\xff\xfe", target).await.expect("send garbage");

    let valid = ControlMessage::int("/avatar/parameters/Oyasumi/Cmd", 4);
    raw.send_to(&slumber_osc::encode(&valid), target)
        .await
        .expect("send valid");

    let received = timeout(Duration::from_secs(2), receiver.next())
        .await
        .expect("receive within timeout")
        .expect("receive");
    assert_eq!(received, valid);
    assert_eq!(receiver.dropped(), 2);
}

#[tokio::test]
async fn binding_an_occupied_port_fails() {
    let (_tx, first) = bind(loopback()).await.expect("bind first");
    let taken = first.local_addr().expect("addr");

    let err = bind(taken).await.unwrap_err();
    assert!(matches!(err, TransportError::Bind { addr, .. } if addr == taken), "got: {err}");
}
