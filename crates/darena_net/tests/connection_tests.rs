//! Loopback tests for framed connections.

use darena_core::protocol::{ClientMessage, ServerMessage, MAX_FRAME_LEN};
use darena_net::{Connection, NetError};
use darena_test_utils::fixtures::sample_turn_log;
use tokio::net::TcpListener;

async fn pair() -> (Connection, Connection) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (client, accepted) = tokio::join!(Connection::connect(addr), listener.accept());
    let (stream, _) = accepted.unwrap();
    (client.unwrap(), Connection::from_stream(stream).unwrap())
}

#[tokio::test]
async fn messages_cross_the_wire_intact() {
    let (mut client, mut server) = pair().await;

    let request = ClientMessage::ConnectionRequest {
        player_name: "Player".to_string(),
    };
    client.send(&request).await.unwrap();
    let received: ClientMessage = server.recv().await.unwrap();
    assert_eq!(received, request);

    let turn = ServerMessage::Turn(sample_turn_log(1));
    server.send(&turn).await.unwrap();
    let received: ServerMessage = client.recv().await.unwrap();
    assert_eq!(received, turn);
}

#[tokio::test]
async fn undecodable_frame_is_transient_and_skipped() {
    let (mut client, mut server) = pair().await;

    // Well-formed header, body with an unknown variant tag.
    client.send_raw(&[0, 0, 0, 2, 9, 9]).await.unwrap();
    client
        .send(&ClientMessage::Turn(sample_turn_log(0)))
        .await
        .unwrap();

    let received: ClientMessage = server.recv_valid().await.unwrap();
    assert_eq!(received, ClientMessage::Turn(sample_turn_log(0)));
}

#[tokio::test]
async fn decode_error_reports_transient() {
    let (mut client, mut server) = pair().await;
    client.send_raw(&[0, 0, 0, 1, 42]).await.unwrap();

    let err = server.recv::<ClientMessage>().await.unwrap_err();
    assert!(matches!(err, NetError::Decode(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn oversized_header_is_fatal() {
    let (mut client, mut server) = pair().await;
    let len = (MAX_FRAME_LEN as u32 + 1).to_be_bytes();
    client.send_raw(&len).await.unwrap();

    let err = server.recv::<ClientMessage>().await.unwrap_err();
    assert!(matches!(err, NetError::BadHeader(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn peer_shutdown_reads_as_closed() {
    let (mut client, mut server) = pair().await;
    client.shutdown().await.unwrap();

    let err = server.recv::<ClientMessage>().await.unwrap_err();
    assert!(matches!(err, NetError::Closed));
}
