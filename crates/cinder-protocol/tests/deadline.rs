//! Deadline-bounded exchanges over real transports

use std::time::{Duration, Instant};

use cinder_protocol::{
    message_with_deadline, ChannelTransport, Deadline, ExpiredPolicy, ProtocolError, SnapshotRequest,
};

#[test]
fn test_channel_deadline_expires()
{
    let (_sender, mut transport) = ChannelTransport::pair();
    let started = Instant::now();
    let err = message_with_deadline(
        &mut transport,
        Deadline::from_timeout(Duration::from_millis(50)),
        ExpiredPolicy::TimeOut,
    )
    .unwrap_err();
    assert!(matches!(err, ProtocolError::TimedOut));
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[test]
fn test_channel_expired_deadline_picks_up_queued_message()
{
    let (sender, mut transport) = ChannelTransport::pair();
    sender.send(b"queued".to_vec()).unwrap();
    let expired = Deadline::At(Instant::now());

    let message = message_with_deadline(&mut transport, expired, ExpiredPolicy::RunOnce).unwrap();
    assert_eq!(message, b"queued");
}

#[test]
fn test_channel_nonblocking_empty()
{
    let (_sender, mut transport) = ChannelTransport::pair();
    let err = message_with_deadline(&mut transport, Deadline::NonBlocking, ExpiredPolicy::RunOnce).unwrap_err();
    assert!(matches!(err, ProtocolError::TimedOut));
}

#[cfg(unix)]
#[test]
fn test_snapshot_request_over_datagram_socket()
{
    use cinder_protocol::DatagramTransport;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("handler.sock");
    let mut transport = DatagramTransport::bind(&path).unwrap();

    let request = SnapshotRequest::new(1000, 1001, 11, 0x4000);
    let client_path = path.clone();
    let client = std::thread::spawn(move || {
        DatagramTransport::send_to(&client_path, &request.encode().unwrap()).unwrap();
    });

    let message = message_with_deadline(
        &mut transport,
        Deadline::from_timeout(Duration::from_secs(5)),
        ExpiredPolicy::TimeOut,
    )
    .unwrap();
    client.join().unwrap();
    assert_eq!(SnapshotRequest::decode(&message).unwrap(), request);
}
