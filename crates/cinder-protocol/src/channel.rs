//! In-process transport over a std `mpsc` channel.

use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};

use crate::error::TransportError;
use crate::transport::{Message, MessageTransport, Wait};

/// Sending side of a [`ChannelTransport`]
pub type ChannelSender = mpsc::Sender<Message>;

/// Receiving side of an in-process message channel
#[derive(Debug)]
pub struct ChannelTransport
{
    receiver: mpsc::Receiver<Message>,
}

impl ChannelTransport
{
    /// Create a connected sender and transport
    #[must_use]
    pub fn pair() -> (ChannelSender, Self)
    {
        let (sender, receiver) = mpsc::channel();
        (sender, Self { receiver })
    }
}

impl MessageTransport for ChannelTransport
{
    fn exchange(&mut self, wait: Wait) -> Result<Message, TransportError>
    {
        match wait {
            Wait::NonBlocking => self.receiver.try_recv().map_err(|e| match e {
                TryRecvError::Empty => TransportError::TimedOut,
                TryRecvError::Disconnected => TransportError::Disconnected,
            }),
            Wait::Forever => self.receiver.recv().map_err(|_| TransportError::Disconnected),
            Wait::For(timeout) => self.receiver.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => TransportError::TimedOut,
                RecvTimeoutError::Disconnected => TransportError::Disconnected,
            }),
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_nonblocking_on_empty_channel_times_out()
    {
        let (_sender, mut transport) = ChannelTransport::pair();
        assert!(matches!(transport.exchange(Wait::NonBlocking), Err(TransportError::TimedOut)));
    }

    #[test]
    fn test_dropped_sender_disconnects()
    {
        let (sender, mut transport) = ChannelTransport::pair();
        drop(sender);
        assert!(matches!(transport.exchange(Wait::Forever), Err(TransportError::Disconnected)));
    }

    #[test]
    fn test_message_from_another_thread()
    {
        let (sender, mut transport) = ChannelTransport::pair();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            sender.send(vec![1, 2, 3]).unwrap();
        });
        let message = transport.exchange(Wait::For(Duration::from_secs(5))).unwrap();
        assert_eq!(message, [1, 2, 3]);
        handle.join().unwrap();
    }
}
