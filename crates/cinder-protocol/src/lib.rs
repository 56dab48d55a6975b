//! # cinder-protocol
//!
//! Messaging between a client that wants a crash file captured and the
//! handler that writes it.
//!
//! The core piece is [`message_with_deadline`]: receive one message before an
//! absolute [`Deadline`], retrying transparently when a signal interrupts the
//! wait. Transports plug in through [`MessageTransport`]:
//!
//! - [`ChannelTransport`]: in-process, over `std::sync::mpsc`
//! - [`DatagramTransport`]: Unix datagram sockets (Unix only)
//!
//! The one message defined here is [`SnapshotRequest`].

pub mod channel;
pub mod deadline;
pub mod error;
pub mod request;
pub mod transport;
#[cfg(unix)]
pub mod uds;

pub use channel::{ChannelSender, ChannelTransport};
pub use deadline::{Deadline, ExpiredPolicy};
pub use error::{ProtocolError, ProtocolResult, TransportError};
pub use request::SnapshotRequest;
pub use transport::{message_with_deadline, Message, MessageTransport, Wait};
#[cfg(unix)]
pub use uds::DatagramTransport;
