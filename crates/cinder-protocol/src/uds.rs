//! Unix datagram socket transport.
//!
//! One datagram is one message, so no framing is needed. The handler binds a
//! socket at a path; clients send requests to that path from an unbound
//! socket.

use std::io;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::TransportError;
use crate::transport::{Message, MessageTransport, Wait};

/// Largest datagram accepted by default
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4096;

/// A bound datagram socket that receives messages
#[derive(Debug)]
pub struct DatagramTransport
{
    socket: UnixDatagram,
    path: PathBuf,
    max_message_size: usize,
}

impl DatagramTransport
{
    /// Bind a socket at `path`
    ///
    /// ## Errors
    ///
    /// Returns the bind error, e.g. if `path` already exists.
    pub fn bind(path: &Path) -> io::Result<Self>
    {
        let socket = UnixDatagram::bind(path)?;
        debug!(path = %path.display(), "datagram transport bound");
        Ok(Self {
            socket,
            path: path.to_path_buf(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        })
    }

    /// Path the socket is bound to
    pub fn path(&self) -> &Path
    {
        &self.path
    }

    /// Send one message to the socket bound at `path`
    ///
    /// ## Errors
    ///
    /// Returns the send error, e.g. if nothing is bound at `path`.
    pub fn send_to(path: &Path, message: &[u8]) -> io::Result<()>
    {
        let socket = UnixDatagram::unbound()?;
        let sent = socket.send_to(message, path)?;
        if sent != message.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("datagram truncated: sent {sent} of {} bytes", message.len()),
            ));
        }
        Ok(())
    }

    fn configure(&self, wait: Wait) -> io::Result<()>
    {
        match wait {
            Wait::NonBlocking => self.socket.set_nonblocking(true),
            Wait::Forever => {
                self.socket.set_nonblocking(false)?;
                self.socket.set_read_timeout(None)
            }
            Wait::For(timeout) => {
                self.socket.set_nonblocking(false)?;
                self.socket.set_read_timeout(Some(timeout))
            }
        }
    }
}

impl MessageTransport for DatagramTransport
{
    fn exchange(&mut self, wait: Wait) -> Result<Message, TransportError>
    {
        self.configure(wait)?;
        let mut buffer = vec![0u8; self.max_message_size];
        match self.socket.recv(&mut buffer) {
            Ok(len) => {
                buffer.truncate(len);
                Ok(buffer)
            }
            Err(e) => Err(match e.kind() {
                io::ErrorKind::Interrupted => TransportError::Interrupted,
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::TimedOut,
                _ => TransportError::Io(e),
            }),
        }
    }
}

impl Drop for DatagramTransport
{
    fn drop(&mut self)
    {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "could not remove socket file");
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_datagram_round_trip()
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cinder.sock");
        let mut transport = DatagramTransport::bind(&path).unwrap();

        DatagramTransport::send_to(&path, b"hello").unwrap();
        let message = transport.exchange(Wait::For(Duration::from_secs(5))).unwrap();
        assert_eq!(message, b"hello");
    }

    #[test]
    fn test_empty_socket_times_out()
    {
        let dir = tempfile::tempdir().unwrap();
        let mut transport = DatagramTransport::bind(&dir.path().join("idle.sock")).unwrap();
        assert!(matches!(transport.exchange(Wait::NonBlocking), Err(TransportError::TimedOut)));
        assert!(matches!(
            transport.exchange(Wait::For(Duration::from_millis(20))),
            Err(TransportError::TimedOut)
        ));
    }

    #[test]
    fn test_drop_removes_socket_file()
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.sock");
        drop(DatagramTransport::bind(&path).unwrap());
        assert!(!path.exists());
    }
}
