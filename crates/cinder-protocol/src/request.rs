//! Snapshot request message.
//!
//! Sent by a crashing (or otherwise interested) client to ask the handler to
//! write a crash file describing it.

use scroll::{Pread, Pwrite, SizeWith, LE};

use crate::error::{ProtocolError, ProtocolResult};

/// `CSRQ` in little-endian
pub const REQUEST_MAGIC: u32 = 0x5152_5343;

/// Current request layout version
pub const REQUEST_VERSION: u32 = 1;

/// Encoded size of a [`SnapshotRequest`]
pub const REQUEST_SIZE: usize = 32;

/// Ask the handler to capture a crash file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, SizeWith)]
pub struct SnapshotRequest
{
    pub magic: u32,
    pub version: u32,
    pub process_id: u32,
    pub thread_id: u32,
    pub exception_code: u32,
    pub flags: u32,
    pub exception_address: u64,
}

impl SnapshotRequest
{
    /// A request for `process_id`, reporting an exception on `thread_id`
    pub fn new(process_id: u32, thread_id: u32, exception_code: u32, exception_address: u64) -> Self
    {
        Self {
            magic: REQUEST_MAGIC,
            version: REQUEST_VERSION,
            process_id,
            thread_id,
            exception_code,
            exception_address,
            flags: 0,
        }
    }

    /// Encode to exactly [`REQUEST_SIZE`] bytes
    ///
    /// ## Errors
    ///
    /// Returns [`ProtocolError::Encoding`] if the record cannot be written.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>>
    {
        let mut buffer = vec![0u8; REQUEST_SIZE];
        buffer.pwrite_with(self, 0, LE)?;
        Ok(buffer)
    }

    /// Decode and validate a received message
    ///
    /// ## Errors
    ///
    /// Returns [`ProtocolError::InvalidMessage`] for a wrong size, magic or
    /// version.
    pub fn decode(message: &[u8]) -> ProtocolResult<Self>
    {
        if message.len() != REQUEST_SIZE {
            return Err(ProtocolError::InvalidMessage(format!(
                "expected {REQUEST_SIZE} bytes, got {}",
                message.len()
            )));
        }
        let request: Self = message.pread_with(0, LE)?;
        if request.magic != REQUEST_MAGIC {
            return Err(ProtocolError::InvalidMessage(format!("bad magic 0x{:08x}", request.magic)));
        }
        if request.version != REQUEST_VERSION {
            return Err(ProtocolError::InvalidMessage(format!("unsupported version {}", request.version)));
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests
{
    use scroll::ctx::SizeWith as _;

    use super::*;

    #[test]
    fn test_encoded_size()
    {
        assert_eq!(SnapshotRequest::size_with(&LE), REQUEST_SIZE);
        let bytes = SnapshotRequest::new(1, 2, 11, 0xdead).encode().unwrap();
        assert_eq!(bytes.len(), REQUEST_SIZE);
        assert_eq!(&bytes[..4], b"CSRQ");
    }

    #[test]
    fn test_decode_round_trip()
    {
        let request = SnapshotRequest::new(4242, 7, 6, 0x7fff_0000_1000);
        let decoded = SnapshotRequest::decode(&request.encode().unwrap()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_decode_rejects_garbage()
    {
        assert!(matches!(SnapshotRequest::decode(b"short"), Err(ProtocolError::InvalidMessage(_))));
        let err = SnapshotRequest::decode(&[0u8; REQUEST_SIZE]).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }
}
