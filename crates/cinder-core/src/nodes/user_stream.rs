//! Opaque application-defined streams.

use crate::error::CinderResult;
use crate::sink::FileWriter;
use crate::stream::Stream;
use crate::types::StreamType;
use crate::writable::{Writable, WritableState};

/// A stream whose payload is caller-supplied bytes under a caller-chosen tag
#[derive(Debug, Clone)]
pub struct UserStream
{
    state: WritableState,
    stream_type: StreamType,
    bytes: Vec<u8>,
}

impl UserStream
{
    /// Create a stream
    pub fn new(stream_type: StreamType, bytes: Vec<u8>) -> Self
    {
        Self {
            state: WritableState::new(),
            stream_type,
            bytes,
        }
    }
}

impl Writable for UserStream
{
    fn state(&self) -> &WritableState
    {
        &self.state
    }

    fn state_mut(&mut self) -> &mut WritableState
    {
        &mut self.state
    }

    fn size_of_object(&self) -> usize
    {
        self.bytes.len()
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        sink.write(&self.bytes)?;
        Ok(())
    }
}

impl Stream for UserStream
{
    fn stream_type(&self) -> StreamType
    {
        self.stream_type
    }
}
