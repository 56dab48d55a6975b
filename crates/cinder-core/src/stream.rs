//! # Streams
//!
//! Top-level nodes listed in the crash file's directory.

use crate::types::StreamType;
use crate::writable::Writable;

/// A node registered directly on the [`RootWriter`](crate::root::RootWriter)
///
/// A stream is an ordinary [`Writable`] to its own children, plus a tag that
/// identifies its payload in the directory. Each tag may appear once per file.
///
/// ## Example
///
/// ```rust
/// use cinder_core::nodes::UserStream;
/// use cinder_core::stream::Stream;
/// use cinder_core::types::StreamType;
///
/// let stream = UserStream::new(StreamType::new(0x1_0001), b"hello".to_vec());
/// assert_eq!(stream.stream_type(), StreamType::new(0x1_0001));
/// ```
pub trait Stream: Writable
{
    /// The directory tag for this stream's payload
    fn stream_type(&self) -> StreamType;
}
