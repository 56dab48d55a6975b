//! # Output Sinks
//!
//! The byte destination of the write pass.
//!
//! A sink only appends. It never seeks backward, so every descriptor must be
//! final before the first byte is written; the layout pass guarantees that.

use std::io::{self, Write};

/// Sequential append-only output with a known position
///
/// ## Contract
///
/// - `write()` either appends all of `data` and advances the position by
///   `data.len()`, or returns an error. Partial success is not allowed.
/// - `position()` is the number of bytes appended so far (the file offset the
///   next byte will land at).
pub trait FileWriter
{
    /// Append `data` at the current position
    ///
    /// ## Errors
    ///
    /// Returns the underlying I/O error if the bytes could not all be written.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Current write position
    fn position(&self) -> u64;
}

/// In-memory sink; the position is the buffer length
impl FileWriter for Vec<u8>
{
    fn write(&mut self, data: &[u8]) -> io::Result<()>
    {
        self.extend_from_slice(data);
        Ok(())
    }

    fn position(&self) -> u64
    {
        self.len() as u64
    }
}

/// Adapts any [`io::Write`] into a [`FileWriter`] by tracking the position
///
/// ## Example
///
/// ```rust
/// use cinder_core::sink::{FileWriter, PositionedWriter};
///
/// let mut sink = PositionedWriter::new(Vec::new());
/// sink.write(b"MDMP")?;
/// assert_eq!(sink.position(), 4);
/// assert_eq!(sink.into_inner(), b"MDMP");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct PositionedWriter<W: Write>
{
    inner: W,
    position: u64,
}

impl<W: Write> PositionedWriter<W>
{
    /// Wrap a writer positioned at the start of its output
    pub fn new(inner: W) -> Self
    {
        Self { inner, position: 0 }
    }

    /// Flush the underlying writer
    ///
    /// ## Errors
    ///
    /// Returns the underlying I/O error.
    pub fn flush(&mut self) -> io::Result<()>
    {
        self.inner.flush()
    }

    /// Borrow the underlying writer
    pub fn get_ref(&self) -> &W
    {
        &self.inner
    }

    /// Unwrap, returning the underlying writer
    pub fn into_inner(self) -> W
    {
        self.inner
    }
}

impl<W: Write> FileWriter for PositionedWriter<W>
{
    fn write(&mut self, data: &[u8]) -> io::Result<()>
    {
        self.inner.write_all(data)?;
        self.position += data.len() as u64;
        Ok(())
    }

    fn position(&self) -> u64
    {
        self.position
    }
}

/// Append `count` zero bytes
pub(crate) fn write_zeros(sink: &mut dyn FileWriter, count: usize) -> io::Result<()>
{
    const ZEROS: [u8; 16] = [0; 16];

    let mut remaining = count;
    while remaining > 0 {
        let chunk = remaining.min(ZEROS.len());
        sink.write(&ZEROS[..chunk])?;
        remaining -= chunk;
    }
    Ok(())
}
