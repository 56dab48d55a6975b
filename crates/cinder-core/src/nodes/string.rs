//! String leaves.
//!
//! Two encodings appear in crash files: UTF-8 for annotations and UTF-16LE
//! (`MINIDUMP_STRING`) for module names. Both are a `u32` length prefix, the
//! code units, and a terminating NUL that the length does not count.

use scroll::{Pwrite, LE};

use crate::error::{checked_count, CinderResult};
use crate::sink::FileWriter;
use crate::writable::{Writable, WritableState};

/// A length-prefixed, NUL-terminated UTF-8 string
///
/// Layout: `u32` byte length, the bytes, one NUL byte.
#[derive(Debug, Clone)]
pub struct Utf8String
{
    state: WritableState,
    value: String,
}

impl Utf8String
{
    /// Create a string node
    pub fn new(value: &str) -> Self
    {
        Self {
            state: WritableState::new(),
            value: value.to_owned(),
        }
    }

    /// The string contents
    pub fn value(&self) -> &str
    {
        &self.value
    }

    /// RVA of this string, valid once laid out
    pub fn rva(&self) -> u32
    {
        self.state.location().offset
    }
}

impl Writable for Utf8String
{
    fn state(&self) -> &WritableState
    {
        &self.state
    }

    fn state_mut(&mut self) -> &mut WritableState
    {
        &mut self.state
    }

    fn freeze_object(&mut self) -> CinderResult<()>
    {
        checked_count("string length", self.value.len())?;
        Ok(())
    }

    fn size_of_object(&self) -> usize
    {
        4 + self.value.len() + 1
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        let mut buffer = vec![0u8; self.size_of_object()];
        buffer.pwrite_with(checked_count("string length", self.value.len())?, 0, LE)?;
        buffer[4..4 + self.value.len()].copy_from_slice(self.value.as_bytes());
        sink.write(&buffer)?;
        Ok(())
    }
}

/// A `MINIDUMP_STRING`: UTF-16LE with a byte-length prefix
///
/// Layout: `u32` length in bytes (excluding the terminator), the UTF-16LE code
/// units, a two-byte NUL.
#[derive(Debug, Clone)]
pub struct Utf16String
{
    state: WritableState,
    units: Vec<u16>,
}

impl Utf16String
{
    /// Create a string node from UTF-8 text
    pub fn new(value: &str) -> Self
    {
        Self {
            state: WritableState::new(),
            units: value.encode_utf16().collect(),
        }
    }

    /// RVA of this string, valid once laid out
    pub fn rva(&self) -> u32
    {
        self.state.location().offset
    }

    fn byte_len(&self) -> usize
    {
        self.units.len() * 2
    }
}

impl Writable for Utf16String
{
    fn state(&self) -> &WritableState
    {
        &self.state
    }

    fn state_mut(&mut self) -> &mut WritableState
    {
        &mut self.state
    }

    fn freeze_object(&mut self) -> CinderResult<()>
    {
        checked_count("string length", self.byte_len())?;
        Ok(())
    }

    fn size_of_object(&self) -> usize
    {
        4 + self.byte_len() + 2
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        let mut buffer = vec![0u8; self.size_of_object()];
        let mut offset = 0;
        buffer.gwrite_with(checked_count("string length", self.byte_len())?, &mut offset, LE)?;
        for unit in &self.units {
            buffer.gwrite_with(*unit, &mut offset, LE)?;
        }
        sink.write(&buffer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::writable::{freeze, lay_out, write_tree, LayoutCursor};

    fn render(node: &mut dyn Writable) -> Vec<u8>
    {
        freeze(node).unwrap();
        lay_out(node, &mut LayoutCursor::at(0)).unwrap();
        let mut sink = Vec::new();
        write_tree(node, &mut sink).unwrap();
        sink
    }

    #[test]
    fn test_empty_utf8_string_still_has_prefix_and_terminator()
    {
        assert_eq!(render(&mut Utf8String::new("")), [0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_utf16_string_layout()
    {
        let bytes = render(&mut Utf16String::new("ab"));
        assert_eq!(bytes, [4, 0, 0, 0, b'a', 0, b'b', 0, 0, 0]);
    }

    #[test]
    fn test_utf16_string_non_ascii()
    {
        // U+1F600 needs a surrogate pair
        let bytes = render(&mut Utf16String::new("\u{1F600}"));
        assert_eq!(&bytes[..4], &[4, 0, 0, 0]);
        assert_eq!(bytes.len(), 4 + 4 + 2);
    }
}
