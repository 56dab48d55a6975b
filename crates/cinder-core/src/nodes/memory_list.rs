//! Memory list stream.
//!
//! Captured memory ranges. The list holds one 16-byte descriptor per range;
//! the captured bytes themselves are [`MemorySnapshot`] children, each
//! aligned to 16 bytes.

use crate::error::{checked_count, CinderError, CinderResult};
use crate::format::{encode_counted, record_size, MemoryDescriptor};
use crate::sink::FileWriter;
use crate::stream::Stream;
use crate::types::{LocationDescriptor, StreamType};
use crate::writable::{Children, ChildrenMut, Writable, WritableState};

/// Alignment of captured memory within the file
pub const MEMORY_ALIGNMENT: usize = 16;

/// Bytes captured from the target's address space
#[derive(Debug, Clone)]
pub struct MemorySnapshot
{
    state: WritableState,
    base_address: u64,
    bytes: Vec<u8>,
}

impl MemorySnapshot
{
    /// Capture `bytes` that were read starting at `base_address`
    pub fn new(base_address: u64, bytes: Vec<u8>) -> Self
    {
        Self {
            state: WritableState::new(),
            base_address,
            bytes,
        }
    }

    /// Address of the first captured byte in the target
    pub fn base_address(&self) -> u64
    {
        self.base_address
    }

    /// Number of captured bytes
    pub fn len(&self) -> usize
    {
        self.bytes.len()
    }

    /// Whether nothing was captured
    pub fn is_empty(&self) -> bool
    {
        self.bytes.is_empty()
    }
}

impl Writable for MemorySnapshot
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
        let base = self.base_address;
        if base.checked_add(self.bytes.len() as u64).is_none() {
            return Err(CinderError::InvalidArgument(format!(
                "memory range at 0x{base:016x} extends past the end of the address space"
            )));
        }
        Ok(())
    }

    fn size_of_object(&self) -> usize
    {
        self.bytes.len()
    }

    fn alignment(&self) -> usize
    {
        MEMORY_ALIGNMENT
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        sink.write(&self.bytes)?;
        Ok(())
    }
}

/// The memory list stream
///
/// Layout: `u32` count, then one [`MemoryDescriptor`] (start address,
/// location of the captured bytes) per snapshot, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryListStream
{
    state: WritableState,
    snapshots: Vec<MemorySnapshot>,
    descriptors: Vec<MemoryDescriptor>,
}

impl MemoryListStream
{
    /// Create an empty memory list
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Append a captured range
    pub fn add_snapshot(&mut self, snapshot: MemorySnapshot)
    {
        self.state.assert_mutable();
        self.snapshots.push(snapshot);
    }

    /// Descriptors as they will be written (complete once laid out)
    pub fn descriptors(&self) -> &[MemoryDescriptor]
    {
        &self.descriptors
    }
}

impl Writable for MemoryListStream
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
        checked_count("memory range count", self.snapshots.len())?;
        self.descriptors = self
            .snapshots
            .iter()
            .map(|snapshot| MemoryDescriptor {
                start_of_memory_range: snapshot.base_address,
                memory: LocationDescriptor::ABSENT,
            })
            .collect();
        Ok(())
    }

    fn size_of_object(&self) -> usize
    {
        4 + self.snapshots.len() * record_size::<MemoryDescriptor>()
    }

    fn children(&self) -> Children<'_>
    {
        self.snapshots.iter().map(|s| s as &dyn Writable).collect()
    }

    fn children_mut(&mut self) -> ChildrenMut<'_>
    {
        self.snapshots.iter_mut().map(|s| s as &mut dyn Writable).collect()
    }

    fn record_child_locations(&mut self)
    {
        for (descriptor, snapshot) in self.descriptors.iter_mut().zip(&self.snapshots) {
            descriptor.memory = snapshot.state().location();
        }
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        let count = checked_count("memory range count", self.descriptors.len())?;
        sink.write(&encode_counted(count, &self.descriptors)?)?;
        Ok(())
    }
}

impl Stream for MemoryListStream
{
    fn stream_type(&self) -> StreamType
    {
        StreamType::MEMORY_LIST
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::writable::{freeze, lay_out, write_tree, LayoutCursor};

    #[test]
    fn test_snapshots_are_sixteen_byte_aligned()
    {
        let mut stream = MemoryListStream::new();
        stream.add_snapshot(MemorySnapshot::new(0x7000, vec![0xaa; 3]));
        stream.add_snapshot(MemorySnapshot::new(0x9000, vec![0xbb; 5]));

        freeze(&mut stream).unwrap();
        lay_out(&mut stream, &mut LayoutCursor::at(44)).unwrap();

        // list: 44..80; first snapshot at 80; second at 96
        assert_eq!(stream.descriptors()[0].memory, LocationDescriptor::new(80, 3));
        assert_eq!(stream.descriptors()[1].memory, LocationDescriptor::new(96, 5));
        assert_eq!(stream.descriptors()[1].start_of_memory_range, 0x9000);

        let mut sink = vec![0u8; 44];
        write_tree(&mut stream, &mut sink).unwrap();
        assert_eq!(sink.len(), 101);
        assert_eq!(&sink[80..83], &[0xaa; 3]);
        assert!(sink[83..96].iter().all(|&b| b == 0));
    }
}
