//! End-to-end layout of a stream whose payload points at a child list

use cinder_core::sink::FileWriter;
use cinder_core::writable::{Children, ChildrenMut, Writable, WritableState};
use cinder_core::{CinderResult, DumpReader, LocationDescriptor, RootWriter, Stream, StreamType};
use scroll::{Pread, LE};

const TABLE_STREAM: StreamType = StreamType::new(0x1_0010);

/// Three `u64` values
struct Table
{
    state: WritableState,
    values: [u64; 3],
}

impl Writable for Table
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
        24
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        for value in self.values {
            sink.write(&value.to_le_bytes())?;
        }
        Ok(())
    }
}

/// 16-byte header: magic, entry count, then the table's descriptor
struct TableStream
{
    state: WritableState,
    table: Table,
    table_location: LocationDescriptor,
}

impl Writable for TableStream
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
        16
    }

    fn children(&self) -> Children<'_>
    {
        Children::from_iter([&self.table as &dyn Writable])
    }

    fn children_mut(&mut self) -> ChildrenMut<'_>
    {
        ChildrenMut::from_iter([&mut self.table as &mut dyn Writable])
    }

    fn record_child_locations(&mut self)
    {
        self.table_location = self.table.state().location();
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        sink.write(b"TBL1")?;
        sink.write(&3u32.to_le_bytes())?;
        sink.write(&self.table_location.size.to_le_bytes())?;
        sink.write(&self.table_location.offset.to_le_bytes())?;
        Ok(())
    }
}

impl Stream for TableStream
{
    fn stream_type(&self) -> StreamType
    {
        TABLE_STREAM
    }
}

#[test]
fn test_single_stream_with_child_list()
{
    let stream = TableStream {
        state: WritableState::new(),
        table: Table {
            state: WritableState::new(),
            values: [7, 8, 9],
        },
        table_location: LocationDescriptor::ABSENT,
    };

    let mut root = RootWriter::new();
    root.add_stream(stream).unwrap();
    let mut bytes = Vec::new();
    root.write_everything(&mut bytes).unwrap();

    // H = 32 + 12 = 44; stream 44..60; table 60..84
    assert_eq!(bytes.len(), 84);
    let reader = DumpReader::parse(&bytes).unwrap();
    assert_eq!(reader.directory().len(), 1);
    assert_eq!(reader.directory()[0].stream_type, TABLE_STREAM.raw());
    assert_eq!(reader.directory()[0].location, LocationDescriptor::new(44, 16));

    let payload = reader.stream(TABLE_STREAM).unwrap().unwrap();
    assert_eq!(&payload[..4], b"TBL1");
    let table_location: LocationDescriptor = payload.pread_with(8, LE).unwrap();
    assert_eq!(table_location, LocationDescriptor::new(60, 24));

    let table = reader.resolve(table_location).unwrap().unwrap();
    let values: Vec<u64> = (0..3).map(|i| table.pread_with(i * 8, LE).unwrap()).collect();
    assert_eq!(values, [7, 8, 9]);
}
