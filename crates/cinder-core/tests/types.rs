//! Tests for on-disk value types

use cinder_core::types::{LocationDescriptor, StreamType};
use cinder_core::CinderError;

#[test]
fn test_absent_descriptor()
{
    assert!(LocationDescriptor::ABSENT.is_absent());
    assert_eq!(LocationDescriptor::default(), LocationDescriptor::ABSENT);
    assert!(!LocationDescriptor::new(44, 0).is_absent());
    assert_eq!(LocationDescriptor::ABSENT.to_string(), "<absent>");
}

#[test]
fn test_descriptor_display()
{
    assert_eq!(LocationDescriptor::new(0x2c, 16).to_string(), "0x0000002c+16");
}

#[test]
fn test_descriptor_from_extent()
{
    let location = LocationDescriptor::from_extent(60, 24).unwrap();
    assert_eq!(location.offset, 60);
    assert_eq!(location.size, 24);
    assert_eq!(location.end(), 84);
}

#[test]
fn test_descriptor_from_extent_overflow()
{
    let err = LocationDescriptor::from_extent(u64::from(u32::MAX), 1).unwrap_err();
    assert!(matches!(err, CinderError::SizeOverflow { what: "end of range", .. }));
    assert!(LocationDescriptor::from_extent(1 << 32, 0).is_err());
}

#[test]
fn test_descriptor_overlap()
{
    let a = LocationDescriptor::new(0, 10);
    let b = LocationDescriptor::new(10, 4);
    let c = LocationDescriptor::new(8, 4);
    assert!(!a.overlaps(b));
    assert!(a.overlaps(c));
    assert!(c.overlaps(b));
    assert!(!a.overlaps(LocationDescriptor::new(5, 0)));
}

#[test]
fn test_stream_type_conversions()
{
    let stream_type = StreamType::from(4);
    assert_eq!(stream_type, StreamType::MODULE_LIST);
    let raw: u32 = stream_type.into();
    assert_eq!(raw, 4);
}

#[test]
fn test_stream_type_names()
{
    assert_eq!(StreamType::MEMORY_LIST.name(), Some("MemoryList"));
    assert_eq!(StreamType::new(0x1_0001).name(), None);
    assert_eq!(StreamType::EXCEPTION.to_string(), "Exception (0x00000006)");
    assert_eq!(StreamType::new(0x1_0001).to_string(), "0x00010001");
}
