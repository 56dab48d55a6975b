//! # On-Disk Records
//!
//! Fixed-size records of the crash file, encoded little-endian with `scroll`.
//!
//! Each record is a plain struct whose field order is its wire order. Nodes
//! keep one of these as their in-memory payload, patch descriptor fields into
//! it during layout, and copy it verbatim to the sink during the write pass.
//!
//! The layouts follow the minidump format (`MINIDUMP_HEADER`,
//! `MINIDUMP_DIRECTORY`, `MINIDUMP_MODULE`, ...) plus the crash-info records
//! used for annotations.

use scroll::ctx::{SizeWith, TryIntoCtx};
use scroll::{Endian, Pread, Pwrite, LE};

use crate::error::CinderResult;
use crate::types::LocationDescriptor;

/// `MDMP` in little-endian
pub const HEADER_SIGNATURE: u32 = 0x504d_444d;

/// Format version stored in the low 16 bits of [`Header::version`]
pub const HEADER_VERSION: u32 = 0xa793;

/// Version of [`CrashInfoRecord`] and [`ModuleCrashInfoRecord`]
pub const CRASH_INFO_VERSION: u32 = 1;

/// `RSDS`, the signature of a PDB 7.0 CodeView record
pub const CODEVIEW_PDB70_SIGNATURE: u32 = 0x5344_5352;

/// `VS_FIXEDFILEINFO` signature
pub const FIXED_FILE_INFO_SIGNATURE: u32 = 0xfeef_04bd;

/// `VS_FIXEDFILEINFO` structure version
pub const FIXED_FILE_INFO_VERSION: u32 = 0x0001_0000;

/// Capacity of [`ExceptionRecord::exception_information`]
pub const EXCEPTION_MAXIMUM_PARAMETERS: usize = 15;

/// File header, always at offset 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, scroll::SizeWith)]
pub struct Header
{
    pub signature: u32,
    pub version: u32,
    pub number_of_streams: u32,
    pub stream_directory_rva: u32,
    pub checksum: u32,
    pub time_date_stamp: u32,
    pub flags: u64,
}

/// One entry of the stream directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, scroll::SizeWith)]
pub struct DirectoryEntry
{
    pub stream_type: u32,
    pub location: LocationDescriptor,
}

/// Payload of the crash info stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, scroll::SizeWith)]
pub struct CrashInfoRecord
{
    pub version: u32,
    pub report_id: [u8; 16],
    pub client_id: [u8; 16],
    pub simple_annotations: LocationDescriptor,
    pub module_list: LocationDescriptor,
}

/// Entry of the module crash-info list, linking a module list index to its info
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, scroll::SizeWith)]
pub struct ModuleCrashInfoLink
{
    pub module_list_index: u32,
    pub location: LocationDescriptor,
}

/// Per-module crash info
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, scroll::SizeWith)]
pub struct ModuleCrashInfoRecord
{
    pub version: u32,
    pub list_annotations: LocationDescriptor,
    pub simple_annotations: LocationDescriptor,
}

/// Entry of a simple string dictionary: RVAs of two UTF-8 strings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, scroll::SizeWith)]
pub struct DictionaryEntry
{
    pub key: u32,
    pub value: u32,
}

/// `VS_FIXEDFILEINFO`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, scroll::SizeWith)]
pub struct FixedFileInfo
{
    pub signature: u32,
    pub struct_version: u32,
    pub file_version_hi: u32,
    pub file_version_lo: u32,
    pub product_version_hi: u32,
    pub product_version_lo: u32,
    pub file_flags_mask: u32,
    pub file_flags: u32,
    pub file_os: u32,
    pub file_type: u32,
    pub file_subtype: u32,
    pub file_date_hi: u32,
    pub file_date_lo: u32,
}

impl FixedFileInfo
{
    /// A version block with only the signature and structure version set
    pub fn empty() -> Self
    {
        FixedFileInfo {
            signature: FIXED_FILE_INFO_SIGNATURE,
            struct_version: FIXED_FILE_INFO_VERSION,
            ..FixedFileInfo::default()
        }
    }
}

/// `MINIDUMP_MODULE`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, scroll::SizeWith)]
pub struct ModuleRecord
{
    pub base_of_image: u64,
    pub size_of_image: u32,
    pub checksum: u32,
    pub time_date_stamp: u32,
    pub module_name_rva: u32,
    pub version_info: FixedFileInfo,
    pub cv_record: LocationDescriptor,
    pub misc_record: LocationDescriptor,
    pub reserved0: u64,
    pub reserved1: u64,
}

/// `MINIDUMP_MEMORY_DESCRIPTOR`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, scroll::SizeWith)]
pub struct MemoryDescriptor
{
    pub start_of_memory_range: u64,
    pub memory: LocationDescriptor,
}

/// `MINIDUMP_EXCEPTION`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, scroll::SizeWith)]
pub struct ExceptionRecord
{
    pub exception_code: u32,
    pub exception_flags: u32,
    pub exception_record: u64,
    pub exception_address: u64,
    pub number_parameters: u32,
    pub unused_alignment: u32,
    pub exception_information: [u64; 15],
}

/// `MINIDUMP_EXCEPTION_STREAM`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, scroll::SizeWith)]
pub struct ExceptionStreamRecord
{
    pub thread_id: u32,
    pub alignment: u32,
    pub exception_record: ExceptionRecord,
    pub thread_context: LocationDescriptor,
}

/// Fixed part of a PDB 7.0 CodeView record; the NUL-terminated path follows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pread, Pwrite, scroll::SizeWith)]
pub struct CodeViewPdb70Prefix
{
    pub signature: u32,
    pub guid: [u8; 16],
    pub age: u32,
}

/// Encoded size of a record type
pub fn record_size<T>() -> usize
where
    T: SizeWith<Endian>,
{
    T::size_with(&LE)
}

/// Encode a record into a fresh buffer of exactly its encoded size
pub fn encode_record<T>(record: &T) -> CinderResult<Vec<u8>>
where
    T: SizeWith<Endian>,
    for<'a> &'a T: TryIntoCtx<Endian, Error = scroll::Error>,
{
    let mut buffer = vec![0u8; record_size::<T>()];
    buffer.pwrite_with(record, 0, LE)?;
    Ok(buffer)
}

/// Encode a `u32` count followed by a run of records
///
/// This is the shape of every list object in the format.
pub fn encode_counted<T>(count: u32, records: &[T]) -> CinderResult<Vec<u8>>
where
    T: SizeWith<Endian>,
    for<'a> &'a T: TryIntoCtx<Endian, Error = scroll::Error>,
{
    let mut buffer = vec![0u8; 4 + records.len() * record_size::<T>()];
    let mut offset = 0;
    buffer.gwrite_with(count, &mut offset, LE)?;
    for record in records {
        buffer.gwrite_with(record, &mut offset, LE)?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_record_sizes_match_format()
    {
        assert_eq!(record_size::<LocationDescriptor>(), LocationDescriptor::ENCODED_SIZE);
        assert_eq!(record_size::<Header>(), 32);
        assert_eq!(record_size::<DirectoryEntry>(), 12);
        assert_eq!(record_size::<CrashInfoRecord>(), 52);
        assert_eq!(record_size::<ModuleCrashInfoLink>(), 12);
        assert_eq!(record_size::<ModuleCrashInfoRecord>(), 20);
        assert_eq!(record_size::<DictionaryEntry>(), 8);
        assert_eq!(record_size::<FixedFileInfo>(), 52);
        assert_eq!(record_size::<ModuleRecord>(), 108);
        assert_eq!(record_size::<MemoryDescriptor>(), 16);
        assert_eq!(record_size::<ExceptionRecord>(), 152);
        assert_eq!(record_size::<ExceptionStreamRecord>(), 168);
        assert_eq!(record_size::<CodeViewPdb70Prefix>(), 24);
    }

    #[test]
    fn test_exception_parameter_capacity()
    {
        let record = ExceptionRecord::default();
        assert_eq!(record.exception_information.len(), EXCEPTION_MAXIMUM_PARAMETERS);
    }

    #[test]
    fn test_location_descriptor_wire_order()
    {
        let bytes = encode_record(&LocationDescriptor::new(0x1122_3344, 0x10)).unwrap();
        // size first, then offset
        assert_eq!(bytes, [0x10, 0, 0, 0, 0x44, 0x33, 0x22, 0x11]);
    }

    #[test]
    fn test_encode_counted()
    {
        let entries = [DictionaryEntry { key: 1, value: 2 }, DictionaryEntry { key: 3, value: 4 }];
        let bytes = encode_counted(2, &entries).unwrap();
        assert_eq!(bytes.len(), 4 + 16);
        assert_eq!(bytes.pread_with::<u32>(0, LE).unwrap(), 2);
        assert_eq!(bytes.pread_with::<u32>(16, LE).unwrap(), 4);
    }
}
