//! # Structural Reader
//!
//! Reads a crash file back into borrowed views.
//!
//! This is not a full minidump processor. It understands exactly the
//! structures this crate writes, which is enough to verify a file after
//! writing it and to print its contents from the CLI.
//!
//! Every offset and size taken from the file is bounds-checked. A file that
//! points outside itself, or whose strings are not valid text, is reported as
//! [`CinderError::Malformed`] rather than panicking.

use scroll::ctx::TryFromCtx;
use scroll::{Endian, Pread, LE};

use crate::error::{CinderError, CinderResult};
use crate::format::{
    record_size, CodeViewPdb70Prefix, CrashInfoRecord, DictionaryEntry, DirectoryEntry, ExceptionStreamRecord, Header,
    MemoryDescriptor, ModuleCrashInfoLink, ModuleCrashInfoRecord, ModuleRecord, CODEVIEW_PDB70_SIGNATURE,
    HEADER_SIGNATURE, HEADER_VERSION,
};
use crate::types::{LocationDescriptor, StreamType};

/// A decoded crash info stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashInfo
{
    /// The fixed record
    pub record: CrashInfoRecord,
    /// Process-wide annotations, sorted by key
    pub simple_annotations: Vec<(String, String)>,
    /// Per-module annotations in file order
    pub modules: Vec<ModuleCrashInfoView>,
}

/// Annotations attached to one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCrashInfoView
{
    /// Index into the module list stream
    pub module_list_index: u32,
    /// Ordered list annotations
    pub list_annotations: Vec<String>,
    /// Key/value annotations, sorted by key
    pub simple_annotations: Vec<(String, String)>,
}

/// A decoded module list entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleView
{
    /// The fixed record
    pub record: ModuleRecord,
    /// The module's path
    pub name: String,
    /// Debug-file identifiers, if present
    pub codeview: Option<CodeViewView>,
}

/// A decoded PDB 7.0 CodeView record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeViewView
{
    /// Debug file GUID
    pub guid: [u8; 16],
    /// Debug file age
    pub age: u32,
    /// Debug file path
    pub pdb_path: String,
}

/// A captured memory range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange<'a>
{
    /// Target address of the first byte
    pub base_address: u64,
    /// Where the bytes live in the file
    pub location: LocationDescriptor,
    /// The captured bytes
    pub bytes: &'a [u8],
}

/// Parsed view of a crash file held in memory
///
/// ## Example
///
/// ```rust
/// use cinder_core::nodes::UserStream;
/// use cinder_core::reader::DumpReader;
/// use cinder_core::root::RootWriter;
/// use cinder_core::types::StreamType;
///
/// let tag = StreamType::new(0x1_0001);
/// let mut root = RootWriter::new();
/// root.add_stream(UserStream::new(tag, b"hi!\0".to_vec()))?;
/// let mut bytes = Vec::new();
/// root.write_everything(&mut bytes)?;
///
/// let reader = DumpReader::parse(&bytes)?;
/// assert_eq!(reader.stream(tag)?, Some(&b"hi!\0"[..]));
/// # Ok::<(), cinder_core::error::CinderError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DumpReader<'a>
{
    bytes: &'a [u8],
    header: Header,
    directory: Vec<DirectoryEntry>,
}

impl<'a> DumpReader<'a>
{
    /// Parse the header and directory of `bytes`
    ///
    /// ## Errors
    ///
    /// Returns [`CinderError::Malformed`] when the signature or version is
    /// wrong or the directory does not fit inside the file.
    pub fn parse(bytes: &'a [u8]) -> CinderResult<Self>
    {
        let header: Header = read_at(bytes, 0, "header")?;
        if header.signature != HEADER_SIGNATURE {
            return Err(malformed(format!("bad signature 0x{:08x}", header.signature)));
        }
        if header.version & 0xffff != HEADER_VERSION {
            return Err(malformed(format!("unsupported version 0x{:08x}", header.version)));
        }

        let entry_size = record_size::<DirectoryEntry>() as u64;
        let directory_end = u64::from(header.stream_directory_rva) + u64::from(header.number_of_streams) * entry_size;
        if directory_end > bytes.len() as u64 {
            return Err(malformed(format!(
                "directory of {} entries at {} runs past the end of a {}-byte file",
                header.number_of_streams,
                header.stream_directory_rva,
                bytes.len()
            )));
        }

        let directory = (0..header.number_of_streams as usize)
            .map(|i| {
                read_at::<DirectoryEntry>(
                    bytes,
                    header.stream_directory_rva as usize + i * entry_size as usize,
                    "directory entry",
                )
            })
            .collect::<CinderResult<Vec<_>>>()?;

        Ok(Self {
            bytes,
            header,
            directory,
        })
    }

    /// The file header
    pub fn header(&self) -> &Header
    {
        &self.header
    }

    /// Directory entries in file order
    pub fn directory(&self) -> &[DirectoryEntry]
    {
        &self.directory
    }

    /// Payload of the first stream with `stream_type`, if any
    ///
    /// ## Errors
    ///
    /// Returns [`CinderError::Malformed`] if the directory points outside the file.
    pub fn stream(&self, stream_type: StreamType) -> CinderResult<Option<&'a [u8]>>
    {
        match self.stream_location(stream_type) {
            Some(location) => Ok(Some(self.slice(location)?)),
            None => Ok(None),
        }
    }

    /// Bytes named by `location`, or `None` for the absent descriptor
    ///
    /// ## Errors
    ///
    /// Returns [`CinderError::Malformed`] if the range lies outside the file.
    pub fn resolve(&self, location: LocationDescriptor) -> CinderResult<Option<&'a [u8]>>
    {
        if location.is_absent() {
            return Ok(None);
        }
        self.slice(location).map(Some)
    }

    /// Read a length-prefixed, NUL-terminated UTF-8 string at `rva`
    ///
    /// ## Errors
    ///
    /// Returns [`CinderError::Malformed`] on out-of-bounds data or invalid UTF-8.
    pub fn utf8_string(&self, rva: u32) -> CinderResult<String>
    {
        let length: u32 = self.read(rva as usize, "string length")?;
        let start = rva as usize + 4;
        let bytes = self.range(start, length as usize, "string")?;
        String::from_utf8(bytes.to_vec()).map_err(|e| malformed(format!("string at {rva}: {e}")))
    }

    /// Read a byte-length-prefixed UTF-16LE string at `rva`
    ///
    /// ## Errors
    ///
    /// Returns [`CinderError::Malformed`] on out-of-bounds data or invalid UTF-16.
    pub fn utf16_string(&self, rva: u32) -> CinderResult<String>
    {
        let byte_length: u32 = self.read(rva as usize, "string length")?;
        if byte_length % 2 != 0 {
            return Err(malformed(format!("UTF-16 string at {rva} has odd byte length {byte_length}")));
        }
        let bytes = self.range(rva as usize + 4, byte_length as usize, "UTF-16 string")?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units).map_err(|e| malformed(format!("UTF-16 string at {rva}: {e}")))
    }

    /// Read a string list
    ///
    /// ## Errors
    ///
    /// Returns [`CinderError::Malformed`] on out-of-bounds data or bad strings.
    pub fn string_list(&self, location: LocationDescriptor) -> CinderResult<Vec<String>>
    {
        let Some(bytes) = self.resolve(location)?
        else {
            return Ok(Vec::new());
        };
        let rvas: Vec<u32> = read_counted(bytes, "string list")?;
        rvas.into_iter().map(|rva| self.utf8_string(rva)).collect()
    }

    /// Read a simple string dictionary
    ///
    /// ## Errors
    ///
    /// Returns [`CinderError::Malformed`] on out-of-bounds data or bad strings.
    pub fn simple_dictionary(&self, location: LocationDescriptor) -> CinderResult<Vec<(String, String)>>
    {
        let Some(bytes) = self.resolve(location)?
        else {
            return Ok(Vec::new());
        };
        let entries: Vec<DictionaryEntry> = read_counted(bytes, "dictionary")?;
        entries
            .into_iter()
            .map(|entry| Ok((self.utf8_string(entry.key)?, self.utf8_string(entry.value)?)))
            .collect()
    }

    /// Decode the crash info stream, if present
    ///
    /// ## Errors
    ///
    /// Returns [`CinderError::Malformed`] if the stream or anything it points at is broken.
    pub fn crash_info(&self) -> CinderResult<Option<CrashInfo>>
    {
        let Some(bytes) = self.stream(StreamType::CRASH_INFO)?
        else {
            return Ok(None);
        };
        let record: CrashInfoRecord = read_at(bytes, 0, "crash info record")?;
        let simple_annotations = self.simple_dictionary(record.simple_annotations)?;

        let mut modules = Vec::new();
        if let Some(list) = self.resolve(record.module_list)? {
            let links: Vec<ModuleCrashInfoLink> = read_counted(list, "module crash info list")?;
            for link in links {
                let Some(info) = self.resolve(link.location)?
                else {
                    return Err(malformed(format!(
                        "module crash info for index {} is absent",
                        link.module_list_index
                    )));
                };
                let info: ModuleCrashInfoRecord = read_at(info, 0, "module crash info")?;
                modules.push(ModuleCrashInfoView {
                    module_list_index: link.module_list_index,
                    list_annotations: self.string_list(info.list_annotations)?,
                    simple_annotations: self.simple_dictionary(info.simple_annotations)?,
                });
            }
        }

        Ok(Some(CrashInfo {
            record,
            simple_annotations,
            modules,
        }))
    }

    /// Decode the module list stream (empty if absent)
    ///
    /// ## Errors
    ///
    /// Returns [`CinderError::Malformed`] if a record, name or CodeView record is broken.
    pub fn modules(&self) -> CinderResult<Vec<ModuleView>>
    {
        let Some(bytes) = self.stream(StreamType::MODULE_LIST)?
        else {
            return Ok(Vec::new());
        };
        let records: Vec<ModuleRecord> = read_counted(bytes, "module list")?;
        records
            .into_iter()
            .map(|record| {
                Ok(ModuleView {
                    name: self.utf16_string(record.module_name_rva)?,
                    codeview: self.codeview(record.cv_record)?,
                    record,
                })
            })
            .collect()
    }

    /// Decode the memory list stream (empty if absent)
    ///
    /// ## Errors
    ///
    /// Returns [`CinderError::Malformed`] if a descriptor points outside the file.
    pub fn memory_ranges(&self) -> CinderResult<Vec<MemoryRange<'a>>>
    {
        let Some(bytes) = self.stream(StreamType::MEMORY_LIST)?
        else {
            return Ok(Vec::new());
        };
        let descriptors: Vec<MemoryDescriptor> = read_counted(bytes, "memory list")?;
        descriptors
            .into_iter()
            .map(|descriptor| {
                Ok(MemoryRange {
                    base_address: descriptor.start_of_memory_range,
                    location: descriptor.memory,
                    bytes: self.resolve(descriptor.memory)?.unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Decode the exception stream record, if present
    ///
    /// ## Errors
    ///
    /// Returns [`CinderError::Malformed`] if the stream is truncated.
    pub fn exception(&self) -> CinderResult<Option<ExceptionStreamRecord>>
    {
        match self.stream(StreamType::EXCEPTION)? {
            Some(bytes) => read_at(bytes, 0, "exception stream").map(Some),
            None => Ok(None),
        }
    }

    fn codeview(&self, location: LocationDescriptor) -> CinderResult<Option<CodeViewView>>
    {
        let Some(bytes) = self.resolve(location)?
        else {
            return Ok(None);
        };
        let prefix: CodeViewPdb70Prefix = read_at(bytes, 0, "CodeView record")?;
        if prefix.signature != CODEVIEW_PDB70_SIGNATURE {
            return Err(malformed(format!("unknown CodeView signature 0x{:08x}", prefix.signature)));
        }
        let path = &bytes[record_size::<CodeViewPdb70Prefix>()..];
        let path = path.split(|&b| b == 0).next().unwrap_or_default();
        let pdb_path = String::from_utf8(path.to_vec()).map_err(|e| malformed(format!("CodeView path: {e}")))?;
        Ok(Some(CodeViewView {
            guid: prefix.guid,
            age: prefix.age,
            pdb_path,
        }))
    }

    fn stream_location(&self, stream_type: StreamType) -> Option<LocationDescriptor>
    {
        self.directory
            .iter()
            .find(|entry| entry.stream_type == stream_type.raw())
            .map(|entry| entry.location)
    }

    fn slice(&self, location: LocationDescriptor) -> CinderResult<&'a [u8]>
    {
        self.range(location.offset as usize, location.size as usize, "location")
    }

    fn range(&self, start: usize, len: usize, what: &str) -> CinderResult<&'a [u8]>
    {
        let bytes: &'a [u8] = self.bytes;
        start
            .checked_add(len)
            .and_then(|end| bytes.get(start..end))
            .ok_or_else(|| {
                malformed(format!(
                    "{what} at {start}+{len} runs past the end of a {}-byte file",
                    bytes.len()
                ))
            })
    }

    fn read<T>(&self, offset: usize, what: &str) -> CinderResult<T>
    where
        T: TryFromCtx<'a, Endian, Error = scroll::Error>,
    {
        read_at(self.bytes, offset, what)
    }
}

fn malformed(message: String) -> CinderError
{
    CinderError::Malformed(message)
}

fn read_at<'a, T>(bytes: &'a [u8], offset: usize, what: &str) -> CinderResult<T>
where
    T: TryFromCtx<'a, Endian, Error = scroll::Error>,
{
    bytes
        .pread_with::<T>(offset, LE)
        .map_err(|e| malformed(format!("{what} at {offset}: {e}")))
}

/// Read a `u32` count followed by that many fixed-size records
fn read_counted<'a, T>(bytes: &'a [u8], what: &str) -> CinderResult<Vec<T>>
where
    T: TryFromCtx<'a, Endian, Error = scroll::Error>,
{
    let count: u32 = read_at(bytes, 0, what)?;
    let mut offset = 4;
    let mut records = Vec::with_capacity((count as usize).min(bytes.len() / 4));
    for _ in 0..count {
        records.push(bytes.gread_with::<T>(&mut offset, LE).map_err(|e| malformed(format!("{what}: {e}")))?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_rejects_short_input()
    {
        assert!(matches!(DumpReader::parse(&[0u8; 8]), Err(CinderError::Malformed(_))));
    }

    #[test]
    fn test_rejects_bad_signature()
    {
        let bytes = [0u8; 32];
        let err = DumpReader::parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("bad signature"));
    }

    #[test]
    fn test_rejects_directory_past_end()
    {
        let mut bytes = vec![0u8; 32];
        bytes[0..4].copy_from_slice(&HEADER_SIGNATURE.to_le_bytes());
        bytes[4..8].copy_from_slice(&HEADER_VERSION.to_le_bytes());
        bytes[8..12].copy_from_slice(&2u32.to_le_bytes());
        bytes[12..16].copy_from_slice(&32u32.to_le_bytes());
        assert!(matches!(DumpReader::parse(&bytes), Err(CinderError::Malformed(_))));
    }

    #[test]
    fn test_resolve_absent_is_none()
    {
        let mut bytes = vec![0u8; 32];
        bytes[0..4].copy_from_slice(&HEADER_SIGNATURE.to_le_bytes());
        bytes[4..8].copy_from_slice(&HEADER_VERSION.to_le_bytes());
        bytes[12..16].copy_from_slice(&32u32.to_le_bytes());
        let reader = DumpReader::parse(&bytes).unwrap();
        assert_eq!(reader.resolve(LocationDescriptor::ABSENT).unwrap(), None);
        assert!(reader.resolve(LocationDescriptor::new(30, 8)).is_err());
    }
}
