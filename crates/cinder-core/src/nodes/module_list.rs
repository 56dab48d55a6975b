//! Module list stream.
//!
//! One 108-byte `MINIDUMP_MODULE` record per loaded image. Each record
//! points at the module's name (a [`Utf16String`]) and, when debug
//! identifiers are known, a [`CodeViewRecord`]. Those children are laid out
//! after the list, module by module.

use scroll::{Pwrite, LE};

use crate::error::{checked_count, CinderError, CinderResult};
use crate::format::{
    encode_counted, record_size, CodeViewPdb70Prefix, FixedFileInfo, ModuleRecord, CODEVIEW_PDB70_SIGNATURE,
};
use crate::nodes::Utf16String;
use crate::sink::FileWriter;
use crate::stream::Stream;
use crate::types::{LocationDescriptor, StreamType};
use crate::writable::{Children, ChildrenMut, Writable, WritableState};

/// A PDB 7.0 CodeView record identifying a module's debug file
///
/// Layout: `RSDS` signature, 16-byte GUID, `u32` age, NUL-terminated UTF-8
/// path of the debug file.
#[derive(Debug, Clone)]
pub struct CodeViewRecord
{
    state: WritableState,
    prefix: CodeViewPdb70Prefix,
    pdb_path: String,
}

impl CodeViewRecord
{
    /// Create a record
    pub fn new(guid: [u8; 16], age: u32, pdb_path: &str) -> Self
    {
        Self {
            state: WritableState::new(),
            prefix: CodeViewPdb70Prefix {
                signature: CODEVIEW_PDB70_SIGNATURE,
                guid,
                age,
            },
            pdb_path: pdb_path.to_owned(),
        }
    }
}

impl Writable for CodeViewRecord
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
        record_size::<CodeViewPdb70Prefix>() + self.pdb_path.len() + 1
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        let prefix_size = record_size::<CodeViewPdb70Prefix>();
        let mut buffer = vec![0u8; self.size_of_object()];
        buffer.pwrite_with(&self.prefix, 0, LE)?;
        buffer[prefix_size..prefix_size + self.pdb_path.len()].copy_from_slice(self.pdb_path.as_bytes());
        sink.write(&buffer)?;
        Ok(())
    }
}

/// One loaded image, owned by a [`ModuleListStream`]
#[derive(Debug, Clone)]
pub struct Module
{
    record: ModuleRecord,
    name: Utf16String,
    codeview: Option<CodeViewRecord>,
}

impl Module
{
    /// Describe an image mapped at `base_of_image` spanning `size_of_image` bytes
    pub fn new(name: &str, base_of_image: u64, size_of_image: u32) -> Self
    {
        Self {
            record: ModuleRecord {
                base_of_image,
                size_of_image,
                version_info: FixedFileInfo::empty(),
                ..ModuleRecord::default()
            },
            name: Utf16String::new(name),
            codeview: None,
        }
    }

    /// Set the image checksum
    #[must_use]
    pub fn with_checksum(mut self, checksum: u32) -> Self
    {
        self.record.checksum = checksum;
        self
    }

    /// Set the image link timestamp
    #[must_use]
    pub fn with_timestamp(mut self, time_date_stamp: u32) -> Self
    {
        self.record.time_date_stamp = time_date_stamp;
        self
    }

    /// Set file and product versions, each as (most significant, least significant) halves
    #[must_use]
    pub fn with_version(mut self, file_version: (u32, u32), product_version: (u32, u32)) -> Self
    {
        let info = &mut self.record.version_info;
        (info.file_version_hi, info.file_version_lo) = file_version;
        (info.product_version_hi, info.product_version_lo) = product_version;
        self
    }

    /// Attach debug-file identifiers
    #[must_use]
    pub fn with_codeview(mut self, codeview: CodeViewRecord) -> Self
    {
        self.codeview = Some(codeview);
        self
    }

    /// The record as it will be written
    pub fn record(&self) -> &ModuleRecord
    {
        &self.record
    }
}

/// The module list stream
///
/// Layout: `u32` count, then one [`ModuleRecord`] per module in insertion
/// order. Insertion order defines the module list indices that
/// [`ModuleCrashInfoList`](crate::nodes::ModuleCrashInfoList) refers to.
#[derive(Debug, Clone, Default)]
pub struct ModuleListStream
{
    state: WritableState,
    modules: Vec<Module>,
}

impl ModuleListStream
{
    /// Create an empty module list
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Append a module and return its index in the list
    pub fn add_module(&mut self, module: Module) -> usize
    {
        self.state.assert_mutable();
        self.modules.push(module);
        self.modules.len() - 1
    }

    /// Modules in list order
    pub fn modules(&self) -> &[Module]
    {
        &self.modules
    }
}

impl Writable for ModuleListStream
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
        checked_count("module count", self.modules.len())?;
        for module in &self.modules {
            let base = module.record.base_of_image;
            if base.checked_add(u64::from(module.record.size_of_image)).is_none() {
                return Err(CinderError::InvalidArgument(format!(
                    "module at 0x{base:016x} extends past the end of the address space"
                )));
            }
        }
        Ok(())
    }

    fn size_of_object(&self) -> usize
    {
        4 + self.modules.len() * record_size::<ModuleRecord>()
    }

    fn children(&self) -> Children<'_>
    {
        let mut children = Children::new();
        for module in &self.modules {
            children.push(&module.name);
            if let Some(codeview) = &module.codeview {
                children.push(codeview);
            }
        }
        children
    }

    fn children_mut(&mut self) -> ChildrenMut<'_>
    {
        let mut children = ChildrenMut::new();
        for module in &mut self.modules {
            children.push(&mut module.name);
            if let Some(codeview) = &mut module.codeview {
                children.push(codeview);
            }
        }
        children
    }

    fn record_child_locations(&mut self)
    {
        for module in &mut self.modules {
            module.record.module_name_rva = module.name.rva();
            module.record.cv_record = module
                .codeview
                .as_ref()
                .map_or(LocationDescriptor::ABSENT, |cv| cv.state().location());
        }
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        let count = checked_count("module count", self.modules.len())?;
        let records: Vec<ModuleRecord> = self.modules.iter().map(|m| m.record).collect();
        sink.write(&encode_counted(count, &records)?)?;
        Ok(())
    }
}

impl Stream for ModuleListStream
{
    fn stream_type(&self) -> StreamType
    {
        StreamType::MODULE_LIST
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::writable::{freeze, lay_out, LayoutCursor};

    #[test]
    fn test_module_records_point_at_names_and_codeview()
    {
        let mut stream = ModuleListStream::new();
        stream.add_module(Module::new("a", 0x1000, 0x100));
        stream.add_module(Module::new("b", 0x2000, 0x100).with_codeview(CodeViewRecord::new([7; 16], 1, "b.pdb")));

        freeze(&mut stream).unwrap();
        lay_out(&mut stream, &mut LayoutCursor::at(0)).unwrap();

        // list: 0..220; "a": 220..228; "b": 228..236; codeview: 236..266
        let records = stream.modules();
        assert_eq!(records[0].record().module_name_rva, 220);
        assert_eq!(records[0].record().cv_record, LocationDescriptor::ABSENT);
        assert_eq!(records[1].record().module_name_rva, 228);
        assert_eq!(records[1].record().cv_record, LocationDescriptor::new(236, 30));
    }

    #[test]
    fn test_module_past_address_space_fails_freeze()
    {
        let mut stream = ModuleListStream::new();
        stream.add_module(Module::new("wrap", u64::MAX - 4, 0x100));
        assert!(freeze(&mut stream).is_err());
    }
}
