//! Crash info stream: process-wide annotations plus per-module annotations.
//!
//! ```text
//! CrashInfoStream ─┬─ SimpleStringDictionary          (optional)
//!                  └─ ModuleCrashInfoList             (optional)
//!                       └─ ModuleCrashInfo × n
//!                            ├─ StringList            (optional)
//!                            └─ SimpleStringDictionary (optional)
//! ```
//!
//! Optional children that were never attached leave their descriptor at
//! (0, 0) in the parent's record and produce no bytes.

use tracing::debug;

use crate::error::{checked_count, CinderError, CinderResult};
use crate::format::{
    encode_counted, encode_record, record_size, CrashInfoRecord, ModuleCrashInfoLink, ModuleCrashInfoRecord,
    CRASH_INFO_VERSION,
};
use crate::nodes::{SimpleStringDictionary, StringList};
use crate::sink::FileWriter;
use crate::stream::Stream;
use crate::types::{LocationDescriptor, StreamType};
use crate::writable::{Children, ChildrenMut, Writable, WritableState};

fn location_of(node: Option<&impl Writable>) -> LocationDescriptor
{
    node.map_or(LocationDescriptor::ABSENT, |n| n.state().location())
}

/// Annotations attached to one module of the module list
#[derive(Debug, Clone)]
pub struct ModuleCrashInfo
{
    state: WritableState,
    record: ModuleCrashInfoRecord,
    list_annotations: Option<StringList>,
    simple_annotations: Option<SimpleStringDictionary>,
}

impl Default for ModuleCrashInfo
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl ModuleCrashInfo
{
    /// Create an entry with no annotations
    pub fn new() -> Self
    {
        Self {
            state: WritableState::new(),
            record: ModuleCrashInfoRecord {
                version: CRASH_INFO_VERSION,
                ..ModuleCrashInfoRecord::default()
            },
            list_annotations: None,
            simple_annotations: None,
        }
    }

    /// Attach free-form annotation strings
    pub fn set_list_annotations(&mut self, list: StringList)
    {
        self.state.assert_mutable();
        self.list_annotations = Some(list);
    }

    /// Attach key/value annotations
    pub fn set_simple_annotations(&mut self, dictionary: SimpleStringDictionary)
    {
        self.state.assert_mutable();
        self.simple_annotations = Some(dictionary);
    }

    /// The record as it will be written
    pub fn record(&self) -> &ModuleCrashInfoRecord
    {
        &self.record
    }
}

impl Writable for ModuleCrashInfo
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
        record_size::<ModuleCrashInfoRecord>()
    }

    fn children(&self) -> Children<'_>
    {
        let mut children = Children::new();
        if let Some(list) = &self.list_annotations {
            children.push(list);
        }
        if let Some(dictionary) = &self.simple_annotations {
            children.push(dictionary);
        }
        children
    }

    fn children_mut(&mut self) -> ChildrenMut<'_>
    {
        let mut children = ChildrenMut::new();
        if let Some(list) = &mut self.list_annotations {
            children.push(list);
        }
        if let Some(dictionary) = &mut self.simple_annotations {
            children.push(dictionary);
        }
        children
    }

    fn record_child_locations(&mut self)
    {
        self.record.list_annotations = location_of(self.list_annotations.as_ref());
        self.record.simple_annotations = location_of(self.simple_annotations.as_ref());
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        sink.write(&encode_record(&self.record)?)?;
        Ok(())
    }
}

/// Links module list indices to their [`ModuleCrashInfo`]
///
/// Layout: `u32` count, then one [`ModuleCrashInfoLink`] per module, in the
/// order modules were added.
#[derive(Debug, Clone, Default)]
pub struct ModuleCrashInfoList
{
    state: WritableState,
    modules: Vec<(u32, ModuleCrashInfo)>,
    links: Vec<ModuleCrashInfoLink>,
}

impl ModuleCrashInfoList
{
    /// Create an empty list
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add info for the module at `module_list_index` in the module list stream
    ///
    /// Each index may be added once; a repeat is reported when the tree is
    /// frozen.
    pub fn add_module(&mut self, module_list_index: u32, info: ModuleCrashInfo)
    {
        self.state.assert_mutable();
        self.modules.push((module_list_index, info));
    }

    /// Number of modules
    pub fn len(&self) -> usize
    {
        self.modules.len()
    }

    /// Whether the list has no modules
    pub fn is_empty(&self) -> bool
    {
        self.modules.is_empty()
    }
}

impl Writable for ModuleCrashInfoList
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
        checked_count("module crash info count", self.modules.len())?;

        let mut seen: Vec<u32> = self.modules.iter().map(|(index, _)| *index).collect();
        seen.sort_unstable();
        if let Some(pair) = seen.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(CinderError::ConflictingEntries(format!(
                "module list index {} has more than one crash info entry",
                pair[0]
            )));
        }

        self.links = self
            .modules
            .iter()
            .map(|(index, _)| ModuleCrashInfoLink {
                module_list_index: *index,
                location: LocationDescriptor::ABSENT,
            })
            .collect();
        Ok(())
    }

    fn size_of_object(&self) -> usize
    {
        4 + self.modules.len() * record_size::<ModuleCrashInfoLink>()
    }

    fn children(&self) -> Children<'_>
    {
        self.modules.iter().map(|(_, info)| info as &dyn Writable).collect()
    }

    fn children_mut(&mut self) -> ChildrenMut<'_>
    {
        self.modules.iter_mut().map(|(_, info)| info as &mut dyn Writable).collect()
    }

    fn record_child_locations(&mut self)
    {
        for (link, (_, info)) in self.links.iter_mut().zip(&self.modules) {
            link.location = info.state().location();
        }
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        let count = checked_count("module crash info count", self.links.len())?;
        sink.write(&encode_counted(count, &self.links)?)?;
        Ok(())
    }
}

/// The crash info stream
///
/// A fixed 52-byte record holding a report id, a client id and descriptors
/// for two optional children: process-wide annotations and the per-module
/// list.
///
/// ## Example
///
/// ```rust
/// use cinder_core::nodes::{CrashInfoStream, SimpleStringDictionary};
/// use cinder_core::root::RootWriter;
///
/// let mut annotations = SimpleStringDictionary::new();
/// annotations.set("reason", "SIGSEGV");
///
/// let mut crash_info = CrashInfoStream::new();
/// crash_info.set_simple_annotations(annotations);
///
/// let mut root = RootWriter::new();
/// root.add_stream(crash_info)?;
/// let mut bytes = Vec::new();
/// root.write_everything(&mut bytes)?;
/// # Ok::<(), cinder_core::error::CinderError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CrashInfoStream
{
    state: WritableState,
    record: CrashInfoRecord,
    simple_annotations: Option<SimpleStringDictionary>,
    module_list: Option<ModuleCrashInfoList>,
}

impl Default for CrashInfoStream
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl CrashInfoStream
{
    /// Create a stream with zero ids and no children
    pub fn new() -> Self
    {
        Self {
            state: WritableState::new(),
            record: CrashInfoRecord {
                version: CRASH_INFO_VERSION,
                ..CrashInfoRecord::default()
            },
            simple_annotations: None,
            module_list: None,
        }
    }

    /// Set the id of this crash report
    pub fn set_report_id(&mut self, report_id: [u8; 16])
    {
        self.state.assert_mutable();
        self.record.report_id = report_id;
    }

    /// Set the id of the client installation that produced the report
    pub fn set_client_id(&mut self, client_id: [u8; 16])
    {
        self.state.assert_mutable();
        self.record.client_id = client_id;
    }

    /// Attach process-wide key/value annotations
    pub fn set_simple_annotations(&mut self, dictionary: SimpleStringDictionary)
    {
        self.state.assert_mutable();
        self.simple_annotations = Some(dictionary);
    }

    /// Attach per-module crash info
    pub fn set_module_list(&mut self, module_list: ModuleCrashInfoList)
    {
        self.state.assert_mutable();
        self.module_list = Some(module_list);
    }

    /// The record as it will be written
    pub fn record(&self) -> &CrashInfoRecord
    {
        &self.record
    }
}

impl Writable for CrashInfoStream
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
        debug!(
            annotations = self.simple_annotations.as_ref().map_or(0, SimpleStringDictionary::len),
            modules = self.module_list.as_ref().map_or(0, ModuleCrashInfoList::len),
            "froze crash info stream"
        );
        Ok(())
    }

    fn size_of_object(&self) -> usize
    {
        record_size::<CrashInfoRecord>()
    }

    fn children(&self) -> Children<'_>
    {
        let mut children = Children::new();
        if let Some(dictionary) = &self.simple_annotations {
            children.push(dictionary);
        }
        if let Some(module_list) = &self.module_list {
            children.push(module_list);
        }
        children
    }

    fn children_mut(&mut self) -> ChildrenMut<'_>
    {
        let mut children = ChildrenMut::new();
        if let Some(dictionary) = &mut self.simple_annotations {
            children.push(dictionary);
        }
        if let Some(module_list) = &mut self.module_list {
            children.push(module_list);
        }
        children
    }

    fn record_child_locations(&mut self)
    {
        self.record.simple_annotations = location_of(self.simple_annotations.as_ref());
        self.record.module_list = location_of(self.module_list.as_ref());
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        sink.write(&encode_record(&self.record)?)?;
        Ok(())
    }
}

impl Stream for CrashInfoStream
{
    fn stream_type(&self) -> StreamType
    {
        StreamType::CRASH_INFO
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::writable::{freeze, lay_out, LayoutCursor};

    #[test]
    fn test_absent_children_leave_zero_descriptors()
    {
        let mut stream = CrashInfoStream::new();
        freeze(&mut stream).unwrap();
        lay_out(&mut stream, &mut LayoutCursor::at(44)).unwrap();

        assert_eq!(stream.record().simple_annotations, LocationDescriptor::ABSENT);
        assert_eq!(stream.record().module_list, LocationDescriptor::ABSENT);
    }

    #[test]
    fn test_empty_module_list_is_present_not_absent()
    {
        let mut stream = CrashInfoStream::new();
        stream.set_module_list(ModuleCrashInfoList::new());
        freeze(&mut stream).unwrap();
        lay_out(&mut stream, &mut LayoutCursor::at(44)).unwrap();

        assert_eq!(stream.record().module_list, LocationDescriptor::new(96, 4));
    }

    #[test]
    fn test_duplicate_module_index_fails_freeze()
    {
        let mut list = ModuleCrashInfoList::new();
        list.add_module(3, ModuleCrashInfo::new());
        list.add_module(1, ModuleCrashInfo::new());
        list.add_module(3, ModuleCrashInfo::new());

        let mut stream = CrashInfoStream::new();
        stream.set_module_list(list);
        let err = freeze(&mut stream).unwrap_err();
        assert!(matches!(err, CinderError::ConflictingEntries(_)));
    }

    #[test]
    #[should_panic(expected = "mutated after it was frozen")]
    fn test_setter_after_freeze_panics()
    {
        let mut stream = CrashInfoStream::new();
        freeze(&mut stream).unwrap();
        stream.set_report_id([1; 16]);
    }
}
