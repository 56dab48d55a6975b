//! Building crash files from command-line input.

use std::str::FromStr;

use cinder_core::nodes::{CrashInfoStream, ExceptionStream, Module, ModuleListStream, SimpleStringDictionary, UserStream};
use cinder_core::{CinderResult, RootWriter, StreamType};
use cinder_protocol::SnapshotRequest;

/// Tag of the stream identifying the writer that produced the file
pub const WRITER_INFO_STREAM: StreamType = StreamType::FIRST_USER;

/// A module given as `name@base:size`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpec
{
    pub name: String,
    pub base: u64,
    pub size: u32,
}

impl FromStr for ModuleSpec
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let (name, range) = s
            .rsplit_once('@')
            .ok_or_else(|| format!("expected name@base:size, got '{s}'"))?;
        let (base, size) = range
            .split_once(':')
            .ok_or_else(|| format!("expected base:size after '@', got '{range}'"))?;
        if name.is_empty() {
            return Err("module name is empty".to_string());
        }
        let size = parse_number(size)?;
        Ok(Self {
            name: name.to_string(),
            base: parse_number(base)?,
            size: u32::try_from(size).map_err(|_| format!("module size {size} does not fit in 32 bits"))?,
        })
    }
}

/// Parse `key=value`
pub fn parse_annotation(s: &str) -> Result<(String, String), String>
{
    let (key, value) = s.split_once('=').ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.is_empty() {
        return Err("annotation key is empty".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse a decimal or `0x`-prefixed hexadecimal number
pub fn parse_number(s: &str) -> Result<u64, String>
{
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number '{s}': {e}"))
}

/// Parse a number that must fit in 32 bits
pub fn parse_u32(s: &str) -> Result<u32, String>
{
    let value = parse_number(s)?;
    u32::try_from(value).map_err(|_| format!("{s} does not fit in 32 bits"))
}

/// Everything that goes into one crash file
#[derive(Debug, Clone, Default)]
pub struct DumpContents
{
    pub annotations: Vec<(String, String)>,
    pub modules: Vec<ModuleSpec>,
    pub request: Option<SnapshotRequest>,
    pub timestamp: u32,
}

/// Assemble the stream tree for `contents`
///
/// The file always carries crash info, a module list and the writer info
/// stream; an exception stream is added when a request is present.
pub fn build_dump(contents: &DumpContents) -> CinderResult<RootWriter>
{
    let mut annotations = SimpleStringDictionary::new();
    for (key, value) in &contents.annotations {
        annotations.set(key, value);
    }
    if let Some(request) = &contents.request {
        annotations.set("pid", &request.process_id.to_string());
        annotations.set("tid", &request.thread_id.to_string());
    }

    let mut crash_info = CrashInfoStream::new();
    crash_info.set_simple_annotations(annotations);

    let mut module_list = ModuleListStream::new();
    for module in &contents.modules {
        module_list.add_module(Module::new(&module.name, module.base, module.size));
    }

    let mut root = RootWriter::new();
    root.set_timestamp(contents.timestamp);
    root.add_stream(crash_info)?;
    root.add_stream(module_list)?;

    if let Some(request) = &contents.request {
        let mut exception = ExceptionStream::new(request.thread_id, request.exception_code, request.exception_address);
        exception.set_flags(request.flags);
        exception.set_parameters(vec![request.exception_address]);
        root.add_stream(exception)?;
    }

    let writer_info = format!("cinder {}\0", env!("CARGO_PKG_VERSION"));
    root.add_stream(UserStream::new(WRITER_INFO_STREAM, writer_info.into_bytes()))?;
    Ok(root)
}
