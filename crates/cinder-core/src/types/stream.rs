//! Stream type tags.

use std::fmt;

/// Tag identifying the kind of payload a directory entry points at
///
/// Values below `0x10000` are reserved by the minidump format. The constants
/// here cover the streams Cinder knows how to write; anything else can be
/// written as a [`UserStream`](crate::nodes::UserStream) with its own tag.
///
/// ## Example
///
/// ```rust
/// use cinder_core::types::StreamType;
///
/// assert_eq!(StreamType::MODULE_LIST.raw(), 4);
/// assert_eq!(StreamType::from(0x4350_0001), StreamType::CRASH_INFO);
/// assert_eq!(StreamType::CRASH_INFO.name(), Some("CrashInfo"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamType(u32);

impl StreamType
{
    /// `ThreadListStream`
    pub const THREAD_LIST: Self = StreamType(3);
    /// `ModuleListStream`
    pub const MODULE_LIST: Self = StreamType(4);
    /// `MemoryListStream`
    pub const MEMORY_LIST: Self = StreamType(5);
    /// `ExceptionStream`
    pub const EXCEPTION: Self = StreamType(6);
    /// `SystemInfoStream`
    pub const SYSTEM_INFO: Self = StreamType(7);
    /// `MiscInfoStream`
    pub const MISC_INFO: Self = StreamType(15);
    /// Crash annotations and per-module crash info (`'CP' 0x0001`)
    pub const CRASH_INFO: Self = StreamType(0x4350_0001);

    /// First tag available for application-defined streams
    pub const FIRST_USER: Self = StreamType(0x1_0000);

    /// Create a stream type from its raw tag
    pub const fn new(raw: u32) -> Self
    {
        StreamType(raw)
    }

    /// The raw on-disk tag
    pub const fn raw(self) -> u32
    {
        self.0
    }

    /// Human-readable name for the well-known tags
    pub const fn name(self) -> Option<&'static str>
    {
        match self.0 {
            3 => Some("ThreadList"),
            4 => Some("ModuleList"),
            5 => Some("MemoryList"),
            6 => Some("Exception"),
            7 => Some("SystemInfo"),
            15 => Some("MiscInfo"),
            0x4350_0001 => Some("CrashInfo"),
            _ => None,
        }
    }
}

impl From<u32> for StreamType
{
    fn from(raw: u32) -> Self
    {
        StreamType(raw)
    }
}

impl From<StreamType> for u32
{
    fn from(stream_type: StreamType) -> Self
    {
        stream_type.0
    }
}

impl fmt::Display for StreamType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.name() {
            Some(name) => write!(f, "{name} (0x{:08x})", self.0),
            None => write!(f, "0x{:08x}", self.0),
        }
    }
}
