//! Location descriptor type.

use std::fmt;

use scroll::{Pread, Pwrite, SizeWith};

use crate::error::{checked_u32, CinderResult};

/// A byte range inside the finished crash file
///
/// This is the crash file's only pointer type. Parents embed descriptors for
/// their children in their own fixed-size records, so a reader can follow
/// them without knowing anything about the writer's object graph.
///
/// ## Wire Layout
///
/// Matches `MINIDUMP_LOCATION_DESCRIPTOR`: `size` first, then `offset` (the
/// RVA), both little-endian `u32`. That is why the fields are declared in this
/// order.
///
/// ## Absent Data
///
/// The header always occupies offset 0, so no real node can be placed there.
/// A descriptor of (0, 0) therefore unambiguously means "no data here". A
/// present-but-empty child still has a nonzero offset.
///
/// Descriptors are produced by the layout pass. Node authors read them from
/// their children's placement; they never compute offsets themselves.
///
/// ## Example
///
/// ```rust
/// use cinder_core::types::LocationDescriptor;
///
/// let loc = LocationDescriptor::new(0x40, 24);
/// assert_eq!(loc.end(), 0x58);
/// assert!(!loc.is_absent());
/// assert!(LocationDescriptor::ABSENT.is_absent());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pread, Pwrite, SizeWith)]
pub struct LocationDescriptor
{
    /// Number of bytes in the range
    pub size: u32,
    /// Absolute offset from the start of the file
    pub offset: u32,
}

impl LocationDescriptor
{
    /// The "no data" descriptor (offset 0, size 0)
    pub const ABSENT: Self = LocationDescriptor { size: 0, offset: 0 };

    /// Encoded size of a descriptor in bytes
    pub const ENCODED_SIZE: usize = 8;

    /// Create a descriptor from an offset and a size
    pub const fn new(offset: u32, size: u32) -> Self
    {
        LocationDescriptor { size, offset }
    }

    /// Create a descriptor from 64-bit layout values
    ///
    /// Fails with [`SizeOverflow`](crate::error::CinderError::SizeOverflow)
    /// if the range does not fit the 32-bit format, including when the end of
    /// the range would pass `u32::MAX`.
    pub fn from_extent(offset: u64, size: u64) -> CinderResult<Self>
    {
        let offset32 = checked_u32("offset", offset)?;
        let size32 = checked_u32("size", size)?;
        checked_u32("end of range", offset + size)?;
        Ok(LocationDescriptor::new(offset32, size32))
    }

    /// Whether this is the (0, 0) "absent" descriptor
    pub const fn is_absent(self) -> bool
    {
        self.offset == 0 && self.size == 0
    }

    /// One past the last byte of the range
    pub const fn end(self) -> u64
    {
        self.offset as u64 + self.size as u64
    }

    /// Whether two ranges share at least one byte
    ///
    /// Empty ranges never overlap anything.
    pub const fn overlaps(self, other: Self) -> bool
    {
        if self.size == 0 || other.size == 0 {
            return false;
        }
        (self.offset as u64) < other.end() && (other.offset as u64) < self.end()
    }
}

impl fmt::Display for LocationDescriptor
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.is_absent() {
            write!(f, "<absent>")
        } else {
            write!(f, "0x{:08x}+{}", self.offset, self.size)
        }
    }
}
