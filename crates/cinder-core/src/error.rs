//! # Error Types
//!
//! Error handling for building and writing crash files.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Calling tree operations out of lifecycle order is **not** represented here.
//! Those are programming mistakes and panic at the call site (see
//! [`crate::writable`]). Everything in this enum is something a caller can
//! observe at runtime and react to by discarding the output.

use thiserror::Error;

use crate::types::StreamType;

/// Main error type for crash file operations
///
/// ## Error Categories
///
/// 1. **Registration errors**: DuplicateStream
/// 2. **Structural errors**: SizeOverflow, LimitExceeded, ConflictingEntries,
///    IncompleteLayout
/// 3. **Input errors**: InvalidArgument, Malformed
/// 4. **Resource errors**: Io, Encoding
#[derive(Error, Debug)]
pub enum CinderError
{
    /// A stream with this type was already registered on the root writer
    ///
    /// The directory maps each stream type to exactly one payload. A second
    /// registration is rejected instead of replacing the first entry.
    #[error("Stream type {0} is already registered")]
    DuplicateStream(StreamType),

    /// A computed offset, size, or count does not fit in its on-disk field
    ///
    /// Location descriptors and counts are 32-bit. When the tree grows past
    /// that, the build fails at freeze time rather than truncating.
    #[error("{what} of {value} bytes exceeds the 32-bit format limit")]
    SizeOverflow
    {
        /// What overflowed (offset, size, count, ...)
        what: &'static str,
        /// The value that did not fit
        value: u64,
    },

    /// A fixed-capacity array in a record would overflow
    #[error("Too many {what}: {count} exceeds the limit of {limit}")]
    LimitExceeded
    {
        /// What was being counted
        what: &'static str,
        /// How many were supplied
        count: usize,
        /// The record's capacity
        limit: usize,
    },

    /// Two entries registered on the same node contradict each other
    ///
    /// Example: two module crash-info entries that claim the same module
    /// list index.
    #[error("Conflicting entries: {0}")]
    ConflictingEntries(String),

    /// An earlier freeze of this writer failed, so its tree has no complete
    /// layout and cannot be written
    #[error("Crash file layout is incomplete: an earlier freeze failed")]
    IncompleteLayout,

    /// Invalid argument passed to a builder function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A crash file being read back is structurally broken
    #[error("Malformed crash file: {0}")]
    Malformed(String),

    /// Failed to encode or decode a fixed-size record
    #[error("Record encoding error: {0}")]
    Encoding(#[from] scroll::Error),

    /// The output sink reported a failure
    ///
    /// Any write failure aborts the whole build. The partially written
    /// output must not be treated as a valid crash file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, CinderError>`
///
/// ```rust
/// use cinder_core::error::CinderResult;
/// fn foo() -> CinderResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type CinderResult<T> = std::result::Result<T, CinderError>;

/// Convert a 64-bit quantity to a 32-bit on-disk field, or report an overflow
pub(crate) fn checked_u32(what: &'static str, value: u64) -> CinderResult<u32>
{
    u32::try_from(value).map_err(|_| CinderError::SizeOverflow { what, value })
}

/// Convert an element count to a 32-bit on-disk count field
pub(crate) fn checked_count(what: &'static str, count: usize) -> CinderResult<u32>
{
    checked_u32(what, count as u64)
}
