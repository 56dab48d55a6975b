//! # Root Writer
//!
//! Owns the file header and the stream directory, and drives the whole tree
//! through freeze, layout and write.
//!
//! ## File Layout
//!
//! ```text
//! 0                     32                  32 + 12·n
//! ┌─────────────────────┬───────────────────┬──────────────────────────────┐
//! │ header              │ directory entries │ stream trees, pre-order      │
//! └─────────────────────┴───────────────────┴──────────────────────────────┘
//! ```
//!
//! The root is itself a [`Writable`]: its own object is the header followed by
//! the directory, and its children are the registered streams in registration
//! order. Once the streams are placed, the root copies their descriptors into
//! the directory, exactly like any other parent node.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{checked_count, CinderError, CinderResult};
use crate::format::{encode_record, record_size, DirectoryEntry, Header, HEADER_SIGNATURE, HEADER_VERSION};
use crate::sink::{FileWriter, PositionedWriter};
use crate::stream::Stream;
use crate::types::{LocationDescriptor, StreamType};
use crate::writable::{self, Children, ChildrenMut, LayoutCursor, Lifecycle, Writable, WritableState};

struct RegisteredStream
{
    stream_type: StreamType,
    node: Box<dyn Writable>,
}

/// Builds one crash file
///
/// ## Lifecycle
///
/// 1. Create: `RootWriter::new()`
/// 2. Register streams: `add_stream()` (each stream type at most once)
/// 3. Write: `write_everything(sink)` or `write_to_path(path)`
///
/// `freeze()` can be called on its own to inspect the layout before writing.
///
/// ## Example
///
/// ```rust
/// use cinder_core::nodes::UserStream;
/// use cinder_core::root::RootWriter;
/// use cinder_core::types::StreamType;
///
/// let mut root = RootWriter::new();
/// root.add_stream(UserStream::new(StreamType::new(0x1_0000), vec![1, 2, 3, 4]))?;
///
/// let mut bytes = Vec::new();
/// root.write_everything(&mut bytes)?;
/// assert_eq!(bytes.len(), 32 + 12 + 4);
/// # Ok::<(), cinder_core::error::CinderError>(())
/// ```
pub struct RootWriter
{
    state: WritableState,
    header: Header,
    streams: Vec<RegisteredStream>,
    directory: Vec<DirectoryEntry>,
    file_size: Option<u64>,
    freeze_failed: bool,
}

impl std::fmt::Debug for RootWriter
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("RootWriter")
            .field("state", &self.state)
            .field("header", &self.header)
            .field("streams", &self.streams.iter().map(|s| s.stream_type).collect::<Vec<_>>())
            .field("file_size", &self.file_size)
            .finish_non_exhaustive()
    }
}

impl Default for RootWriter
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl RootWriter
{
    /// Create a writer with no streams
    pub fn new() -> Self
    {
        Self {
            state: WritableState::new(),
            header: Header {
                signature: HEADER_SIGNATURE,
                version: HEADER_VERSION,
                ..Header::default()
            },
            streams: Vec::new(),
            directory: Vec::new(),
            file_size: None,
            freeze_failed: false,
        }
    }

    /// Set the header timestamp (seconds since the Unix epoch)
    pub fn set_timestamp(&mut self, time_date_stamp: u32)
    {
        self.state.assert_mutable();
        self.header.time_date_stamp = time_date_stamp;
    }

    /// Set the header flags
    pub fn set_flags(&mut self, flags: u64)
    {
        self.state.assert_mutable();
        self.header.flags = flags;
    }

    /// Register a stream
    ///
    /// Streams appear in the directory, and in the file, in registration
    /// order.
    ///
    /// ## Errors
    ///
    /// Returns [`CinderError::DuplicateStream`] if a stream with the same type
    /// is already registered. The writer is left unchanged.
    ///
    /// ## Panics
    ///
    /// Panics if the writer has already been frozen.
    pub fn add_stream<S>(&mut self, stream: S) -> CinderResult<()>
    where
        S: Stream + 'static,
    {
        self.state.assert_mutable();

        let stream_type = stream.stream_type();
        if self.has_stream(stream_type) {
            warn!(%stream_type, "rejected duplicate stream registration");
            return Err(CinderError::DuplicateStream(stream_type));
        }

        self.streams.push(RegisteredStream {
            stream_type,
            node: Box::new(stream),
        });
        Ok(())
    }

    /// Whether a stream of this type is registered
    pub fn has_stream(&self, stream_type: StreamType) -> bool
    {
        self.streams.iter().any(|s| s.stream_type == stream_type)
    }

    /// Number of registered streams
    pub fn stream_count(&self) -> usize
    {
        self.streams.len()
    }

    /// The header as it will be written (complete once frozen)
    pub fn header(&self) -> &Header
    {
        &self.header
    }

    /// The directory as it will be written (complete once frozen)
    pub fn directory(&self) -> &[DirectoryEntry]
    {
        &self.directory
    }

    /// Total file size, known once frozen
    pub fn file_size(&self) -> Option<u64>
    {
        self.file_size
    }

    /// Freeze every stream and compute the final layout
    ///
    /// Returns the total file size.
    ///
    /// ## Errors
    ///
    /// Returns the first freeze failure from any node, or
    /// [`CinderError::SizeOverflow`] if the file would not fit the 32-bit
    /// offsets of the format. After a failure the writer is unusable: every
    /// later freeze or write returns [`CinderError::IncompleteLayout`].
    ///
    /// ## Panics
    ///
    /// Panics if called again after a successful freeze.
    pub fn freeze(&mut self) -> CinderResult<u64>
    {
        if self.freeze_failed {
            return Err(CinderError::IncompleteLayout);
        }

        let result = self.freeze_and_lay_out();
        if let Err(e) = &result {
            self.freeze_failed = true;
            warn!(error = %e, "crash file freeze failed");
        }
        result
    }

    fn freeze_and_lay_out(&mut self) -> CinderResult<u64>
    {
        writable::freeze(self)?;

        let mut cursor = LayoutCursor::at(0);
        writable::lay_out(self, &mut cursor)?;

        let file_size = cursor.position();
        self.file_size = Some(file_size);
        debug!(streams = self.streams.len(), file_size, "crash file layout complete");
        Ok(file_size)
    }

    /// Freeze unless already frozen, then require a complete layout
    fn ensure_laid_out(&mut self) -> CinderResult<()>
    {
        if self.state.lifecycle() == Lifecycle::Mutable {
            self.freeze()?;
        }
        if self.file_size.is_none() {
            return Err(CinderError::IncompleteLayout);
        }
        Ok(())
    }

    /// Freeze (if needed) and write the whole file to `sink`
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: the sink is not at position 0
    /// - Any freeze failure (see [`RootWriter::freeze`])
    /// - `IncompleteLayout`: an earlier freeze failed
    /// - `Io`: the sink failed; the output is incomplete and must be discarded
    pub fn write_everything(&mut self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        if sink.position() != 0 {
            return Err(CinderError::InvalidArgument(format!(
                "crash file must start at sink position 0, sink is at {}",
                sink.position()
            )));
        }

        self.ensure_laid_out()?;

        writable::write_tree(self, sink)?;
        debug!(bytes = sink.position(), "crash file written");
        Ok(())
    }

    /// Write the whole file to `path`
    ///
    /// The tree is frozen before the filesystem is touched. The bytes go to a
    /// temporary file in the same directory, which replaces `path` only once
    /// it is complete and synced. On any failure `path` is left as it was.
    /// Returns the number of bytes written.
    ///
    /// ## Errors
    ///
    /// See [`RootWriter::write_everything`]; file creation, flush, sync and
    /// rename failures are reported as `Io`.
    pub fn write_to_path(&mut self, path: &Path) -> CinderResult<u64>
    {
        self.ensure_laid_out()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;

        match self.write_file(temp.as_file_mut()) {
            Ok(written) => {
                temp.persist(path).map_err(|e| e.error)?;
                Ok(written)
            }
            Err(e) => {
                if let Err(close) = temp.close() {
                    warn!(path = %path.display(), error = %close, "failed to remove incomplete crash file");
                }
                Err(e)
            }
        }
    }

    fn write_file(&mut self, file: &mut File) -> CinderResult<u64>
    {
        let mut sink = PositionedWriter::new(BufWriter::new(&mut *file));
        self.write_everything(&mut sink)?;
        let written = sink.position();
        sink.into_inner().into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(written)
    }
}

impl Writable for RootWriter
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
        self.header.number_of_streams = checked_count("stream count", self.streams.len())?;
        self.directory = self
            .streams
            .iter()
            .map(|s| DirectoryEntry {
                stream_type: s.stream_type.raw(),
                location: LocationDescriptor::ABSENT,
            })
            .collect();
        Ok(())
    }

    fn size_of_object(&self) -> usize
    {
        record_size::<Header>() + self.streams.len() * record_size::<DirectoryEntry>()
    }

    fn children(&self) -> Children<'_>
    {
        self.streams.iter().map(|s| s.node.as_ref() as &dyn Writable).collect()
    }

    fn children_mut(&mut self) -> ChildrenMut<'_>
    {
        self.streams.iter_mut().map(|s| s.node.as_mut() as &mut dyn Writable).collect()
    }

    fn record_child_locations(&mut self)
    {
        let own = self.state.location();
        // The directory immediately follows the header within the root object.
        self.header.stream_directory_rva = own.offset + record_size::<Header>() as u32;
        for (entry, stream) in self.directory.iter_mut().zip(&self.streams) {
            entry.location = stream.node.state().location();
        }
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        sink.write(&encode_record(&self.header)?)?;
        for entry in &self.directory {
            sink.write(&encode_record(entry)?)?;
        }
        Ok(())
    }
}
