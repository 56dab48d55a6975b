//! # cinder-core
//!
//! The crash file engine behind Cinder.
//!
//! A crash file is built as a tree of [`Writable`] nodes owned by a
//! [`RootWriter`]. The tree is then driven through three passes:
//!
//! - **freeze**: every node fixes its shape, bottom-up
//! - **layout**: every node gets its byte offset, in pre-order
//! - **write**: every node appends its bytes, in the same order
//!
//! Nodes refer to each other only through [`LocationDescriptor`]s, which are
//! all known before the first byte is written, so the output can go to a
//! sequential sink without seeking back.
//!
//! ## Modules
//!
//! - [`writable`]: the node contract and the three passes
//! - [`root`]: header, directory and the top-level driver
//! - [`nodes`]: concrete streams, lists and strings
//! - [`format`]: fixed-size on-disk records
//! - [`reader`]: reads a written file back for verification
//!
//! ## Example
//!
//! ```rust
//! use cinder_core::nodes::{CrashInfoStream, SimpleStringDictionary};
//! use cinder_core::reader::DumpReader;
//! use cinder_core::RootWriter;
//!
//! let mut annotations = SimpleStringDictionary::new();
//! annotations.set("channel", "beta");
//!
//! let mut crash_info = CrashInfoStream::new();
//! crash_info.set_simple_annotations(annotations);
//!
//! let mut root = RootWriter::new();
//! root.add_stream(crash_info)?;
//! let mut bytes = Vec::new();
//! root.write_everything(&mut bytes)?;
//!
//! let info = DumpReader::parse(&bytes)?.crash_info()?.unwrap();
//! assert_eq!(info.simple_annotations, [("channel".to_owned(), "beta".to_owned())]);
//! # Ok::<(), cinder_core::CinderError>(())
//! ```

pub mod error;
pub mod format;
pub mod nodes;
pub mod prelude;
pub mod reader;
pub mod root;
pub mod sink;
pub mod stream;
pub mod types;
pub mod writable;

pub use error::{CinderError, CinderResult};
pub use reader::DumpReader;
pub use root::RootWriter;
pub use sink::{FileWriter, PositionedWriter};
pub use stream::Stream;
pub use types::{LocationDescriptor, StreamType};
pub use writable::Writable;
