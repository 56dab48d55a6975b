//! Common module for library exports

pub use crate::error::{CinderError, CinderResult};
pub use crate::nodes::*;
pub use crate::reader::DumpReader;
pub use crate::root::RootWriter;
pub use crate::sink::{FileWriter, PositionedWriter};
pub use crate::stream::Stream;
pub use crate::types::{LocationDescriptor, StreamType};
pub use crate::writable::{Lifecycle, Writable};
