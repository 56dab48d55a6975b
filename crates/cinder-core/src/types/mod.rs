//! # Types
//!
//! Value types shared by the writer, the nodes and the reader.
//!
//! These are the pieces that appear on disk as-is: byte ranges and stream
//! tags. The record layouts built out of them live in [`crate::format`].

pub mod location;
pub mod stream;

// Re-export all public types
pub use location::LocationDescriptor;
pub use stream::StreamType;
