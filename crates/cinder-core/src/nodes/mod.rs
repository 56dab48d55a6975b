//! # Node Kinds
//!
//! Concrete [`Writable`](crate::writable::Writable) nodes for the streams
//! Cinder writes.
//!
//! | node | stream type | children |
//! |---|---|---|
//! | [`CrashInfoStream`] | `CrashInfo` | annotations, [`ModuleCrashInfoList`] |
//! | [`ModuleListStream`] | `ModuleList` | module names, [`CodeViewRecord`]s |
//! | [`MemoryListStream`] | `MemoryList` | [`MemorySnapshot`]s |
//! | [`ExceptionStream`] | `Exception` | [`ThreadContext`] |
//! | [`UserStream`] | any | none |

pub mod annotations;
pub mod crash_info;
pub mod exception;
pub mod memory_list;
pub mod module_list;
pub mod string;
pub mod user_stream;

pub use annotations::{SimpleStringDictionary, StringList};
pub use crash_info::{CrashInfoStream, ModuleCrashInfo, ModuleCrashInfoList};
pub use exception::{ExceptionStream, ThreadContext};
pub use memory_list::{MemoryListStream, MemorySnapshot};
pub use module_list::{CodeViewRecord, Module, ModuleListStream};
pub use string::{Utf16String, Utf8String};
pub use user_stream::UserStream;
