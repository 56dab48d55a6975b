//! Exception stream: which thread crashed, why, and its CPU context.

use crate::error::{checked_count, CinderError, CinderResult};
use crate::format::{
    encode_record, record_size, ExceptionRecord, ExceptionStreamRecord, EXCEPTION_MAXIMUM_PARAMETERS,
};
use crate::sink::FileWriter;
use crate::stream::Stream;
use crate::types::{LocationDescriptor, StreamType};
use crate::writable::{Children, ChildrenMut, Writable, WritableState};

/// Raw CPU context of the crashing thread
///
/// The bytes are written as supplied; their layout is the platform's
/// context structure and is not interpreted here.
#[derive(Debug, Clone)]
pub struct ThreadContext
{
    state: WritableState,
    bytes: Vec<u8>,
}

impl ThreadContext
{
    /// Wrap a platform context blob
    pub fn new(bytes: Vec<u8>) -> Self
    {
        Self {
            state: WritableState::new(),
            bytes,
        }
    }
}

impl Writable for ThreadContext
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
        self.bytes.len()
    }

    fn alignment(&self) -> usize
    {
        16
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        sink.write(&self.bytes)?;
        Ok(())
    }
}

/// The exception stream
///
/// ## Example
///
/// ```rust
/// use cinder_core::nodes::ExceptionStream;
///
/// // SIGSEGV at 0xdead0000 on thread 42, faulting address as a parameter
/// let mut exception = ExceptionStream::new(42, 11, 0xdead_0000);
/// exception.set_parameters(vec![0xdead_0000]);
/// ```
#[derive(Debug, Clone)]
pub struct ExceptionStream
{
    state: WritableState,
    record: ExceptionStreamRecord,
    parameters: Vec<u64>,
    context: Option<ThreadContext>,
}

impl ExceptionStream
{
    /// Describe an exception of `exception_code` at `exception_address` on `thread_id`
    pub fn new(thread_id: u32, exception_code: u32, exception_address: u64) -> Self
    {
        Self {
            state: WritableState::new(),
            record: ExceptionStreamRecord {
                thread_id,
                exception_record: ExceptionRecord {
                    exception_code,
                    exception_address,
                    ..ExceptionRecord::default()
                },
                ..ExceptionStreamRecord::default()
            },
            parameters: Vec::new(),
            context: None,
        }
    }

    /// Set the exception flags
    pub fn set_flags(&mut self, exception_flags: u32)
    {
        self.state.assert_mutable();
        self.record.exception_record.exception_flags = exception_flags;
    }

    /// Set the exception parameters (at most 15; checked at freeze)
    pub fn set_parameters(&mut self, parameters: Vec<u64>)
    {
        self.state.assert_mutable();
        self.parameters = parameters;
    }

    /// Attach the crashing thread's CPU context
    pub fn set_context(&mut self, context: ThreadContext)
    {
        self.state.assert_mutable();
        self.context = Some(context);
    }

    /// The record as it will be written
    pub fn record(&self) -> &ExceptionStreamRecord
    {
        &self.record
    }
}

impl Writable for ExceptionStream
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
        if self.parameters.len() > EXCEPTION_MAXIMUM_PARAMETERS {
            return Err(CinderError::LimitExceeded {
                what: "exception parameters",
                count: self.parameters.len(),
                limit: EXCEPTION_MAXIMUM_PARAMETERS,
            });
        }

        let exception = &mut self.record.exception_record;
        exception.number_parameters = checked_count("exception parameters", self.parameters.len())?;
        exception.exception_information[..self.parameters.len()].copy_from_slice(&self.parameters);
        Ok(())
    }

    fn size_of_object(&self) -> usize
    {
        record_size::<ExceptionStreamRecord>()
    }

    fn children(&self) -> Children<'_>
    {
        self.context.iter().map(|c| c as &dyn Writable).collect()
    }

    fn children_mut(&mut self) -> ChildrenMut<'_>
    {
        self.context.iter_mut().map(|c| c as &mut dyn Writable).collect()
    }

    fn record_child_locations(&mut self)
    {
        self.record.thread_context = self
            .context
            .as_ref()
            .map_or(LocationDescriptor::ABSENT, |c| c.state().location());
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        sink.write(&encode_record(&self.record)?)?;
        Ok(())
    }
}

impl Stream for ExceptionStream
{
    fn stream_type(&self) -> StreamType
    {
        StreamType::EXCEPTION
    }
}
