//! Test nodes shared by the integration tests

#![allow(dead_code)]

use cinder_core::sink::FileWriter;
use cinder_core::writable::{Children, ChildrenMut, Writable, WritableState};
use cinder_core::{CinderResult, LocationDescriptor, Stream, StreamType};

/// A node of arbitrary size and alignment that fills its bytes with one value
#[derive(Debug)]
pub struct Blob
{
    state: WritableState,
    pub tag: StreamType,
    pub size: usize,
    pub align: usize,
    pub fill: u8,
    pub children: Vec<Blob>,
    /// Children's locations as seen by `record_child_locations`
    pub recorded: Vec<LocationDescriptor>,
}

impl Blob
{
    pub fn new(size: usize, align: usize, fill: u8) -> Self
    {
        Self {
            state: WritableState::new(),
            tag: StreamType::FIRST_USER,
            size,
            align,
            fill,
            children: Vec::new(),
            recorded: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: StreamType) -> Self
    {
        self.tag = tag;
        self
    }

    pub fn with_child(mut self, child: Blob) -> Self
    {
        self.children.push(child);
        self
    }

    /// Every node of this subtree in pre-order
    pub fn walk<'a>(&'a self, out: &mut Vec<&'a Blob>)
    {
        out.push(self);
        for child in &self.children {
            child.walk(out);
        }
    }
}

impl Writable for Blob
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
        self.size
    }

    fn alignment(&self) -> usize
    {
        self.align
    }

    fn children(&self) -> Children<'_>
    {
        self.children.iter().map(|c| c as &dyn Writable).collect()
    }

    fn children_mut(&mut self) -> ChildrenMut<'_>
    {
        self.children.iter_mut().map(|c| c as &mut dyn Writable).collect()
    }

    fn record_child_locations(&mut self)
    {
        self.recorded = self.children.iter().map(|c| c.state().location()).collect();
    }

    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>
    {
        sink.write(&vec![self.fill; self.size])?;
        Ok(())
    }
}

impl Stream for Blob
{
    fn stream_type(&self) -> StreamType
    {
        self.tag
    }
}
