//! # Writable Nodes
//!
//! The object tree that becomes a crash file.
//!
//! Every piece of a crash file (a stream, a list, a string, a memory blob) is
//! a node implementing [`Writable`]. A node owns its children, reports the
//! size of its own bytes, and writes them once it has been placed. The free
//! functions in this module drive a whole tree through three passes:
//!
//! 1. [`freeze`]: bottom-up. Children are frozen before their parent, so a
//!    parent can validate itself against its children's final shape.
//! 2. [`lay_out`]: pre-order. Each node is placed at the running cursor
//!    (rounded up to its alignment), the cursor advances by the node's own
//!    size, then its children are placed in order. After its subtree is
//!    placed, the parent copies its children's descriptors into its own
//!    payload record.
//! 3. [`write_tree`]: the same pre-order walk, appending each node's bytes.
//!    Because the order is identical, the sink position before each node's
//!    write is exactly the offset the layout pass gave it.
//!
//! No bytes are ever patched after they are written.
//!
//! ## Lifecycle
//!
//! ```text
//! Mutable ──freeze──▶ Frozen ──lay_out──▶ Frozen+placed ──write_tree──▶ Written
//! ```
//!
//! Calling a pass out of order is a programming error, not a runtime
//! condition, and panics with a message naming the violated rule.

use smallvec::SmallVec;
use tracing::trace;

use crate::error::{checked_u32, CinderResult};
use crate::sink::{write_zeros, FileWriter};
use crate::types::LocationDescriptor;

/// Default alignment of a node's offset
pub const DEFAULT_ALIGNMENT: usize = 4;

/// Direct children of a node, in traversal order
pub type Children<'a> = SmallVec<[&'a dyn Writable; 4]>;

/// Mutable view of a node's direct children, in traversal order
pub type ChildrenMut<'a> = SmallVec<[&'a mut dyn Writable; 4]>;

/// Lifecycle stage of a node
///
/// Transitions only move forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle
{
    /// Under construction; setters may be called
    #[default]
    Mutable,
    /// Shape is final; size and children may be queried
    Frozen,
    /// Bytes have been appended to the sink
    Written,
}

/// Lifecycle bookkeeping embedded in every node
///
/// Concrete nodes hold one of these and hand it out through
/// [`Writable::state`]. The drivers in this module are the only code that
/// advances it.
#[derive(Debug, Clone, Default)]
pub struct WritableState
{
    lifecycle: Lifecycle,
    location: Option<LocationDescriptor>,
}

impl WritableState
{
    /// A fresh, mutable state
    pub const fn new() -> Self
    {
        Self {
            lifecycle: Lifecycle::Mutable,
            location: None,
        }
    }

    /// Current lifecycle stage
    pub fn lifecycle(&self) -> Lifecycle
    {
        self.lifecycle
    }

    /// Panics unless the node is still mutable
    ///
    /// Call this at the top of every setter.
    #[track_caller]
    pub fn assert_mutable(&self)
    {
        assert_eq!(
            self.lifecycle(),
            Lifecycle::Mutable,
            "writable node mutated after it was frozen"
        );
    }

    /// Panics unless the node has been frozen
    #[track_caller]
    pub fn assert_frozen(&self)
    {
        assert!(
            self.lifecycle() >= Lifecycle::Frozen,
            "writable node queried before it was frozen"
        );
    }

    /// Where the layout pass placed this node, if it has run
    pub fn placement(&self) -> Option<LocationDescriptor>
    {
        self.location
    }

    /// Where the layout pass placed this node
    ///
    /// Panics if the node has not been laid out yet.
    #[track_caller]
    pub fn location(&self) -> LocationDescriptor
    {
        match self.location {
            Some(location) => location,
            None => panic!("writable node location read before layout"),
        }
    }

    fn mark_frozen(&mut self)
    {
        self.assert_mutable();
        self.lifecycle = Lifecycle::Frozen;
    }

    fn place(&mut self, location: LocationDescriptor)
    {
        assert!(self.location.is_none(), "writable node laid out twice");
        self.location = Some(location);
    }

    fn mark_written(&mut self)
    {
        self.lifecycle = Lifecycle::Written;
    }
}

/// A node of the crash file tree
///
/// Implementors supply the per-kind behavior; the drivers ([`freeze`],
/// [`lay_out`], [`write_tree`]) supply ordering, state checks, alignment and
/// offset bookkeeping. Implementors never touch offsets directly: a parent
/// reads its children's placement in [`record_child_locations`] and copies
/// it into its own record.
///
/// [`record_child_locations`]: Writable::record_child_locations
pub trait Writable
{
    /// Lifecycle bookkeeping for this node
    fn state(&self) -> &WritableState;

    /// Mutable lifecycle bookkeeping for this node
    fn state_mut(&mut self) -> &mut WritableState;

    /// Finalize this node's own record once all children are frozen
    ///
    /// The default does nothing. Override to compute counts, validate
    /// entries, or fill fields that depend on children's shape.
    ///
    /// ## Errors
    ///
    /// Return an error when the node cannot be represented: counts too large
    /// for their field, conflicting entries, and so on.
    fn freeze_object(&mut self) -> CinderResult<()>
    {
        Ok(())
    }

    /// Size in bytes of this node's own object, excluding descendants
    fn size_of_object(&self) -> usize;

    /// Direct children, in the order they are laid out and written
    fn children(&self) -> Children<'_>
    {
        Children::new()
    }

    /// Mutable direct children, in the same order as [`Writable::children`]
    fn children_mut(&mut self) -> ChildrenMut<'_>
    {
        ChildrenMut::new()
    }

    /// Required alignment of this node's offset, a power of two
    fn alignment(&self) -> usize
    {
        DEFAULT_ALIGNMENT
    }

    /// Copy placed children's descriptors into this node's record
    ///
    /// Called by [`lay_out`] after this node and its whole subtree have been
    /// placed. Nodes without descriptor fields keep the default no-op.
    fn record_child_locations(&mut self) {}

    /// Append exactly [`Writable::size_of_object`] bytes to `sink`
    ///
    /// ## Errors
    ///
    /// Propagate sink failures and encoding failures.
    fn write_object(&self, sink: &mut dyn FileWriter) -> CinderResult<()>;
}

/// Running offset of the layout pass
///
/// Threaded explicitly through [`lay_out`]; it is the only mutable state the
/// layout pass shares between nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutCursor
{
    position: u64,
}

impl LayoutCursor
{
    /// A cursor at `position`
    pub const fn at(position: u64) -> Self
    {
        Self { position }
    }

    /// Current position
    pub const fn position(self) -> u64
    {
        self.position
    }

    /// Round the position up to `alignment` and return the new position
    pub fn align_to(&mut self, alignment: usize) -> CinderResult<u64>
    {
        assert!(alignment.is_power_of_two(), "node alignment must be a power of two");
        let mask = alignment as u64 - 1;
        let aligned = (self.position + mask) & !mask;
        checked_u32("offset", aligned)?;
        self.position = aligned;
        Ok(aligned)
    }

    /// Move past `size` bytes
    pub fn advance(&mut self, size: u64) -> CinderResult<()>
    {
        let end = self.position + size;
        checked_u32("file size", end)?;
        self.position = end;
        Ok(())
    }
}

/// Freeze `node` and its whole subtree
///
/// Children are frozen first, in order, then the node's own
/// [`Writable::freeze_object`] runs.
///
/// ## Errors
///
/// The first failure anywhere in the subtree is returned. The tree is then
/// partially frozen and must be discarded.
///
/// ## Panics
///
/// Panics if any node in the subtree was already frozen.
pub fn freeze(node: &mut dyn Writable) -> CinderResult<()>
{
    node.state().assert_mutable();
    for child in node.children_mut() {
        freeze(child)?;
    }
    node.freeze_object()?;
    node.state_mut().mark_frozen();
    Ok(())
}

/// Size of a frozen node's own object
///
/// ## Panics
///
/// Panics if the node is not frozen yet.
pub fn object_size(node: &dyn Writable) -> usize
{
    node.state().assert_frozen();
    node.size_of_object()
}

/// Direct children of a frozen node
///
/// ## Panics
///
/// Panics if the node is not frozen yet.
pub fn child_nodes(node: &dyn Writable) -> Children<'_>
{
    node.state().assert_frozen();
    node.children()
}

/// Assign offsets to `node` and its subtree, starting at `cursor`
///
/// ## Errors
///
/// Returns [`SizeOverflow`](crate::error::CinderError::SizeOverflow) when an
/// offset, a size, or the end of the file passes the 32-bit limit.
///
/// ## Panics
///
/// Panics if the node is not frozen, or was already laid out.
pub fn lay_out(node: &mut dyn Writable, cursor: &mut LayoutCursor) -> CinderResult<()>
{
    node.state().assert_frozen();

    let offset = cursor.align_to(node.alignment())?;
    let size = node.size_of_object() as u64;
    let location = LocationDescriptor::from_extent(offset, size)?;
    node.state_mut().place(location);
    cursor.advance(size)?;
    trace!(offset, size, "placed node");

    for child in node.children_mut() {
        lay_out(child, cursor)?;
    }
    node.record_child_locations();
    Ok(())
}

/// Write `node` and its subtree to `sink` in layout order
///
/// Zero padding is written before any node whose alignment left a gap.
///
/// ## Errors
///
/// Returns the first sink or encoding failure. The output is then
/// incomplete and must be discarded.
///
/// ## Panics
///
/// Panics if the node was not laid out, was already written, if the sink
/// position has run past the node's offset, or if the node wrote a different
/// number of bytes than it reported.
pub fn write_tree(node: &mut dyn Writable, sink: &mut dyn FileWriter) -> CinderResult<()>
{
    assert_eq!(
        node.state().lifecycle(),
        Lifecycle::Frozen,
        "writable node written before freeze or written twice"
    );
    let location = node.state().location();

    let position = sink.position();
    let offset = u64::from(location.offset);
    assert!(position <= offset, "sink at {position} is past node offset {offset}");
    write_zeros(sink, (offset - position) as usize)?;

    node.write_object(sink)?;
    let written = sink.position() - offset;
    assert_eq!(
        written,
        u64::from(location.size),
        "writable node wrote a different size than it reported"
    );
    node.state_mut().mark_written();

    for child in node.children_mut() {
        write_tree(child, sink)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::nodes::Utf8String;

    #[test]
    fn test_cursor_alignment()
    {
        let mut cursor = LayoutCursor::at(5);
        assert_eq!(cursor.align_to(4).unwrap(), 8);
        assert_eq!(cursor.align_to(16).unwrap(), 16);
        assert_eq!(cursor.align_to(1).unwrap(), 16);
    }

    #[test]
    fn test_cursor_overflow_is_reported()
    {
        let mut cursor = LayoutCursor::at(u64::from(u32::MAX) - 2);
        assert!(cursor.advance(8).is_err());
    }

    #[test]
    fn test_lifecycle_advances()
    {
        let mut node = Utf8String::new("abc");
        assert_eq!(node.state().lifecycle(), Lifecycle::Mutable);

        freeze(&mut node).unwrap();
        assert_eq!(node.state().lifecycle(), Lifecycle::Frozen);
        assert_eq!(object_size(&node), 8);

        let mut cursor = LayoutCursor::at(0);
        lay_out(&mut node, &mut cursor).unwrap();
        assert_eq!(node.state().location(), LocationDescriptor::new(0, 8));

        let mut sink = Vec::new();
        write_tree(&mut node, &mut sink).unwrap();
        assert_eq!(node.state().lifecycle(), Lifecycle::Written);
        assert_eq!(sink, [3, 0, 0, 0, b'a', b'b', b'c', 0]);
    }

    #[test]
    #[should_panic(expected = "queried before it was frozen")]
    fn test_size_before_freeze_panics()
    {
        let node = Utf8String::new("abc");
        let _ = object_size(&node);
    }

    #[test]
    #[should_panic(expected = "mutated after it was frozen")]
    fn test_double_freeze_panics()
    {
        let mut node = Utf8String::new("abc");
        freeze(&mut node).unwrap();
        let _ = freeze(&mut node);
    }

    #[test]
    #[should_panic(expected = "location read before layout")]
    fn test_write_before_layout_panics()
    {
        let mut node = Utf8String::new("abc");
        freeze(&mut node).unwrap();
        let mut sink = Vec::new();
        let _ = write_tree(&mut node, &mut sink);
    }
}
