//! Block scopes.

use super::{CaptureKey, CaptureTable, FrameKind, FramePtr, ScopeFlags, SlotTable};

/// A block body nested `depth` levels inside its base scope.
///
/// Blocks only exist inside a [`ScopeChain`](super::ScopeChain), which owns
/// resolution; this type holds the per-block state.
#[derive(Clone, Debug)]
pub struct BlockScope {
    pub(crate) depth: u32,
    pub(crate) slots: SlotTable,
    pub(crate) flags: ScopeFlags,
    /// Ancestor frames this block reads from its incoming closure array.
    pub(crate) captures: CaptureTable,
    /// Frames handed to blocks defined in this block.
    pub(crate) outgoing: CaptureTable,
}

impl BlockScope {
    pub(crate) fn new(depth: u32) -> Self {
        BlockScope {
            depth,
            slots: SlotTable::new(),
            flags: ScopeFlags::empty(),
            captures: CaptureTable::new(),
            outgoing: CaptureTable::new(),
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    pub fn flags(&self) -> ScopeFlags {
        self.flags
    }

    pub fn captures(&self) -> &CaptureTable {
        &self.captures
    }

    pub fn outgoing(&self) -> &CaptureTable {
        &self.outgoing
    }

    /// Whether this block reads `key` from its incoming closure array.
    pub fn captures_key(&self, key: CaptureKey) -> bool {
        self.captures.contains(key)
    }

    pub(crate) fn frame_ptr(&self) -> Option<FramePtr> {
        (!self.slots.is_empty()).then_some(FramePtr::Frame(FrameKind::Dyna))
    }
}
