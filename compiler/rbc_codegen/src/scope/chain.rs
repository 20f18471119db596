//! A base scope plus the blocks entered inside it.

use crate::error::{CodegenError, CodegenResult};

use super::{
    closure_setup, frame_setup, BaseScope, BlockScope, CaptureKey, CaptureTable, FrameKind,
    FramePtr, FrameRef, Scope, ScopeFlags, Storage, VarRef, Visibility, CLOSURE_HEADER,
};

/// The scope stack of one region. The innermost block, if any, is current.
#[derive(Clone, Debug)]
pub struct ScopeChain {
    base: BaseScope,
    blocks: Vec<BlockScope>,
}

impl ScopeChain {
    pub fn new(base: BaseScope) -> Self {
        ScopeChain {
            base,
            blocks: Vec::new(),
        }
    }

    pub fn base(&self) -> &BaseScope {
        &self.base
    }

    pub fn current_block(&self) -> Option<&BlockScope> {
        self.blocks.last()
    }

    /// Enter a block defined in the current scope; returns its depth.
    ///
    /// The current scope starts building a closure array, since the block
    /// receives `self` and `cbase` through it.
    pub fn enter_block(&mut self) -> u32 {
        *self.flags_mut(self.depth()) |= ScopeFlags::NEED_CLOSURE;
        let depth = self.depth() + 1;
        self.blocks.push(BlockScope::new(depth));
        tracing::trace!(depth, "entered block scope");
        depth
    }

    /// Leave the current block, returning it with its setup code.
    pub fn leave_block(&mut self) -> CodegenResult<(BlockScope, String)> {
        let setup = match self.blocks.last() {
            Some(block) => self.block_setup(block)?,
            None => return Err(CodegenError::bug("leaving a block scope at depth 0")),
        };
        let block = self
            .blocks
            .pop()
            .ok_or_else(|| CodegenError::bug("block scope vanished"))?;
        tracing::trace!(
            depth = block.depth,
            on_heap = block.flags.contains(ScopeFlags::NEED_HEAP),
            "left block scope"
        );
        Ok((block, setup))
    }

    /// Close the region, returning the base scope with its setup code.
    pub fn finish(self) -> CodegenResult<(BaseScope, String)> {
        if !self.blocks.is_empty() {
            return Err(CodegenError::bug(format!(
                "region finished with {} open block scopes",
                self.blocks.len()
            )));
        }
        let setup = self.base.setup_code()?;
        Ok((self.base, setup))
    }

    fn block_setup(&self, block: &BlockScope) -> CodegenResult<String> {
        let mut entries = Vec::with_capacity(block.outgoing.len());
        for key in block.outgoing.iter() {
            let owner = key.owner_depth();
            let entry = if owner == block.depth {
                FrameRef::Heap(FrameKind::Dyna)
            } else if owner < block.depth {
                FrameRef::Closure(self.incoming_slot(block.depth, key)?)
            } else {
                return Err(CodegenError::bug(format!(
                    "block at depth {} hands down a deeper frame ({owner})",
                    block.depth
                )));
            };
            entries.push(entry.to_string());
        }
        let mut out = frame_setup(
            FrameKind::Dyna,
            block.slots.len(),
            block.flags.contains(ScopeFlags::NEED_HEAP),
        );
        if block.flags.contains(ScopeFlags::NEED_CLOSURE) {
            out.push_str(&closure_setup(&entries));
        }
        Ok(out)
    }

    /// Slot of `key` in the closure array received by the block at `depth`.
    fn incoming_slot(&self, depth: u32, key: CaptureKey) -> CodegenResult<usize> {
        self.outgoing(depth - 1)
            .position(key)
            .map(|pos| CLOSURE_HEADER + pos)
            .ok_or_else(|| {
                CodegenError::bug(format!("capture {key:?} not forwarded to depth {depth}"))
            })
    }

    fn outgoing(&self, depth: u32) -> &CaptureTable {
        match depth {
            0 => &self.base.outgoing,
            d => &self.blocks[d as usize - 1].outgoing,
        }
    }

    fn outgoing_mut(&mut self, depth: u32) -> &mut CaptureTable {
        match depth {
            0 => &mut self.base.outgoing,
            d => &mut self.blocks[d as usize - 1].outgoing,
        }
    }

    fn flags_mut(&mut self, depth: u32) -> &mut ScopeFlags {
        match depth {
            0 => &mut self.base.flags,
            d => &mut self.blocks[d as usize - 1].flags,
        }
    }

    fn top_mut(&mut self) -> CodegenResult<&mut BlockScope> {
        self.blocks
            .last_mut()
            .ok_or_else(|| CodegenError::bug("no block scope is open"))
    }

    /// Make the frame named by `key` reachable from the current block,
    /// returning its slot in the incoming closure array.
    fn capture(&mut self, key: CaptureKey) -> CodegenResult<usize> {
        let depth = self.depth();
        let owner = key.owner_depth();
        if owner >= depth {
            return Err(CodegenError::bug(format!(
                "unexpected capture of depth {owner} from depth {depth}"
            )));
        }
        *self.flags_mut(owner) |= ScopeFlags::NEED_HEAP;
        for level in owner + 1..=depth {
            self.blocks[level as usize - 1].captures.insert(key);
            self.outgoing_mut(level - 1).insert(key);
        }
        self.incoming_slot(depth, key)
    }

    fn captured_local(&mut self, index: usize) -> CodegenResult<VarRef> {
        let slot = self.capture(CaptureKey::Base)?;
        Ok(VarRef::new(Storage::Closure(slot), index))
    }
}

impl Scope for ScopeChain {
    fn depth(&self) -> u32 {
        self.blocks.last().map_or(0, BlockScope::depth)
    }

    fn resolve_local(&mut self, name: &str) -> CodegenResult<VarRef> {
        if self.blocks.is_empty() {
            return self.base.resolve_local(name);
        }
        let index = self
            .base
            .slots
            .get(name)
            .ok_or_else(|| CodegenError::bug(format!("unknown local variable `{name}`")))?;
        self.captured_local(index)
    }

    fn declare_local(&mut self, name: &str) -> CodegenResult<VarRef> {
        if self.blocks.is_empty() {
            return self.base.declare_local(name);
        }
        self.resolve_local(name)
    }

    fn local_at(&mut self, index: usize) -> CodegenResult<VarRef> {
        if self.blocks.is_empty() {
            return self.base.local_at(index);
        }
        if index >= self.base.slots.len() {
            return Err(CodegenError::bug(format!("wrong local variable index {index}")));
        }
        self.captured_local(index)
    }

    fn resolve(&mut self, name: &str) -> CodegenResult<VarRef> {
        let depth = self.depth();
        if depth == 0 {
            return self.base.resolve(name);
        }
        let own = &self.blocks[depth as usize - 1];
        if let Some(index) = own.slots.get(name) {
            return Ok(VarRef::new(Storage::Frame(FrameKind::Dyna), index));
        }
        for level in (1..depth).rev() {
            if let Some(index) = self.blocks[level as usize - 1].slots.get(name) {
                let slot = self.capture(CaptureKey::Depth(level))?;
                return Ok(VarRef::new(Storage::Closure(slot), index));
            }
        }
        if let Some(index) = self.base.slots.get(name) {
            return self.captured_local(index);
        }
        self.declare(name)
    }

    fn declare(&mut self, name: &str) -> CodegenResult<VarRef> {
        if self.blocks.is_empty() {
            return self.base.declare(name);
        }
        let index = self.top_mut()?.slots.insert(name);
        Ok(VarRef::new(Storage::Frame(FrameKind::Dyna), index))
    }

    fn request_whole_frame(&mut self) -> CodegenResult<FrameRef> {
        if self.blocks.is_empty() {
            return self.base.request_whole_frame();
        }
        self.top_mut()?.flags |= ScopeFlags::NEED_HEAP;
        Ok(FrameRef::Heap(FrameKind::Dyna))
    }

    fn frame_at_depth(&mut self, depth: u32) -> CodegenResult<FrameRef> {
        let current = self.depth();
        if depth == current {
            self.request_whole_frame()
        } else if depth < current {
            let slot = self.capture(CaptureKey::for_depth(depth))?;
            Ok(FrameRef::Closure(slot))
        } else {
            Err(CodegenError::bug(format!(
                "no frame at depth {depth} (current depth {current})"
            )))
        }
    }

    fn block_closure(&mut self) -> CodegenResult<FrameRef> {
        *self.flags_mut(self.depth()) |= ScopeFlags::NEED_CLOSURE;
        Ok(FrameRef::Outgoing)
    }

    fn outgoing_closure(&self) -> Option<FrameRef> {
        match self.blocks.last() {
            Some(block) => block
                .flags
                .contains(ScopeFlags::NEED_CLOSURE)
                .then_some(FrameRef::Outgoing),
            None => self.base.outgoing_closure(),
        }
    }

    fn frame_ptr(&self) -> Option<FramePtr> {
        match self.blocks.last() {
            Some(block) => block.frame_ptr(),
            None => self.base.frame_ptr(),
        }
    }

    fn closure_ptr(&self) -> Option<FramePtr> {
        (!self.blocks.is_empty()).then_some(FramePtr::Closure)
    }

    fn visibility(&self) -> Visibility {
        if self.blocks.is_empty() {
            self.base.visibility()
        } else {
            Visibility::Public
        }
    }

    fn visibility_marker(&mut self, method: &str) -> bool {
        self.blocks.is_empty() && self.base.visibility_marker(method)
    }
}
