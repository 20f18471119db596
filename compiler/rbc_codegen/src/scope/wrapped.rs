//! View over a scope for code moved into a separate callback.
//!
//! `begin`/`ensure` and `begin`/`rescue` bodies run inside C callbacks that
//! only receive a pointer to a wrapper struct. The view resolves through the
//! underlying scope and rewrites each descriptor to go through that struct.

use crate::error::{CodegenError, CodegenResult};

use super::{FramePtr, FrameRef, Scope, Storage, VarRef, Visibility};

/// A [`Scope`] whose frames are reached through `wrap_ptr`.
pub struct WrappedScope<'a> {
    inner: &'a mut dyn Scope,
}

impl<'a> WrappedScope<'a> {
    pub fn new(inner: &'a mut dyn Scope) -> Self {
        WrappedScope { inner }
    }

    fn wrap_var(var: VarRef) -> VarRef {
        let storage = match var.storage {
            Storage::Frame(_) | Storage::WrappedFrame => Storage::WrappedFrame,
            Storage::Closure(slot) | Storage::WrappedClosure(slot) => Storage::WrappedClosure(slot),
        };
        VarRef::new(storage, var.index)
    }

    fn wrap_frame(frame: FrameRef) -> CodegenResult<FrameRef> {
        match frame {
            FrameRef::Heap(kind) => Err(CodegenError::bug(format!(
                "whole {kind:?} frame requested inside a wrapped scope"
            ))),
            FrameRef::Closure(slot) | FrameRef::WrappedClosure(slot) => {
                Ok(FrameRef::WrappedClosure(slot))
            }
            FrameRef::Outgoing | FrameRef::WrappedOutgoing => Ok(FrameRef::WrappedOutgoing),
        }
    }
}

impl Scope for WrappedScope<'_> {
    fn depth(&self) -> u32 {
        self.inner.depth()
    }

    fn resolve_local(&mut self, name: &str) -> CodegenResult<VarRef> {
        self.inner.resolve_local(name).map(Self::wrap_var)
    }

    fn declare_local(&mut self, name: &str) -> CodegenResult<VarRef> {
        self.inner.declare_local(name).map(Self::wrap_var)
    }

    fn local_at(&mut self, index: usize) -> CodegenResult<VarRef> {
        self.inner.local_at(index).map(Self::wrap_var)
    }

    fn resolve(&mut self, name: &str) -> CodegenResult<VarRef> {
        self.inner.resolve(name).map(Self::wrap_var)
    }

    fn declare(&mut self, name: &str) -> CodegenResult<VarRef> {
        self.inner.declare(name).map(Self::wrap_var)
    }

    fn request_whole_frame(&mut self) -> CodegenResult<FrameRef> {
        Self::wrap_frame(self.inner.request_whole_frame()?)
    }

    fn frame_at_depth(&mut self, depth: u32) -> CodegenResult<FrameRef> {
        Self::wrap_frame(self.inner.frame_at_depth(depth)?)
    }

    fn block_closure(&mut self) -> CodegenResult<FrameRef> {
        Self::wrap_frame(self.inner.block_closure()?)
    }

    fn outgoing_closure(&self) -> Option<FrameRef> {
        self.inner
            .outgoing_closure()
            .map(|_| FrameRef::WrappedOutgoing)
    }

    fn frame_ptr(&self) -> Option<FramePtr> {
        self.inner.frame_ptr().map(|_| FramePtr::WrappedFrame)
    }

    fn closure_ptr(&self) -> Option<FramePtr> {
        self.inner.closure_ptr().map(|_| FramePtr::WrappedClosure)
    }

    fn visibility(&self) -> Visibility {
        self.inner.visibility()
    }

    fn visibility_marker(&mut self, method: &str) -> bool {
        self.inner.visibility_marker(method)
    }
}
