//! Method, top-level and class-body scopes.

use crate::error::{CodegenError, CodegenResult};

use super::{
    closure_setup, frame_setup, CaptureKey, CaptureTable, FrameKind, FramePtr, FrameRef, Scope,
    ScopeFlags, SlotTable, Storage, VarRef, Visibility,
};

/// The outermost scope of a region.
#[derive(Clone, Debug, Default)]
pub struct BaseScope {
    pub(crate) slots: SlotTable,
    pub(crate) flags: ScopeFlags,
    /// Frames handed to blocks defined in this scope.
    pub(crate) outgoing: CaptureTable,
    visibility: Visibility,
}

impl BaseScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope whose first slots are `params`, in order.
    pub fn with_params<'a>(params: impl IntoIterator<Item = &'a str>) -> Self {
        let mut scope = Self::new();
        for param in params {
            scope.slots.insert(param);
        }
        scope
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    pub fn flags(&self) -> ScopeFlags {
        self.flags
    }

    pub fn outgoing(&self) -> &CaptureTable {
        &self.outgoing
    }

    /// Frame declaration followed by the outgoing closure array, if any.
    pub fn setup_code(&self) -> CodegenResult<String> {
        let mut entries = Vec::with_capacity(self.outgoing.len());
        for key in self.outgoing.iter() {
            match key {
                CaptureKey::Base => entries.push(FrameRef::Heap(FrameKind::Local).to_string()),
                CaptureKey::Depth(depth) => {
                    return Err(CodegenError::bug(format!(
                        "base scope cannot hand down the frame at depth {depth}"
                    )));
                }
            }
        }
        let mut out = frame_setup(
            FrameKind::Local,
            self.slots.len(),
            self.flags.contains(ScopeFlags::NEED_HEAP),
        );
        if self.flags.contains(ScopeFlags::NEED_CLOSURE) {
            out.push_str(&closure_setup(&entries));
        }
        Ok(out)
    }

    fn slot_ref(index: usize) -> VarRef {
        VarRef::new(Storage::Frame(FrameKind::Local), index)
    }

    fn no_dvars(name: &str) -> CodegenError {
        CodegenError::bug(format!("block variable `{name}` outside a block"))
    }
}

impl Scope for BaseScope {
    fn depth(&self) -> u32 {
        0
    }

    fn resolve_local(&mut self, name: &str) -> CodegenResult<VarRef> {
        self.slots
            .get(name)
            .map(Self::slot_ref)
            .ok_or_else(|| CodegenError::bug(format!("unknown local variable `{name}`")))
    }

    fn declare_local(&mut self, name: &str) -> CodegenResult<VarRef> {
        Ok(Self::slot_ref(self.slots.insert(name)))
    }

    fn local_at(&mut self, index: usize) -> CodegenResult<VarRef> {
        if index >= self.slots.len() {
            return Err(CodegenError::bug(format!("wrong local variable index {index}")));
        }
        Ok(Self::slot_ref(index))
    }

    fn resolve(&mut self, name: &str) -> CodegenResult<VarRef> {
        Err(Self::no_dvars(name))
    }

    fn declare(&mut self, name: &str) -> CodegenResult<VarRef> {
        Err(Self::no_dvars(name))
    }

    fn request_whole_frame(&mut self) -> CodegenResult<FrameRef> {
        self.flags |= ScopeFlags::NEED_HEAP;
        Ok(FrameRef::Heap(FrameKind::Local))
    }

    fn frame_at_depth(&mut self, depth: u32) -> CodegenResult<FrameRef> {
        if depth != 0 {
            return Err(CodegenError::bug(format!("no frame at depth {depth}")));
        }
        self.request_whole_frame()
    }

    fn block_closure(&mut self) -> CodegenResult<FrameRef> {
        self.flags |= ScopeFlags::NEED_CLOSURE;
        Ok(FrameRef::Outgoing)
    }

    fn outgoing_closure(&self) -> Option<FrameRef> {
        self.flags
            .contains(ScopeFlags::NEED_CLOSURE)
            .then_some(FrameRef::Outgoing)
    }

    fn frame_ptr(&self) -> Option<FramePtr> {
        (!self.slots.is_empty()).then_some(FramePtr::Frame(FrameKind::Local))
    }

    fn closure_ptr(&self) -> Option<FramePtr> {
        None
    }

    fn visibility(&self) -> Visibility {
        self.visibility
    }

    fn visibility_marker(&mut self, method: &str) -> bool {
        match Visibility::from_marker(method) {
            Some(visibility) => {
                self.visibility = visibility;
                true
            }
            None => false,
        }
    }
}
