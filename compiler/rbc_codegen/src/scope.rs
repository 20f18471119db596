//! Scope resolution engine.
//!
//! Tracks variable slots per region, resolves closure captures across nested
//! blocks, and decides whether each frame lives on the C stack or in a heap
//! array that outlives the region.
//!
//! # Variants
//!
//! All three share the [`Scope`] interface:
//!
//! - [`BaseScope`]: a method, top-level chunk or class/module body on its own
//! - [`ScopeChain`]: a base scope plus the stack of [`BlockScope`]s entered
//!   inside it; the innermost block is the current scope
//! - [`WrappedScope`]: a view over either, for code emitted into a separate
//!   callback that reaches its frames through a wrapper struct
//!
//! Operations return structured descriptors ([`VarRef`], [`FrameRef`],
//! [`FramePtr`]); they become C text only when displayed. The wrapped view
//! rewrites descriptors, never text.
//!
//! # Closure contract
//!
//! Every scope that defines blocks builds one closure array at the end of its
//! setup: `[self, cbase, captured frames...]`. A block reads its captured
//! frames through the incoming array. Capture keys are forwarded explicitly:
//! when a block at depth `D` references a frame owned at depth `k`, every
//! block at depths `k+1..=D` records the key and every enclosing scope on the
//! path adds it to the array it hands down. The owner's frame is forced onto
//! the heap.
//!
//! # Stack vs heap
//!
//! The choice is made from the scope's flags when its setup code is emitted
//! at the end of the region, so a capture discovered late still upgrades the
//! frame. Flags only ever get set, which makes the choice independent of the
//! order in which references were resolved.

mod base;
mod block;
mod chain;
mod slots;
mod wrapped;

use std::fmt;

use crate::error::CodegenResult;

pub use base::BaseScope;
pub use block::BlockScope;
pub use chain::ScopeChain;
pub use slots::{CaptureTable, SlotTable};
pub use wrapped::WrappedScope;

/// Closure array slots ahead of the captured frames: `self` and `cbase`.
pub const CLOSURE_HEADER: usize = 2;

bitflags::bitflags! {
    /// Per-scope frame requirements.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ScopeFlags: u8 {
        /// Some consumer needs the whole frame after the region returns.
        const NEED_HEAP = 1;
        /// The scope hands a closure array to blocks defined in it.
        const NEED_CLOSURE = 1 << 1;
    }
}

/// Method visibility in effect for `def`s in a base scope.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Protected,
    ModuleFunction,
}

impl Visibility {
    /// The visibility a no-argument call to `method` switches to, if any.
    pub fn from_marker(method: &str) -> Option<Self> {
        match method {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            "protected" => Some(Visibility::Protected),
            "module_function" => Some(Visibility::ModuleFunction),
            _ => None,
        }
    }

    /// The runtime function that defines a method with this visibility.
    pub const fn define_function(self) -> &'static str {
        match self {
            Visibility::Public => "rb_define_method",
            Visibility::Private => "rb_define_private_method",
            Visibility::Protected => "rb_define_protected_method",
            Visibility::ModuleFunction => "rb_define_module_function",
        }
    }
}

/// Which ancestor frame a block must reach at run time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CaptureKey {
    /// The base scope's frame.
    Base,
    /// The frame of the enclosing block at this depth.
    Depth(u32),
}

impl CaptureKey {
    /// Key for the frame owned at `depth` (0 is the base scope).
    pub fn for_depth(depth: u32) -> Self {
        if depth == 0 {
            CaptureKey::Base
        } else {
            CaptureKey::Depth(depth)
        }
    }

    /// Depth of the scope that owns the captured frame.
    pub fn owner_depth(self) -> u32 {
        match self {
            CaptureKey::Base => 0,
            CaptureKey::Depth(depth) => depth,
        }
    }
}

/// Which kind of frame a variable lives in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Base scope frame (`lvar`).
    Local,
    /// Block frame (`dvar`).
    Dyna,
}

impl FrameKind {
    fn var(self) -> &'static str {
        match self {
            FrameKind::Local => "lvar",
            FrameKind::Dyna => "dvar",
        }
    }
}

/// How generated code reaches the frame holding a variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Storage {
    /// The current function's own frame.
    Frame(FrameKind),
    /// A captured frame at this slot of the incoming closure array.
    Closure(usize),
    /// The own frame, through the wrapper struct.
    WrappedFrame,
    /// A captured frame, through the wrapper struct.
    WrappedClosure(usize),
}

/// A resolved variable: frame access plus slot index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VarRef {
    pub storage: Storage,
    pub index: usize,
}

impl VarRef {
    pub fn new(storage: Storage, index: usize) -> Self {
        VarRef { storage, index }
    }
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index = self.index;
        match self.storage {
            Storage::Frame(kind) => write!(f, "{}[{index}]", kind.var()),
            Storage::Closure(slot) => write!(f, "RARRAY_PTR(closure[{slot}])[{index}]"),
            Storage::WrappedFrame => write!(f, "(wrap_ptr->var)[{index}]"),
            Storage::WrappedClosure(slot) => {
                write!(f, "RARRAY_PTR((wrap_ptr->closure)[{slot}])[{index}]")
            }
        }
    }
}

/// A whole frame or closure array, as a Ruby `VALUE`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameRef {
    /// The current function's heap-backed frame (`lvar_ary` / `dvar_ary`).
    Heap(FrameKind),
    /// A captured frame from the incoming closure array.
    Closure(usize),
    /// The closure array this scope hands to its blocks.
    Outgoing,
    WrappedClosure(usize),
    WrappedOutgoing,
}

impl fmt::Display for FrameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameRef::Heap(kind) => write!(f, "{}_ary", kind.var()),
            FrameRef::Closure(slot) => write!(f, "closure[{slot}]"),
            FrameRef::Outgoing => f.write_str("blk_closure"),
            FrameRef::WrappedClosure(slot) => write!(f, "(wrap_ptr->closure)[{slot}]"),
            FrameRef::WrappedOutgoing => f.write_str("(wrap_ptr->blk_closure)"),
        }
    }
}

/// A `VALUE *` handed to a wrapped callback.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FramePtr {
    Frame(FrameKind),
    Closure,
    WrappedFrame,
    WrappedClosure,
}

impl fmt::Display for FramePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramePtr::Frame(kind) => f.write_str(kind.var()),
            FramePtr::Closure => f.write_str("closure"),
            FramePtr::WrappedFrame => f.write_str("(wrap_ptr->var)"),
            FramePtr::WrappedClosure => f.write_str("(wrap_ptr->closure)"),
        }
    }
}

/// Scope operations shared by base, nested and wrapped scopes.
pub trait Scope {
    /// Nesting depth of the current scope (0 for a base scope).
    fn depth(&self) -> u32;

    /// Look up a base-scope variable (`lvar`). Absent names are a bug.
    fn resolve_local(&mut self, name: &str) -> CodegenResult<VarRef>;

    /// Assign a base-scope variable (`lasgn`), declaring it on first
    /// reference when the base scope is current.
    fn declare_local(&mut self, name: &str) -> CodegenResult<VarRef>;

    /// Base-scope variable by slot index.
    fn local_at(&mut self, index: usize) -> CodegenResult<VarRef>;

    /// Look up a block variable (`dvar`, `dasgn`): own table, then enclosing
    /// blocks, then the base scope; a miss declares a block-local.
    fn resolve(&mut self, name: &str) -> CodegenResult<VarRef>;

    /// Declare (or find) a variable in the current block (`dasgn_curr`).
    fn declare(&mut self, name: &str) -> CodegenResult<VarRef>;

    /// The current scope's whole frame, forcing it onto the heap.
    ///
    /// This and [`Scope::frame_at_depth`] hand out frames as values for
    /// plugins that build their own closures. Block closures do not go
    /// through them: their entries are written when the block scope closes,
    /// from the same capture tables, and name the same storage.
    fn request_whole_frame(&mut self) -> CodegenResult<FrameRef>;

    /// The whole frame owned at `depth`, capturing it if it is an ancestor's.
    fn frame_at_depth(&mut self, depth: u32) -> CodegenResult<FrameRef>;

    /// The closure array for a block defined in the current scope.
    fn block_closure(&mut self) -> CodegenResult<FrameRef>;

    /// The closure array, if the current scope builds one.
    fn outgoing_closure(&self) -> Option<FrameRef>;

    /// Pointer to the current frame for a wrapper struct (`None` if empty).
    fn frame_ptr(&self) -> Option<FramePtr>;

    /// Pointer to the incoming closure array (`None` in a base scope).
    fn closure_ptr(&self) -> Option<FramePtr>;

    /// Visibility for `def`s in the current scope.
    fn visibility(&self) -> Visibility;

    /// Apply `method` as a visibility marker; returns whether it was one.
    fn visibility_marker(&mut self, method: &str) -> bool;

    /// Runtime function for defining a method in the current scope.
    fn define_function(&self) -> &'static str {
        self.visibility().define_function()
    }
}

/// Stack or heap declaration of a frame with `size` slots.
pub(crate) fn frame_setup(kind: FrameKind, size: usize, on_heap: bool) -> String {
    let var = kind.var();
    match (size, on_heap) {
        (0, false) => String::new(),
        (0, true) => format!("VALUE {var}_ary = rb_ary_new();\n"),
        (_, true) => format!(
            "VALUE *{var};\n\
             VALUE {var}_ary = rb_ary_new2({size});\n\
             rb_ary_store({var}_ary, {last}, Qnil);\n\
             {var} = RARRAY_PTR({var}_ary);\n",
            last = size - 1,
        ),
        (_, false) => format!("VALUE {var}[{size}];\nrb_mem_clear({var}, {size});\n"),
    }
}

/// Declaration of the closure array handed to blocks.
pub(crate) fn closure_setup(entries: &[String]) -> String {
    let mut out = format!(
        "VALUE blk_closure = rb_ary_new3({}, self, cbase",
        CLOSURE_HEADER + entries.len()
    );
    for entry in entries {
        out.push_str(", ");
        out.push_str(entry);
    }
    out.push_str(");\n");
    out
}
