//! Plugin and preprocessor pipeline.
//!
//! A [`Plugin`] contributes global C code, `Init_` code, and preprocessors.
//! A preprocessor is registered against one [`NodeType`] and sees each node of
//! that type before normal code generation:
//!
//! - [`Rewrite::Keep`]: pass the node on unchanged
//! - [`Rewrite::Replace`]: pass a different node on
//! - [`Rewrite::Done`]: use this C expression; later preprocessors never run
//!
//! Handlers for one tag fold left to right in registration order. Plugins
//! reach the generator only through [`GenCx`]; scope state stays private to
//! the region being generated.

use std::rc::Rc;

use rbc_ir::{Node, NodeType};
use rustc_hash::FxHashMap;

use crate::error::CodegenResult;
use crate::gen::RegionKind;
use crate::options::CompileOptions;
use crate::plugins;
use crate::scope::Visibility;

/// Outcome of one preprocessor.
#[derive(Clone, Debug, PartialEq)]
pub enum Rewrite {
    Keep,
    Replace(Node),
    Done(String),
}

/// A per-node-type rewrite hook.
pub type Preprocessor = Rc<dyn Fn(&mut dyn GenCx, &Node) -> CodegenResult<Rewrite>>;

/// Generator services available to preprocessors.
///
/// Every `compile*` call may emit statements into the current function
/// before returning the C expression for the node's value.
pub trait GenCx {
    /// Compile `node`, running its preprocessors first.
    fn compile(&mut self, node: &Node) -> CodegenResult<String>;

    /// Compile `node` without running preprocessors for the node itself.
    /// Its children are still preprocessed.
    fn compile_plain(&mut self, node: &Node) -> CodegenResult<String>;

    /// Compile call arguments into a fresh array; returns `(argc, argv)`.
    fn compile_args(&mut self, args: &[Node]) -> CodegenResult<(usize, String)>;

    /// Append a statement to the current function.
    fn emit(&mut self, line: String);

    /// A fresh `VALUE` temporary in the current function.
    fn temp(&mut self) -> String;

    /// Interned `ID` variable for `name`.
    fn sym(&mut self, name: &str) -> String;

    /// Shared constant storage initialized to `init` at load time.
    fn global_const(&mut self, init: &str) -> String;

    /// Private mutable storage initialized to `init` at load time.
    fn global_var(&mut self, init: &str) -> String;

    fn unique_name(&mut self, base: &str) -> String;

    /// Add a C fragment emitted once per unit, ahead of generated functions.
    fn add_helper(&mut self, code: &str);

    /// Register a function body (see [`FunctionRegistry`](crate::FunctionRegistry)).
    fn add_fun(&mut self, body: &str, base_name: &str) -> CodegenResult<String>;

    /// Compile `node` as a separate top-level region; returns its function,
    /// callable as `f(self, cbase)`.
    fn compile_toplevel(&mut self, node: &Node, private_vmode: bool) -> CodegenResult<String>;

    /// Nesting depth of the code being generated (0 outside blocks).
    fn depth(&self) -> u32;

    fn region_kind(&self) -> RegionKind;

    /// Path of the class or module body being generated, if any.
    fn class_path(&self) -> Option<&str>;

    /// Function and visibility of a method already compiled for the current
    /// class path.
    fn method_function(&self, name: &str) -> Option<(String, Visibility)>;

    /// Source file of the tree being compiled.
    fn file_name(&self) -> &str;
}

/// Preprocessors by node type, in registration order.
#[derive(Default, Clone)]
pub struct PreprocessorSet {
    by_type: FxHashMap<NodeType, Vec<Preprocessor>>,
}

impl PreprocessorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        node_type: NodeType,
        handler: impl Fn(&mut dyn GenCx, &Node) -> CodegenResult<Rewrite> + 'static,
    ) {
        self.by_type
            .entry(node_type)
            .or_default()
            .push(Rc::new(handler));
    }

    /// Handlers for `node_type`, cloned so the caller can run them while
    /// mutating the session that owns this set.
    pub fn for_type(&self, node_type: NodeType) -> Vec<Preprocessor> {
        self.by_type.get(&node_type).cloned().unwrap_or_default()
    }

    pub fn count(&self, node_type: NodeType) -> usize {
        self.by_type.get(&node_type).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.values().all(Vec::is_empty)
    }
}

impl std::fmt::Debug for PreprocessorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<_> = self.by_type.iter().map(|(t, h)| (*t, h.len())).collect();
        counts.sort();
        f.debug_struct("PreprocessorSet")
            .field("handlers", &counts)
            .finish()
    }
}

/// Run `handlers` over `node`, left to right.
///
/// Each handler sees the node produced by the previous one. The first
/// [`Rewrite::Done`] ends the fold; otherwise the result is `Keep` when no
/// handler replaced the node and `Replace` with the last replacement if one
/// did.
pub fn fold(handlers: &[Preprocessor], cx: &mut dyn GenCx, node: &Node) -> CodegenResult<Rewrite> {
    let mut current: Option<Node> = None;
    for handler in handlers {
        match handler(cx, current.as_ref().unwrap_or(node))? {
            Rewrite::Keep => {}
            Rewrite::Replace(next) => current = Some(next),
            Rewrite::Done(code) => return Ok(Rewrite::Done(code)),
        }
    }
    Ok(current.map_or(Rewrite::Keep, Rewrite::Replace))
}

/// An optional compilation pass.
pub trait Plugin {
    /// Option name that enables the plugin.
    fn name(&self) -> &'static str;

    /// C code placed at file scope, after shared helpers.
    fn global_code(&self) -> String {
        String::new()
    }

    /// C code run in `Init_` before any top-level function.
    fn init_code(&self) -> String {
        String::new()
    }

    fn register(&self, preprocessors: &mut PreprocessorSet);
}

/// Instantiate the plugins `options` enable, in the fixed order.
///
/// Diagnostics come first so they see every node untouched; require
/// inlining comes last.
pub fn plugins_for(options: &CompileOptions) -> CodegenResult<Vec<Box<dyn Plugin>>> {
    let mut out: Vec<Box<dyn Plugin>> = Vec::new();
    if options.warnings {
        out.push(Box::new(plugins::Warnings));
    }
    for (name, args) in options.enabled_optimizations()? {
        out.push(plugins::optimization(name, &args)?);
    }
    if let Some(include) = &options.require_include {
        out.push(Box::new(plugins::RequireInclude::new(include.clone())));
    }
    tracing::debug!(
        plugins = ?out.iter().map(|p| p.name()).collect::<Vec<_>>(),
        "instantiated plugins"
    );
    Ok(out)
}
