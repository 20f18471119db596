//! Inlining of `require`d files.
//!
//! `require "feature"` with a literal name is compiled into the unit when a
//! pre-parsed `feature.json` exists on one of the include paths. Every such
//! site calls one loader function per feature, which runs the feature the
//! first time it is reached and marks it as provided then, so later runtime
//! `require`s of it return false. Features not found are left to the
//! runtime.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use rbc_ir::{Node, NodeKind, NodeType, ParsedFile};

use crate::c_text::{c_string_literal, mangle};
use crate::error::{CodegenError, CodegenResult};
use crate::options;
use crate::plugin::{GenCx, Plugin, PreprocessorSet, Rewrite};

use super::to_temp;

pub struct RequireInclude {
    state: Rc<IncludeState>,
}

struct IncludeState {
    options: options::RequireInclude,
    /// Features inlined so far with their loader function, which is `None`
    /// while the feature itself is being compiled.
    included: RefCell<Vec<(String, Option<String>)>>,
}

impl RequireInclude {
    pub fn new(options: options::RequireInclude) -> Self {
        RequireInclude {
            state: Rc::new(IncludeState {
                options,
                included: RefCell::new(Vec::new()),
            }),
        }
    }
}

impl IncludeState {
    fn wants(&self, feature: &str) -> bool {
        self.options.files.is_empty() || self.options.files.iter().any(|file| file == feature)
    }

    /// `None` if `feature` was never seen, `Some(None)` while it compiles.
    fn loader(&self, feature: &str) -> Option<Option<String>> {
        self.included
            .borrow()
            .iter()
            .find(|(done, _)| done == feature)
            .map(|(_, loader)| loader.clone())
    }

    fn find(&self, feature: &str) -> Option<PathBuf> {
        self.options
            .paths
            .iter()
            .map(|dir| dir.join(format!("{feature}.json")))
            .find(|path| path.is_file())
    }
}

/// The literal feature name of `require "..."`.
///
/// Call-site caching may already have wrapped the call.
fn required_feature(node: &Node) -> Option<&str> {
    let NodeKind::Fcall { method, args } = &node.call_target().kind else {
        return None;
    };
    match (method.as_str(), args.as_slice()) {
        (
            "require",
            [Node {
                kind: NodeKind::Str { value },
                ..
            }],
        ) => Some(value.strip_suffix(".rb").unwrap_or(value)),
        _ => None,
    }
}

fn load(path: PathBuf) -> CodegenResult<ParsedFile> {
    let text = std::fs::read_to_string(&path).map_err(|source| CodegenError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CodegenError::Json { path, source })
}

/// Runs `funs` once per process, unless the runtime already loaded the
/// feature; returns whether it ran.
fn loader_body(cx: &mut dyn GenCx, feature: &str, funs: &[String]) -> String {
    let flag = cx.global_var("Qfalse");
    let provided = c_string_literal(&format!("{feature}.rb"));
    let mut body = format!(
        "static VALUE FUNNAME(void) {{\n\
         if (RTEST({flag}) || rb_provided({provided})) return Qfalse;\n\
         {flag} = Qtrue;\n\
         rb_provide({provided});\n"
    );
    for fun in funs {
        body.push_str(&format!("{fun}(ruby_top_self, rb_cObject);\n"));
    }
    body.push_str("return Qtrue;\n}");
    body
}

fn include(state: &IncludeState, cx: &mut dyn GenCx, node: &Node) -> CodegenResult<Rewrite> {
    let Some(feature) = required_feature(node) else {
        return Ok(Rewrite::Keep);
    };
    if !state.wants(feature) {
        return Ok(Rewrite::Keep);
    }
    match state.loader(feature) {
        Some(Some(loader)) => return Ok(Rewrite::Done(to_temp(cx, format!("{loader}()")))),
        // a require cycle: the feature is already running when this is reached
        Some(None) => return Ok(Rewrite::Done("Qfalse".to_string())),
        None => {}
    }
    let Some(path) = state.find(feature) else {
        tracing::debug!(feature, "feature not on include paths, left to runtime");
        return Ok(Rewrite::Keep);
    };
    tracing::debug!(feature, path = %path.display(), "inlining required feature");
    state.included.borrow_mut().push((feature.to_string(), None));
    let file = load(path)?;

    let mut funs = Vec::new();
    if let Some(begin) = &file.begin {
        for stmt in begin.statements() {
            funs.push(cx.compile_toplevel(stmt, false)?);
        }
    }
    if let Some(tree) = &file.tree {
        funs.push(cx.compile_toplevel(tree, true)?);
    }
    let body = loader_body(cx, feature, &funs);
    let loader = cx.add_fun(&body, &format!("require_{}", mangle(feature)))?;
    if let Some(entry) = state
        .included
        .borrow_mut()
        .iter_mut()
        .find(|(done, _)| done == feature)
    {
        entry.1 = Some(loader.clone());
    }
    Ok(Rewrite::Done(to_temp(cx, format!("{loader}()"))))
}

impl Plugin for RequireInclude {
    fn name(&self) -> &'static str {
        "require_include"
    }

    fn register(&self, preprocessors: &mut PreprocessorSet) {
        let state = Rc::clone(&self.state);
        preprocessors.add(NodeType::Fcall, move |cx, node| include(&state, cx, node));
    }
}
