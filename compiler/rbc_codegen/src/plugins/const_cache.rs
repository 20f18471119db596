//! Per-site constant caching.
//!
//! Each constant reference gets its own global, filled by the first lookup.
//! Reassigning the constant later is not observed.

use rbc_ir::{Node, NodeKind, NodeType};

use crate::error::CodegenResult;
use crate::plugin::{GenCx, Plugin, PreprocessorSet, Rewrite};

pub struct ConstCache;

fn cache_const(cx: &mut dyn GenCx, node: &Node) -> CodegenResult<Rewrite> {
    let NodeKind::Const { name } = &node.kind else {
        return Ok(Rewrite::Keep);
    };
    let cache = cx.global_var("Qundef");
    let sym = cx.sym(name);
    cx.emit(format!(
        "if ({cache} == Qundef) {cache} = rb_const_get(cbase, {sym});"
    ));
    Ok(Rewrite::Done(cache))
}

impl Plugin for ConstCache {
    fn name(&self) -> &'static str {
        "const_cache"
    }

    fn register(&self, preprocessors: &mut PreprocessorSet) {
        preprocessors.add(NodeType::Const, cache_const);
    }
}
