//! Inline expansion of a few Object methods.

use rbc_ir::{Node, NodeKind, NodeType};

use crate::error::CodegenResult;
use crate::plugin::{GenCx, Plugin, PreprocessorSet, Rewrite};

use super::{compile_to_temp, to_temp};

pub struct InlineMethods;

fn inline_call(cx: &mut dyn GenCx, node: &Node) -> CodegenResult<Rewrite> {
    let NodeKind::Call { recv, method, args } = &node.kind else {
        return Ok(Rewrite::Keep);
    };
    match (method.as_str(), args.as_slice()) {
        ("nil?", []) => {
            let recv = cx.compile(recv)?;
            Ok(Rewrite::Done(to_temp(
                cx,
                format!("(NIL_P({recv}) ? Qtrue : Qfalse)"),
            )))
        }
        ("equal?", [other]) => {
            let recv = compile_to_temp(cx, recv)?;
            let other = cx.compile(other)?;
            Ok(Rewrite::Done(to_temp(
                cx,
                format!("({recv} == {other} ? Qtrue : Qfalse)"),
            )))
        }
        _ => Ok(Rewrite::Keep),
    }
}

/// `block_given?` asks about the method's own block, so only a method body
/// outside any block can answer it directly.
fn inline_self_call(cx: &mut dyn GenCx, node: &Node) -> CodegenResult<Rewrite> {
    let is_block_given = match &node.kind {
        NodeKind::Vcall { method } => method == "block_given?",
        NodeKind::Fcall { method, args } => method == "block_given?" && args.is_empty(),
        _ => false,
    };
    if is_block_given && cx.region_kind().is_method() && cx.depth() == 0 {
        return Ok(Rewrite::Done(
            "(rb_block_given_p() ? Qtrue : Qfalse)".to_string(),
        ));
    }
    Ok(Rewrite::Keep)
}

impl Plugin for InlineMethods {
    fn name(&self) -> &'static str {
        "inline_methods"
    }

    fn register(&self, preprocessors: &mut PreprocessorSet) {
        preprocessors.add(NodeType::Call, inline_call);
        preprocessors.add(NodeType::Fcall, inline_self_call);
        preprocessors.add(NodeType::Vcall, inline_self_call);
    }
}
