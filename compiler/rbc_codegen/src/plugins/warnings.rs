//! Warnings for calls that compiled code cannot honor.
//!
//! Compiled regions keep their variables in C frames, so anything that
//! inspects or evaluates code against the caller's binding sees nothing.

use rbc_ir::{Node, NodeType};

use crate::error::CodegenResult;
use crate::plugin::{GenCx, Plugin, PreprocessorSet, Rewrite};

use super::call_method;

pub struct Warnings;

fn problem(method: &str) -> Option<&'static str> {
    match method {
        "eval" | "binding" | "local_variables" => {
            Some("cannot see local variables of compiled code")
        }
        "instance_eval" | "class_eval" | "module_eval" => {
            Some("string arguments are evaluated without access to compiled locals")
        }
        "callcc" => Some("continuations do not capture compiled C frames"),
        "set_trace_func" => Some("compiled code produces no line events"),
        _ => None,
    }
}

fn check_call(cx: &mut dyn GenCx, node: &Node) -> CodegenResult<Rewrite> {
    if let Some(method) = call_method(node) {
        if let Some(problem) = problem(method) {
            tracing::warn!(
                file = cx.file_name(),
                line = node.line,
                method,
                "{method}: {problem}"
            );
        }
    }
    Ok(Rewrite::Keep)
}

impl Plugin for Warnings {
    fn name(&self) -> &'static str {
        "warnings"
    }

    fn register(&self, preprocessors: &mut PreprocessorSet) {
        for node_type in [NodeType::Call, NodeType::Fcall, NodeType::Vcall] {
            preprocessors.add(node_type, check_call);
        }
    }
}
