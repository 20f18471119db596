//! Built-in plugins.
//!
//! Optimizations assume core classes and methods are not redefined at run
//! time; each falls back to a normal dynamic call whenever its fast path does
//! not apply.

mod builtin_methods;
mod cache_call;
mod case_optimize;
mod const_cache;
mod direct_self_call;
mod inline_methods;
mod ivar_cache;
mod require_include;
mod warnings;

pub use builtin_methods::BuiltinMethods;
pub use cache_call::CacheCall;
pub use case_optimize::CaseOptimize;
pub use const_cache::ConstCache;
pub use direct_self_call::DirectSelfCall;
pub use inline_methods::InlineMethods;
pub use ivar_cache::IvarCache;
pub use require_include::RequireInclude;
pub use warnings::Warnings;

use rbc_ir::{Node, NodeKind};

use crate::error::{CodegenError, CodegenResult};
use crate::plugin::{GenCx, Plugin};

/// Instantiate the optimization called `name` with its option arguments.
pub fn optimization(name: &str, args: &[String]) -> CodegenResult<Box<dyn Plugin>> {
    let plugin: Box<dyn Plugin> = match name {
        "const_cache" => {
            no_args(name, args)?;
            Box::new(ConstCache)
        }
        "case_optimize" => {
            no_args(name, args)?;
            Box::new(CaseOptimize)
        }
        "inline_methods" => {
            no_args(name, args)?;
            Box::new(InlineMethods)
        }
        "builtin_methods" => Box::new(BuiltinMethods::new(args)?),
        "cache_call" => {
            no_args(name, args)?;
            Box::new(CacheCall::new())
        }
        "direct_self_call" => Box::new(DirectSelfCall::new(args)?),
        "ivar_cache" => {
            no_args(name, args)?;
            Box::new(IvarCache)
        }
        other => {
            return Err(CodegenError::user(format!("unknown optimization `{other}`")));
        }
    };
    Ok(plugin)
}

fn no_args(name: &str, args: &[String]) -> CodegenResult<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CodegenError::user(format!(
            "optimization `{name}` takes no arguments (got {})",
            args.join(", ")
        )))
    }
}

/// Compile `node` and keep its value in a fresh temporary.
fn compile_to_temp(cx: &mut dyn GenCx, node: &Node) -> CodegenResult<String> {
    let value = cx.compile(node)?;
    let tmp = cx.temp();
    cx.emit(format!("{tmp} = {value};"));
    Ok(tmp)
}

/// Store `expr` in a fresh temporary.
fn to_temp(cx: &mut dyn GenCx, expr: String) -> String {
    let tmp = cx.temp();
    cx.emit(format!("{tmp} = {expr};"));
    tmp
}

/// Method name of a call-like node.
fn call_method(node: &Node) -> Option<&str> {
    match &node.kind {
        NodeKind::Call { method, .. } | NodeKind::Fcall { method, .. } | NodeKind::Vcall { method } => {
            Some(method)
        }
        _ => None,
    }
}
