//! Direct calls to methods compiled in the same class body.
//!
//! A receiver-less call to a method defined earlier in the same class (or at
//! top level) calls the method's C function instead of dispatching. Only
//! private methods qualify unless `allow_public` is given: a public method may
//! be overridden in a subclass, and then `self` would need dynamic dispatch.

use rbc_ir::{Node, NodeKind, NodeType};

use crate::error::{CodegenError, CodegenResult};
use crate::gen::RegionKind;
use crate::plugin::{GenCx, Plugin, PreprocessorSet, Rewrite};
use crate::scope::Visibility;

use super::to_temp;

#[derive(Debug, Default)]
pub struct DirectSelfCall {
    allow_public: bool,
}

impl DirectSelfCall {
    pub fn new(args: &[String]) -> CodegenResult<Self> {
        let mut plugin = DirectSelfCall::default();
        for arg in args {
            match arg.as_str() {
                "allow_public" => plugin.allow_public = true,
                other => {
                    return Err(CodegenError::user(format!(
                        "direct_self_call: unknown argument `{other}` (expected allow_public)"
                    )))
                }
            }
        }
        Ok(plugin)
    }

    pub fn allow_public(&self) -> bool {
        self.allow_public
    }
}

fn direct_call(allow_public: bool, cx: &mut dyn GenCx, node: &Node) -> CodegenResult<Rewrite> {
    let (method, args) = match &node.call_target().kind {
        NodeKind::Fcall { method, args } => (method, args.as_slice()),
        NodeKind::Vcall { method } => (method, &[][..]),
        _ => return Ok(Rewrite::Keep),
    };
    // `self` is an instance of the class only inside its instance methods;
    // top-level code runs with `self` being main, an Object
    let self_matches = match cx.region_kind() {
        RegionKind::Method => true,
        RegionKind::Toplevel => cx.class_path().is_none(),
        RegionKind::ClassBody | RegionKind::SingletonMethod => false,
    };
    if !self_matches {
        return Ok(Rewrite::Keep);
    }
    let Some((fun, visibility)) = cx.method_function(method) else {
        return Ok(Rewrite::Keep);
    };
    let private = matches!(visibility, Visibility::Private | Visibility::ModuleFunction);
    if !private && !allow_public {
        return Ok(Rewrite::Keep);
    }
    tracing::trace!(method = %method, %fun, "direct self call");
    let (argc, argv) = cx.compile_args(args)?;
    Ok(Rewrite::Done(to_temp(cx, format!("{fun}({argc}, {argv}, self)"))))
}

impl Plugin for DirectSelfCall {
    fn name(&self) -> &'static str {
        "direct_self_call"
    }

    fn register(&self, preprocessors: &mut PreprocessorSet) {
        let allow_public = self.allow_public;
        for node_type in [NodeType::Fcall, NodeType::Vcall] {
            preprocessors.add(node_type, move |cx, node| direct_call(allow_public, cx, node));
        }
    }
}
