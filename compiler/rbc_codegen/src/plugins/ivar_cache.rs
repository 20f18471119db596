//! Instance variable reads straight from the object's table.

use rbc_ir::{Node, NodeKind, NodeType};

use crate::error::CodegenResult;
use crate::plugin::{GenCx, Plugin, PreprocessorSet, Rewrite};

/// Falls back to `rb_ivar_get` for non-plain objects and for unset variables,
/// which keeps the uninitialized-variable warning.
const IVAR_GET: &str = "\
static VALUE rb2c_ivar_get(VALUE obj, ID id) {
VALUE val;
if (TYPE(obj) == T_OBJECT && ROBJECT(obj)->iv_tbl && st_lookup(ROBJECT(obj)->iv_tbl, id, (st_data_t *)&val)) return val;
return rb_ivar_get(obj, id);
}";

pub struct IvarCache;

fn read_ivar(cx: &mut dyn GenCx, node: &Node) -> CodegenResult<Rewrite> {
    let NodeKind::Ivar { name } = &node.kind else {
        return Ok(Rewrite::Keep);
    };
    cx.add_helper(IVAR_GET);
    let sym = cx.sym(name);
    let tmp = cx.temp();
    cx.emit(format!("{tmp} = rb2c_ivar_get(self, {sym});"));
    Ok(Rewrite::Done(tmp))
}

impl Plugin for IvarCache {
    fn name(&self) -> &'static str {
        "ivar_cache"
    }

    fn register(&self, preprocessors: &mut PreprocessorSet) {
        preprocessors.add(NodeType::Ivar, read_ivar);
    }
}
