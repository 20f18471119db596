//! Per-site method caches.
//!
//! Every call site gets a static cache remembering the receiver class seen
//! last. When that class implements the method as a C function taking
//! `(argc, argv, self)`, the function is called directly until a receiver of
//! another class shows up. Singleton classes are never cached.

use std::cell::RefCell;
use std::rc::Rc;

use rbc_ir::{Node, NodeType};

use crate::error::CodegenResult;
use crate::plugin::{GenCx, Plugin, PreprocessorSet, Rewrite};

const CACHE_STRUCT: &str = "\
struct rb2c_call_cache {
VALUE klass;
NODE *node;
};";

/// Private methods are only cached for receiver-less calls.
const CACHED_CALL: &str = "\
static VALUE rb2c_cached_call(struct rb2c_call_cache *cache, VALUE recv, ID mid, int argc, VALUE *argv, int fcall) {
VALUE klass = CLASS_OF(recv);
NODE *body;
if (cache->klass != klass) {
cache->klass = klass;
cache->node = 0;
if (!FL_TEST(klass, FL_SINGLETON) && (fcall || rb_obj_respond_to(recv, mid, Qfalse))) {
body = rb_method_node(klass, mid);
if (body && nd_type(body) == NODE_CFUNC && body->nd_argc == -1) cache->node = body;
}
}
if (cache->node) return (*cache->node->nd_cfnc)(argc, argv, recv);
return fcall ? rb_funcall2(recv, mid, argc, argv) : rb_funcall3(recv, mid, argc, argv);
}";

#[derive(Default)]
pub struct CacheCall {
    sites: Rc<RefCell<Vec<String>>>,
}

impl CacheCall {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Plugin for CacheCall {
    fn name(&self) -> &'static str {
        "cache_call"
    }

    fn global_code(&self) -> String {
        let sites = self.sites.borrow();
        if sites.is_empty() {
            return String::new();
        }
        let mut out = format!("{CACHE_STRUCT}\n");
        for site in sites.iter() {
            out.push_str(&format!("static struct rb2c_call_cache {site};\n"));
        }
        out.push_str(CACHED_CALL);
        out
    }

    /// The cached class is marked so its address is not reused by a new
    /// class while the cache still holds it.
    fn init_code(&self) -> String {
        self.sites
            .borrow()
            .iter()
            .map(|site| format!("rb_gc_register_address(&{site}.klass);\n"))
            .collect()
    }

    fn register(&self, preprocessors: &mut PreprocessorSet) {
        for node_type in [NodeType::Call, NodeType::Fcall, NodeType::Vcall] {
            let sites = Rc::clone(&self.sites);
            preprocessors.add(node_type, move |cx, node| cache_site(&sites, cx, node));
        }
    }
}

fn cache_site(
    sites: &RefCell<Vec<String>>,
    cx: &mut dyn GenCx,
    node: &Node,
) -> CodegenResult<Rewrite> {
    let site = cx.unique_name("call_cache");
    sites.borrow_mut().push(site.clone());
    Ok(Rewrite::Replace(node.cached(site)))
}
