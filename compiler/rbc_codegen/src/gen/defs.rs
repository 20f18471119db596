//! Method, class and module definitions.

use rbc_ir::{Cpath, Node, NodeKind};

use crate::c_text::c_string_literal;
use crate::error::CodegenResult;
use crate::plugin::GenCx;

use super::RegionGen;

/// Reopens `outer::id` or defines it as a new class.
const DEFINE_CLASS: &str = "\
static VALUE rb2c_define_class(VALUE outer, ID id, VALUE super, int has_super) {
VALUE klass;
if (rb_const_defined_at(outer, id)) {
klass = rb_const_get_at(outer, id);
if (TYPE(klass) != T_CLASS) rb_raise(rb_eTypeError, \"%s is not a class\", rb_id2name(id));
if (has_super && rb_class_real(RCLASS(klass)->super) != super) rb_raise(rb_eTypeError, \"superclass mismatch for class %s\", rb_id2name(id));
return klass;
}
if (!has_super) super = rb_cObject;
klass = rb_define_class_id(id, super);
rb_set_class_path(klass, outer, rb_id2name(id));
rb_const_set(outer, id, klass);
rb_class_inherited(super, klass);
return klass;
}";

/// Reopens `outer::id` or defines it as a new module.
const DEFINE_MODULE: &str = "\
static VALUE rb2c_define_module(VALUE outer, ID id) {
VALUE mod;
if (rb_const_defined_at(outer, id)) {
mod = rb_const_get_at(outer, id);
if (TYPE(mod) != T_MODULE) rb_raise(rb_eTypeError, \"%s is not a module\", rb_id2name(id));
return mod;
}
mod = rb_define_module_id(id);
rb_set_class_path(mod, outer, rb_id2name(id));
rb_const_set(outer, id, mod);
return mod;
}";

impl RegionGen<'_> {
    /// `def name`: compiles the body as a method region and defines it on
    /// `cbase` with the current visibility.
    pub(super) fn compile_defn(
        &mut self,
        name: &str,
        params: &[String],
        body: Option<&Node>,
    ) -> CodegenResult<String> {
        let cbase_var = self.global_var("Qnil");
        let visibility = self.with_scope(|scope| scope.visibility());
        let class_path = self.class_path.clone();
        let fun = RegionGen::method(
            self.session,
            class_path.as_deref(),
            name,
            params,
            body,
            &cbase_var,
        )?;
        self.session
            .record_method(class_path.as_deref(), name, &fun, visibility);

        self.emit(format!("{cbase_var} = cbase;"));
        self.emit(format!(
            "{}(cbase, {}, RUBY_METHOD_FUNC({fun}), -1);",
            visibility.define_function(),
            c_string_literal(name)
        ));
        Ok("Qnil".to_string())
    }

    /// `def recv.name`.
    pub(super) fn compile_defs(
        &mut self,
        recv: &Node,
        name: &str,
        params: &[String],
        body: Option<&Node>,
    ) -> CodegenResult<String> {
        let recv = self.compile(recv)?;
        let recv = self.stabilize(recv);
        let cbase_var = self.global_var("Qnil");
        let fun = RegionGen::singleton_method(self.session, name, params, body, &cbase_var)?;
        self.emit(format!("{cbase_var} = cbase;"));
        self.emit(format!(
            "rb_define_singleton_method({recv}, {}, RUBY_METHOD_FUNC({fun}), -1);",
            c_string_literal(name)
        ));
        Ok("Qnil".to_string())
    }

    pub(super) fn compile_class(
        &mut self,
        cpath: &Cpath,
        superclass: Option<&Node>,
        body: Option<&Node>,
    ) -> CodegenResult<String> {
        let outer = self.compile_outer(cpath)?;
        let (superclass, has_super) = match superclass {
            Some(node) => {
                let value = self.compile(node)?;
                (self.stabilize(value), 1)
            }
            None => ("Qnil".to_string(), 0),
        };
        self.add_helper(DEFINE_CLASS);
        let sym = self.sym(&cpath.name);
        let klass = self.temp();
        self.emit(format!(
            "{klass} = rb2c_define_class({outer}, {sym}, {superclass}, {has_super});"
        ));
        self.compile_class_body(cpath, &klass, body)
    }

    pub(super) fn compile_module(&mut self, cpath: &Cpath, body: Option<&Node>) -> CodegenResult<String> {
        let outer = self.compile_outer(cpath)?;
        self.add_helper(DEFINE_MODULE);
        let sym = self.sym(&cpath.name);
        let module = self.temp();
        self.emit(format!("{module} = rb2c_define_module({outer}, {sym});"));
        self.compile_class_body(cpath, &module, body)
    }

    fn compile_outer(&mut self, cpath: &Cpath) -> CodegenResult<String> {
        match &cpath.scope {
            Some(scope) => {
                let value = self.compile(scope)?;
                Ok(self.stabilize(value))
            }
            None => Ok("cbase".to_string()),
        }
    }

    fn compile_class_body(
        &mut self,
        cpath: &Cpath,
        klass: &str,
        body: Option<&Node>,
    ) -> CodegenResult<String> {
        let path = self.nested_path(cpath);
        let fun = RegionGen::class_body(self.session, &path, body)?;
        Ok(self.stabilize(format!("{fun}({klass}, {klass})")))
    }

    /// Display path of the class being defined, used to match self calls
    /// against methods defined in the same body.
    fn nested_path(&self, cpath: &Cpath) -> String {
        let prefix = match cpath.scope.as_deref().map(|node| &node.kind) {
            Some(NodeKind::Const { name }) => Some(name.as_str()),
            Some(_) => None,
            None => self.class_path.as_deref(),
        };
        match prefix {
            Some(prefix) => format!("{prefix}::{}", cpath.name),
            None => cpath.name.clone(),
        }
    }
}
