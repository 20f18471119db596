//! Region code generation.
//!
//! A region is a method body, a top-level chunk or a class/module body. Its
//! code lands in one C function, plus one extra function per block and per
//! `begin`/`ensure` or `begin`/`rescue` callback inside it.
//!
//! Every `compile_*` method returns a side-effect-free C expression for the
//! node's value, after emitting whatever statements computing it takes into
//! the current function. Results of calls always go into temporaries, so the
//! returned expression stays valid while later siblings are compiled.
//!
//! # Function shapes
//!
//! ```text
//! top-level / class body   static VALUE f(VALUE self, VALUE cbase)
//! method                   static VALUE f(int argc, VALUE *argv, VALUE self)
//! block                    static VALUE f(VALUE bl_val, VALUE closure_ary, VALUE bl_self)
//! wrapped callback         static VALUE f(VALUE wrap_arg [, VALUE exc])
//! ```

mod calls;
mod control;
mod defs;
mod expr;
mod function;
mod wrap;

use rbc_ir::{Node, NodeKind};

use crate::error::{CodegenError, CodegenResult};
use crate::plugin::{fold, GenCx, Rewrite};
use crate::scope::{BaseScope, Scope, ScopeChain, Visibility, WrappedScope};
use crate::session::Session;
use crate::stack::ensure_sufficient_stack;

pub(crate) use expr::fits_fixnum;
use function::{FunKind, FunctionBuf};

/// What kind of region is being generated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RegionKind {
    Toplevel,
    ClassBody,
    Method,
    /// `def recv.name`: `self` is the receiver, never an instance of the
    /// enclosing class.
    SingletonMethod,
}

impl RegionKind {
    /// Whether the region is a method body, where `yield` and `return` work.
    pub fn is_method(self) -> bool {
        matches!(self, RegionKind::Method | RegionKind::SingletonMethod)
    }
}

/// Generator for one region.
pub(crate) struct RegionGen<'s> {
    session: &'s mut Session,
    scope: ScopeChain,
    kind: RegionKind,
    class_path: Option<String>,
    /// Function being generated (last) and the ones it is nested in.
    funs: Vec<FunctionBuf>,
}

impl<'s> RegionGen<'s> {
    fn new(
        session: &'s mut Session,
        base: BaseScope,
        kind: RegionKind,
        class_path: Option<String>,
    ) -> Self {
        RegionGen {
            session,
            scope: ScopeChain::new(base),
            kind,
            class_path,
            funs: vec![FunctionBuf::new(FunKind::Region)],
        }
    }

    /// Compile a top-level chunk; returns its function, called as
    /// `f(self, cbase)`.
    #[tracing::instrument(level = "debug", skip_all, fields(line = node.line))]
    pub(crate) fn toplevel(
        session: &'s mut Session,
        node: &Node,
        private_vmode: bool,
    ) -> CodegenResult<String> {
        let mut base = BaseScope::new();
        if private_vmode {
            base.visibility_marker("private");
        }
        let mut gen = RegionGen::new(session, base, RegionKind::Toplevel, None);
        let result = gen.compile(node)?;
        gen.finish_region("static VALUE FUNNAME(VALUE self, VALUE cbase)", &[], &result, "toplevel")
    }

    /// Compile a class or module body; called as `f(klass, klass)`.
    #[tracing::instrument(level = "debug", skip(session, body))]
    pub(crate) fn class_body(
        session: &'s mut Session,
        class_path: &str,
        body: Option<&Node>,
    ) -> CodegenResult<String> {
        let mut gen = RegionGen::new(
            session,
            BaseScope::new(),
            RegionKind::ClassBody,
            Some(class_path.to_string()),
        );
        let result = gen.compile_opt(body)?;
        gen.finish_region(
            "static VALUE FUNNAME(VALUE self, VALUE cbase)",
            &[],
            &result,
            &format!("class_{class_path}"),
        )
    }

    /// Compile a method body taking exactly `params.len()` arguments.
    ///
    /// `cbase_var` holds the lexical class at the definition site.
    #[tracing::instrument(level = "debug", skip(session, params, body, cbase_var))]
    pub(crate) fn method(
        session: &'s mut Session,
        class_path: Option<&str>,
        name: &str,
        params: &[String],
        body: Option<&Node>,
        cbase_var: &str,
    ) -> CodegenResult<String> {
        let gen = RegionGen::new(
            session,
            BaseScope::with_params(params.iter().map(String::as_str)),
            RegionKind::Method,
            class_path.map(str::to_string),
        );
        gen.method_body(name, params, body, cbase_var)
    }

    /// Compile the body of `def recv.name`, called like [`Self::method`].
    #[tracing::instrument(level = "debug", skip(session, params, body, cbase_var))]
    pub(crate) fn singleton_method(
        session: &'s mut Session,
        name: &str,
        params: &[String],
        body: Option<&Node>,
        cbase_var: &str,
    ) -> CodegenResult<String> {
        let gen = RegionGen::new(
            session,
            BaseScope::with_params(params.iter().map(String::as_str)),
            RegionKind::SingletonMethod,
            None,
        );
        gen.method_body(name, params, body, cbase_var)
    }

    fn method_body(
        mut self,
        name: &str,
        params: &[String],
        body: Option<&Node>,
        cbase_var: &str,
    ) -> CodegenResult<String> {
        let arity = params.len();
        self.emit(format!(
            "if (argc != {arity}) rb_raise(rb_eArgError, \"wrong number of arguments (%d for {arity})\", argc);"
        ));
        for index in 0..arity {
            let slot = self.scope.local_at(index)?;
            self.emit(format!("{slot} = argv[{index}];"));
        }
        let result = self.compile_opt(body)?;
        self.finish_region(
            "static VALUE FUNNAME(int argc, VALUE *argv, VALUE self)",
            &[format!("VALUE cbase = {cbase_var};")],
            &result,
            &format!("method_{name}"),
        )
    }

    fn finish_region(
        mut self,
        signature: &str,
        prologue: &[String],
        result: &str,
        base_name: &str,
    ) -> CodegenResult<String> {
        let buf = self
            .funs
            .pop()
            .ok_or_else(|| CodegenError::bug("region function missing"))?;
        if !self.funs.is_empty() {
            return Err(CodegenError::bug("region finished inside a nested function"));
        }
        let (_, setup) = self.scope.finish()?;
        let body = buf.render(signature, prologue, &setup, result);
        self.session.add_fun(&body, base_name)
    }

    // Function stack

    fn current(&self) -> &FunctionBuf {
        // the region function is pushed at construction and popped only by
        // `finish_region`, which consumes the generator
        &self.funs[self.funs.len() - 1]
    }

    fn current_mut(&mut self) -> &mut FunctionBuf {
        let last = self.funs.len() - 1;
        &mut self.funs[last]
    }

    /// Run `f` against the scope as seen from the current function.
    fn with_scope<R>(&mut self, f: impl FnOnce(&mut dyn Scope) -> R) -> R {
        if self.current().kind.is_wrapped() {
            f(&mut WrappedScope::new(&mut self.scope))
        } else {
            f(&mut self.scope)
        }
    }

    // Dispatch

    fn compile_opt(&mut self, node: Option<&Node>) -> CodegenResult<String> {
        match node {
            Some(node) => self.compile(node),
            None => Ok("Qnil".to_string()),
        }
    }

    fn compile_node(&mut self, node: &Node) -> CodegenResult<String> {
        let line = node.line;
        match &node.kind {
            NodeKind::Block { stmts } => self.compile_block(stmts),

            NodeKind::Nil => Ok("Qnil".to_string()),
            NodeKind::True => Ok("Qtrue".to_string()),
            NodeKind::False => Ok("Qfalse".to_string()),
            NodeKind::SelfRef => Ok("self".to_string()),
            NodeKind::Lit { lit } => Ok(self.compile_lit(lit)),
            NodeKind::Str { value } => Ok(Self::compile_str(value)),
            NodeKind::Dstr { parts } => self.compile_dstr(parts),
            NodeKind::Array { elems } => self.compile_array(elems),
            NodeKind::Hash { pairs } => self.compile_hash(pairs),

            NodeKind::Lvar { name } => self.compile_lvar(name),
            NodeKind::Lasgn { name, value } => self.compile_lasgn(name, value),
            NodeKind::Dvar { name } => self.compile_dvar(name),
            NodeKind::Dasgn { name, value } => self.compile_dasgn(name, value),
            NodeKind::DasgnCurr { name, value } => self.compile_dasgn_curr(name, value.as_deref()),
            NodeKind::Gvar { name } => Ok(Self::compile_gvar(name)),
            NodeKind::Gasgn { name, value } => self.compile_gasgn(name, value),
            NodeKind::Ivar { name } => Ok(self.compile_ivar(name)),
            NodeKind::Iasgn { name, value } => self.compile_iasgn(name, value),
            NodeKind::Const { name } => Ok(self.compile_const(name)),
            NodeKind::Colon2 { scope, name } => self.compile_colon2(scope, name),
            NodeKind::Colon3 { name } => Ok(self.compile_colon3(name)),
            NodeKind::Cdecl { name, value } => self.compile_cdecl(name, value),

            NodeKind::Call { recv, method, args } => self.compile_call(recv, method, args),
            NodeKind::Fcall { method, args } => self.compile_fcall(method, args),
            NodeKind::Vcall { method } => self.compile_fcall(method, &[]),
            NodeKind::CachedCall { site, call } => self.compile_cached_call(site, call),
            NodeKind::Iter { call, params, body } => {
                self.compile_iter(call, params, body.as_deref())
            }
            NodeKind::Yield { args } => self.compile_yield(args, line),

            NodeKind::If { cond, then, else_body } => {
                self.compile_if(cond, then.as_deref(), else_body.as_deref())
            }
            NodeKind::While { cond, body, do_while } => {
                self.compile_loop(cond, body.as_deref(), *do_while, false)
            }
            NodeKind::Until { cond, body, do_while } => {
                self.compile_loop(cond, body.as_deref(), *do_while, true)
            }
            NodeKind::And { left, right } => self.compile_and_or(left, right, true),
            NodeKind::Or { left, right } => self.compile_and_or(left, right, false),
            NodeKind::Not { value } => self.compile_not(value),
            NodeKind::Case { subject, whens, else_body } => {
                self.compile_case(subject, whens, else_body.as_deref())
            }
            NodeKind::Return { value } => self.compile_return(value.as_deref(), line),
            NodeKind::Break { value } => self.compile_break(value.as_deref(), line),
            NodeKind::Next { value } => self.compile_next(value.as_deref(), line),
            NodeKind::Ensure { body, ensure } => {
                self.compile_ensure(body.as_deref(), ensure.as_deref())
            }
            NodeKind::Rescue { body, rescue } => {
                self.compile_rescue(body.as_deref(), rescue.as_deref())
            }

            NodeKind::Defn { name, args, body } => self.compile_defn(name, args, body.as_deref()),
            NodeKind::Defs { recv, name, args, body } => {
                self.compile_defs(recv, name, args, body.as_deref())
            }
            NodeKind::Class { cpath, superclass, body } => {
                self.compile_class(cpath, superclass.as_deref(), body.as_deref())
            }
            NodeKind::Module { cpath, body } => self.compile_module(cpath, body.as_deref()),
        }
    }

    fn compile_block(&mut self, stmts: &[Node]) -> CodegenResult<String> {
        let mut result = "Qnil".to_string();
        for stmt in stmts {
            result = self.compile(stmt)?;
        }
        Ok(result)
    }

    /// Store `expr` in a temporary unless it is a constant.
    fn stabilize(&mut self, expr: String) -> String {
        if is_constant(&expr) {
            return expr;
        }
        let tmp = self.temp();
        self.emit(format!("{tmp} = {expr};"));
        tmp
    }
}

/// Expressions whose value cannot change while later code runs.
fn is_constant(expr: &str) -> bool {
    matches!(expr, "Qnil" | "Qtrue" | "Qfalse" | "self" | "cbase")
        || expr.starts_with("LONG2FIX(")
        || expr.starts_with("ID2SYM(")
}

impl GenCx for RegionGen<'_> {
    fn compile(&mut self, node: &Node) -> CodegenResult<String> {
        ensure_sufficient_stack(|| {
            let handlers = self.session.preprocessors().for_type(node.node_type());
            if handlers.is_empty() {
                return self.compile_node(node);
            }
            match fold(&handlers, self, node)? {
                Rewrite::Keep => self.compile_node(node),
                Rewrite::Replace(replacement) => {
                    tracing::trace!(
                        from = %node.node_type(),
                        to = %replacement.node_type(),
                        "node replaced"
                    );
                    self.compile_node(&replacement)
                }
                Rewrite::Done(code) => Ok(code),
            }
        })
    }

    fn compile_plain(&mut self, node: &Node) -> CodegenResult<String> {
        ensure_sufficient_stack(|| self.compile_node(node))
    }

    fn compile_args(&mut self, args: &[Node]) -> CodegenResult<(usize, String)> {
        if args.is_empty() {
            return Ok((0, "0".to_string()));
        }
        let argv = self.current_mut().array(args.len());
        for (index, arg) in args.iter().enumerate() {
            let value = self.compile(arg)?;
            self.emit(format!("{argv}[{index}] = {value};"));
        }
        Ok((args.len(), argv))
    }

    fn emit(&mut self, line: String) {
        self.current_mut().lines.push(line);
    }

    fn temp(&mut self) -> String {
        self.current_mut().temp()
    }

    fn sym(&mut self, name: &str) -> String {
        self.session.sym(name)
    }

    fn global_const(&mut self, init: &str) -> String {
        self.session.global_const(init)
    }

    fn global_var(&mut self, init: &str) -> String {
        self.session.global_var(init)
    }

    fn unique_name(&mut self, base: &str) -> String {
        self.session.unique_name(base)
    }

    fn add_helper(&mut self, code: &str) {
        self.session.add_helper(code);
    }

    fn add_fun(&mut self, body: &str, base_name: &str) -> CodegenResult<String> {
        self.session.add_fun(body, base_name)
    }

    fn compile_toplevel(&mut self, node: &Node, private_vmode: bool) -> CodegenResult<String> {
        RegionGen::toplevel(self.session, node, private_vmode)
    }

    fn depth(&self) -> u32 {
        self.scope.depth()
    }

    fn region_kind(&self) -> RegionKind {
        self.kind
    }

    fn class_path(&self) -> Option<&str> {
        self.class_path.as_deref()
    }

    fn method_function(&self, name: &str) -> Option<(String, Visibility)> {
        self.session.method_function(self.class_path.as_deref(), name)
    }

    fn file_name(&self) -> &str {
        self.session.file_name()
    }
}

#[cfg(test)]
mod tests;
