//! Method calls, blocks and `yield`.

use rbc_ir::{Node, NodeKind};

use crate::error::{CodegenError, CodegenResult};
use crate::plugin::GenCx;

use super::function::{FunKind, FunctionBuf};
use super::RegionGen;

/// Receiver, method and arguments of a call-like node.
struct CallParts<'n> {
    /// `None` for receiver-less calls on `self`.
    recv: Option<&'n Node>,
    method: &'n str,
    args: &'n [Node],
}

impl<'n> CallParts<'n> {
    fn of(node: &'n Node) -> CodegenResult<Self> {
        match &node.kind {
            NodeKind::Call { recv, method, args } => Ok(CallParts {
                recv: Some(recv),
                method,
                args,
            }),
            NodeKind::Fcall { method, args } => Ok(CallParts {
                recv: None,
                method,
                args,
            }),
            NodeKind::Vcall { method } => Ok(CallParts {
                recv: None,
                method,
                args: &[],
            }),
            other => Err(CodegenError::user_at(
                format!("unsupported call node `{}`", other.node_type()),
                node.line,
            )),
        }
    }
}

impl RegionGen<'_> {
    /// Receiver expression, kept stable across argument evaluation.
    fn compile_recv(&mut self, recv: Option<&Node>) -> CodegenResult<String> {
        match recv {
            Some(recv) => {
                let value = self.compile(recv)?;
                Ok(self.stabilize(value))
            }
            None => Ok("self".to_string()),
        }
    }

    pub(super) fn compile_call(
        &mut self,
        recv: &Node,
        method: &str,
        args: &[Node],
    ) -> CodegenResult<String> {
        let recv = self.compile_recv(Some(recv))?;
        let (argc, argv) = self.compile_args(args)?;
        let sym = self.sym(method);
        Ok(self.stabilize(format!("rb_funcall3({recv}, {sym}, {argc}, {argv})")))
    }

    /// Receiver-less call. A bare visibility marker switches the visibility
    /// of later `def`s and emits nothing.
    pub(super) fn compile_fcall(&mut self, method: &str, args: &[Node]) -> CodegenResult<String> {
        if args.is_empty() && self.with_scope(|scope| scope.visibility_marker(method)) {
            tracing::trace!(method, "visibility marker");
            return Ok("Qnil".to_string());
        }
        let (argc, argv) = self.compile_args(args)?;
        let sym = self.sym(method);
        Ok(self.stabilize(format!("rb_funcall2(self, {sym}, {argc}, {argv})")))
    }

    /// Call dispatched through the per-site cache `site`.
    pub(super) fn compile_cached_call(&mut self, site: &str, call: &Node) -> CodegenResult<String> {
        let parts = CallParts::of(call)?;
        if parts.recv.is_none()
            && parts.args.is_empty()
            && self.with_scope(|scope| scope.visibility_marker(parts.method))
        {
            return Ok("Qnil".to_string());
        }
        let fcall = i32::from(parts.recv.is_none());
        let recv = self.compile_recv(parts.recv)?;
        let (argc, argv) = self.compile_args(parts.args)?;
        let sym = self.sym(parts.method);
        Ok(self.stabilize(format!(
            "rb2c_cached_call(&{site}, {recv}, {sym}, {argc}, {argv}, {fcall})"
        )))
    }

    /// A call with a literal block: the body becomes its own C function
    /// receiving the closure array of the current scope.
    pub(super) fn compile_iter(
        &mut self,
        call: &Node,
        params: &[String],
        body: Option<&Node>,
    ) -> CodegenResult<String> {
        let parts = CallParts::of(call.call_target())?;
        let recv = self.compile_recv(parts.recv)?;
        let (argc, argv) = self.compile_args(parts.args)?;
        let sym = self.sym(parts.method);

        let closure = self.with_scope(|scope| scope.block_closure())?;
        let block = self.compile_block_fun(params, body)?;
        Ok(self.stabilize(format!(
            "rb_block_call({recv}, {sym}, {argc}, {argv}, RUBY_METHOD_FUNC({block}), {closure})"
        )))
    }

    fn compile_block_fun(&mut self, params: &[String], body: Option<&Node>) -> CodegenResult<String> {
        let depth = self.scope.enter_block();
        self.funs.push(FunctionBuf::new(FunKind::Block));
        let result = self.compile_block_body(params, body)?;
        let (_, setup) = self.scope.leave_block()?;
        let buf = self
            .funs
            .pop()
            .ok_or_else(|| CodegenError::bug("block function missing"))?;
        tracing::trace!(depth, "compiled block");

        let prologue = [
            "VALUE *closure = RARRAY_PTR(closure_ary);".to_string(),
            "VALUE self = closure[0];".to_string(),
            "VALUE cbase = closure[1];".to_string(),
        ];
        let text = buf.render(
            "static VALUE FUNNAME(VALUE bl_val, VALUE closure_ary, VALUE bl_self)",
            &prologue,
            &setup,
            &result,
        );
        self.session.add_fun(&text, "block")
    }

    fn compile_block_body(&mut self, params: &[String], body: Option<&Node>) -> CodegenResult<String> {
        match params {
            [] => {}
            [param] => {
                let var = self.scope_declare(param)?;
                self.emit(format!("{var} = bl_val;"));
            }
            _ => {
                let args = self.temp();
                self.emit(format!("{args} = rb_check_array_type(bl_val);"));
                self.emit(format!("if (NIL_P({args})) {args} = rb_ary_new3(1, bl_val);"));
                for (index, param) in params.iter().enumerate() {
                    let var = self.scope_declare(param)?;
                    self.emit(format!("{var} = rb_ary_entry({args}, {index});"));
                }
            }
        }
        self.compile_opt(body)
    }

    fn scope_declare(&mut self, name: &str) -> CodegenResult<String> {
        Ok(self.with_scope(|scope| scope.declare(name))?.to_string())
    }

    pub(super) fn compile_yield(&mut self, args: &[Node], line: u32) -> CodegenResult<String> {
        if !self.kind.is_method() {
            return Err(CodegenError::user_at("yield outside of a method", line));
        }
        if self.depth() > 0 {
            return Err(CodegenError::user_at("yield inside a block is not supported", line));
        }
        let call = match args {
            [] => "rb_yield(Qundef)".to_string(),
            [arg] => {
                let value = self.compile(arg)?;
                format!("rb_yield({value})")
            }
            _ => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    let value = self.compile(arg)?;
                    values.push(self.stabilize(value));
                }
                format!("rb_yield_values({}, {})", values.len(), values.join(", "))
            }
        };
        Ok(self.stabilize(call))
    }
}
