//! `begin`/`ensure` and `begin`/`rescue`.
//!
//! Both clauses of each construct run as `rb_ensure`/`rb_rescue` callbacks.
//! A callback gets one pointer to a `struct rb2c_wrap` filled in by the
//! enclosing function and resolves variables through a
//! [`WrappedScope`](crate::scope::WrappedScope).

use rbc_ir::Node;

use crate::error::{CodegenError, CodegenResult};
use crate::plugin::GenCx;

use super::function::{FunKind, FunctionBuf};
use super::RegionGen;

const WRAP_STRUCT: &str = "\
struct rb2c_wrap {
VALUE self;
VALUE cbase;
VALUE *var;
VALUE *closure;
VALUE blk_closure;
};";

const ENSURE_SIGNATURE: &str = "static VALUE FUNNAME(VALUE wrap_arg)";
const RESCUE_SIGNATURE: &str = "static VALUE FUNNAME(VALUE wrap_arg, VALUE exc)";

impl RegionGen<'_> {
    pub(super) fn compile_ensure(
        &mut self,
        body: Option<&Node>,
        ensure: Option<&Node>,
    ) -> CodegenResult<String> {
        let body = self.compile_wrapped_fun(body, ENSURE_SIGNATURE, "ensure_body")?;
        let ensure = self.compile_wrapped_fun(ensure, ENSURE_SIGNATURE, "ensure")?;
        let wrap = self.init_wrap();
        Ok(self.stabilize(format!(
            "rb_ensure(RUBY_METHOD_FUNC({body}), (VALUE)&{wrap}, RUBY_METHOD_FUNC({ensure}), (VALUE)&{wrap})"
        )))
    }

    /// `rescue` without exception classes: catches `StandardError`.
    pub(super) fn compile_rescue(
        &mut self,
        body: Option<&Node>,
        rescue: Option<&Node>,
    ) -> CodegenResult<String> {
        let body = self.compile_wrapped_fun(body, ENSURE_SIGNATURE, "rescue_body")?;
        let rescue = self.compile_wrapped_fun(rescue, RESCUE_SIGNATURE, "rescue")?;
        let wrap = self.init_wrap();
        Ok(self.stabilize(format!(
            "rb_rescue(RUBY_METHOD_FUNC({body}), (VALUE)&{wrap}, RUBY_METHOD_FUNC({rescue}), (VALUE)&{wrap})"
        )))
    }

    fn compile_wrapped_fun(
        &mut self,
        body: Option<&Node>,
        signature: &str,
        base_name: &str,
    ) -> CodegenResult<String> {
        self.add_helper(WRAP_STRUCT);
        self.funs.push(FunctionBuf::new(FunKind::Wrapped));
        let result = self.compile_opt(body)?;
        let buf = self
            .funs
            .pop()
            .ok_or_else(|| CodegenError::bug("wrapped function missing"))?;
        let prologue = [
            "struct rb2c_wrap *wrap_ptr = (struct rb2c_wrap *)wrap_arg;".to_string(),
            "VALUE self = wrap_ptr->self;".to_string(),
            "VALUE cbase = wrap_ptr->cbase;".to_string(),
        ];
        let text = buf.render(signature, &prologue, "", &result);
        self.session.add_fun(&text, base_name)
    }

    /// Declare and fill a wrapper struct for callbacks compiled so far.
    fn init_wrap(&mut self) -> String {
        let wrap = self.current_mut().wrap_struct();
        let (var, closure, outgoing) = self.with_scope(|scope| {
            (
                scope.frame_ptr(),
                scope.closure_ptr(),
                scope.outgoing_closure(),
            )
        });
        let var = var.map_or_else(|| "0".to_string(), |ptr| ptr.to_string());
        let closure = closure.map_or_else(|| "0".to_string(), |ptr| ptr.to_string());
        let outgoing = outgoing.map_or_else(|| "Qnil".to_string(), |frame| frame.to_string());
        self.emit(format!("{wrap}.self = self;"));
        self.emit(format!("{wrap}.cbase = cbase;"));
        self.emit(format!("{wrap}.var = {var};"));
        self.emit(format!("{wrap}.closure = {closure};"));
        self.emit(format!("{wrap}.blk_closure = {outgoing};"));
        wrap
    }
}
