//! Literals, variables and constants.

use rbc_ir::{Literal, Node};

use crate::c_text::c_string_literal;
use crate::error::CodegenResult;
use crate::plugin::GenCx;

use super::RegionGen;

/// Fixnum range on a host with 32-bit `long`; wider values are built at
/// load time so they never wrap.
const FIXNUM_MIN: i64 = -(1 << 30);
const FIXNUM_MAX: i64 = (1 << 30) - 1;

/// Whether `value` is a Fixnum on every host.
pub(crate) fn fits_fixnum(value: i64) -> bool {
    (FIXNUM_MIN..=FIXNUM_MAX).contains(&value)
}

impl RegionGen<'_> {
    pub(super) fn compile_lit(&mut self, lit: &Literal) -> String {
        match lit {
            Literal::Int(value) if fits_fixnum(*value) => format!("LONG2FIX({value})"),
            Literal::Int(value) => {
                self.global_const(&format!("rb_cstr2inum({}, 10)", c_string_literal(&value.to_string())))
            }
            Literal::Bignum(digits) => {
                self.global_const(&format!("rb_cstr2inum({}, 10)", c_string_literal(digits)))
            }
            Literal::Float(value) => {
                let value = if value.is_nan() {
                    "(0.0 / 0.0)".to_string()
                } else if value.is_infinite() {
                    let sign = if *value < 0.0 { "-" } else { "" };
                    format!("({sign}1.0 / 0.0)")
                } else {
                    format!("{value:?}")
                };
                self.global_const(&format!("rb_float_new({value})"))
            }
            Literal::Sym(name) => format!("ID2SYM({})", self.sym(name)),
        }
    }

    pub(super) fn compile_str(value: &str) -> String {
        format!("rb_str_new({}, {})", c_string_literal(value), value.len())
    }

    pub(super) fn compile_dstr(&mut self, parts: &[Node]) -> CodegenResult<String> {
        let out = self.temp();
        self.emit(format!("{out} = rb_str_new(0, 0);"));
        for part in parts {
            let value = self.compile(part)?;
            self.emit(format!("rb_str_append({out}, rb_obj_as_string({value}));"));
        }
        Ok(out)
    }

    pub(super) fn compile_array(&mut self, elems: &[Node]) -> CodegenResult<String> {
        if elems.is_empty() {
            return Ok(self.stabilize("rb_ary_new()".to_string()));
        }
        let (argc, argv) = self.compile_args(elems)?;
        Ok(self.stabilize(format!("rb_ary_new4({argc}, {argv})")))
    }

    pub(super) fn compile_hash(&mut self, pairs: &[(Node, Node)]) -> CodegenResult<String> {
        let out = self.temp();
        self.emit(format!("{out} = rb_hash_new();"));
        for (key, value) in pairs {
            let key = self.compile(key)?;
            let key = self.stabilize(key);
            let value = self.compile(value)?;
            self.emit(format!("rb_hash_aset({out}, {key}, {value});"));
        }
        Ok(out)
    }

    // Variables

    pub(super) fn compile_lvar(&mut self, name: &str) -> CodegenResult<String> {
        let var = self.with_scope(|scope| scope.resolve_local(name))?;
        Ok(var.to_string())
    }

    pub(super) fn compile_lasgn(&mut self, name: &str, value: &Node) -> CodegenResult<String> {
        let var = self.with_scope(|scope| scope.declare_local(name))?;
        let value = self.compile(value)?;
        self.emit(format!("{var} = {value};"));
        Ok(var.to_string())
    }

    pub(super) fn compile_dvar(&mut self, name: &str) -> CodegenResult<String> {
        let var = self.with_scope(|scope| scope.resolve(name))?;
        Ok(var.to_string())
    }

    pub(super) fn compile_dasgn(&mut self, name: &str, value: &Node) -> CodegenResult<String> {
        let var = self.with_scope(|scope| scope.resolve(name))?;
        let value = self.compile(value)?;
        self.emit(format!("{var} = {value};"));
        Ok(var.to_string())
    }

    pub(super) fn compile_dasgn_curr(
        &mut self,
        name: &str,
        value: Option<&Node>,
    ) -> CodegenResult<String> {
        let var = self.with_scope(|scope| scope.declare(name))?;
        match value {
            Some(value) => {
                let value = self.compile(value)?;
                self.emit(format!("{var} = {value};"));
                Ok(var.to_string())
            }
            None => Ok("Qnil".to_string()),
        }
    }

    pub(super) fn compile_gvar(name: &str) -> String {
        format!("rb_gv_get({})", c_string_literal(name))
    }

    pub(super) fn compile_gasgn(&mut self, name: &str, value: &Node) -> CodegenResult<String> {
        let value = self.compile(value)?;
        Ok(self.stabilize(format!("rb_gv_set({}, {value})", c_string_literal(name))))
    }

    pub(super) fn compile_ivar(&mut self, name: &str) -> String {
        let sym = self.sym(name);
        let value = format!("rb_ivar_get(self, {sym})");
        self.stabilize(value)
    }

    pub(super) fn compile_iasgn(&mut self, name: &str, value: &Node) -> CodegenResult<String> {
        let value = self.compile(value)?;
        let value = self.stabilize(value);
        let sym = self.sym(name);
        self.emit(format!("rb_ivar_set(self, {sym}, {value});"));
        Ok(value)
    }

    // Constants

    pub(super) fn compile_const(&mut self, name: &str) -> String {
        let sym = self.sym(name);
        self.stabilize(format!("rb_const_get(cbase, {sym})"))
    }

    pub(super) fn compile_colon2(&mut self, scope: &Node, name: &str) -> CodegenResult<String> {
        let outer = self.compile(scope)?;
        let sym = self.sym(name);
        Ok(self.stabilize(format!("rb_const_get_from({outer}, {sym})")))
    }

    pub(super) fn compile_colon3(&mut self, name: &str) -> String {
        let sym = self.sym(name);
        self.stabilize(format!("rb_const_get_from(rb_cObject, {sym})"))
    }

    pub(super) fn compile_cdecl(&mut self, name: &str, value: &Node) -> CodegenResult<String> {
        let value = self.compile(value)?;
        let value = self.stabilize(value);
        let sym = self.sym(name);
        self.emit(format!("rb_const_set(cbase, {sym}, {value});"));
        Ok(value)
    }
}
