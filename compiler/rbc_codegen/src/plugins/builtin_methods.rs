//! Fast paths for core-class methods.
//!
//! A call to one of the methods in [`FAST_PATHS`] goes through a per-method
//! helper that tests the receiver's class and computes the result directly,
//! falling back to a normal call for every other receiver. The option's
//! argument list restricts which classes get fast paths.

use std::fmt::Write as _;
use std::rc::Rc;

use rbc_ir::{Node, NodeKind, NodeType};

use crate::c_text::{c_string_literal, mangle};
use crate::error::{CodegenError, CodegenResult};
use crate::plugin::{GenCx, Plugin, PreprocessorSet, Rewrite};

use super::{compile_to_temp, to_temp};

/// Classes with fast paths, with the test that `recv` is exactly that class.
const CLASSES: [(&str, &str); 5] = [
    ("Fixnum", "FIXNUM_P(recv)"),
    ("Float", "(!SPECIAL_CONST_P(recv) && RBASIC(recv)->klass == rb_cFloat)"),
    ("Array", "(!SPECIAL_CONST_P(recv) && RBASIC(recv)->klass == rb_cArray)"),
    ("String", "(!SPECIAL_CONST_P(recv) && RBASIC(recv)->klass == rb_cString)"),
    ("Hash", "(!SPECIAL_CONST_P(recv) && RBASIC(recv)->klass == rb_cHash)"),
];

const IS_FLOAT_A0: &str = "(!SPECIAL_CONST_P(a0) && RBASIC(a0)->klass == rb_cFloat)";
const IS_STRING_A0: &str = "(!SPECIAL_CONST_P(a0) && RBASIC(a0)->klass == rb_cString)";

/// One fast path: applies when the receiver is `class` and `guard` holds.
struct FastPath {
    class: &'static str,
    method: &'static str,
    argc: usize,
    guard: &'static str,
    value: &'static str,
}

const fn fast(
    class: &'static str,
    method: &'static str,
    argc: usize,
    guard: &'static str,
    value: &'static str,
) -> FastPath {
    FastPath {
        class,
        method,
        argc,
        guard,
        value,
    }
}

const FAST_PATHS: &[FastPath] = &[
    // Fixnum operands are at most one bit short of a long, so sums and
    // differences cannot overflow before LONG2NUM sees them.
    fast("Fixnum", "+", 1, "FIXNUM_P(a0)", "LONG2NUM(FIX2LONG(recv) + FIX2LONG(a0))"),
    fast("Fixnum", "-", 1, "FIXNUM_P(a0)", "LONG2NUM(FIX2LONG(recv) - FIX2LONG(a0))"),
    fast("Fixnum", "<", 1, "FIXNUM_P(a0)", "(FIX2LONG(recv) < FIX2LONG(a0) ? Qtrue : Qfalse)"),
    fast("Fixnum", "<=", 1, "FIXNUM_P(a0)", "(FIX2LONG(recv) <= FIX2LONG(a0) ? Qtrue : Qfalse)"),
    fast("Fixnum", ">", 1, "FIXNUM_P(a0)", "(FIX2LONG(recv) > FIX2LONG(a0) ? Qtrue : Qfalse)"),
    fast("Fixnum", ">=", 1, "FIXNUM_P(a0)", "(FIX2LONG(recv) >= FIX2LONG(a0) ? Qtrue : Qfalse)"),
    fast("Fixnum", "==", 1, "FIXNUM_P(a0)", "(recv == a0 ? Qtrue : Qfalse)"),
    fast("Float", "+", 1, IS_FLOAT_A0, "rb_float_new(RFLOAT(recv)->value + RFLOAT(a0)->value)"),
    fast("Float", "-", 1, IS_FLOAT_A0, "rb_float_new(RFLOAT(recv)->value - RFLOAT(a0)->value)"),
    fast("Float", "*", 1, IS_FLOAT_A0, "rb_float_new(RFLOAT(recv)->value * RFLOAT(a0)->value)"),
    fast("Float", "/", 1, IS_FLOAT_A0, "rb_float_new(RFLOAT(recv)->value / RFLOAT(a0)->value)"),
    fast("Float", "<", 1, IS_FLOAT_A0, "(RFLOAT(recv)->value < RFLOAT(a0)->value ? Qtrue : Qfalse)"),
    fast("Float", ">", 1, IS_FLOAT_A0, "(RFLOAT(recv)->value > RFLOAT(a0)->value ? Qtrue : Qfalse)"),
    fast("Array", "[]", 1, "FIXNUM_P(a0)", "rb_ary_entry(recv, FIX2LONG(a0))"),
    fast("Array", "size", 0, "1", "LONG2NUM(RARRAY_LEN(recv))"),
    fast("Array", "length", 0, "1", "LONG2NUM(RARRAY_LEN(recv))"),
    fast("Array", "<<", 1, "1", "rb_ary_push(recv, a0)"),
    fast("String", "size", 0, "1", "LONG2NUM(RSTRING_LEN(recv))"),
    fast("String", "length", 0, "1", "LONG2NUM(RSTRING_LEN(recv))"),
    fast("String", "+", 1, IS_STRING_A0, "rb_str_plus(recv, a0)"),
    fast("String", "<<", 1, IS_STRING_A0, "rb_str_append(recv, a0)"),
    fast("Hash", "[]", 1, "1", "rb_hash_aref(recv, a0)"),
    fast("Hash", "[]=", 2, "1", "rb_hash_aset(recv, a0, a1)"),
    fast("Hash", "size", 0, "1", "LONG2NUM(RHASH(recv)->tbl->num_entries)"),
];

pub struct BuiltinMethods {
    classes: Rc<[&'static str]>,
}

impl BuiltinMethods {
    /// Fast paths for the named classes; no names means all of them.
    pub fn new(classes: &[String]) -> CodegenResult<Self> {
        let mut enabled = Vec::new();
        if classes.is_empty() {
            enabled.extend(CLASSES.iter().map(|(name, _)| *name));
        }
        for class in classes {
            let Some((name, _)) = CLASSES.iter().find(|(name, _)| *name == class.as_str()) else {
                return Err(CodegenError::user(format!(
                    "builtin_methods: unsupported class `{class}` (expected one of {})",
                    CLASSES.map(|(name, _)| name).join(", ")
                )));
            };
            if !enabled.contains(name) {
                enabled.push(*name);
            }
        }
        Ok(BuiltinMethods {
            classes: enabled.into(),
        })
    }

    pub fn classes(&self) -> &[&'static str] {
        &self.classes
    }
}

fn class_test(class: &str) -> &'static str {
    CLASSES
        .iter()
        .find(|(name, _)| *name == class)
        .map_or("0", |(_, test)| *test)
}

/// Name and text of the helper for `method` with `argc` arguments, or `None`
/// when no enabled class has a fast path for it.
fn helper(classes: &[&str], method: &str, argc: usize) -> Option<(String, String)> {
    let paths: Vec<&FastPath> = FAST_PATHS
        .iter()
        .filter(|path| path.method == method && path.argc == argc && classes.contains(&path.class))
        .collect();
    if paths.is_empty() {
        return None;
    }
    let name = format!("rb2c_builtin_{}_{argc}", mangle(method));
    let params: String = (0..argc).map(|i| format!(", VALUE a{i}")).collect();

    let mut text = format!("static VALUE {name}(VALUE recv{params}) {{\nstatic ID mid;\n");
    if argc > 0 {
        let _ = writeln!(text, "VALUE argv[{argc}];");
    }
    for path in paths {
        let _ = writeln!(
            text,
            "if ({} && {}) return {};",
            class_test(path.class),
            path.guard,
            path.value
        );
    }
    // the call keeps its explicit receiver, so private methods still raise
    let _ = writeln!(text, "if (!mid) mid = rb_intern({});", c_string_literal(method));
    for i in 0..argc {
        let _ = writeln!(text, "argv[{i}] = a{i};");
    }
    let argv = if argc > 0 { "argv" } else { "0" };
    let _ = write!(text, "return rb_funcall3(recv, mid, {argc}, {argv});\n}}");
    Some((name, text))
}

fn builtin_call(classes: &[&str], cx: &mut dyn GenCx, node: &Node) -> CodegenResult<Rewrite> {
    let NodeKind::Call { recv, method, args } = &node.kind else {
        return Ok(Rewrite::Keep);
    };
    let Some((name, text)) = helper(classes, method, args.len()) else {
        return Ok(Rewrite::Keep);
    };
    cx.add_helper(&text);
    let recv = compile_to_temp(cx, recv)?;
    let mut values = vec![recv];
    for arg in args {
        values.push(compile_to_temp(cx, arg)?);
    }
    Ok(Rewrite::Done(to_temp(
        cx,
        format!("{name}({})", values.join(", ")),
    )))
}

impl Plugin for BuiltinMethods {
    fn name(&self) -> &'static str {
        "builtin_methods"
    }

    fn register(&self, preprocessors: &mut PreprocessorSet) {
        let classes = Rc::clone(&self.classes);
        preprocessors.add(NodeType::Call, move |cx, node| {
            builtin_call(&classes, cx, node)
        });
    }
}
