#![allow(clippy::unwrap_used, reason = "tests unwrap for brevity")]

use pretty_assertions::assert_eq;
use rbc_ir::ParsedFile;

use crate::error::CodegenError;
use crate::options::{CompileOptions, RequireInclude};
use crate::session::Session;

fn parse(tree: &str) -> ParsedFile {
    serde_json::from_str(&format!(r#"{{"file_name": "test.rb", "tree": {tree}}}"#)).unwrap()
}

fn compile_with(options: &CompileOptions, tree: &str) -> String {
    let mut session = Session::new("test", options).unwrap();
    session.add_file(&parse(tree)).unwrap();
    session.to_c_code()
}

fn compile(tree: &str) -> String {
    compile_with(&CompileOptions::default(), tree)
}

fn compile_err(tree: &str) -> CodegenError {
    let mut session = Session::new("test", &CompileOptions::default()).unwrap();
    session.add_file(&parse(tree)).unwrap_err()
}

fn with(optimization: &str, args: &[&str]) -> CompileOptions {
    let mut options = CompileOptions::default();
    options.enable(optimization, args.iter().map(ToString::to_string).collect());
    options
}

/// The text of the generated function named `name`.
fn function<'c>(code: &'c str, name: &str) -> &'c str {
    let start = code
        .find(&format!(" {name}("))
        .and_then(|pos| code[..pos].rfind("static VALUE"))
        .unwrap_or_else(|| panic!("no function {name} in:\n{code}"));
    let end = code[start..].find("\n}\n").unwrap() + start + 3;
    &code[start..end]
}

fn assert_contains(code: &str, needle: &str) {
    assert!(code.contains(needle), "`{needle}` not found in:\n{code}");
}

const X_IS_ONE: &str = r#"{"type": "lasgn", "name": "x", "value": {"type": "lit", "lit": {"int": 1}}}"#;

// Blocks and closures

#[test]
fn nested_block_reaches_toplevel_variable_through_forwarded_closures() {
    let code = compile(&format!(
        r#"{{"type": "block", "stmts": [
            {X_IS_ONE},
            {{"type": "iter",
              "call": {{"type": "call", "recv": {{"type": "array"}}, "method": "each"}},
              "params": ["a"],
              "body": {{"type": "iter",
                "call": {{"type": "call", "recv": {{"type": "array"}}, "method": "each"}},
                "params": ["b"],
                "body": {{"type": "fcall", "method": "p", "args": [{{"type": "lvar", "name": "x"}}]}}
              }}
            }}
        ]}}"#
    ));

    let toplevel = function(&code, "toplevel");
    assert_contains(
        toplevel,
        "VALUE *lvar;\nVALUE lvar_ary = rb_ary_new2(1);\nrb_ary_store(lvar_ary, 0, Qnil);\nlvar = RARRAY_PTR(lvar_ary);\n\
         VALUE blk_closure = rb_ary_new3(3, self, cbase, lvar_ary);\n",
    );
    assert_contains(toplevel, ", blk_closure);");

    // the middle block forwards the base frame it received
    assert_contains(
        &code,
        "VALUE dvar[1];\nrb_mem_clear(dvar, 1);\nVALUE blk_closure = rb_ary_new3(3, self, cbase, closure[2]);\n",
    );
    // the innermost block reads it
    assert_contains(&code, "args0[0] = RARRAY_PTR(closure[2])[0];");
    assert_contains(
        &code,
        "(VALUE bl_val, VALUE closure_ary, VALUE bl_self) {\nVALUE *closure = RARRAY_PTR(closure_ary);\nVALUE self = closure[0];\nVALUE cbase = closure[1];\n",
    );
}

#[test]
fn block_without_captures_keeps_base_frame_on_stack() {
    let code = compile(&format!(
        r#"{{"type": "block", "stmts": [
            {X_IS_ONE},
            {{"type": "iter", "call": {{"type": "fcall", "method": "loop"}},
              "body": {{"type": "dasgn_curr", "name": "y", "value": {{"type": "lit", "lit": {{"int": 2}}}}}}}}
        ]}}"#
    ));
    let toplevel = function(&code, "toplevel");
    assert_contains(
        toplevel,
        "VALUE lvar[1];\nrb_mem_clear(lvar, 1);\nVALUE blk_closure = rb_ary_new3(2, self, cbase);\n",
    );
    assert_contains(&code, "dvar[0] = LONG2FIX(2);\nreturn dvar[0];\n}");
}

#[test]
fn block_parameters_unpack_bl_val() {
    let code = compile(
        r#"{"type": "iter", "call": {"type": "fcall", "method": "each_pair"},
            "params": ["k", "v"], "body": {"type": "dvar", "name": "v"}}"#,
    );
    assert_contains(
        &code,
        "tmp0 = rb_check_array_type(bl_val);\nif (NIL_P(tmp0)) tmp0 = rb_ary_new3(1, bl_val);\n\
         dvar[0] = rb_ary_entry(tmp0, 0);\ndvar[1] = rb_ary_entry(tmp0, 1);\nreturn dvar[1];\n",
    );
}

#[test]
fn identical_blocks_share_one_function() {
    let block = r#"{"type": "iter", "call": {"type": "fcall", "method": "loop"}, "body": {"type": "nil"}}"#;
    let mut session = Session::new("test", &CompileOptions::default()).unwrap();
    session
        .add_file(&parse(&format!(r#"{{"type": "block", "stmts": [{block}, {block}]}}"#)))
        .unwrap();
    // one block body plus the toplevel function
    assert_eq!(session.function_count(), 2);
}

// Control flow

#[test]
fn while_loop_break_sets_result() {
    let code = compile(
        r#"{"type": "while", "cond": {"type": "true"},
            "body": {"type": "break", "value": {"type": "lit", "lit": {"int": 5}}}}"#,
    );
    assert_contains(
        &code,
        "tmp0 = Qnil;\nfor (;;) {\nif (!RTEST(Qtrue)) break;\ntmp0 = LONG2FIX(5);\nbreak;\n}\nreturn tmp0;\n",
    );
}

#[test]
fn do_while_skips_first_test() {
    let code = compile(
        r#"{"type": "until", "cond": {"type": "false"}, "do_while": true,
            "body": {"type": "next"}}"#,
    );
    assert_contains(
        &code,
        "for (tmp1 = Qtrue; ; tmp1 = Qfalse) {\nif (!RTEST(tmp1)) {\nif (RTEST(Qfalse)) break;\n}\ncontinue;\n}\n",
    );
}

#[test]
fn next_and_break_in_blocks() {
    let code = compile(
        r#"{"type": "block", "stmts": [
            {"type": "iter", "call": {"type": "fcall", "method": "a"},
             "body": {"type": "next", "value": {"type": "lit", "lit": {"int": 1}}}},
            {"type": "iter", "call": {"type": "fcall", "method": "b"},
             "body": {"type": "break"}}
        ]}"#,
    );
    assert_contains(&code, "return LONG2FIX(1);\nreturn Qnil;\n}");
    assert_contains(&code, "rb_iter_break();");
}

#[test]
fn if_and_boolean_operators() {
    let code = compile(&format!(
        r#"{{"type": "block", "stmts": [
            {X_IS_ONE},
            {{"type": "if", "cond": {{"type": "and", "left": {{"type": "lvar", "name": "x"}}, "right": {{"type": "true"}}}},
              "then": {{"type": "str", "value": "yes"}}}}
        ]}}"#
    ));
    assert_contains(
        &code,
        "tmp1 = lvar[0];\nif (RTEST(tmp1)) {\ntmp1 = Qtrue;\n}\nif (RTEST(tmp1)) {\ntmp0 = rb_str_new(\"yes\", 3);\n} else {\ntmp0 = Qnil;\n}\n",
    );
}

#[test]
fn case_tests_each_value_with_case_equality() {
    let code = compile(&format!(
        r#"{{"type": "block", "stmts": [
            {X_IS_ONE},
            {{"type": "case", "subject": {{"type": "lvar", "name": "x"}},
              "whens": [{{"values": [{{"type": "lit", "lit": {{"int": 1}}}}], "body": {{"type": "true"}}}}],
              "else": {{"type": "false"}}}}
        ]}}"#
    ));
    assert_contains(&code, "sym_eq_eq_eq = rb_intern(\"===\");");
    assert_contains(
        &code,
        "tmp0 = lvar[0];\ntmp2 = Qfalse;\nif (!RTEST(tmp2)) {\ntmp2 = rb_funcall2(LONG2FIX(1), sym_eq_eq_eq, 1, &tmp0);\n}\n\
         if (RTEST(tmp2)) {\ntmp1 = Qtrue;\n} else {\ntmp1 = Qfalse;\n}\n",
    );
}

// begin/ensure and begin/rescue

#[test]
fn ensure_bodies_reach_locals_through_wrapper() {
    let code = compile(&format!(
        r#"{{"type": "block", "stmts": [
            {X_IS_ONE},
            {{"type": "ensure", "body": {{"type": "lvar", "name": "x"}},
              "ensure": {{"type": "lasgn", "name": "x", "value": {{"type": "lit", "lit": {{"int": 2}}}}}}}}
        ]}}"#
    ));
    assert_contains(&code, "struct rb2c_wrap {\nVALUE self;\nVALUE cbase;\nVALUE *var;\nVALUE *closure;\nVALUE blk_closure;\n};");
    assert_eq!(
        function(&code, "ensure_body"),
        "static VALUE ensure_body(VALUE wrap_arg) {\n\
         struct rb2c_wrap *wrap_ptr = (struct rb2c_wrap *)wrap_arg;\n\
         VALUE self = wrap_ptr->self;\n\
         VALUE cbase = wrap_ptr->cbase;\n\
         return (wrap_ptr->var)[0];\n}\n"
    );
    assert_contains(function(&code, "ensure"), "(wrap_ptr->var)[0] = LONG2FIX(2);");
    assert_contains(
        function(&code, "toplevel"),
        "wrap0.self = self;\nwrap0.cbase = cbase;\nwrap0.var = lvar;\nwrap0.closure = 0;\nwrap0.blk_closure = Qnil;\n\
         tmp1 = rb_ensure(RUBY_METHOD_FUNC(ensure_body), (VALUE)&wrap0, RUBY_METHOD_FUNC(ensure), (VALUE)&wrap0);\n",
    );
}

#[test]
fn rescue_callback_takes_the_exception() {
    let code = compile(
        r#"{"type": "rescue", "body": {"type": "fcall", "method": "risky"}, "rescue": {"type": "nil"}}"#,
    );
    assert_contains(&code, "static VALUE rescue(VALUE wrap_arg, VALUE exc) {");
    assert_contains(&code, "rb_rescue(RUBY_METHOD_FUNC(rescue_body), (VALUE)&wrap");
}

#[test]
fn break_cannot_leave_a_wrapped_body() {
    let err = compile_err(
        r#"{"type": "while", "cond": {"type": "true"},
            "body": {"type": "ensure", "body": {"type": "break", "line": 4}}}"#,
    );
    assert!(!err.is_bug());
    assert!(err.to_string().contains("begin/ensure"), "{err}");
    assert_eq!(err.line(), Some(4));
}

// Definitions

#[test]
fn method_checks_arity_and_loads_arguments() {
    let code = compile(
        r#"{"type": "defn", "name": "first", "args": ["a", "b"], "body": {"type": "lvar", "name": "a"}}"#,
    );
    assert_eq!(
        function(&code, "method_first"),
        "static VALUE method_first(int argc, VALUE *argv, VALUE self) {\n\
         VALUE cbase = global;\n\
         VALUE lvar[2];\n\
         rb_mem_clear(lvar, 2);\n\
         if (argc != 2) rb_raise(rb_eArgError, \"wrong number of arguments (%d for 2)\", argc);\n\
         lvar[0] = argv[0];\n\
         lvar[1] = argv[1];\n\
         return lvar[0];\n}\n"
    );
    assert_contains(
        function(&code, "toplevel"),
        "global = cbase;\nrb_define_private_method(cbase, \"first\", RUBY_METHOD_FUNC(method_first), -1);\n",
    );
}

#[test]
fn visibility_markers_switch_later_definitions() {
    let code = compile(
        r#"{"type": "class", "cpath": {"name": "Foo"}, "body": {"type": "block", "stmts": [
            {"type": "defn", "name": "a"},
            {"type": "vcall", "method": "protected"},
            {"type": "defn", "name": "b"},
            {"type": "fcall", "method": "module_function"},
            {"type": "defn", "name": "c"}
        ]}}"#,
    );
    assert_contains(&code, "rb_define_method(cbase, \"a\"");
    assert_contains(&code, "rb_define_protected_method(cbase, \"b\"");
    assert_contains(&code, "rb_define_module_function(cbase, \"c\"");
    assert!(!code.contains("sym_protected"));
}

#[test]
fn singleton_method_is_defined_on_receiver() {
    let code = compile(r#"{"type": "defs", "recv": {"type": "self"}, "name": "create"}"#);
    assert_contains(&code, "rb_define_singleton_method(self, \"create\", RUBY_METHOD_FUNC(method_create), -1);");
}

#[test]
fn shared_helpers_are_emitted_once() {
    let code = compile(
        r#"{"type": "block", "stmts": [
            {"type": "class", "cpath": {"name": "A"}},
            {"type": "class", "cpath": {"name": "B"}}
        ]}"#,
    );
    assert_eq!(code.matches("static VALUE rb2c_define_class(").count(), 1);
}

#[test]
fn nested_class_bodies_run_with_class_as_self_and_cbase() {
    let code = compile(
        r#"{"type": "module", "cpath": {"name": "M"}, "body":
            {"type": "class", "cpath": {"name": "C"}, "superclass": {"type": "const", "name": "Base"}}}"#,
    );
    assert_contains(&code, "tmp0 = rb2c_define_module(cbase, sym_M);");
    assert_contains(&code, "tmp1 = class_M(tmp0, tmp0);");
    let body = function(&code, "class_M");
    assert_contains(body, "tmp0 = rb_const_get(cbase, sym_Base);");
    assert_contains(body, "tmp1 = rb2c_define_class(cbase, sym_C, tmp0, 1);");
    assert_contains(body, "class_M__C(tmp1, tmp1)");
}

#[test]
fn yield_forms() {
    let code = compile(
        r#"{"type": "defn", "name": "each", "body": {"type": "block", "stmts": [
            {"type": "yield"},
            {"type": "yield", "args": [{"type": "lit", "lit": {"int": 1}}, {"type": "lit", "lit": {"int": 2}}]}
        ]}}"#,
    );
    assert_contains(&code, "tmp0 = rb_yield(Qundef);");
    assert_contains(&code, "tmp1 = rb_yield_values(2, LONG2FIX(1), LONG2FIX(2));");
}

#[test]
fn misplaced_jumps_are_user_errors() {
    let cases = [
        (r#"{"type": "yield", "line": 2}"#, "yield outside of a method"),
        (r#"{"type": "return", "line": 2}"#, "return outside of a method"),
        (r#"{"type": "next", "line": 2}"#, "next outside of a loop or block"),
        (
            r#"{"type": "defn", "name": "m", "body": {"type": "iter", "call": {"type": "fcall", "method": "each"},
                "body": {"type": "yield", "line": 2}}}"#,
            "yield inside a block is not supported",
        ),
        (
            r#"{"type": "defn", "name": "m", "body": {"type": "iter", "call": {"type": "fcall", "method": "each"},
                "body": {"type": "return", "line": 2}}}"#,
            "return inside a block is not supported",
        ),
    ];
    for (tree, message) in cases {
        let err = compile_err(tree);
        assert!(!err.is_bug(), "{tree}: {err}");
        assert_eq!(err.to_string(), message);
        assert_eq!(err.line(), Some(2));
    }
}

// Literals

#[test]
fn literals_are_interned_once() {
    let code = compile(
        r#"{"type": "array", "elems": [
            {"type": "lit", "lit": {"float": 0.5}},
            {"type": "lit", "lit": {"float": 0.5}},
            {"type": "lit", "lit": {"bignum": "123456789012345678901234567890"}},
            {"type": "lit", "lit": {"sym": "ok"}},
            {"type": "str", "value": "a\"b"}
        ]}"#,
    );
    assert_contains(&code, "global = rb_float_new(0.5);");
    assert_contains(&code, "global_1 = rb_cstr2inum(\"123456789012345678901234567890\", 10);");
    assert_contains(
        &code,
        "args0[0] = global;\nargs0[1] = global;\nargs0[2] = global_1;\nargs0[3] = ID2SYM(sym_ok);\nargs0[4] = rb_str_new(\"a\\\"b\", 3);\n",
    );
}

#[test]
fn integers_beyond_fixnum_range_are_built_at_load_time() {
    let code = compile(r#"{"type": "lit", "lit": {"int": 4611686018427387904}}"#);
    assert_contains(&code, "global = rb_cstr2inum(\"4611686018427387904\", 10);");
    assert_contains(&code, "return global;\n");
    assert!(!code.contains("LONG2FIX("), "{code}");

    let code = compile(
        r#"{"type": "array", "elems": [
            {"type": "lit", "lit": {"int": 1073741823}},
            {"type": "lit", "lit": {"int": -1073741824}},
            {"type": "lit", "lit": {"int": 1073741824}}
        ]}"#,
    );
    assert_contains(
        &code,
        "args0[0] = LONG2FIX(1073741823);\nargs0[1] = LONG2FIX(-1073741824);\nargs0[2] = global;\n",
    );
    assert_contains(&code, "global = rb_cstr2inum(\"1073741824\", 10);");
}

#[test]
fn string_interpolation_appends_each_part() {
    let code = compile(
        r#"{"type": "dstr", "parts": [{"type": "str", "value": "n="}, {"type": "gvar", "name": "$n"}]}"#,
    );
    assert_contains(
        &code,
        "tmp0 = rb_str_new(0, 0);\nrb_str_append(tmp0, rb_obj_as_string(rb_str_new(\"n=\", 2)));\n\
         rb_str_append(tmp0, rb_obj_as_string(rb_gv_get(\"$n\")));\n",
    );
}

// Plugins

#[test]
fn const_cache_looks_up_once_per_site() {
    let code = compile_with(&with("const_cache", &[]), r#"{"type": "const", "name": "Foo"}"#);
    assert_contains(&code, "global = Qundef;");
    assert_contains(&code, "if (global == Qundef) global = rb_const_get(cbase, sym_Foo);\nreturn global;\n");
}

#[test]
fn case_optimize_compares_immediates_directly() {
    let tree = format!(
        r#"{{"type": "block", "stmts": [
            {X_IS_ONE},
            {{"type": "case", "subject": {{"type": "lvar", "name": "x"}},
              "whens": [{{"values": [{{"type": "lit", "lit": {{"int": 1}}}}, {{"type": "lit", "lit": {{"sym": "a"}}}}],
                          "body": {{"type": "true"}}}}]}}
        ]}}"#
    );
    let code = compile_with(&with("case_optimize", &[]), &tree);
    assert_contains(
        &code,
        "tmp0 = lvar[0];\nif ((FIXNUM_P(tmp0) ? tmp0 == LONG2FIX(1) : RTEST(rb_funcall2(LONG2FIX(1), sym_eq_eq_eq, 1, &tmp0))) || tmp0 == ID2SYM(sym_a)) {\n\
         tmp1 = Qtrue;\n} else {\ntmp1 = Qnil;\n}\n",
    );

    // a non-literal value falls back to the generic form
    let code = compile_with(
        &with("case_optimize", &[]),
        r#"{"type": "case", "subject": {"type": "nil"}, "whens": [{"values": [{"type": "const", "name": "String"}]}]}"#,
    );
    assert_contains(&code, "rb_funcall2(tmp");
    assert!(!code.contains("FIXNUM_P"));

    // so does an integer that is not a Fixnum everywhere
    let code = compile_with(
        &with("case_optimize", &[]),
        r#"{"type": "case", "subject": {"type": "nil"},
            "whens": [{"values": [{"type": "lit", "lit": {"int": 4611686018427387904}}]}]}"#,
    );
    assert_contains(&code, "rb_funcall2(global, sym_eq_eq_eq");
    assert!(!code.contains("FIXNUM_P"));
}

#[test]
fn inline_methods_expand_in_place() {
    let tree = format!(
        r#"{{"type": "block", "stmts": [
            {X_IS_ONE},
            {{"type": "call", "recv": {{"type": "lvar", "name": "x"}}, "method": "nil?"}},
            {{"type": "defn", "name": "m", "body": {{"type": "vcall", "method": "block_given?"}}}},
            {{"type": "vcall", "method": "block_given?"}}
        ]}}"#
    );
    let code = compile_with(&with("inline_methods", &[]), &tree);
    assert_contains(&code, "tmp0 = (NIL_P(lvar[0]) ? Qtrue : Qfalse);");
    assert_contains(function(&code, "method_m"), "return (rb_block_given_p() ? Qtrue : Qfalse);");
    // outside a method the call stays dynamic
    assert_contains(function(&code, "toplevel"), "rb_funcall2(self, sym_block_given_p, 0, 0)");
}

#[test]
fn builtin_methods_route_through_helpers() {
    let tree = r#"{"type": "call", "recv": {"type": "lit", "lit": {"int": 1}}, "method": "+",
                   "args": [{"type": "lit", "lit": {"int": 2}}]}"#;
    let code = compile_with(&with("builtin_methods", &["Fixnum"]), tree);
    assert_contains(&code, "static VALUE rb2c_builtin_plus_1(VALUE recv, VALUE a0) {");
    assert_contains(&code, "tmp2 = rb2c_builtin_plus_1(tmp0, tmp1);");
    assert!(!code.contains("rb_cFloat"));

    // no fast path for this method: plain call
    let code = compile_with(
        &with("builtin_methods", &["Fixnum"]),
        r#"{"type": "call", "recv": {"type": "nil"}, "method": "inspect"}"#,
    );
    assert!(!code.contains("rb2c_builtin"));
}

#[test]
fn cache_call_gives_each_site_its_own_cache() {
    let tree = r#"{"type": "block", "stmts": [
        {"type": "call", "recv": {"type": "self"}, "method": "a"},
        {"type": "fcall", "method": "b"}
    ]}"#;
    let code = compile_with(&with("cache_call", &[]), tree);
    assert_contains(&code, "static struct rb2c_call_cache call_cache;\nstatic struct rb2c_call_cache call_cache_1;\n");
    assert_contains(&code, "rb2c_cached_call(&call_cache, self, sym_a, 0, 0, 0)");
    assert_contains(&code, "rb2c_cached_call(&call_cache_1, self, sym_b, 0, 0, 1)");
    assert_contains(&code, "rb_gc_register_address(&call_cache_1.klass);");
}

const CLASS_WITH_HELPERS: &str = r#"{"type": "class", "cpath": {"name": "Foo"}, "body": {"type": "block", "stmts": [
    {"type": "defn", "name": "shown"},
    {"type": "vcall", "method": "private"},
    {"type": "defn", "name": "hidden"},
    {"type": "defn", "name": "run", "body": {"type": "block", "stmts": [
        {"type": "vcall", "method": "hidden"},
        {"type": "fcall", "method": "shown", "args": [{"type": "nil"}]}
    ]}}
]}}"#;

#[test]
fn direct_self_call_targets_private_methods_only() {
    let code = compile_with(&with("direct_self_call", &[]), CLASS_WITH_HELPERS);
    let run = function(&code, "method_run");
    assert_contains(run, "tmp0 = method_hidden(0, 0, self);");
    assert_contains(run, "rb_funcall2(self, sym_shown, 1, args1)");
}

#[test]
fn direct_self_call_with_public_methods_and_call_caching() {
    let mut options = with("cache_call", &[]);
    options.enable("direct_self_call", vec!["allow_public".to_string()]);
    let code = compile_with(&options, CLASS_WITH_HELPERS);
    let run = function(&code, "method_run");
    assert_contains(run, "method_hidden(0, 0, self)");
    assert_contains(run, "args1[0] = Qnil;\ntmp2 = method_shown(1, args1, self);");
    assert!(!run.contains("rb2c_cached_call"));
}

#[test]
fn singleton_methods_always_dispatch_self_calls() {
    let tree = r#"{"type": "block", "stmts": [
        {"type": "defn", "name": "helper"},
        {"type": "class", "cpath": {"name": "Foo"}, "body":
            {"type": "defs", "recv": {"type": "self"}, "name": "run", "body": {"type": "vcall", "method": "helper"}}}
    ]}"#;
    let code = compile_with(&with("direct_self_call", &["allow_public"]), tree);
    let run = function(&code, "method_run");
    assert_contains(run, "rb_funcall2(self, sym_helper, 0, 0)");
    assert!(!run.contains("method_helper("), "{run}");

    // still a method body
    compile(r#"{"type": "defs", "recv": {"type": "self"}, "name": "now", "body": {"type": "return"}}"#);
}

#[test]
fn ivar_cache_reads_through_helper() {
    let code = compile_with(&with("ivar_cache", &[]), r#"{"type": "ivar", "name": "@a"}"#);
    assert_contains(&code, "static VALUE rb2c_ivar_get(VALUE obj, ID id) {");
    assert_contains(&code, "tmp0 = rb2c_ivar_get(self, sym_at_a);");
}

#[test]
fn require_include_inlines_pre_parsed_features() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("helper.json"),
        r#"{"file_name": "helper.rb", "tree": {"type": "defn", "name": "assist"}}"#,
    )
    .unwrap();
    let options = CompileOptions {
        require_include: Some(RequireInclude {
            paths: vec![dir.path().to_path_buf()],
            files: Vec::new(),
        }),
        ..CompileOptions::default()
    };
    let require = |feature: &str| {
        format!(r#"{{"type": "fcall", "method": "require", "args": [{{"type": "str", "value": "{feature}"}}]}}"#)
    };
    // the first site is never reached at run time
    let tree = format!(
        r#"{{"type": "block", "stmts": [
            {{"type": "if", "cond": {{"type": "false"}}, "then": {}}},
            {{"type": "lasgn", "name": "r", "value": {}}},
            {},
            {}
        ]}}"#,
        require("helper"),
        require("helper"),
        require("helper.rb"),
        require("missing")
    );
    let mut session = Session::new("test", &options).unwrap();
    session.add_file(&parse(&tree)).unwrap();
    let code = session.to_c_code();

    assert_contains(&code, "rb_define_private_method(cbase, \"assist\"");
    let loader = function(&code, "require_helper");
    assert_contains(loader, "static VALUE require_helper(void) {");
    assert_contains(loader, "rb_provided(\"helper.rb\")) return Qfalse;");
    assert_contains(loader, "rb_provide(\"helper.rb\");\ntoplevel");
    assert_contains(loader, "(ruby_top_self, rb_cObject);\nreturn Qtrue;\n}");

    let main = session.toplevel_functions().last().unwrap().clone();
    let body = function(&code, &main);
    assert_eq!(body.matches("= require_helper();").count(), 3);
    assert_contains(body, "rb_funcall2(self, sym_require, 1, args");
    assert_eq!(body.matches("sym_require").count(), 1);

    // nothing is provided before the feature runs
    let init = &code[code.find("void Init_test()").unwrap()..];
    assert!(!init.contains("rb_provide"), "{init}");
}

#[test]
fn require_include_reports_unreadable_trees() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
    let options = CompileOptions {
        require_include: Some(RequireInclude {
            paths: vec![dir.path().to_path_buf()],
            files: vec!["broken".to_string()],
        }),
        ..CompileOptions::default()
    };
    let mut session = Session::new("test", &options).unwrap();
    let err = session
        .add_file(&parse(
            r#"{"type": "fcall", "method": "require", "args": [{"type": "str", "value": "broken"}]}"#,
        ))
        .unwrap_err();
    assert!(matches!(err, CodegenError::Json { .. }), "{err}");
}

#[test]
fn warnings_do_not_change_output() {
    let tree = r#"{"type": "fcall", "method": "eval", "args": [{"type": "str", "value": "1"}]}"#;
    let options = CompileOptions {
        warnings: true,
        ..CompileOptions::default()
    };
    assert_eq!(compile_with(&options, tree), compile(tree));
}
