#![allow(clippy::unwrap_used, reason = "tests unwrap for brevity")]

use pretty_assertions::assert_eq;
use rbc_ir::{Node, NodeKind, ParsedFile};

use super::Session;
use crate::options::CompileOptions;
use crate::scope::Visibility;

fn file(tree: &str) -> ParsedFile {
    serde_json::from_str(&format!(r#"{{"file_name": "test.rb", "tree": {tree}}}"#)).unwrap()
}

fn node(json: &str) -> Node {
    serde_json::from_str(json).unwrap()
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("`{needle}` not found in:\n{haystack}"))
}

#[test]
fn script_without_blocks_is_one_function() {
    let mut session = Session::new("demo", &CompileOptions::default()).unwrap();
    session
        .add_file(&file(
            r#"{"type": "block", "stmts": [
                {"type": "lasgn", "name": "x", "value": {"type": "lit", "lit": {"int": 1}}},
                {"type": "fcall", "method": "puts", "args": [{"type": "lvar", "name": "x"}]}
            ]}"#,
        ))
        .unwrap();

    assert_eq!(session.function_count(), 1);
    assert_eq!(session.global_count(), 0);
    assert_eq!(session.toplevel_functions(), ["toplevel"]);
    assert_eq!(
        session.to_c_code(),
        "\
#include <ruby.h>
#include <node.h>
#include <env.h>
#include <st.h>
extern VALUE ruby_top_self;
static ID sym_puts;
static void init_syms(void) {
sym_puts = rb_intern(\"puts\");
}
static void init_globals(void) {
}
static VALUE toplevel(VALUE self, VALUE cbase) {
VALUE args0[1];
VALUE tmp1;
VALUE lvar[1];
rb_mem_clear(lvar, 1);
lvar[0] = LONG2FIX(1);
args0[0] = lvar[0];
tmp1 = rb_funcall2(self, sym_puts, 1, args0);
return tmp1;
}
void Init_demo() {
init_syms();
init_globals();
toplevel(ruby_top_self, rb_cObject);
}
"
    );
}

#[test]
fn empty_file_still_defines_init() {
    let mut session = Session::new("empty", &CompileOptions::default()).unwrap();
    session.add_file(&ParsedFile::default()).unwrap();
    let code = session.to_c_code();
    assert!(code.ends_with("void Init_empty() {\ninit_syms();\ninit_globals();\n}\n"));
    assert_eq!(session.function_count(), 0);
}

#[test]
fn output_sections_follow_fixed_order() {
    let mut options = CompileOptions::default();
    options.enable("cache_call", Vec::new());
    let mut session = Session::new("ordered", &options).unwrap();
    session
        .add_file(&file(
            r#"{"type": "block", "stmts": [
                {"type": "class", "cpath": {"name": "Foo"}},
                {"type": "fcall", "method": "puts", "args": [{"type": "lit", "lit": {"float": 1.5}}]}
            ]}"#,
        ))
        .unwrap();
    let code = session.to_c_code();

    let order = [
        "#include <ruby.h>",
        "static ID sym_Foo;",
        "static VALUE global;",
        "static void init_globals(void) {",
        "static VALUE rb2c_define_class(",
        "struct rb2c_call_cache {",
        "static struct rb2c_call_cache call_cache;",
        "static VALUE class_Foo(VALUE self, VALUE cbase) {",
        "static VALUE toplevel(VALUE self, VALUE cbase) {",
        "void Init_ordered() {",
        "init_syms();",
        "init_globals();",
        "rb_gc_register_address(&call_cache.klass);",
        "toplevel(ruby_top_self, rb_cObject);",
    ];
    for pair in order.windows(2) {
        assert!(
            position(&code, pair[0]) < position(&code, pair[1]),
            "`{}` should come before `{}`",
            pair[0],
            pair[1]
        );
    }
    assert!(code.contains("global = rb_float_new(1.5);"));
    assert!(code
        .lines()
        .all(|line| !line.is_empty() && line.trim() == line));
}

#[test]
fn begin_preamble_runs_first_with_public_visibility() {
    let parsed: ParsedFile = serde_json::from_str(
        r#"{
            "file_name": "pre.rb",
            "begin": {"type": "defn", "name": "early"},
            "tree": {"type": "defn", "name": "late"}
        }"#,
    )
    .unwrap();
    let mut session = Session::new("pre", &CompileOptions::default()).unwrap();
    session.add_file(&parsed).unwrap();

    assert_eq!(session.toplevel_functions().len(), 2);
    let code = session.to_c_code();
    let early = position(&code, "rb_define_method(cbase, \"early\"");
    let late = position(&code, "rb_define_private_method(cbase, \"late\"");
    assert!(early < late);

    let calls: Vec<&str> = code
        .lines()
        .filter(|line| line.ends_with("(ruby_top_self, rb_cObject);"))
        .collect();
    assert_eq!(
        calls,
        session
            .toplevel_functions()
            .iter()
            .map(|fun| format!("{fun}(ruby_top_self, rb_cObject);"))
            .collect::<Vec<_>>()
    );
}

#[test]
fn compile_region_queues_the_region() {
    let mut session = Session::new("snap", &CompileOptions::default()).unwrap();
    let first = session
        .compile_region(&node(r#"{"type": "defn", "name": "a"}"#))
        .unwrap();
    let second = session
        .compile_region(&node(r#"{"type": "defn", "name": "b"}"#))
        .unwrap();
    assert_ne!(first, second);
    assert_eq!(session.toplevel_functions(), [first, second]);
    // regions are compiled with public visibility
    assert!(session.to_c_code().contains("rb_define_method(cbase, \"b\""));
}

fn defn_name(def: &Node) -> &str {
    match &def.kind {
        NodeKind::Defn { name, .. } => name,
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn own_methods_skips_nested_and_singleton_definitions() {
    let class = node(
        r#"{"type": "class", "cpath": {"name": "Foo"}, "body": {"type": "block", "stmts": [
            {"type": "defn", "name": "a"},
            {"type": "defs", "recv": {"type": "self"}, "name": "b"},
            {"type": "class", "cpath": {"name": "Inner"}, "body": {"type": "defn", "name": "c"}},
            {"type": "defn", "name": "d"}
        ]}}"#,
    );
    let names: Vec<&str> = Session::own_methods(&class)
        .into_iter()
        .map(|(def, _)| defn_name(def))
        .collect();
    assert_eq!(names, ["a", "d"]);

    let single = node(r#"{"type": "module", "cpath": {"name": "M"}, "body": {"type": "defn", "name": "only"}}"#);
    assert_eq!(Session::own_methods(&single).len(), 1);
    assert!(Session::own_methods(&node(r#"{"type": "nil"}"#)).is_empty());
}

#[test]
fn own_methods_track_visibility_markers() {
    let class = node(
        r#"{"type": "class", "cpath": {"name": "Foo"}, "body": {"type": "block", "stmts": [
            {"type": "defn", "name": "open"},
            {"type": "vcall", "method": "private"},
            {"type": "defn", "name": "secret"},
            {"type": "fcall", "method": "protected"},
            {"type": "defn", "name": "shared"},
            {"type": "fcall", "method": "private", "args": [{"type": "lit", "lit": {"sym": "open"}}]},
            {"type": "defn", "name": "still_shared"}
        ]}}"#,
    );
    let methods: Vec<(&str, Visibility)> = Session::own_methods(&class)
        .into_iter()
        .map(|(def, visibility)| (defn_name(def), visibility))
        .collect();
    assert_eq!(
        methods,
        [
            ("open", Visibility::Public),
            ("secret", Visibility::Private),
            ("shared", Visibility::Protected),
            ("still_shared", Visibility::Protected),
        ]
    );
}

#[test]
fn methods_are_recorded_per_class_with_visibility() {
    let mut session = Session::new("rec", &CompileOptions::default()).unwrap();
    session
        .add_file(&file(
            r#"{"type": "block", "stmts": [
                {"type": "defn", "name": "top"},
                {"type": "class", "cpath": {"name": "Foo"}, "body": {"type": "block", "stmts": [
                    {"type": "defn", "name": "open"},
                    {"type": "vcall", "method": "private"},
                    {"type": "defn", "name": "helper"}
                ]}}
            ]}"#,
        ))
        .unwrap();

    let (_, visibility) = session.method_function(None, "top").unwrap();
    assert_eq!(visibility, Visibility::Private);
    let (fun, visibility) = session.method_function(Some("Foo"), "open").unwrap();
    assert_eq!(fun, "method_open");
    assert_eq!(visibility, Visibility::Public);
    let (_, visibility) = session.method_function(Some("Foo"), "helper").unwrap();
    assert_eq!(visibility, Visibility::Private);
    assert!(session.method_function(None, "helper").is_none());
}

#[test]
fn extension_name_must_be_a_c_identifier() {
    for name in ["my-ext", "2fast", ""] {
        let err = Session::new(name, &CompileOptions::default()).unwrap_err();
        assert!(!err.is_bug(), "{name}: {err}");
    }
    assert!(Session::new("my_ext2", &CompileOptions::default()).is_ok());
}

#[test]
fn failed_unit_reports_line() {
    let mut session = Session::new("bad", &CompileOptions::default()).unwrap();
    let err = session
        .add_file(&file(r#"{"type": "break", "line": 7}"#))
        .unwrap_err();
    assert!(!err.is_bug());
    assert_eq!(err.line(), Some(7));
}

#[test]
fn sessions_are_independent() {
    let tree = file(r#"{"type": "fcall", "method": "puts", "args": [{"type": "lit", "lit": {"float": 2.5}}]}"#);
    let mut a = Session::new("a", &CompileOptions::default()).unwrap();
    let mut b = Session::new("b", &CompileOptions::default()).unwrap();
    a.add_file(&tree).unwrap();
    b.add_file(&tree).unwrap();
    assert_eq!(
        a.to_c_code().replace("Init_a", "Init_x"),
        b.to_c_code().replace("Init_b", "Init_x")
    );
}
