#![allow(clippy::unwrap_used, reason = "tests unwrap for brevity")]

use pretty_assertions::assert_eq;

use super::FunctionRegistry;
use crate::intern::UniqueNames;

const SHIM: &str = "static VALUE FUNNAME(VALUE x) {\nreturn x;\n}";

#[test]
fn identical_bodies_collapse() {
    let mut names = UniqueNames::new();
    let mut registry = FunctionRegistry::new();
    let a = registry.register(&mut names, SHIM, "shim").unwrap();
    let b = registry.register(&mut names, SHIM, "shim").unwrap();
    assert_eq!(a, b);
    assert_eq!(registry.len(), 1);
    assert_eq!(
        registry.finalize(),
        ["static VALUE shim(VALUE x) {\nreturn x;\n}".to_string()]
    );
}

#[test]
fn bodies_with_private_storage_never_collapse() {
    let body = "static VALUE FUNNAME(void) {\nstatic int calls = 0;\nreturn INT2FIX(++calls);\n}";
    let mut names = UniqueNames::new();
    let mut registry = FunctionRegistry::new();
    let a = registry.register(&mut names, body, "counter").unwrap();
    let b = registry.register(&mut names, body, "counter").unwrap();
    assert_ne!(a, b);
    assert_eq!(registry.len(), 2);
}

#[test]
fn different_bodies_get_unique_names() {
    let mut names = UniqueNames::new();
    let mut registry = FunctionRegistry::new();
    let a = registry.register(&mut names, SHIM, "block").unwrap();
    let b = registry
        .register(&mut names, "static VALUE FUNNAME(void) {\nreturn Qnil;\n}", "block")
        .unwrap();
    assert_eq!(a, "block");
    assert_eq!(b, "block_1");
    assert_eq!(registry.finalize()[1], "static VALUE block_1(void) {\nreturn Qnil;\n}");
}

#[test]
fn every_placeholder_occurrence_is_substituted() {
    let body = "static VALUE FUNNAME(VALUE n) {\nreturn FUNNAME(n);\n}";
    let mut names = UniqueNames::new();
    let mut registry = FunctionRegistry::new();
    let name = registry.register(&mut names, body, "loop").unwrap();
    assert_eq!(
        registry.finalize()[0],
        format!("static VALUE {name}(VALUE n) {{\nreturn {name}(n);\n}}")
    );
}

#[test]
fn non_static_body_is_a_bug() {
    let mut names = UniqueNames::new();
    let mut registry = FunctionRegistry::new();
    let err = registry
        .register(&mut names, "VALUE FUNNAME(void) {\n}", "f")
        .unwrap_err();
    assert!(err.is_bug());
    assert!(registry.is_empty());
}

#[test]
fn missing_placeholder_is_a_bug() {
    let mut names = UniqueNames::new();
    let mut registry = FunctionRegistry::new();
    let err = registry
        .register(&mut names, "static VALUE f(void) {\n}", "f")
        .unwrap_err();
    assert!(err.is_bug());
    assert!(!names.contains("f"));
}
