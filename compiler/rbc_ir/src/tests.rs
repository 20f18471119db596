#![allow(clippy::unwrap_used, reason = "tests unwrap for brevity")]

use pretty_assertions::assert_eq;

use crate::{Literal, Node, NodeKind, NodeType, ParsedFile};

fn parse(json: &str) -> Node {
    serde_json::from_str(json).unwrap()
}

// Wire format

#[test]
fn parses_tagged_nodes_with_line() {
    let node = parse(r#"{"type": "lasgn", "name": "x", "value": {"type": "lit", "lit": {"int": 1}}, "line": 3}"#);
    assert_eq!(node.line, 3);
    assert_eq!(node.node_type(), NodeType::Lasgn);
    let NodeKind::Lasgn { name, value } = &node.kind else {
        panic!("expected lasgn, got {node:?}");
    };
    assert_eq!(name, "x");
    assert_eq!(value.kind, NodeKind::Lit { lit: Literal::Int(1) });
    assert_eq!(value.line, 0);
}

#[test]
fn parses_unit_and_renamed_variants() {
    assert_eq!(parse(r#"{"type": "self"}"#).kind, NodeKind::SelfRef);
    assert_eq!(parse(r#"{"type": "nil"}"#).kind, NodeKind::Nil);

    let node = parse(
        r#"{"type": "if", "cond": {"type": "true"}, "else": {"type": "str", "value": "no"}}"#,
    );
    let NodeKind::If { then, else_body, .. } = node.kind else {
        panic!("expected if");
    };
    assert!(then.is_none());
    assert_eq!(
        else_body.unwrap().kind,
        NodeKind::Str {
            value: "no".to_string()
        }
    );
}

#[test]
fn missing_optional_children_default() {
    let node = parse(r#"{"type": "fcall", "method": "puts"}"#);
    assert_eq!(
        node.kind,
        NodeKind::Fcall {
            method: "puts".to_string(),
            args: Vec::new()
        }
    );
}

#[test]
fn parsed_file_with_preamble() {
    let file: ParsedFile = serde_json::from_str(
        r#"{"file_name": "a.rb", "begin": {"type": "nil"}, "tree": {"type": "block", "stmts": []}}"#,
    )
    .unwrap();
    assert_eq!(file.file_name, "a.rb");
    assert_eq!(file.begin.unwrap().kind, NodeKind::Nil);
    assert!(file.tree.unwrap().statements().is_empty());
}

#[test]
fn node_type_names_match_wire_tags() {
    let node = parse(r#"{"type": "dasgn_curr", "name": "y"}"#);
    assert_eq!(node.node_type().to_string(), "dasgn_curr");
    assert_eq!(NodeType::SelfRef.as_str(), "self");
}

// Helpers

#[test]
fn statements_of_non_block_is_itself() {
    let node = parse(r#"{"type": "nil"}"#);
    assert_eq!(node.statements(), std::slice::from_ref(&node));
}

#[test]
fn call_target_unwraps_cached_calls() {
    let call = parse(r#"{"type": "vcall", "method": "foo"}"#);
    let cached = Node::new(NodeKind::CachedCall {
        site: "call_cache".to_string(),
        call: Box::new(call.clone()),
    });
    assert_eq!(cached.call_target(), &call);
    assert_eq!(call.call_target(), &call);
}
