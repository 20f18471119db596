//! `case` over integer and symbol literals.
//!
//! Symbols match by identity. Integers match by identity when the subject is
//! a Fixnum; any other subject still goes through `===`, so `1.0` keeps
//! matching `when 1`. Integers outside the portable Fixnum range are left to
//! the generic form.

use rbc_ir::{Literal, Node, NodeKind, NodeType, When};

use crate::error::CodegenResult;
use crate::gen::fits_fixnum;
use crate::plugin::{GenCx, Plugin, PreprocessorSet, Rewrite};

use super::compile_to_temp;

pub struct CaseOptimize;

fn is_immediate(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Lit {
            lit: Literal::Int(value),
        } => fits_fixnum(*value),
        NodeKind::Lit {
            lit: Literal::Sym(_),
        } => true,
        _ => false,
    }
}

/// C condition for `when value` against the temporary `subject`.
fn test(cx: &mut dyn GenCx, value: &Node, subject: &str) -> CodegenResult<String> {
    let literal = cx.compile(value)?;
    Ok(match &value.kind {
        NodeKind::Lit {
            lit: Literal::Int(_),
        } => {
            let eqq = cx.sym("===");
            format!(
                "(FIXNUM_P({subject}) ? {subject} == {literal} : RTEST(rb_funcall2({literal}, {eqq}, 1, &{subject})))"
            )
        }
        _ => format!("{subject} == {literal}"),
    })
}

fn optimize_case(cx: &mut dyn GenCx, node: &Node) -> CodegenResult<Rewrite> {
    let NodeKind::Case {
        subject,
        whens,
        else_body,
    } = &node.kind
    else {
        return Ok(Rewrite::Keep);
    };
    let eligible = !whens.is_empty()
        && whens
            .iter()
            .all(|when| !when.values.is_empty() && when.values.iter().all(is_immediate));
    if !eligible {
        return Ok(Rewrite::Keep);
    }

    let subject = compile_to_temp(cx, subject)?;
    let out = cx.temp();
    for When { values, body } in whens {
        let mut tests = Vec::with_capacity(values.len());
        for value in values {
            tests.push(test(cx, value, &subject)?);
        }
        cx.emit(format!("if ({}) {{", tests.join(" || ")));
        let value = match body {
            Some(body) => cx.compile(body)?,
            None => "Qnil".to_string(),
        };
        cx.emit(format!("{out} = {value};"));
        cx.emit("} else {".to_string());
    }
    let value = match else_body {
        Some(body) => cx.compile(body)?,
        None => "Qnil".to_string(),
    };
    cx.emit(format!("{out} = {value};"));
    for _ in whens {
        cx.emit("}".to_string());
    }
    Ok(Rewrite::Done(out))
}

impl Plugin for CaseOptimize {
    fn name(&self) -> &'static str {
        "case_optimize"
    }

    fn register(&self, preprocessors: &mut PreprocessorSet) {
        preprocessors.add(NodeType::Case, optimize_case);
    }
}
