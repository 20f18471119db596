//! Conditionals, loops and jumps.

use rbc_ir::{Node, When};

use crate::error::{CodegenError, CodegenResult};
use crate::plugin::GenCx;

use super::function::{FunKind, Loop};
use super::RegionGen;

impl RegionGen<'_> {
    /// Compile `node` and assign its value to `target`.
    fn assign(&mut self, target: &str, node: Option<&Node>) -> CodegenResult<()> {
        let value = self.compile_opt(node)?;
        self.emit(format!("{target} = {value};"));
        Ok(())
    }

    pub(super) fn compile_if(
        &mut self,
        cond: &Node,
        then: Option<&Node>,
        else_body: Option<&Node>,
    ) -> CodegenResult<String> {
        let out = self.temp();
        let cond = self.compile(cond)?;
        self.emit(format!("if (RTEST({cond})) {{"));
        self.assign(&out, then)?;
        self.emit("} else {".to_string());
        self.assign(&out, else_body)?;
        self.emit("}".to_string());
        Ok(out)
    }

    /// `while`/`until`. A do-while loop skips the test on its first pass;
    /// `next` still reaches the test through the `for` step.
    pub(super) fn compile_loop(
        &mut self,
        cond: &Node,
        body: Option<&Node>,
        do_while: bool,
        until: bool,
    ) -> CodegenResult<String> {
        let result = self.temp();
        self.emit(format!("{result} = Qnil;"));
        let first = if do_while {
            let first = self.temp();
            self.emit(format!("for ({first} = Qtrue; ; {first} = Qfalse) {{"));
            self.emit(format!("if (!RTEST({first})) {{"));
            Some(first)
        } else {
            self.emit("for (;;) {".to_string());
            None
        };
        let cond = self.compile(cond)?;
        let test = if until { "" } else { "!" };
        self.emit(format!("if ({test}RTEST({cond})) break;"));
        if first.is_some() {
            self.emit("}".to_string());
        }

        self.current_mut().loops.push(Loop::While {
            result: result.clone(),
        });
        let compiled = self.compile_opt(body);
        self.current_mut().loops.pop();
        compiled?;
        self.emit("}".to_string());
        Ok(result)
    }

    pub(super) fn compile_and_or(
        &mut self,
        left: &Node,
        right: &Node,
        is_and: bool,
    ) -> CodegenResult<String> {
        let out = self.temp();
        self.assign(&out, Some(left))?;
        let test = if is_and { "" } else { "!" };
        self.emit(format!("if ({test}RTEST({out})) {{"));
        self.assign(&out, Some(right))?;
        self.emit("}".to_string());
        Ok(out)
    }

    pub(super) fn compile_not(&mut self, value: &Node) -> CodegenResult<String> {
        let value = self.compile(value)?;
        Ok(format!("(RTEST({value}) ? Qfalse : Qtrue)"))
    }

    /// `case` with `===` tests, first match wins.
    pub(super) fn compile_case(
        &mut self,
        subject: &Node,
        whens: &[When],
        else_body: Option<&Node>,
    ) -> CodegenResult<String> {
        let value = self.compile(subject)?;
        // `===` takes the subject by address
        let subject = self.temp();
        self.emit(format!("{subject} = {value};"));
        let out = self.temp();
        let matched = self.temp();
        let eqq = self.sym("===");
        for when in whens {
            self.emit(format!("{matched} = Qfalse;"));
            for value in &when.values {
                self.emit(format!("if (!RTEST({matched})) {{"));
                let value = self.compile(value)?;
                self.emit(format!(
                    "{matched} = rb_funcall2({value}, {eqq}, 1, &{subject});"
                ));
                self.emit("}".to_string());
            }
            self.emit(format!("if (RTEST({matched})) {{"));
            self.assign(&out, when.body.as_deref())?;
            self.emit("} else {".to_string());
        }
        self.assign(&out, else_body)?;
        for _ in whens {
            self.emit("}".to_string());
        }
        Ok(out)
    }

    pub(super) fn compile_return(&mut self, value: Option<&Node>, line: u32) -> CodegenResult<String> {
        if !self.kind.is_method() {
            return Err(CodegenError::user_at("return outside of a method", line));
        }
        match self.current().kind {
            FunKind::Region => {}
            FunKind::Block => {
                return Err(CodegenError::user_at(
                    "return inside a block is not supported",
                    line,
                ))
            }
            FunKind::Wrapped => {
                return Err(CodegenError::user_at(
                    "return inside begin/ensure or begin/rescue is not supported",
                    line,
                ))
            }
        }
        let value = self.compile_opt(value)?;
        self.emit(format!("return {value};"));
        Ok("Qnil".to_string())
    }

    pub(super) fn compile_break(&mut self, value: Option<&Node>, line: u32) -> CodegenResult<String> {
        match self.current().loops.last().cloned() {
            Some(Loop::While { result }) => {
                self.assign(&result, value)?;
                self.emit("break;".to_string());
            }
            Some(Loop::Block) => {
                // the block's value is dropped: `rb_iter_break` carries none
                self.compile_opt(value)?;
                self.emit("rb_iter_break();".to_string());
            }
            None => return Err(self.jump_error("break", line)),
        }
        Ok("Qnil".to_string())
    }

    pub(super) fn compile_next(&mut self, value: Option<&Node>, line: u32) -> CodegenResult<String> {
        match self.current().loops.last().cloned() {
            Some(Loop::While { .. }) => {
                self.compile_opt(value)?;
                self.emit("continue;".to_string());
            }
            Some(Loop::Block) => {
                let value = self.compile_opt(value)?;
                self.emit(format!("return {value};"));
            }
            None => return Err(self.jump_error("next", line)),
        }
        Ok("Qnil".to_string())
    }

    fn jump_error(&self, keyword: &str, line: u32) -> CodegenError {
        let message = if self.current().kind.is_wrapped() {
            format!("{keyword} out of begin/ensure or begin/rescue is not supported")
        } else {
            format!("{keyword} outside of a loop or block")
        };
        CodegenError::user_at(message, line)
    }
}
