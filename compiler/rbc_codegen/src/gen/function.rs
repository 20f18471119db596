//! Buffer for one C function under construction.

/// Which kind of C function a buffer becomes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum FunKind {
    /// The region's own function.
    Region,
    Block,
    /// A `rb_ensure`/`rb_rescue` callback reaching its frames through
    /// `wrap_ptr`.
    Wrapped,
}

impl FunKind {
    pub(crate) fn is_wrapped(self) -> bool {
        self == FunKind::Wrapped
    }
}

/// Innermost construct `break` and `next` apply to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Loop {
    /// A C loop whose value lives in `result`.
    While { result: String },
    /// The block function itself.
    Block,
}

#[derive(Debug)]
pub(crate) struct FunctionBuf {
    pub(crate) kind: FunKind,
    decls: Vec<String>,
    pub(crate) lines: Vec<String>,
    pub(crate) loops: Vec<Loop>,
    next_local: usize,
}

impl FunctionBuf {
    pub(crate) fn new(kind: FunKind) -> Self {
        let loops = match kind {
            FunKind::Block => vec![Loop::Block],
            FunKind::Region | FunKind::Wrapped => Vec::new(),
        };
        FunctionBuf {
            kind,
            decls: Vec::new(),
            lines: Vec::new(),
            loops,
            next_local: 0,
        }
    }

    fn local(&mut self, prefix: &str) -> String {
        let name = format!("{prefix}{}", self.next_local);
        self.next_local += 1;
        name
    }

    /// A fresh `VALUE` temporary.
    pub(crate) fn temp(&mut self) -> String {
        let name = self.local("tmp");
        self.decls.push(format!("VALUE {name};"));
        name
    }

    /// A fresh `VALUE` array of `len` elements.
    pub(crate) fn array(&mut self, len: usize) -> String {
        let name = self.local("args");
        self.decls.push(format!("VALUE {name}[{len}];"));
        name
    }

    /// A fresh wrapper struct for a callback.
    pub(crate) fn wrap_struct(&mut self) -> String {
        let name = self.local("wrap");
        self.decls.push(format!("struct rb2c_wrap {name};"));
        name
    }

    /// Full function text: signature, `prologue`, local declarations, frame
    /// `setup`, statements, then `return result`.
    pub(crate) fn render(
        &self,
        signature: &str,
        prologue: &[String],
        setup: &str,
        result: &str,
    ) -> String {
        let mut out = format!("{signature} {{\n");
        for line in prologue.iter().chain(&self.decls) {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(setup);
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&format!("return {result};\n}}"));
        out
    }
}
