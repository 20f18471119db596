//! Symbol interning (`rb_intern`).

use rustc_hash::FxHashMap;

use super::UniqueNames;
use crate::c_text::c_string_literal;

/// Ruby symbols used by generated code, each backed by one `static ID`.
#[derive(Debug, Default)]
pub struct SymbolTable {
    ids: FxHashMap<String, String>,
    /// (symbol, C variable) in first-request order.
    order: Vec<(String, String)>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The C variable holding the `ID` of `sym`.
    pub fn get(&mut self, names: &mut UniqueNames, sym: &str) -> String {
        if let Some(var) = self.ids.get(sym) {
            return var.clone();
        }
        let var = names.get(&format!("sym_{sym}"));
        tracing::trace!(sym, %var, "interned symbol");
        self.ids.insert(sym.to_string(), var.clone());
        self.order.push((sym.to_string(), var.clone()));
        var
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Declarations plus `init_syms()`, which fills every variable.
    pub fn finalize(&self) -> String {
        let mut out = String::new();
        for (_, var) in &self.order {
            out.push_str(&format!("static ID {var};\n"));
        }
        out.push_str("static void init_syms(void) {\n");
        for (sym, var) in &self.order {
            out.push_str(&format!("{var} = rb_intern({});\n", c_string_literal(sym)));
        }
        out.push_str("}\n");
        out
    }
}
