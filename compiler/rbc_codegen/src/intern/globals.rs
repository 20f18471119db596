//! Module-lifetime `VALUE` storage.

use rustc_hash::FxHashMap;

use super::UniqueNames;

/// One static `VALUE` and the expression that initializes it at load time.
#[derive(Debug)]
struct GlobalEntry {
    var: String,
    init: String,
    register_gc: bool,
}

/// Static `VALUE` variables initialized once in `init_globals()`.
///
/// Shared entries (constants: float literals, bignums, frozen strings) are
/// deduplicated by initializer text. Private entries (mutable caches) get
/// fresh storage on every request.
#[derive(Debug, Default)]
pub struct GlobalTable {
    shared: FxHashMap<String, String>,
    entries: Vec<GlobalEntry>,
}

impl GlobalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage initialized to `init`.
    ///
    /// With `reusable`, an earlier entry with the same initializer is
    /// returned. With `register_gc`, the variable is registered with
    /// `rb_global_variable` so the stored object lives as long as the module.
    pub fn get(
        &mut self,
        names: &mut UniqueNames,
        init: &str,
        reusable: bool,
        register_gc: bool,
    ) -> String {
        if reusable {
            if let Some(var) = self.shared.get(init) {
                return var.clone();
            }
        }
        let var = names.get("global");
        tracing::trace!(%var, init, reusable, "allocated global");
        if reusable {
            self.shared.insert(init.to_string(), var.clone());
        }
        self.entries.push(GlobalEntry {
            var: var.clone(),
            init: init.to_string(),
            register_gc,
        });
        var
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declarations plus `init_globals()`.
    pub fn finalize(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&format!("static VALUE {};\n", entry.var));
        }
        out.push_str("static void init_globals(void) {\n");
        for entry in &self.entries {
            if entry.register_gc {
                out.push_str(&format!("rb_global_variable(&{});\n", entry.var));
            }
            out.push_str(&format!("{} = {};\n", entry.var, entry.init));
        }
        out.push_str("}\n");
        out
    }
}
