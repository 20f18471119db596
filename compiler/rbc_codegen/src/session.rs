//! Compilation session.
//!
//! A [`Session`] turns the parse trees of one compilation unit into one C
//! source file. It owns every table shared between regions: names, symbols,
//! globals, registered functions, helpers and the plugin set. Sessions share
//! nothing with each other.
//!
//! # Output layout
//!
//! ```text
//! #include <ruby.h> ...        headers
//! static ID sym_...;          symbols + init_syms()
//! static VALUE global...;     globals + init_globals()
//! helpers                     sorted, each once
//! plugin global code
//! functions                   registration order
//! void Init_<name>()          tables, plugin init code, top-level calls
//! ```

use std::collections::BTreeSet;

use rbc_ir::{Node, NodeKind, ParsedFile};
use rustc_hash::FxHashMap;

use crate::c_text::is_c_identifier;
use crate::error::{CodegenError, CodegenResult};
use crate::gen::RegionGen;
use crate::intern::{GlobalTable, SymbolTable, UniqueNames};
use crate::options::CompileOptions;
use crate::plugin::{plugins_for, Plugin, PreprocessorSet};
use crate::registry::FunctionRegistry;
use crate::scope::Visibility;

/// Class path used for methods defined outside any class body.
const TOPLEVEL_CLASS: &str = "Object";

/// One compilation unit.
pub struct Session {
    name: String,
    file_name: String,
    names: UniqueNames,
    syms: SymbolTable,
    globals: GlobalTable,
    funs: FunctionRegistry,
    helpers: BTreeSet<String>,
    plugins: Vec<Box<dyn Plugin>>,
    preprocessors: PreprocessorSet,
    toplevel: Vec<String>,
    /// `(class path, method name)` → function and visibility at definition.
    methods: FxHashMap<(String, String), (String, Visibility)>,
}

impl Session {
    /// A session for the unit `name`, which becomes `Init_<name>`.
    #[tracing::instrument(level = "debug", skip(options))]
    pub fn new(name: &str, options: &CompileOptions) -> CodegenResult<Self> {
        if !is_c_identifier(name) {
            return Err(CodegenError::user(format!(
                "`{name}` is not a valid extension name (it must be a C identifier)"
            )));
        }
        let plugins = plugins_for(options)?;
        let mut preprocessors = PreprocessorSet::new();
        for plugin in &plugins {
            plugin.register(&mut preprocessors);
        }
        Ok(Session {
            name: name.to_string(),
            file_name: String::new(),
            names: UniqueNames::new(),
            syms: SymbolTable::new(),
            globals: GlobalTable::new(),
            funs: FunctionRegistry::new(),
            helpers: BTreeSet::new(),
            plugins,
            preprocessors,
            toplevel: Vec::new(),
            methods: FxHashMap::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compile a parsed file and queue its top-level functions.
    ///
    /// Each `BEGIN` statement becomes its own function and runs first, with
    /// public visibility; the main tree starts out private, like Ruby's
    /// top-level `def`.
    #[tracing::instrument(level = "debug", skip_all, fields(file = %file.file_name))]
    pub fn add_file(&mut self, file: &ParsedFile) -> CodegenResult<()> {
        self.file_name.clone_from(&file.file_name);
        if let Some(begin) = &file.begin {
            for stmt in begin.statements() {
                let fun = self.compile_toplevel(stmt, false)?;
                self.add_toplevel(fun);
            }
        }
        if let Some(tree) = &file.tree {
            let fun = self.compile_toplevel(tree, true)?;
            self.add_toplevel(fun);
        }
        Ok(())
    }

    /// Compile `node` as a top-level region without queueing it; returns the
    /// function name.
    pub fn compile_toplevel(&mut self, node: &Node, private_vmode: bool) -> CodegenResult<String> {
        RegionGen::toplevel(self, node, private_vmode)
    }

    /// Queue `fun` to be called from `Init_`, after those queued earlier.
    pub fn add_toplevel(&mut self, fun: String) {
        tracing::debug!(%fun, "queued top-level function");
        self.toplevel.push(fun);
    }

    /// Compile one region (typically a class body regenerated from a running
    /// program) and queue it; returns its callable name.
    #[tracing::instrument(level = "debug", skip_all, fields(line = node.line))]
    pub fn compile_region(&mut self, node: &Node) -> CodegenResult<String> {
        let fun = self.compile_toplevel(node, false)?;
        self.add_toplevel(fun.clone());
        Ok(fun)
    }

    /// Methods a class or module body defines directly, in source order,
    /// with the visibility each is defined with.
    ///
    /// Definitions in nested classes and singleton definitions are excluded.
    pub fn own_methods(class_node: &Node) -> Vec<(&Node, Visibility)> {
        let body = match &class_node.kind {
            NodeKind::Class { body, .. } | NodeKind::Module { body, .. } => body.as_deref(),
            _ => None,
        };
        let mut visibility = Visibility::Public;
        let mut methods = Vec::new();
        for stmt in body.map(Node::statements).unwrap_or_default() {
            match &stmt.kind {
                NodeKind::Defn { .. } => methods.push((stmt, visibility)),
                NodeKind::Vcall { method } => {
                    visibility = Visibility::from_marker(method).unwrap_or(visibility);
                }
                NodeKind::Fcall { method, args } if args.is_empty() => {
                    visibility = Visibility::from_marker(method).unwrap_or(visibility);
                }
                _ => {}
            }
        }
        methods
    }

    /// The assembled C source of the unit.
    #[tracing::instrument(level = "debug", skip(self), fields(name = %self.name))]
    pub fn to_c_code(&self) -> String {
        let mut parts: Vec<String> = vec![
            "#include <ruby.h>".to_string(),
            "#include <node.h>".to_string(),
            "#include <env.h>".to_string(),
            "#include <st.h>".to_string(),
            "extern VALUE ruby_top_self;".to_string(),
            self.syms.finalize(),
            self.globals.finalize(),
        ];
        parts.extend(self.helpers.iter().cloned());
        parts.extend(self.plugins.iter().map(|plugin| plugin.global_code()));
        parts.extend(self.funs.finalize().iter().cloned());

        parts.push(format!("void Init_{}() {{", self.name));
        parts.push("init_syms();".to_string());
        parts.push("init_globals();".to_string());
        parts.extend(self.plugins.iter().map(|plugin| plugin.init_code()));
        for fun in &self.toplevel {
            parts.push(format!("{fun}(ruby_top_self, rb_cObject);"));
        }
        parts.push("}".to_string());

        let mut out = String::new();
        for line in parts.iter().flat_map(|part| part.lines()) {
            let line = line.trim();
            if !line.is_empty() {
                out.push_str(line);
                out.push('\n');
            }
        }
        tracing::debug!(
            functions = self.funs.len(),
            symbols = self.syms.len(),
            globals = self.globals.len(),
            "assembled unit"
        );
        out
    }

    // Accessors

    pub fn toplevel_functions(&self) -> &[String] {
        &self.toplevel
    }

    pub fn function_count(&self) -> usize {
        self.funs.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.syms.len()
    }

    pub fn global_count(&self) -> usize {
        self.globals.len()
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    // Services for region generation

    pub(crate) fn preprocessors(&self) -> &PreprocessorSet {
        &self.preprocessors
    }

    pub(crate) fn file_name(&self) -> &str {
        &self.file_name
    }

    pub(crate) fn sym(&mut self, name: &str) -> String {
        self.syms.get(&mut self.names, name)
    }

    pub(crate) fn global_const(&mut self, init: &str) -> String {
        self.globals.get(&mut self.names, init, true, true)
    }

    pub(crate) fn global_var(&mut self, init: &str) -> String {
        self.globals.get(&mut self.names, init, false, true)
    }

    pub(crate) fn unique_name(&mut self, base: &str) -> String {
        self.names.get(base)
    }

    pub(crate) fn add_helper(&mut self, code: &str) {
        if !self.helpers.contains(code) {
            self.helpers.insert(code.to_string());
        }
    }

    pub(crate) fn add_fun(&mut self, body: &str, base_name: &str) -> CodegenResult<String> {
        self.funs.register(&mut self.names, body, base_name)
    }

    pub(crate) fn record_method(
        &mut self,
        class_path: Option<&str>,
        name: &str,
        fun: &str,
        visibility: Visibility,
    ) {
        let class_path = class_path.unwrap_or(TOPLEVEL_CLASS).to_string();
        self.methods
            .insert((class_path, name.to_string()), (fun.to_string(), visibility));
    }

    pub(crate) fn method_function(
        &self,
        class_path: Option<&str>,
        name: &str,
    ) -> Option<(String, Visibility)> {
        let key = (
            class_path.unwrap_or(TOPLEVEL_CLASS).to_string(),
            name.to_string(),
        );
        self.methods.get(&key).cloned()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("functions", &self.funs.len())
            .field("toplevel", &self.toplevel)
            .field("plugins", &self.plugin_names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
