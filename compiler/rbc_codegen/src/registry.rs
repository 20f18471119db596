//! Function registry.
//!
//! Content-addressed store for generated C function bodies. Bodies are
//! written with the placeholder [`FUNNAME`] where the function's name goes;
//! registration mints the name, substitutes it, and queues the body for
//! emission. Identical bodies that declare no `static` storage of their own
//! collapse to one definition: argument-unpacking shims and small blocks are
//! textually identical across unrelated call sites.

use rustc_hash::FxHashMap;

use crate::error::{CodegenError, CodegenResult};
use crate::intern::UniqueNames;

/// Placeholder for the function name inside a body passed to
/// [`FunctionRegistry::register`].
pub const FUNNAME: &str = "FUNNAME";

/// Registered function bodies in emission order.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    /// Placeholder body text → assigned name, for reusable bodies only.
    reusable: FxHashMap<String, String>,
    bodies: Vec<String>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `body`, returning the name it is callable by.
    ///
    /// The first line must open a `static` definition and the body must
    /// contain [`FUNNAME`]; anything else is a generator bug.
    pub fn register(
        &mut self,
        names: &mut UniqueNames,
        body: &str,
        base_name: &str,
    ) -> CodegenResult<String> {
        if let Some(name) = self.reusable.get(body) {
            tracing::trace!(%name, "reused function body");
            return Ok(name.clone());
        }

        let mut lines = body.lines();
        let is_static_definition = lines
            .next()
            .is_some_and(|first| first.trim_start().starts_with("static "));
        if !is_static_definition {
            return Err(CodegenError::bug(format!(
                "trying to add a non-static function ({base_name})"
            )));
        }
        if !body.contains(FUNNAME) {
            return Err(CodegenError::bug(format!(
                "trying to add a function without {FUNNAME} ({base_name})"
            )));
        }
        // Private `static` storage makes the body site-specific.
        let has_private_storage = lines.any(|line| line.trim_start().starts_with("static "));

        let name = names.get(base_name);
        if !has_private_storage {
            self.reusable.insert(body.to_string(), name.clone());
        }
        tracing::debug!(%name, reusable = !has_private_storage, "registered function");
        self.bodies.push(body.replace(FUNNAME, &name));
        Ok(name)
    }

    /// Number of distinct bodies queued for emission.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// All registered bodies, in registration order.
    pub fn finalize(&self) -> &[String] {
        &self.bodies
    }
}

#[cfg(test)]
mod tests;
