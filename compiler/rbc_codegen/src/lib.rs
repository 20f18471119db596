//! rb2c code generation.
//!
//! Translates Ruby 1.8 parse trees into the C source of a Ruby extension.
//! Each compilation unit is one [`Session`]: feed it parsed files or single
//! regions, then assemble the source with [`Session::to_c_code`].
//!
//! # Architecture
//!
//! - [`scope`]: variable slots, closure captures, stack vs heap frames
//! - [`intern`]: unique C names, symbols and load-time globals
//! - [`registry`]: content-addressed store of generated function bodies
//! - [`plugin`] / [`plugins`]: optional passes hooked in per node type
//! - [`gen`]: per-region code generation
//! - [`session`]: the driver tying it together
//!
//! # Usage
//!
//! ```ignore
//! let options = CompileOptions::all_optimizations();
//! let c_source = compile_file("my_ext", &parsed, &options)?;
//! ```

pub mod c_text;
mod error;
pub mod gen;
pub mod intern;
pub mod options;
pub mod plugin;
pub mod plugins;
pub mod registry;
pub mod scope;
pub mod session;
mod stack;

pub use error::{CodegenError, CodegenResult};
pub use options::CompileOptions;
pub use registry::FunctionRegistry;
pub use scope::Visibility;
pub use session::Session;

use rbc_ir::ParsedFile;

/// Compile one parsed file into the C source of extension `name`.
#[tracing::instrument(level = "debug", skip(file, options), fields(file = %file.file_name))]
pub fn compile_file(
    name: &str,
    file: &ParsedFile,
    options: &CompileOptions,
) -> CodegenResult<String> {
    let mut session = Session::new(name, options)?;
    session.add_file(file)?;
    Ok(session.to_c_code())
}
